pub mod handlers;
pub mod pages;
pub mod store;
pub mod validation;
pub mod views;
