use serde::Deserialize;

use crate::applications::store::{ApplicationChanges, ApplicationFilter, NewApplication};
use crate::errors::AppError;
use crate::models::application::ApplicationStatus;

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Raw `?limit&offset&status&q` parameters, checked by [`PageQuery::validate`].
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub status: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug)]
pub struct PageRequest {
    pub limit: i64,
    pub offset: i64,
    pub filter: ApplicationFilter,
}

impl PageQuery {
    pub fn validate(self) -> Result<PageRequest, AppError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}, got {limit}"
            )));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::Validation(format!(
                "offset must not be negative, got {offset}"
            )));
        }

        Ok(PageRequest {
            limit,
            offset,
            filter: ApplicationFilter {
                status: parse_status(self.status.as_deref())?,
                q: self.q,
            },
        })
    }
}

/// JSON body of `POST /api/applications`.
#[derive(Debug, Deserialize)]
pub struct CreateApplication {
    pub company: String,
    pub role: String,
    pub status: ApplicationStatus,
}

impl CreateApplication {
    pub fn validate(self) -> Result<NewApplication, AppError> {
        Ok(NewApplication {
            company: require_text("company", &self.company)?,
            role: require_text("role", &self.role)?,
            status: self.status,
        })
    }
}

/// JSON body of `PATCH /api/applications/:id`. A supplied field must not be blank.
pub fn validate_changes(changes: ApplicationChanges) -> Result<ApplicationChanges, AppError> {
    Ok(ApplicationChanges {
        company: changes
            .company
            .map(|c| require_text("company", &c))
            .transpose()?,
        role: changes.role.map(|r| require_text("role", &r)).transpose()?,
        status: changes.status,
    })
}

/// Form body of `POST /applications`. Fields are optional here so that a
/// missing one is reported through the same path as a blank one.
#[derive(Debug, Default, Deserialize)]
pub struct ApplicationForm {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl ApplicationForm {
    pub fn validate(self) -> Result<NewApplication, AppError> {
        let status = parse_status(self.status.as_deref())?
            .ok_or_else(|| AppError::Validation("status is required".to_string()))?;
        Ok(NewApplication {
            company: require_text("company", self.company.as_deref().unwrap_or_default())?,
            role: require_text("role", self.role.as_deref().unwrap_or_default())?,
            status,
        })
    }
}

/// Form body of the edit route. Blank inputs mean "leave unchanged".
#[derive(Debug, Default, Deserialize)]
pub struct EditForm {
    pub company: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl EditForm {
    pub fn validate(self) -> Result<ApplicationChanges, AppError> {
        Ok(ApplicationChanges {
            company: non_blank(self.company),
            role: non_blank(self.role),
            status: parse_status(self.status.as_deref())?,
        })
    }
}

/// Form body of the status route. Only the status can change here, and it must be given.
#[derive(Debug, Default, Deserialize)]
pub struct StatusForm {
    pub status: Option<String>,
}

impl StatusForm {
    pub fn validate(self) -> Result<ApplicationChanges, AppError> {
        let status = parse_status(self.status.as_deref())?
            .ok_or_else(|| AppError::Validation("status is required".to_string()))?;
        Ok(ApplicationChanges {
            status: Some(status),
            ..Default::default()
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require_text(field: &str, value: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Blank means "no status given"; anything else must name a known status.
fn parse_status(raw: Option<&str>) -> Result<Option<ApplicationStatus>, AppError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => label
            .parse::<ApplicationStatus>()
            .map(Some)
            .map_err(|e| AppError::Validation(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = PageQuery::default().validate().unwrap();
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset, 0);
        assert!(page.filter.status.is_none());
    }

    #[test]
    fn test_page_limit_bounds() {
        for limit in [0, -1, 101] {
            let query = PageQuery {
                limit: Some(limit),
                ..Default::default()
            };
            assert!(matches!(query.validate(), Err(AppError::Validation(_))));
        }
        for limit in [1, 100] {
            let query = PageQuery {
                limit: Some(limit),
                ..Default::default()
            };
            assert_eq!(query.validate().unwrap().limit, limit);
        }
    }

    #[test]
    fn test_negative_offset_rejected() {
        let query = PageQuery {
            offset: Some(-5),
            ..Default::default()
        };
        assert!(matches!(query.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_page_status_parsing() {
        let query = PageQuery {
            status: Some("offer".into()),
            ..Default::default()
        };
        assert_eq!(
            query.validate().unwrap().filter.status,
            Some(ApplicationStatus::Offer)
        );

        let blank = PageQuery {
            status: Some("".into()),
            ..Default::default()
        };
        assert_eq!(blank.validate().unwrap().filter.status, None);

        let bogus = PageQuery {
            status: Some("Ghosted".into()),
            ..Default::default()
        };
        assert!(matches!(bogus.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_create_form_requires_every_field() {
        let form = ApplicationForm {
            company: Some("  Acme ".into()),
            role: Some("Engineer".into()),
            status: Some("Applied".into()),
        };
        let new = form.validate().unwrap();
        assert_eq!(new.company, "Acme");
        assert_eq!(new.status, ApplicationStatus::Applied);

        let missing_role = ApplicationForm {
            company: Some("Acme".into()),
            role: Some("   ".into()),
            status: Some("Applied".into()),
        };
        assert!(matches!(missing_role.validate(), Err(AppError::Validation(_))));

        let missing_status = ApplicationForm {
            company: Some("Acme".into()),
            role: Some("Engineer".into()),
            status: None,
        };
        assert!(matches!(missing_status.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_edit_form_blank_fields_are_unchanged() {
        let changes = EditForm {
            company: Some("".into()),
            role: Some(" Staff Engineer ".into()),
            status: Some("".into()),
        }
        .validate()
        .unwrap();

        assert_eq!(changes.company, None);
        assert_eq!(changes.role.as_deref(), Some("Staff Engineer"));
        assert_eq!(changes.status, None);
    }

    #[test]
    fn test_status_form_requires_status() {
        let changes = StatusForm {
            status: Some("interview".into()),
        }
        .validate()
        .unwrap();
        assert_eq!(changes.status, Some(ApplicationStatus::Interview));
        assert_eq!(changes.company, None);
        assert_eq!(changes.role, None);

        for status in [None, Some("  ".to_string())] {
            assert!(matches!(
                StatusForm { status }.validate(),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_json_changes_reject_blank_text() {
        let changes = ApplicationChanges {
            company: Some(" ".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_changes(changes),
            Err(AppError::Validation(_))
        ));
    }
}
