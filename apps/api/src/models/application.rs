use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::any::AnyRow;
use sqlx::{FromRow, Row};
use thiserror::Error;

/// Where an application currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Applied,
    Interview,
    Offer,
    Rejected,
}

#[derive(Debug, Error)]
#[error("Unknown status '{0}'; expected one of Applied, Interview, Offer, Rejected")]
pub struct UnknownStatus(pub String);

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Applied,
        ApplicationStatus::Interview,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::Interview => "Interview",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lenient parse used for query strings and form fields: surrounding
/// whitespace and letter case are ignored.
impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownStatus(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobApplication {
    pub id: i64,
    pub company: String,
    pub role: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One entry of the status picker rendered for a row.
pub struct StatusOption {
    pub label: &'static str,
    pub selected: bool,
}

impl JobApplication {
    pub fn status_options(&self) -> Vec<StatusOption> {
        ApplicationStatus::ALL
            .into_iter()
            .map(|status| StatusOption {
                label: status.as_str(),
                selected: status == self.status,
            })
            .collect()
    }

    pub fn updated_label(&self) -> String {
        self.updated_at.format("%Y-%m-%d %H:%M").to_string()
    }
}

// Decoded by hand: the Any driver only carries primitive column types, so
// status and timestamps travel as text.
impl<'r> FromRow<'r, AnyRow> for JobApplication {
    fn from_row(row: &'r AnyRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;

        Ok(JobApplication {
            id: row.try_get("id")?,
            company: row.try_get("company")?,
            role: row.try_get("role")?,
            status: status.parse().map_err(|e| column_error("status", e))?,
            created_at: decode_timestamp(&created_at)
                .map_err(|e| column_error("created_at", e))?,
            updated_at: decode_timestamp(&updated_at)
                .map_err(|e| column_error("updated_at", e))?,
        })
    }
}

fn column_error(
    column: &str,
    source: impl std::error::Error + Send + Sync + 'static,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(source),
    }
}

/// Current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 in UTC, so text order matches time order.
pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_is_lenient() {
        assert_eq!(
            " offer ".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Offer
        );
        assert_eq!(
            "INTERVIEW".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Interview
        );
        assert!("Ghosted".parse::<ApplicationStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&ApplicationStatus::Rejected).unwrap();
        assert_eq!(json, "\"Rejected\"");
        assert!(serde_json::from_str::<ApplicationStatus>("\"rejected\"").is_err());
    }

    #[test]
    fn test_timestamp_text_is_fixed_width_and_ordered() {
        let earlier = decode_timestamp("2024-01-31T09:15:00.000001Z").unwrap();
        let later = decode_timestamp("2024-01-31T09:15:00.100000Z").unwrap();
        let (a, b) = (encode_timestamp(earlier), encode_timestamp(later));

        assert_eq!(a, "2024-01-31T09:15:00.000001Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_now_survives_encoding() {
        let ts = now();
        assert_eq!(decode_timestamp(&encode_timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn test_status_options_mark_current() {
        let app = JobApplication {
            id: 1,
            company: "Acme".into(),
            role: "Engineer".into(),
            status: ApplicationStatus::Interview,
            created_at: now(),
            updated_at: now(),
        };
        let selected: Vec<_> = app
            .status_options()
            .into_iter()
            .filter(|o| o.selected)
            .map(|o| o.label)
            .collect();
        assert_eq!(selected, vec!["Interview"]);
    }
}
