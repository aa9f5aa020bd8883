use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::timestamp::normalize_required;

/// Application status. Only `pending` is ever written today; `approved` and
/// `rejected` are reserved for future owner action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Stored values are constrained by a CHECK, so anything unexpected is
    /// a migration bug; fall back to `pending` rather than failing a read.
    pub fn from_db(value: &str) -> Self {
        match value {
            "approved" => ApplicationStatus::Approved,
            "rejected" => ApplicationStatus::Rejected,
            _ => ApplicationStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ApplicationModel {
    pub id: String,
    pub item_id: String,
    pub applicant_id: String,
    pub applicant_name: String,
    pub applicant_picture: Option<String>,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// A purchase application as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseApplication {
    pub id: String,
    pub item_id: String,
    pub applicant_id: String,
    pub applicant_name: String,
    pub applicant_picture: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: String,
}

impl ApplicationModel {
    pub fn into_wire(self) -> PurchaseApplication {
        PurchaseApplication {
            id: self.id,
            item_id: self.item_id,
            applicant_id: self.applicant_id,
            applicant_name: self.applicant_name,
            applicant_picture: self.applicant_picture,
            status: ApplicationStatus::from_db(&self.status),
            created_at: normalize_required(self.created_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Rejected).unwrap(),
            "\"rejected\""
        );
    }

    #[test]
    fn status_parses_from_stored_value() {
        assert_eq!(ApplicationStatus::from_db("pending"), ApplicationStatus::Pending);
        assert_eq!(ApplicationStatus::from_db("approved"), ApplicationStatus::Approved);
        assert_eq!(ApplicationStatus::from_db("rejected"), ApplicationStatus::Rejected);
    }

    #[test]
    fn wire_application_uses_camel_case() {
        let model = ApplicationModel {
            id: "app-1".to_string(),
            item_id: "item-1".to_string(),
            applicant_id: "google-sub-2".to_string(),
            applicant_name: "Bob".to_string(),
            applicant_picture: Some("https://img/bob.png".to_string()),
            status: "pending".to_string(),
            created_at: Some(Utc.with_ymd_and_hms(2025, 11, 22, 12, 0, 0).unwrap()),
        };
        let value = serde_json::to_value(model.into_wire()).unwrap();
        assert_eq!(value["itemId"], "item-1");
        assert_eq!(value["applicantId"], "google-sub-2");
        assert_eq!(value["applicantName"], "Bob");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["createdAt"], "2025-11-22T12:00:00.000Z");
    }
}
