use chrono::{DateTime, SecondsFormat, Utc};

/// A timestamp as it comes out of the store, before it is safe to put on the
/// wire. Historical records may already carry the wire (string) form; a value
/// that is neither native nor a string is treated as missing.
#[derive(Debug, Clone)]
pub enum StoredTimestamp {
    Native(DateTime<Utc>),
    Wire(String),
    Missing,
}

impl From<Option<DateTime<Utc>>> for StoredTimestamp {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        match value {
            Some(ts) => StoredTimestamp::Native(ts),
            None => StoredTimestamp::Missing,
        }
    }
}

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Normalize a required timestamp (`postedAt`, `createdAt`) for the wire.
/// A corrupt or missing value falls back to the current time so a read is
/// never blocked by one bad record.
pub fn normalize_required(ts: impl Into<StoredTimestamp>) -> String {
    match ts.into() {
        StoredTimestamp::Native(ts) => to_rfc3339(ts),
        StoredTimestamp::Wire(s) => s,
        StoredTimestamp::Missing => to_rfc3339(Utc::now()),
    }
}

/// Normalize an optional timestamp (`lastApplicationAt`). A corrupt or
/// missing value is dropped from the payload rather than defaulted.
pub fn normalize_optional(ts: impl Into<StoredTimestamp>) -> Option<String> {
    match ts.into() {
        StoredTimestamp::Native(ts) => Some(to_rfc3339(ts)),
        StoredTimestamp::Wire(s) => Some(s),
        StoredTimestamp::Missing => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn native_timestamps_become_rfc3339() {
        let ts = Utc.with_ymd_and_hms(2025, 11, 22, 9, 30, 0).unwrap();
        assert_eq!(normalize_required(Some(ts)), "2025-11-22T09:30:00.000Z");
    }

    #[test]
    fn wire_form_passes_through_unchanged() {
        let s = "2025-11-22T09:30:00.000Z".to_string();
        assert_eq!(
            normalize_required(StoredTimestamp::Wire(s.clone())),
            s.as_str()
        );
    }

    #[test]
    fn missing_required_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let normalized = normalize_required(None);
        let parsed = DateTime::parse_from_rfc3339(&normalized).unwrap();
        let after = Utc::now();
        assert!(parsed.with_timezone(&Utc) >= before - chrono::Duration::seconds(1));
        assert!(parsed.with_timezone(&Utc) <= after + chrono::Duration::seconds(1));
    }

    #[test]
    fn missing_optional_timestamp_is_dropped() {
        assert_eq!(normalize_optional(None), None);
        let ts = Utc.with_ymd_and_hms(2025, 11, 22, 9, 30, 0).unwrap();
        assert_eq!(
            normalize_optional(Some(ts)),
            Some("2025-11-22T09:30:00.000Z".to_string())
        );
    }

    #[test]
    fn normalized_output_is_stable() {
        // Two reads of the same stored value must produce identical strings.
        let ts = Utc.with_ymd_and_hms(2025, 11, 23, 12, 0, 1).unwrap();
        assert_eq!(normalize_required(Some(ts)), normalize_required(Some(ts)));
    }
}
