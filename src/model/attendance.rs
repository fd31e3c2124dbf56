use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Optional geo fix attached to a period boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 32.0853)]
    pub lat: f64,
    #[schema(example = 34.7818)]
    pub lng: f64,
}

/// One start/end interval inside a day's ledger entry.
///
/// `end_at == None` marks the open period; the ledger invariant is that at
/// most one period is open and it is always the last one.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Period {
    #[schema(value_type = String, format = "date-time")]
    pub start_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_location: Option<GeoPoint>,
}

impl Period {
    pub fn is_open(&self) -> bool {
        self.end_at.is_none()
    }
}

/// Active-shift marker embedded in the user row (JSON column).
/// Present if and only if a shift is open for that user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveShift {
    pub company_id: String,
    pub date_key: String,
    /// Row id of the day's ledger entry, `{user_id}_{date_key}`.
    pub entry_id: String,
    #[schema(value_type = String, format = "date-time")]
    pub started_at: DateTime<Utc>,
}

/// A user's workday: the ordered period list for one (user, calendar day).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub company_id: String,
    pub user_id: String,
    pub date_key: String,
    pub periods: Vec<Period>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn entry_id(user_id: &str, date_key: &str) -> String {
        format!("{}_{}", user_id, date_key)
    }

    /// The open period, if any. Only the last period may be open.
    pub fn open_period(&self) -> Option<&Period> {
        self.periods.last().filter(|p| p.is_open())
    }

    pub fn has_open_period(&self) -> bool {
        self.open_period().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, h, 0, 0).unwrap()
    }

    fn period(start: u32, end: Option<u32>) -> Period {
        Period {
            start_at: at(start),
            end_at: end.map(at),
            start_location: None,
            end_location: None,
        }
    }

    fn entry(periods: Vec<Period>) -> LedgerEntry {
        LedgerEntry {
            id: "u1_2026-02-10".into(),
            company_id: "c1".into(),
            user_id: "u1".into(),
            date_key: "2026-02-10".into(),
            periods,
            updated_at: at(16),
            expires_at: at(16),
        }
    }

    #[test]
    fn open_period_is_only_ever_the_last_one() {
        let e = entry(vec![period(8, Some(12)), period(13, None)]);
        assert!(e.has_open_period());
        assert_eq!(e.open_period().map(|p| p.start_at), Some(at(13)));
    }

    #[test]
    fn closed_day_has_no_open_period() {
        let e = entry(vec![period(8, Some(16))]);
        assert!(!e.has_open_period());
    }

    #[test]
    fn periods_round_trip_through_json_column_format() {
        let stored = serde_json::to_string(&vec![period(8, None)]).unwrap();
        let parsed: Vec<Period> = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].is_open());
    }
}
