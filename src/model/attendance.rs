use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coordinates captured at check-in, stored as a JSON string in
/// `attendance.location_data`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    #[schema(example = 37.7749)]
    pub latitude: f64,
    #[schema(example = -122.4194)]
    pub longitude: f64,
}

impl Location {
    pub fn to_json(&self) -> String {
        // serializing two floats cannot fail
        serde_json::to_string(self).unwrap()
    }

    pub fn from_json(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1)]
    pub user_id: u64,
    #[schema(example = "2024-01-01T09:00:00Z", format = "date-time", value_type = String)]
    pub check_in_time: DateTime<Utc>,
    #[schema(example = "2024-01-01T17:30:00Z", format = "date-time", value_type = String, nullable = true)]
    pub check_out_time: Option<DateTime<Utc>>,
    #[schema(example = r#"{"latitude":37.7749,"longitude":-122.4194}"#)]
    pub location_data: String,
    #[schema(example = "1 Market St, San Francisco", nullable = true)]
    pub location_address: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
}

impl AttendanceRecord {
    pub fn location(&self) -> Option<Location> {
        Location::from_json(&self.location_data)
    }

    /// Elapsed hours for a closed record, `None` while it is still open.
    pub fn duration(&self) -> Option<f64> {
        duration_hours(self.check_in_time, self.check_out_time)
    }
}

/// `check_out − check_in` in hours, rounded to 2 decimal places.
pub fn duration_hours(
    check_in: DateTime<Utc>,
    check_out: Option<DateTime<Utc>>,
) -> Option<f64> {
    let check_out = check_out?;
    let seconds = (check_out - check_in).num_milliseconds() as f64 / 1000.0;
    Some((seconds / 3600.0 * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn duration_of_open_record_is_none() {
        assert_eq!(duration_hours(ts("2024-01-01T09:00:00Z"), None), None);
    }

    #[test]
    fn full_work_day_is_eight_and_a_half_hours() {
        let d = duration_hours(
            ts("2024-01-01T09:00:00Z"),
            Some(ts("2024-01-01T17:30:00Z")),
        );
        assert_eq!(d, Some(8.5));
    }

    #[test]
    fn duration_rounds_to_two_decimals() {
        // 10 minutes = 0.1666… hours
        let d = duration_hours(
            ts("2024-01-01T09:00:00Z"),
            Some(ts("2024-01-01T09:10:00Z")),
        );
        assert_eq!(d, Some(0.17));

        // one second
        let d = duration_hours(
            ts("2024-01-01T09:00:00Z"),
            Some(ts("2024-01-01T09:00:01Z")),
        );
        assert_eq!(d, Some(0.0));
    }

    #[test]
    fn duration_spans_midnight() {
        let d = duration_hours(
            ts("2024-01-01T22:00:00Z"),
            Some(ts("2024-01-02T06:00:00Z")),
        );
        assert_eq!(d, Some(8.0));
    }

    #[test]
    fn location_json_round_trip() {
        let loc = Location {
            latitude: 37.7749,
            longitude: -122.4194,
        };
        let parsed = Location::from_json(&loc.to_json()).unwrap();
        assert_eq!(parsed, loc);
    }

    #[test]
    fn malformed_location_data_is_none() {
        assert_eq!(Location::from_json("not json"), None);
        assert_eq!(Location::from_json(r#"{"latitude": 1.0}"#), None);
    }

    #[test]
    fn record_duration_uses_its_own_timestamps() {
        let record = AttendanceRecord {
            id: 1,
            user_id: 2,
            check_in_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            check_out_time: Some(Utc.with_ymd_and_hms(2024, 1, 1, 13, 15, 0).unwrap()),
            location_data: r#"{"latitude":0.0,"longitude":0.0}"#.to_string(),
            location_address: None,
            notes: None,
        };
        assert_eq!(record.duration(), Some(4.25));
    }
}
