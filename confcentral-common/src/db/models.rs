//! Database records
//!
//! Each record maps its columns explicitly in `from_row`; list-valued fields
//! are JSON arrays in TEXT columns.

use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    pub id: String,
    pub organizer_user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub city: String,
    pub topics: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// 1-12 from `start_date`, 0 when there is no start date
    pub month: i64,
    pub max_attendees: i64,
    pub seats_available: i64,
}

impl Conference {
    /// Column list matching [`Conference::from_row`]
    pub const COLUMNS: &'static str = "id, organizer_user_id, name, description, city, topics, \
         start_date, end_date, month, max_attendees, seats_available";

    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            organizer_user_id: row.try_get("organizer_user_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            city: row.try_get("city")?,
            topics: decode_list(&row.try_get::<String, _>("topics")?)?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            month: row.try_get("month")?,
            max_attendees: row.try_get("max_attendees")?,
            seats_available: row.try_get("seats_available")?,
        })
    }

    /// Seats currently held by registered attendees
    pub fn seats_taken(&self) -> i64 {
        self.max_attendees - self.seats_available
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub conference_id: String,
    pub name: String,
    pub highlights: Vec<String>,
    /// Empty when no speaker is known
    pub speaker: String,
    pub type_of_session: String,
    pub start_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    /// Minutes
    pub duration: i64,
}

impl Session {
    /// Column list matching [`Session::from_row`]
    pub const COLUMNS: &'static str = "id, conference_id, name, highlights, speaker, \
         type_of_session, start_date, start_time, duration";

    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            conference_id: row.try_get("conference_id")?,
            name: row.try_get("name")?,
            highlights: decode_list(&row.try_get::<String, _>("highlights")?)?,
            speaker: row.try_get("speaker")?,
            type_of_session: row.try_get("type_of_session")?,
            start_date: row.try_get("start_date")?,
            start_time: row.try_get("start_time")?,
            duration: row.try_get("duration")?,
        })
    }

    /// Time of day the session ends, if it has a start time
    ///
    /// `None` also for durations outside the representable range.
    pub fn end_time(&self) -> Option<NaiveTime> {
        let start = self.start_time?;
        let length = chrono::TimeDelta::try_minutes(self.duration)?;
        let (end, wrapped) = start.overflowing_add_signed(length);
        // A session running past midnight does not end "before" any time of day
        if wrapped != 0 {
            return None;
        }
        Some(end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    /// Attend-set in registration order, no duplicates
    pub conference_keys_to_attend: Vec<String>,
}

impl Profile {
    pub const COLUMNS: &'static str = "user_id, conference_keys_to_attend";

    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            conference_keys_to_attend: decode_list(
                &row.try_get::<String, _>("conference_keys_to_attend")?,
            )?,
        })
    }

    pub fn is_attending(&self, conference_id: &str) -> bool {
        self.conference_keys_to_attend
            .iter()
            .any(|key| key == conference_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub id: String,
    pub profile_id: String,
    pub session_id: String,
}

impl WishlistEntry {
    pub const COLUMNS: &'static str = "id, profile_id, session_id";

    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            profile_id: row.try_get("profile_id")?,
            session_id: row.try_get("session_id")?,
        })
    }
}

/// Month number stored on a conference for a given start date
pub fn month_of(start_date: Option<NaiveDate>) -> i64 {
    start_date.map(|d| i64::from(d.month())).unwrap_or(0)
}

/// Encode a list-valued column
pub fn encode_list(values: &[String]) -> Result<String> {
    Ok(serde_json::to_string(values)?)
}

/// Decode a list-valued column
pub fn decode_list(raw: &str) -> Result<Vec<String>> {
    Ok(serde_json::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(start: Option<NaiveTime>, duration: i64) -> Session {
        Session {
            id: "s".into(),
            conference_id: "c".into(),
            name: "Intro".into(),
            highlights: vec![],
            speaker: String::new(),
            type_of_session: "Workshop".into(),
            start_date: None,
            start_time: start,
            duration,
        }
    }

    #[test]
    fn test_month_of() {
        assert_eq!(month_of(NaiveDate::from_ymd_opt(2026, 6, 1)), 6);
        assert_eq!(month_of(None), 0);
    }

    #[test]
    fn test_list_encoding() {
        let topics = vec!["Rust".to_string(), "Databases".to_string()];
        let raw = encode_list(&topics).unwrap();
        assert_eq!(raw, r#"["Rust","Databases"]"#);
        assert_eq!(decode_list("[]").unwrap(), Vec::<String>::new());
        assert!(decode_list("not json").is_err());
    }

    #[test]
    fn test_session_end_time() {
        let start = NaiveTime::from_hms_opt(10, 0, 0);
        assert_eq!(
            session_at(start, 90).end_time(),
            NaiveTime::from_hms_opt(11, 30, 0)
        );
        assert_eq!(session_at(None, 90).end_time(), None);
        // Runs past midnight
        assert_eq!(session_at(NaiveTime::from_hms_opt(23, 0, 0), 120).end_time(), None);
    }

    #[test]
    fn test_session_end_time_huge_duration() {
        let start = NaiveTime::from_hms_opt(9, 0, 0);
        assert_eq!(session_at(start, i64::MAX / 2).end_time(), None);
        assert_eq!(session_at(start, i64::MAX).end_time(), None);
        assert_eq!(session_at(start, 3 * 24 * 60).end_time(), None);
    }

    #[test]
    fn test_profile_attending() {
        let profile = Profile {
            user_id: "u".into(),
            conference_keys_to_attend: vec!["a".into(), "b".into()],
        };
        assert!(profile.is_attending("b"));
        assert!(!profile.is_attending("c"));
    }

    #[test]
    fn test_seats_taken() {
        let conf = Conference {
            id: "c".into(),
            organizer_user_id: "u".into(),
            name: "RustConf".into(),
            description: None,
            city: "Portland".into(),
            topics: vec![],
            start_date: None,
            end_date: None,
            month: 0,
            max_attendees: 10,
            seats_available: 3,
        };
        assert_eq!(conf.seats_taken(), 7);
    }
}
