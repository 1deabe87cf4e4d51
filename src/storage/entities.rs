use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named activity time is tracked against. `total_time` is the sum of the durations of every
/// [Session] recorded for it, in seconds.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub total_time: u64,
}

impl Skill {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            total_time: 0,
        }
    }
}

/// One completed interval of work. Sessions are never modified once recorded.
///
/// Timestamps are stored as RFC 3339 strings, which is also what a browser produces when it
/// serializes a `Date`, so logs exported from the web tracker load as is.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub skill: String,
    /// Active seconds, pauses excluded.
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};

    use super::{Session, Skill};

    #[test]
    fn test_skill_uses_camel_case() -> Result<()> {
        let skill = Skill {
            name: "Guitar".into(),
            total_time: 125,
        };
        assert_eq!(
            serde_json::to_string(&skill)?,
            r#"{"name":"Guitar","totalTime":125}"#
        );
        Ok(())
    }

    #[test]
    fn test_session_parses_browser_dates() -> Result<()> {
        let stored = r#"{
            "id": "1709280000000",
            "skill": "Guitar",
            "duration": 60,
            "startTime": "2024-03-01T07:59:00.000Z",
            "endTime": "2024-03-01T08:00:00.000Z"
        }"#;

        let session: Session = serde_json::from_str(stored)?;

        assert_eq!(
            session,
            Session {
                id: "1709280000000".into(),
                skill: "Guitar".into(),
                duration: 60,
                start_time: Utc.with_ymd_and_hms(2024, 3, 1, 7, 59, 0).unwrap(),
                end_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            }
        );
        Ok(())
    }
}
