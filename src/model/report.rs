use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An abuse report against a survey, as stored in the database.
///
/// Created open; closed exactly once by a moderator or admin, recording the
/// resolution and the resolver. The close is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    /// The reported survey.
    pub survey_id: Id,
    /// Why the survey was reported.
    pub reason: String,
    /// Subject id of the reporter. Needed so a false report can be struck.
    pub reporter_id: Id,
    /// Whether the report has been resolved.
    pub resolved: bool,
    /// Resolution text, set on close.
    pub resolution: Option<String>,
    /// Subject id of the resolver, set on close.
    pub resolver_id: Option<Id>,
    /// Creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Report {
    pub fn new(survey_id: Id, reason: String, reporter_id: Id) -> Self {
        Self {
            id: Id::new(),
            survey_id,
            reason,
            reporter_id,
            resolved: false,
            resolution: None,
            resolver_id: None,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reports_are_open() {
        let report = Report::new(Id::new(), "spam".to_string(), Id::new());
        assert!(!report.resolved);
        assert_eq!(report.resolution, None);
        assert_eq!(report.resolver_id, None);
    }
}
