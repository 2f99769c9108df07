use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single committed vote, as stored in the database.
///
/// Deliberately carries no voter identity of any kind; the back-references
/// to the survey and option exist only for tallying. Votes are insert-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    /// The survey voted on.
    pub survey_id: Id,
    /// The option chosen.
    pub option_id: Id,
    /// When the ballot was accepted.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(survey_id: Id, option_id: Id) -> Self {
        Self {
            id: Id::new(),
            survey_id,
            option_id,
            cast_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mongodb::bson::to_document;

    #[test]
    fn votes_are_structurally_anonymous() {
        let vote = Vote::new(Id::new(), Id::new());
        let document = to_document(&vote).unwrap();

        let mut fields: Vec<_> = document.keys().map(String::as_str).collect();
        fields.sort_unstable();
        assert_eq!(fields, ["_id", "cast_at", "option_id", "survey_id"]);
    }

    #[test]
    fn votes_for_the_same_option_are_independent() {
        let survey_id = Id::new();
        let option_id = Id::new();

        let first = Vote::new(survey_id, option_id);
        let second = Vote::new(survey_id, option_id);
        assert_ne!(first.id, second.id);
        assert_eq!(first.option_id, second.option_id);
    }
}
