use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Reserved tag value marking a survey as struck by moderation. Surveys
/// carrying it are hidden from every listing; the value itself is never
/// surfaced as a user-facing tag.
pub const STRUCK_TAG: &str = "DoNotShowStruckSurvey";

/// Content-warning tags excluded from the default (safe-for-work) listing.
pub const SFW_EXCLUDED_TAGS: &[&str] = &["NSFW", "18+", "Explicit"];

/// A survey, as stored in the database.
///
/// Options and tags are embedded; votes and the keypair live in their own
/// collections, keyed by the survey id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    /// Survey title.
    pub title: String,
    /// Survey description.
    pub description: String,
    /// Free-text information shown alongside the options.
    pub information: String,
    /// The instant voting closes. Strictly future at creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub runtime: DateTime<Utc>,
    /// Subject id of the creator.
    pub creator_id: Id,
    /// The votable options. At least two, immutable after creation.
    pub options: Vec<SurveyOption>,
    /// Tags, including any moderation sentinel. Duplicate values may
    /// accumulate.
    pub tags: Vec<Tag>,
    /// Running total of committed votes across all options.
    pub vote_count: u64,
    /// Creation time.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Survey {
    /// Create a new survey with zeroed tallies. Ids for the survey and every
    /// embedded option and tag are assigned here, once.
    pub fn new(
        title: String,
        description: String,
        information: String,
        runtime: DateTime<Utc>,
        creator_id: Id,
        options: Vec<String>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: Id::new(),
            title,
            description,
            information,
            runtime,
            creator_id,
            options: options.into_iter().map(SurveyOption::new).collect(),
            tags: tags.into_iter().map(Tag::new).collect(),
            vote_count: 0,
            created_at: Utc::now(),
        }
    }

    /// Look up an embedded option by id.
    pub fn option(&self, option_id: Id) -> Option<&SurveyOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    /// Has voting closed? The boundary is inclusive: a survey is closed at
    /// exactly its configured runtime.
    pub fn is_closed(&self, now: DateTime<Utc>) -> bool {
        now >= self.runtime
    }
}

/// A votable option embedded in its survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurveyOption {
    /// Unique ID; ballots decrypt to this value.
    pub id: Id,
    /// Display value.
    pub value: String,
    /// Committed votes for this option, maintained by the voting engine in
    /// the same transaction as each vote insert.
    pub tally: u64,
}

impl SurveyOption {
    fn new(value: String) -> Self {
        Self {
            id: Id::new(),
            value,
            tally: 0,
        }
    }
}

/// A tag embedded in its survey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Unique ID.
    pub id: Id,
    /// Tag value.
    pub value: String,
}

impl Tag {
    pub fn new(value: String) -> Self {
        Self {
            id: Id::new(),
            value,
        }
    }

    /// The moderation sentinel tag.
    pub fn struck() -> Self {
        Self::new(STRUCK_TAG.to_string())
    }
}
