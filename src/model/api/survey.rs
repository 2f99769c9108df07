use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    mongodb::Id,
    survey::{Survey, SurveyOption},
};

/// A survey specification, as submitted by a creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveySpec {
    /// Survey title.
    pub title: String,
    /// Survey description.
    pub description: String,
    /// Display values of the options; at least two.
    pub options: Vec<String>,
    /// The instant voting closes; must be strictly in the future.
    pub runtime: DateTime<Utc>,
    /// Initial tags.
    pub tags: Vec<String>,
    /// Free-text information.
    #[serde(default)]
    pub information: String,
}

impl SurveySpec {
    /// Validate the boundary invariants: a strictly future runtime and a
    /// real choice between at least two options.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), &'static str> {
        if self.runtime <= now {
            return Err("runtime must be in the future");
        }
        if self.options.len() < 2 {
            return Err("at least two options required");
        }
        Ok(())
    }

    /// Convert this spec into a survey owned by `creator_id`.
    pub fn into_survey(self, creator_id: Id) -> Survey {
        Survey::new(
            self.title,
            self.description,
            self.information,
            self.runtime,
            creator_id,
            self.options,
            self.tags,
        )
    }
}

/// A survey as shown to readers.
///
/// While the survey is still open every count is projected as zero, for
/// everyone including the creator; true tallies appear only once the runtime
/// has passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyDescription {
    /// Survey title.
    pub title: String,
    /// Survey description.
    pub description: String,
    /// Tag values, in insertion order.
    pub tags: Vec<String>,
    /// Free-text information.
    pub information: String,
    /// The options with their (possibly zeroed) counts.
    pub options: Vec<OptionDescription>,
    /// Total vote count, zero pre-close.
    pub total_votes: u64,
    /// Close instant; absent in redacted projections.
    pub runtime: Option<DateTime<Utc>>,
    /// Survey id.
    pub survey_id: Id,
}

/// One option inside a [`SurveyDescription`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDescription {
    /// Display value.
    pub value: String,
    /// Tally, zeroed while the survey is open.
    pub count: u64,
    /// Option id, needed by voters to encrypt a ballot. Absent in redacted
    /// projections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_id: Option<Id>,
}

impl SurveyDescription {
    /// Project a survey for listing, applying the zero-until-close rule.
    pub fn project(survey: &Survey, now: DateTime<Utc>) -> Self {
        let hide_counts = !survey.is_closed(now);
        let count = |option: &SurveyOption| if hide_counts { 0 } else { option.tally };
        Self {
            title: survey.title.clone(),
            description: survey.description.clone(),
            tags: survey.tags.iter().map(|tag| tag.value.clone()).collect(),
            information: survey.information.clone(),
            options: survey
                .options
                .iter()
                .map(|option| OptionDescription {
                    value: option.value.clone(),
                    count: count(option),
                    option_id: Some(option.id),
                })
                .collect(),
            total_votes: if hide_counts { 0 } else { survey.vote_count },
            runtime: Some(survey.runtime),
            survey_id: survey.id,
        }
    }

    /// Project a survey for moderation listings: option values only, no
    /// counts, no option ids, no runtime.
    pub fn redacted(survey: &Survey) -> Self {
        Self {
            title: survey.title.clone(),
            description: survey.description.clone(),
            tags: survey.tags.iter().map(|tag| tag.value.clone()).collect(),
            information: survey.information.clone(),
            options: survey
                .options
                .iter()
                .map(|option| OptionDescription {
                    value: option.value.clone(),
                    count: 0,
                    option_id: None,
                })
                .collect(),
            total_votes: 0,
            runtime: None,
            survey_id: survey.id,
        }
    }
}

/// A survey paired with its public key, ready for publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedSurvey {
    /// Base64-DER public key under which ballots for this survey are
    /// encrypted.
    pub public_key: String,
    /// The survey projection.
    pub survey: SurveyDescription,
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    fn voted_survey() -> Survey {
        let mut survey = Survey::open_example();
        survey.options[0].tally = 3;
        survey.options[1].tally = 2;
        survey.vote_count = 5;
        survey
    }

    #[test]
    fn counts_are_zero_while_open() {
        let survey = voted_survey();
        let description = SurveyDescription::project(&survey, survey.runtime - Duration::hours(1));
        assert_eq!(description.total_votes, 0);
        assert!(description.options.iter().all(|option| option.count == 0));
        // The structure is otherwise intact.
        assert_eq!(description.options.len(), 2);
        assert_eq!(description.options[0].option_id, Some(survey.options[0].id));
    }

    #[test]
    fn counts_are_revealed_after_close() {
        let survey = voted_survey();
        let description = SurveyDescription::project(&survey, survey.runtime);
        assert_eq!(description.total_votes, 5);
        assert_eq!(description.options[0].count, 3);
        assert_eq!(description.options[1].count, 2);
    }

    #[test]
    fn redacted_projection_hides_structure() {
        let survey = voted_survey();
        let description = SurveyDescription::redacted(&survey);
        assert_eq!(description.total_votes, 0);
        assert_eq!(description.runtime, None);
        assert!(description
            .options
            .iter()
            .all(|option| option.count == 0 && option.option_id.is_none()));
        assert_eq!(description.options[0].value, survey.options[0].value);
    }

    #[test]
    fn spec_validation() {
        let now = Utc::now();
        let mut spec = SurveySpec {
            title: "T".to_string(),
            description: "D".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            runtime: now + Duration::minutes(5),
            tags: vec![],
            information: String::new(),
        };
        assert!(spec.validate(now).is_ok());

        spec.runtime = now;
        assert_eq!(spec.validate(now), Err("runtime must be in the future"));
        spec.runtime = now - Duration::seconds(1);
        assert_eq!(spec.validate(now), Err("runtime must be in the future"));

        spec.runtime = now + Duration::minutes(5);
        spec.options.pop();
        assert_eq!(spec.validate(now), Err("at least two options required"));
    }

    #[test]
    fn published_survey_wire_shape() {
        let survey = Survey::open_example();
        let published = PublishedSurvey {
            public_key: "cHVibGlj".to_string(),
            survey: SurveyDescription::project(&survey, Utc::now()),
        };
        let json = serde_json::to_value(&published).unwrap();
        assert_eq!(json["publicKey"], "cHVibGlj");
        assert_eq!(json["survey"]["surveyId"], survey.id.to_string());
        assert_eq!(json["survey"]["totalVotes"], 0);
    }
}
