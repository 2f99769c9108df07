use serde::{Deserialize, Serialize};

use crate::model::{mongodb::Id, report::Report};

use super::survey::SurveyDescription;

/// A new abuse report, as submitted by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSpec {
    /// The survey being reported.
    pub survey_id: Id,
    /// Why it is being reported.
    pub reason: String,
}

/// The moderator's decision when closing a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReport {
    /// Resolution text recorded on the report.
    pub resolution: String,
    /// Strike the reporter (a false or abusive report).
    pub strike_reporter: bool,
    /// Strike the survey's creator and hide the survey from listings.
    pub strike_creator: bool,
}

/// An open report paired with a redacted view of the reported survey.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportedSurvey {
    /// Redacted projection of the reported survey.
    pub survey: SurveyDescription,
    /// The reporter's reason.
    pub reason: String,
    /// Report id, used to close it.
    pub report_id: Id,
}

impl ReportedSurvey {
    pub fn new(report: &Report, survey: &crate::model::survey::Survey) -> Self {
        Self {
            survey: SurveyDescription::redacted(survey),
            reason: report.reason.clone(),
            report_id: report.id,
        }
    }
}
