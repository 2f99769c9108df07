use mongodb::bson::{doc, to_bson};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::auth::Bearer;
use crate::error::{Error, Result};
use crate::model::{
    api::report::{CloseReport, ReportSpec, ReportedSurvey},
    mongodb::{Coll, Id},
    report::Report,
    survey::{Survey, Tag},
};
use crate::upstream::AuthServer;

pub fn routes() -> Vec<Route> {
    routes![report_survey, open_reports, close_report]
}

#[post("/reports", data = "<spec>", format = "json")]
async fn report_survey(
    bearer: Bearer,
    spec: Json<ReportSpec>,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
    reports: Coll<Report>,
) -> Result<Json<Id>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    if auth_server.is_struck(bearer.token()).await? {
        return Err(Error::Forbidden("user is struck".to_string()));
    }
    let reporter_id = bearer.subject()?;

    let survey = surveys
        .find_one(spec.survey_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("survey not found"))?;

    let report = Report::new(survey.id, spec.0.reason, reporter_id);
    reports.insert_one(&report, None).await?;

    info!("survey {} reported as report {}", survey.id, report.id);
    Ok(Json(report.id))
}

/// Open reports with a redacted view of each reported survey.
/// Moderator rank or above.
#[get("/reports")]
async fn open_reports(
    bearer: Bearer,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
    reports: Coll<Report>,
) -> Result<Json<Vec<ReportedSurvey>>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    let role = auth_server.role(bearer.token()).await?;
    if !role.may_moderate() {
        return Err(Error::Forbidden(
            "moderator rank required to triage reports".to_string(),
        ));
    }

    let open: Vec<Report> = reports
        .find(doc! { "resolved": false }, None)
        .await?
        .try_collect()
        .await?;

    let mut reported = Vec::with_capacity(open.len());
    for report in open {
        match surveys.find_one(report.survey_id.as_doc(), None).await? {
            Some(survey) => reported.push(ReportedSurvey::new(&report, &survey)),
            None => warn!(
                "report {} references missing survey {}",
                report.id, report.survey_id
            ),
        }
    }
    Ok(Json(reported))
}

/// Close a report, exactly once, optionally striking the reporter and/or the
/// survey's creator. Striking the creator also hides the survey from all
/// listings via the sentinel tag.
#[post("/reports/<report_id>/close", data = "<decision>", format = "json")]
async fn close_report(
    bearer: Bearer,
    report_id: Id,
    decision: Json<CloseReport>,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
    reports: Coll<Report>,
) -> Result<()> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    let resolver_id = bearer.subject()?;
    let role = auth_server.role(bearer.token()).await?;
    if !role.may_moderate() {
        return Err(Error::Forbidden(
            "moderator rank required to close reports".to_string(),
        ));
    }

    let report = reports
        .find_one(report_id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found("report not found"))?;
    if report.resolved {
        return Err(Error::Conflict("report already closed".to_string()));
    }

    if decision.strike_reporter {
        auth_server.strike(bearer.token(), report.reporter_id).await?;
    }
    if decision.strike_creator {
        // Surveys are never hard-deleted, so a missing one is an internal
        // inconsistency; the close itself still goes through.
        match surveys.find_one(report.survey_id.as_doc(), None).await? {
            Some(survey) => {
                let sentinel = to_bson(&Tag::struck())
                    .expect("sentinel tag serialization does not fail");
                surveys
                    .update_one(
                        survey.id.as_doc(),
                        doc! { "$push": { "tags": sentinel } },
                        None,
                    )
                    .await?;
                auth_server.strike(bearer.token(), survey.creator_id).await?;
            }
            None => warn!(
                "report {} references missing survey {}, no creator strike",
                report.id, report.survey_id
            ),
        }
    }

    let resolve = doc! {
        "$set": {
            "resolved": true,
            "resolution": decision.resolution.clone(),
            "resolver_id": resolver_id,
        }
    };
    reports.update_one(report.id.as_doc(), resolve, None).await?;

    info!("report {} closed", report.id);
    Ok(())
}
