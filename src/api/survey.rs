use chrono::Utc;
use mongodb::{
    bson::{doc, to_bson, Bson},
    Client,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::auth::Bearer;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        ballot::BallotSpec,
        survey::{PublishedSurvey, SurveyDescription, SurveySpec},
    },
    keypair::KeyPair,
    mongodb::{Coll, Id},
    survey::{Survey, Tag, SFW_EXCLUDED_TAGS, STRUCK_TAG},
    vote::Vote,
};
use crate::upstream::AuthServer;
use crate::voting::{self, VoteOutcome};

pub fn routes() -> Vec<Route> {
    routes![
        create_survey,
        surveys_sfw,
        surveys_filtered,
        all_tags,
        add_tags,
        vote,
    ]
}

#[post("/surveys", data = "<spec>", format = "json")]
async fn create_survey(
    bearer: Bearer,
    spec: Json<SurveySpec>,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
    keypairs: Coll<KeyPair>,
    db_client: &State<Client>,
) -> Result<Json<Id>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    if auth_server.is_struck(bearer.token()).await? {
        return Err(Error::Forbidden("user is struck".to_string()));
    }
    let creator_id = bearer.subject()?;

    spec.validate(Utc::now())
        .map_err(|reason| Error::BadRequest(reason.to_string()))?;

    let survey = spec.0.into_survey(creator_id);
    let keypair = voting::issue_keypair(survey.id)?;

    // The survey and its keypair land together or not at all; a survey
    // without a keypair can never accept a ballot.
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;
    surveys
        .insert_one_with_session(&survey, None, &mut session)
        .await?;
    keypairs
        .insert_one_with_session(&keypair, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    info!(
        "survey {} created with {} options",
        survey.id,
        survey.options.len()
    );
    Ok(Json(survey.id))
}

/// The default listing: safe-for-work, so the fixed content-warning tags
/// are excluded on top of the struck sentinel. Open to anonymous readers.
#[get("/surveys")]
async fn surveys_sfw(
    surveys: Coll<Survey>,
    keypairs: Coll<KeyPair>,
) -> Result<Json<Vec<PublishedSurvey>>> {
    let excluded = SFW_EXCLUDED_TAGS
        .iter()
        .map(|tag| tag.to_string())
        .collect();
    published_surveys(excluded, &surveys, &keypairs).await
}

/// Listing with a caller-supplied exclusion set; the struck sentinel is
/// always excluded regardless.
#[get("/surveys/filtered?<exclude>")]
async fn surveys_filtered(
    bearer: Bearer,
    exclude: Vec<String>,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
    keypairs: Coll<KeyPair>,
) -> Result<Json<Vec<PublishedSurvey>>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    published_surveys(exclude, &surveys, &keypairs).await
}

async fn published_surveys(
    mut excluded_tags: Vec<String>,
    surveys: &Coll<Survey>,
    keypairs: &Coll<KeyPair>,
) -> Result<Json<Vec<PublishedSurvey>>> {
    excluded_tags.push(STRUCK_TAG.to_string());
    let filter = doc! {
        "tags.value": { "$nin": excluded_tags }
    };
    let listed: Vec<Survey> = surveys.find(filter, None).await?.try_collect().await?;

    let now = Utc::now();
    let mut published = Vec::with_capacity(listed.len());
    for survey in listed {
        // No keypair means no ballot can ever be cast for this survey;
        // it is omitted rather than published unusable.
        match keypairs
            .find_one(doc! { "survey_id": survey.id }, None)
            .await?
        {
            Some(keypair) => published.push(PublishedSurvey {
                public_key: keypair.public_key,
                survey: SurveyDescription::project(&survey, now),
            }),
            None => warn!("survey {} has no keypair, omitted from listing", survey.id),
        }
    }
    Ok(Json(published))
}

/// Every tag value in use, minus the moderation sentinel.
#[get("/surveys/tags")]
async fn all_tags(
    bearer: Bearer,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
) -> Result<Json<Vec<String>>> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    let mut tags: Vec<String> = surveys
        .distinct("tags.value", None, None)
        .await?
        .into_iter()
        .filter_map(|value| match value {
            Bson::String(tag) if tag != STRUCK_TAG => Some(tag),
            _ => None,
        })
        .collect();
    tags.sort_unstable();
    Ok(Json(tags))
}

/// Append tags to an existing survey. Any resolvable role may do this;
/// duplicate values are allowed to accumulate.
#[patch("/surveys/<survey_id>/tags", data = "<tags>", format = "json")]
async fn add_tags(
    bearer: Bearer,
    survey_id: Id,
    tags: Json<Vec<String>>,
    auth_server: &State<AuthServer>,
    surveys: Coll<Survey>,
) -> Result<()> {
    if !auth_server.is_authenticated(bearer.token()).await? {
        return Err(Error::Unauthorized("invalid bearer token".to_string()));
    }
    // Resolving a role at all is the permission bar here.
    let _role = auth_server.role(bearer.token()).await?;

    let new_tags = tags
        .0
        .into_iter()
        .map(|value| to_bson(&Tag::new(value)))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::BadRequest("unencodable tag value".to_string()))?;
    let update = doc! {
        "$push": { "tags": { "$each": new_tags } }
    };

    let result = surveys.update_one(survey_id.as_doc(), update, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found("survey not found"));
    }
    Ok(())
}

/// Cast an encrypted ballot. Deliberately unauthenticated: the server must
/// not be able to link the decrypted choice to anyone, so it never learns
/// who submitted it. Eligibility is controlled by who holds the public key.
#[post("/surveys/vote", data = "<ballot>", format = "json")]
async fn vote(
    ballot: Json<BallotSpec>,
    keypairs: Coll<KeyPair>,
    surveys: Coll<Survey>,
    votes: Coll<Vote>,
    db_client: &State<Client>,
) -> Result<Json<&'static str>> {
    match voting::cast_ballot(&ballot, &keypairs, &surveys, &votes, db_client).await? {
        VoteOutcome::Accepted => Ok(Json("vote recorded")),
        VoteOutcome::Rejected(reason) => Err(reason.into()),
    }
}
