//! The voting engine: keypair issuance and the ballot pipeline.
//!
//! A ballot moves through `KeyLookup → Decrypted → Validated → Tallied`,
//! exiting early with a labelled rejection at any gate. The engine never
//! learns who cast a ballot — only that some holder of the survey's public
//! key encrypted a valid option id.

use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};
use mongodb::{bson::doc, Client};

use crate::error::{Error, Result};
use crate::model::{
    api::ballot::BallotSpec,
    keypair::KeyPair,
    mongodb::{Coll, Id},
    survey::Survey,
    vote::Vote,
};

/// Terminal result of a ballot submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote was committed.
    Accepted,
    /// The ballot was rejected at one of the gates.
    Rejected(RejectReason),
}

/// Why a ballot was rejected. The display form is the user-facing reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    KeyPairNotFound,
    NoOptionSpecified,
    SurveyNotFound,
    SurveyExpired,
    OptionNotFound,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            RejectReason::KeyPairNotFound => "key pair not found",
            RejectReason::NoOptionSpecified => "no option specified",
            RejectReason::SurveyNotFound => "survey not found",
            RejectReason::SurveyExpired => "survey expired",
            RejectReason::OptionNotFound => "option not found",
        };
        write!(f, "{reason}")
    }
}

impl From<RejectReason> for Error {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::KeyPairNotFound
            | RejectReason::SurveyNotFound
            | RejectReason::OptionNotFound => Error::NotFound(reason.to_string()),
            RejectReason::NoOptionSpecified | RejectReason::SurveyExpired => {
                Error::BadRequest(reason.to_string())
            }
        }
    }
}

/// Mint the keypair for a new survey. The lifecycle manager calls this once
/// per survey, at creation; there is no other mint and no rotation.
pub fn issue_keypair(survey_id: Id) -> Result<KeyPair> {
    let keys = ballot_crypto::generate_keypair(&mut rand::thread_rng())?;
    Ok(KeyPair::new(survey_id, keys))
}

/// Gate 2: recover the encrypted choice. Any decryption failure, and an
/// empty plaintext, mean the ballot selected nothing usable.
fn decrypted_choice(private_key: &str, message: &str) -> std::result::Result<Vec<u8>, RejectReason> {
    match ballot_crypto::decrypt(private_key, message) {
        Ok(plaintext) if plaintext.is_empty() => Err(RejectReason::NoOptionSpecified),
        Ok(plaintext) => Ok(plaintext),
        Err(_) => Err(RejectReason::NoOptionSpecified),
    }
}

/// Gate 3: check the time window and match the decrypted choice against the
/// survey's options.
///
/// The expiry boundary is inclusive: a ballot arriving at exactly the
/// configured runtime is already too late. A choice that is not the id of
/// one of this survey's options — including one that is not an id at all —
/// names no option.
fn validate(
    survey: &Survey,
    choice: &[u8],
    now: DateTime<Utc>,
) -> std::result::Result<Id, RejectReason> {
    if survey.is_closed(now) {
        return Err(RejectReason::SurveyExpired);
    }
    let option_id = std::str::from_utf8(choice)
        .ok()
        .and_then(|text| text.parse::<Id>().ok())
        .ok_or(RejectReason::OptionNotFound)?;
    if survey.option(option_id).is_none() {
        return Err(RejectReason::OptionNotFound);
    }
    Ok(option_id)
}

/// Run a ballot through the full pipeline.
///
/// Expected failures come back as [`VoteOutcome::Rejected`]; the `Err` arm
/// is reserved for fatal conditions (database connectivity). Once the
/// validation gate has passed, the vote insert and both counter increments
/// commit in a single transaction — two concurrent valid ballots on the same
/// survey both land, and the counters always equal the number of committed
/// votes.
pub async fn cast_ballot(
    ballot: &BallotSpec,
    keypairs: &Coll<KeyPair>,
    surveys: &Coll<Survey>,
    votes: &Coll<Vote>,
    db_client: &Client,
) -> Result<VoteOutcome> {
    // KeyLookup.
    let keypair = match keypairs
        .find_one(doc! { "survey_id": ballot.survey_id }, None)
        .await?
    {
        Some(keypair) => keypair,
        None => return Ok(VoteOutcome::Rejected(RejectReason::KeyPairNotFound)),
    };

    // Decrypted.
    let choice = match decrypted_choice(&keypair.private_key, &ballot.message) {
        Ok(choice) => choice,
        Err(reason) => return Ok(VoteOutcome::Rejected(reason)),
    };

    // Validated.
    let survey = match surveys.find_one(ballot.survey_id.as_doc(), None).await? {
        Some(survey) => survey,
        None => return Ok(VoteOutcome::Rejected(RejectReason::SurveyNotFound)),
    };
    let option_id = match validate(&survey, &choice, Utc::now()) {
        Ok(option_id) => option_id,
        Err(reason) => return Ok(VoteOutcome::Rejected(reason)),
    };

    // Tallied: vote insert + counter increments, both-or-neither.
    let vote = Vote::new(survey.id, option_id);
    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;
    votes
        .insert_one_with_session(&vote, None, &mut session)
        .await?;
    let matched_option = doc! {
        "_id": survey.id,
        "options.id": option_id,
    };
    let increment = doc! {
        "$inc": { "vote_count": 1, "options.$.tally": 1 }
    };
    surveys
        .update_one_with_session(matched_option, increment, None, &mut session)
        .await?;
    session.commit_transaction().await?;

    debug!("ballot accepted for survey {}", survey.id);
    Ok(VoteOutcome::Accepted)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::OnceLock;

    use ballot_crypto::EncodedKeyPair;
    use chrono::Duration;

    fn keys() -> &'static EncodedKeyPair {
        static KEYS: OnceLock<EncodedKeyPair> = OnceLock::new();
        KEYS.get_or_init(|| ballot_crypto::generate_keypair(&mut rand::thread_rng()).unwrap())
    }

    #[test]
    fn reject_reasons_read_as_specified() {
        assert_eq!(RejectReason::KeyPairNotFound.to_string(), "key pair not found");
        assert_eq!(RejectReason::NoOptionSpecified.to_string(), "no option specified");
        assert_eq!(RejectReason::SurveyNotFound.to_string(), "survey not found");
        assert_eq!(RejectReason::SurveyExpired.to_string(), "survey expired");
        assert_eq!(RejectReason::OptionNotFound.to_string(), "option not found");
    }

    #[test]
    fn rejections_map_to_the_error_taxonomy() {
        assert!(matches!(
            Error::from(RejectReason::KeyPairNotFound),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from(RejectReason::SurveyNotFound),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from(RejectReason::OptionNotFound),
            Error::NotFound(_)
        ));
        assert!(matches!(
            Error::from(RejectReason::SurveyExpired),
            Error::BadRequest(_)
        ));
        assert!(matches!(
            Error::from(RejectReason::NoOptionSpecified),
            Error::BadRequest(_)
        ));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let survey = Survey::open_example();
        let choice = survey.options[0].id.to_string().into_bytes();

        assert!(validate(&survey, &choice, survey.runtime - Duration::seconds(1)).is_ok());
        assert_eq!(
            validate(&survey, &choice, survey.runtime),
            Err(RejectReason::SurveyExpired)
        );
        assert_eq!(
            validate(&survey, &choice, survey.runtime + Duration::hours(2)),
            Err(RejectReason::SurveyExpired)
        );
    }

    #[test]
    fn unknown_option_is_rejected() {
        let survey = Survey::open_example();
        let now = survey.runtime - Duration::minutes(1);

        let foreign = Id::new().to_string().into_bytes();
        assert_eq!(
            validate(&survey, &foreign, now),
            Err(RejectReason::OptionNotFound)
        );
    }

    #[test]
    fn unparsable_choice_names_no_option() {
        let survey = Survey::open_example();
        let now = survey.runtime - Duration::minutes(1);

        assert_eq!(
            validate(&survey, b"not a uuid", now),
            Err(RejectReason::OptionNotFound)
        );
        assert_eq!(
            validate(&survey, &[0xff, 0xfe, 0x00], now),
            Err(RejectReason::OptionNotFound)
        );
    }

    #[test]
    fn matching_choice_passes_validation() {
        let survey = Survey::open_example();
        let now = survey.runtime - Duration::minutes(1);
        let wanted = survey.options[1].id;

        assert_eq!(validate(&survey, wanted.to_string().as_bytes(), now), Ok(wanted));
    }

    #[test]
    fn decrypted_choice_round_trips() {
        let pair = keys();
        let option_id = Id::new();
        let message = ballot_crypto::encrypt(
            &mut rand::thread_rng(),
            &pair.public_key,
            option_id.to_string().as_bytes(),
        )
        .unwrap();

        let choice = decrypted_choice(&pair.private_key, &message).unwrap();
        assert_eq!(choice, option_id.to_string().into_bytes());
    }

    #[test]
    fn undecryptable_message_specifies_no_option() {
        let pair = keys();
        assert_eq!(
            decrypted_choice(&pair.private_key, "!!!not base64!!!"),
            Err(RejectReason::NoOptionSpecified)
        );

        // A well-formed ciphertext under the wrong key.
        let other = ballot_crypto::generate_keypair(&mut rand::thread_rng()).unwrap();
        let message =
            ballot_crypto::encrypt(&mut rand::thread_rng(), &other.public_key, b"choice").unwrap();
        assert_eq!(
            decrypted_choice(&pair.private_key, &message),
            Err(RejectReason::NoOptionSpecified)
        );
    }

    #[test]
    fn empty_plaintext_specifies_no_option() {
        let pair = keys();
        let message = ballot_crypto::encrypt(&mut rand::thread_rng(), &pair.public_key, b"").unwrap();
        assert_eq!(
            decrypted_choice(&pair.private_key, &message),
            Err(RejectReason::NoOptionSpecified)
        );
    }

    #[test]
    fn issued_keypairs_bind_their_survey() {
        let survey_id = Id::new();
        let keypair = issue_keypair(survey_id).unwrap();
        assert_eq!(keypair.survey_id, survey_id);
        assert_ne!(keypair.public_key, keypair.private_key);

        // The issued pair must actually work end to end.
        let option_id = Id::new();
        let message = ballot_crypto::encrypt(
            &mut rand::thread_rng(),
            &keypair.public_key,
            option_id.to_string().as_bytes(),
        )
        .unwrap();
        assert_eq!(
            decrypted_choice(&keypair.private_key, &message).unwrap(),
            option_id.to_string().into_bytes()
        );
    }
}
