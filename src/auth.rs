//! Bearer-token extraction and subject-claim parsing.
//!
//! Tokens are issued and verified by the external auth server; this backend
//! only lifts the subject claim out of the payload (the auth server's
//! `ValidateToken` endpoint is the actual verifier, called per request).

use data_encoding::BASE64URL_NOPAD;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome, Request},
};

use crate::error::{Error, Result};
use crate::model::mongodb::Id;

/// Claim names carrying the subject id: the short form and the XML-schema
/// URI form, depending on how the auth server serialised its claims.
const SUBJECT_CLAIMS: [&str; 2] = [
    "nameidentifier",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
];

/// A raw bearer token lifted from the `Authorization` header.
#[derive(Debug, Clone)]
pub struct Bearer(String);

impl Bearer {
    /// The raw token, for forwarding to the auth server.
    pub fn token(&self) -> &str {
        &self.0
    }

    /// The subject id from the token payload.
    pub fn subject(&self) -> Result<Id> {
        parse_subject(&self.0)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Bearer {
    type Error = Error;

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let header = req.headers().get_one("Authorization");
        match header.and_then(|value| value.strip_prefix("Bearer ")) {
            Some(token) if !token.is_empty() => Outcome::Success(Bearer(token.to_string())),
            _ => Outcome::Failure((
                Status::Unauthorized,
                Error::Unauthorized("missing bearer token".to_string()),
            )),
        }
    }
}

/// Decode the payload segment of a JWT and extract the subject claim.
///
/// No signature check happens here, deliberately; a forged token fails at
/// the auth server instead.
fn parse_subject(token: &str) -> Result<Id> {
    let malformed = || Error::BadRequest("malformed bearer token".to_string());

    let mut segments = token.split('.');
    let payload = match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(malformed()),
    };

    let decoded = BASE64URL_NOPAD
        .decode(payload.as_bytes())
        .map_err(|_| malformed())?;
    let claims: serde_json::Value = serde_json::from_slice(&decoded).map_err(|_| malformed())?;

    let subject = SUBJECT_CLAIMS
        .iter()
        .find_map(|claim| claims.get(claim).and_then(|value| value.as_str()))
        .ok_or_else(|| Error::BadRequest("token carries no subject claim".to_string()))?;

    subject
        .parse()
        .map_err(|_| Error::BadRequest("could not parse token subject".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    fn mint<C: Serialize>(claims: &C) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[derive(Serialize)]
    struct ShortClaims {
        nameidentifier: String,
        exp: u64,
    }

    #[derive(Serialize)]
    struct SchemaClaims {
        #[serde(rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier")]
        name_identifier: String,
        exp: u64,
    }

    #[test]
    fn extracts_short_subject_claim() {
        let subject = Id::new();
        let token = mint(&ShortClaims {
            nameidentifier: subject.to_string(),
            exp: 4_102_444_800,
        });
        assert_eq!(parse_subject(&token).unwrap(), subject);
    }

    #[test]
    fn extracts_schema_uri_subject_claim() {
        let subject = Id::new();
        let token = mint(&SchemaClaims {
            name_identifier: subject.to_string(),
            exp: 4_102_444_800,
        });
        assert_eq!(parse_subject(&token).unwrap(), subject);
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(parse_subject("").is_err());
        assert!(parse_subject("only-one-segment").is_err());
        assert!(parse_subject("two.segments").is_err());
        assert!(parse_subject("a.b.c.d").is_err());
        assert!(parse_subject("head.!!not-base64url!!.sig").is_err());
    }

    #[test]
    fn rejects_missing_or_unparsable_subject() {
        #[derive(Serialize)]
        struct NoSubject {
            exp: u64,
        }
        let token = mint(&NoSubject { exp: 4_102_444_800 });
        assert!(parse_subject(&token).is_err());

        let token = mint(&ShortClaims {
            nameidentifier: "not-a-uuid".to_string(),
            exp: 4_102_444_800,
        });
        assert!(parse_subject(&token).is_err());
    }
}
