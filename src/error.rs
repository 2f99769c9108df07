use rocket::{http::Status, response::Responder};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while serving a request.
///
/// Expected rejections (bad ballot, expired survey, missing entity) are
/// constructed with a short human-readable reason; genuinely exceptional
/// conditions (database connectivity, key generation) wrap their source
/// error. Responses never carry key material or internal detail beyond the
/// reason string.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] mongodb::error::Error),
    #[error("key generation failed: {0}")]
    Crypto(#[from] ballot_crypto::Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream auth server failure: {0}")]
    Upstream(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] describing the missing entity.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Strip the URL: it may embed query parameters.
        Self::Upstream(err.without_url().to_string())
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            Self::Db(_) | Self::Crypto(_) => Status::InternalServerError,
            Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
            Self::Forbidden(_) => Status::Forbidden,
            Self::NotFound(_) => Status::NotFound,
            Self::Conflict(_) => Status::Conflict,
            Self::Upstream(_) => Status::BadGateway,
        };
        match status.class() {
            rocket::http::StatusClass::ServerError => error!("{self}"),
            _ => debug!("{self}"),
        }
        // The reason string is user-facing; sources (DB, crypto) are not.
        let body = match &self {
            Self::Db(_) => "internal database error".to_string(),
            Self::Crypto(_) => "internal cryptography error".to_string(),
            other => other.to_string(),
        };
        rocket::Response::build_from(body.respond_to(req)?)
            .status(status)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_user_facing() {
        let err = Error::BadRequest("runtime must be in the future".to_string());
        assert_eq!(err.to_string(), "Bad request: runtime must be in the future");

        let err = Error::not_found("survey not found");
        assert_eq!(err.to_string(), "Not found: survey not found");
    }
}
