use std::fmt::{Display, Formatter};
use std::str::FromStr;

use mongodb::bson::{doc, Bson, Document};
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique entity identifier.
///
/// A UUID v4, assigned once at construction (never by the database) and
/// serialised as its hyphenated string form in both JSON and BSON, so the
/// same value appears on the wire, in documents, and in filters.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// A filter document matching this id as `_id`.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": *self }
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        Bson::String(id.to_string())
    }
}

impl<'a> FromParam<'a> for Id {
    type Error = uuid::Error;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        param.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_round_trip() {
        let id = Id::new();
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_non_uuid() {
        assert!("not-a-uuid".parse::<Id>().is_err());
        assert!("".parse::<Id>().is_err());
    }

    #[test]
    fn serialises_as_string() {
        let id = Id::new();
        assert_eq!(
            serde_json::to_value(id).unwrap(),
            serde_json::Value::String(id.to_string())
        );
        assert_eq!(Bson::from(id), Bson::String(id.to_string()));
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(Id::new(), Id::new());
    }
}
