use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// An encrypted ballot as submitted by a client.
///
/// `message` is the base64 ciphertext of an option id, encrypted under the
/// survey's published public key. Nothing here identifies the voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSpec {
    /// Base64 ciphertext.
    pub message: String,
    /// The survey voted on.
    pub survey_id: Id,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape() {
        let ballot = BallotSpec {
            message: "c2VhbGVk".to_string(),
            survey_id: Id::new(),
        };
        let json = serde_json::to_value(&ballot).unwrap();
        assert_eq!(json["message"], "c2VhbGVk");
        assert_eq!(json["surveyId"], ballot.survey_id.to_string());

        let parsed: BallotSpec = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, ballot);
    }

    #[test]
    fn both_fields_are_required() {
        assert!(serde_json::from_str::<BallotSpec>(r#"{"message": "abc"}"#).is_err());
        assert!(serde_json::from_str::<BallotSpec>(
            r#"{"surveyId": "0f8ab9de-17c4-4f2d-92b3-58d0c9271b11"}"#
        )
        .is_err());
    }
}
