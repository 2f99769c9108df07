use std::fmt::{Debug, Formatter};

use ballot_crypto::EncodedKeyPair;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A survey's asymmetric keypair, as stored in the database.
///
/// Minted exactly once, at survey creation; the `survey_id` column carries a
/// unique index. The public key is published alongside survey listings; the
/// private key never leaves the server.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyPair {
    /// Unique ID.
    #[serde(rename = "_id")]
    pub id: Id,
    /// The owning survey (1:1).
    pub survey_id: Id,
    /// Base64-encoded SPKI DER.
    pub public_key: String,
    /// Base64-encoded PKCS#8 DER.
    pub private_key: String,
}

impl KeyPair {
    pub fn new(survey_id: Id, keys: EncodedKeyPair) -> Self {
        Self {
            id: Id::new(),
            survey_id,
            public_key: keys.public_key,
            private_key: keys.private_key,
        }
    }
}

// Hand-written so the private key cannot end up in log output.
impl Debug for KeyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("id", &self.id)
            .field("survey_id", &self.survey_id)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_private_key() {
        let pair = KeyPair::new(
            Id::new(),
            EncodedKeyPair {
                public_key: "cHVibGlj".to_string(),
                private_key: "c2VjcmV0".to_string(),
            },
        );
        let rendered = format!("{pair:?}");
        assert!(rendered.contains("cHVibGlj"));
        assert!(!rendered.contains("c2VjcmV0"));
    }
}
