//! Per-survey asymmetric ballot encryption.
//!
//! Every survey owns a fresh RSA-2048 keypair. The public key is published so
//! that any client can encrypt the id of their chosen option; only the server
//! holds the private key and can recover the choice. OAEP padding randomises
//! every ciphertext, so two encryptions of the same option are unlinkable.
//!
//! Keys travel as base64-encoded DER (PKCS#8 for private keys, SPKI for
//! public keys); ciphertexts as plain base64.

use data_encoding::BASE64;
use rand::{CryptoRng, RngCore};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

/// Modulus size of every survey keypair.
pub const KEY_BITS: usize = 2048;

/// Maximum plaintext length for OAEP with SHA-256 under a 2048-bit modulus.
/// Option ids are UUID strings (36 bytes), far below this.
pub const MAX_PLAINTEXT_LEN: usize = KEY_BITS / 8 - 2 * 32 - 2;

#[derive(Debug, Error)]
pub enum Error {
    #[error("key generation failed: {0}")]
    KeyGen(#[source] rsa::Error),
    #[error("malformed private key encoding")]
    PrivateKeyDecode(#[source] rsa::pkcs8::Error),
    #[error("malformed public key encoding")]
    PublicKeyDecode(#[source] rsa::pkcs8::spki::Error),
    #[error("key export failed")]
    KeyEncode,
    #[error("malformed base64: {0}")]
    Base64(#[from] data_encoding::DecodeError),
    #[error("plaintext exceeds the {MAX_PLAINTEXT_LEN}-byte OAEP limit")]
    PlaintextTooLong,
    #[error("encryption failed: {0}")]
    Encrypt(#[source] rsa::Error),
    #[error("ciphertext does not decrypt under this key")]
    Decrypt,
}

/// A freshly generated keypair, already in storage encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedKeyPair {
    /// Base64-encoded SPKI DER. Safe to publish.
    pub public_key: String,
    /// Base64-encoded PKCS#8 DER. Never leaves the server.
    pub private_key: String,
}

/// Generate a fresh RSA-2048 keypair.
///
/// Fails only on catastrophic entropy or allocation failure; callers treat
/// that as fatal rather than retrying.
pub fn generate_keypair(rng: &mut (impl CryptoRng + RngCore)) -> Result<EncodedKeyPair, Error> {
    let private = RsaPrivateKey::new(rng, KEY_BITS).map_err(Error::KeyGen)?;
    let public = RsaPublicKey::from(&private);

    let private_der = private.to_pkcs8_der().map_err(|_| Error::KeyEncode)?;
    let public_der = public.to_public_key_der().map_err(|_| Error::KeyEncode)?;

    Ok(EncodedKeyPair {
        public_key: BASE64.encode(public_der.as_bytes()),
        private_key: BASE64.encode(private_der.as_bytes()),
    })
}

/// Encrypt a short plaintext under a base64-DER public key.
///
/// OAEP padding is randomised: calling this twice with identical inputs
/// yields different ciphertexts.
pub fn encrypt(
    rng: &mut (impl CryptoRng + RngCore),
    public_key: &str,
    plaintext: &[u8],
) -> Result<String, Error> {
    if plaintext.len() > MAX_PLAINTEXT_LEN {
        return Err(Error::PlaintextTooLong);
    }
    let der = BASE64.decode(public_key.as_bytes())?;
    let key = RsaPublicKey::from_public_key_der(&der).map_err(Error::PublicKeyDecode)?;
    let ciphertext = key
        .encrypt(rng, Oaep::new::<Sha256>(), plaintext)
        .map_err(Error::Encrypt)?;
    Ok(BASE64.encode(&ciphertext))
}

/// Decrypt a base64 ciphertext under a base64-DER private key.
///
/// Malformed base64, a wrong-length block, or an OAEP padding check failure
/// all surface as errors; the caller decides whether that is fatal (for the
/// voting engine it simply means "no usable option selected").
pub fn decrypt(private_key: &str, ciphertext: &str) -> Result<Vec<u8>, Error> {
    let der = BASE64.decode(private_key.as_bytes())?;
    let key = RsaPrivateKey::from_pkcs8_der(&der).map_err(Error::PrivateKeyDecode)?;
    let block = BASE64.decode(ciphertext.as_bytes())?;
    key.decrypt(Oaep::new::<Sha256>(), &block)
        .map_err(|_| Error::Decrypt)
}
