//! The key store collaborator (spec.md §6): an ECDSA P-384 keypair for
//! document signing and HKDF-SHA-384 derivation of the at-rest AES-256
//! symmetric key.
//!
//! Generalizes the teacher's `Wallet` (`src/wallet.rs`) — generate-or-
//! load-from-disk, `Signer`/`Verifier`-trait based signing — from
//! Ed25519 to the P-384 curve the spec requires, and adds the JWK
//! export the document envelope's `publicKey` field needs (spec.md §3,
//! §6).

use crate::error::EnvelopeError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ecdsa::signature::{Signer, Verifier};
use elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use hkdf::Hkdf;
use p384::ecdsa::{Signature, SigningKey, VerifyingKey};
use p384::{EncodedPoint, FieldBytes};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha384;

/// A P-384 public key in JWK form (spec.md §6 file format:
/// `{kty:"EC", crv:"P-384", x, y}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl Jwk {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        let x = point.x().expect("uncompressed point always has x");
        let y = point.y().expect("uncompressed point always has y");
        Jwk {
            kty: "EC".to_string(),
            crv: "P-384".to_string(),
            x: URL_SAFE_NO_PAD.encode(x),
            y: URL_SAFE_NO_PAD.encode(y),
        }
    }

    pub fn to_verifying_key(&self) -> Result<VerifyingKey, EnvelopeError> {
        if self.kty != "EC" || self.crv != "P-384" {
            return Err(EnvelopeError::InvalidJwk(format!("unsupported kty/crv: {}/{}", self.kty, self.crv)));
        }
        let x = URL_SAFE_NO_PAD
            .decode(&self.x)
            .map_err(|e| EnvelopeError::InvalidJwk(e.to_string()))?;
        let y = URL_SAFE_NO_PAD
            .decode(&self.y)
            .map_err(|e| EnvelopeError::InvalidJwk(e.to_string()))?;
        let x = FieldBytes::from_slice(&x);
        let y = FieldBytes::from_slice(&y);
        let point = EncodedPoint::from_affine_coordinates(x, y, false);
        Option::<VerifyingKey>::from(VerifyingKey::from_encoded_point(&point))
            .ok_or_else(|| EnvelopeError::InvalidJwk("point is not on the P-384 curve".to_string()))
    }
}

/// A signing keypair for the document envelope.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self { signing_key: SigningKey::random(&mut OsRng) }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let signing_key = SigningKey::from_slice(bytes).map_err(EnvelopeError::Signing)?;
        Ok(Self { signing_key })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.signing_key.to_bytes().to_vec()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }

    pub fn public_key_jwk(&self) -> Jwk {
        Jwk::from_verifying_key(&self.verifying_key())
    }

    /// Sign the UTF-8 bytes of a hex string (spec.md §4.F: the document
    /// hash's hex representation, not its raw 32 bytes).
    pub fn sign(&self, message: &[u8]) -> [u8; 96] {
        let signature: Signature = self.signing_key.sign(message);
        signature.to_bytes().into()
    }
}

/// Verify a raw-encoding (r || s) P-384/SHA-384 signature against a JWK
/// public key (spec.md §4.F `verifySignature`).
pub fn verify(jwk: &Jwk, message: &[u8], signature_bytes: &[u8]) -> Result<bool, EnvelopeError> {
    if signature_bytes.len() != 96 {
        return Err(EnvelopeError::InvalidSignatureLength);
    }
    let verifying_key = jwk.to_verifying_key()?;
    let signature = Signature::from_slice(signature_bytes).map_err(EnvelopeError::Signing)?;
    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Derive a 32-byte AES-256-GCM key from a 32-byte base secret via
/// HKDF-SHA-384 (spec.md §6 key store collaborator).
pub fn derive_symmetric_key(base_secret: &[u8; 32], info: &[u8]) -> [u8; 32] {
    let hk = Hkdf::<Sha384>::new(None, base_secret);
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm).expect("32 bytes is a valid HKDF-SHA384 output length");
    okm
}
