//! The document envelope and signer (spec.md §3 `Document envelope`,
//! §4.F): assembles the portable document, computes its content hash,
//! and signs/verifies it with the key store's P-384 keypair.
//!
//! Grounded on the teacher's `Block` construction in `src/block.rs`
//! (header fields computed from a payload, then hashed) generalized
//! from a blockchain block to a save-on-demand document bundle, and on
//! `src/wallet.rs`'s sign/verify pair generalized to [`crate::keystore`].

use crate::canonical::CanonicalValue;
use crate::chain::Epoch;
use crate::error::EnvelopeError;
use crate::keystore::{self, Jwk, KeyPair};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

pub const DOCUMENT_VERSION: &str = "2.1-crypto";

/// The document's editable body (spec.md §6 file format `content`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeContent {
    pub html: String,
    pub delta: Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeMetadata {
    pub epoch_count: u64,
    pub genesis_hash: String,
    pub latest_hash: String,
    pub total_duration: f64,
    pub document_hash: Option<String>,
    pub public_key: Option<Jwk>,
    pub signature: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub title: String,
    pub version: String,
    pub timestamp: String,
    pub content: EnvelopeContent,
    pub proof_chain: Vec<Epoch>,
    pub metadata: EnvelopeMetadata,
}

impl Envelope {
    /// Assemble the envelope from the current chain and editor state,
    /// then compute and fill in `metadata.documentHash` (spec.md §4.F
    /// `build`).
    pub fn build(
        title: impl Into<String>,
        content: EnvelopeContent,
        chain: &[Epoch],
        timestamp: impl Into<String>,
    ) -> Result<Self, EnvelopeError> {
        let genesis = chain.first().ok_or(EnvelopeError::MissingField("proofChain"))?;
        let latest = chain.last().ok_or(EnvelopeError::MissingField("proofChain"))?;
        let total_duration = chain.iter().filter_map(Epoch::epoch_duration).sum();

        let mut envelope = Envelope {
            title: title.into(),
            version: DOCUMENT_VERSION.to_string(),
            timestamp: timestamp.into(),
            content,
            proof_chain: chain.to_vec(),
            metadata: EnvelopeMetadata {
                epoch_count: chain.len() as u64,
                genesis_hash: genesis.hash().to_string(),
                latest_hash: latest.hash().to_string(),
                total_duration,
                document_hash: None,
                public_key: None,
                signature: None,
            },
        };
        let hash = envelope.compute_document_hash()?;
        envelope.metadata.document_hash = Some(hex::encode(hash));
        Ok(envelope)
    }

    /// SHA-256 of the canonicalized envelope with `metadata.documentHash`,
    /// `metadata.signature`, and `metadata.publicKey` forced to null,
    /// regardless of their current value (spec.md §4.F: "with
    /// metadata.documentHash=null, metadata.signature=null,
    /// metadata.publicKey=null").
    pub fn compute_document_hash(&self) -> Result<[u8; 32], EnvelopeError> {
        let mut for_hash = self.clone();
        for_hash.metadata.document_hash = None;
        for_hash.metadata.signature = None;
        for_hash.metadata.public_key = None;
        let json = serde_json::to_value(&for_hash)?;
        Ok(CanonicalValue::from_json(&json).hash())
    }

    /// Sign the hex string of `documentHash` under the given keypair,
    /// writing `signature` and `publicKey` into metadata (spec.md §4.F
    /// `sign`).
    pub fn sign(&mut self, keypair: &KeyPair) -> Result<(), EnvelopeError> {
        let document_hash =
            self.metadata.document_hash.clone().ok_or(EnvelopeError::MissingField("documentHash"))?;
        let signature = keypair.sign(document_hash.as_bytes());
        self.metadata.signature = Some(signature.to_vec());
        self.metadata.public_key = Some(keypair.public_key_jwk());
        Ok(())
    }

    /// Re-derive the document hash from the envelope's current fields
    /// and check the stored signature against it, so that mutating any
    /// hashed field (e.g. `title`) invalidates a previously valid
    /// signature even though the stored `documentHash`/`signature`
    /// fields were never touched (spec.md S3).
    pub fn verify_signature(&self) -> Result<bool, EnvelopeError> {
        let public_key = self.metadata.public_key.as_ref().ok_or(EnvelopeError::MissingField("publicKey"))?;
        let signature = self.metadata.signature.as_ref().ok_or(EnvelopeError::MissingField("signature"))?;
        let recomputed_hash = hex::encode(self.compute_document_hash()?);
        keystore::verify(public_key, recomputed_hash.as_bytes(), signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{EpochChain, GENESIS_HASH};
    use crate::delta::EditDeltaGroup;
    use crate::vdf::Vdf;
    use num_bigint::BigUint;
    use serde_json::json;

    fn sample_chain() -> Vec<Epoch> {
        let vdf = Vdf::new(BigUint::from(2088769923527729741573924049279569u128)).unwrap();
        let mut chain = EpochChain::new();
        chain.genesis();
        for text in ["a", "b", "c"] {
            let tip = chain.current_tip().unwrap().hash().to_string();
            let proof = vdf.compute_proof(&tip, 20, None).unwrap();
            chain
                .append(vec![EditDeltaGroup::new(json!([{"insert": text}]))], proof, 20, 1.0)
                .unwrap();
        }
        chain.epochs().to_vec()
    }

    fn sample_content() -> EnvelopeContent {
        EnvelopeContent { html: "<p>hi</p>".to_string(), delta: json!({"ops": [{"insert": "hi"}]}) }
    }

    #[test]
    fn build_populates_document_hash() {
        let chain = sample_chain();
        let envelope = Envelope::build("note", sample_content(), &chain, "2024-01-01T00:00:00Z").unwrap();
        assert!(envelope.metadata.document_hash.is_some());
        assert_eq!(envelope.metadata.epoch_count, 4);
        assert_eq!(envelope.metadata.genesis_hash, GENESIS_HASH);
        assert_eq!(envelope.metadata.latest_hash, chain.last().unwrap().hash());
    }

    #[test]
    fn build_is_stable_under_parse_serialize_round_trip() {
        let chain = sample_chain();
        let envelope = Envelope::build("note", sample_content(), &chain, "2024-01-01T00:00:00Z").unwrap();
        let serialized = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&serialized).unwrap();
        let rebuilt = Envelope::build(parsed.title.clone(), parsed.content.clone(), &parsed.proof_chain, parsed.timestamp.clone()).unwrap();
        assert_eq!(rebuilt.metadata.document_hash, envelope.metadata.document_hash);
    }

    #[test]
    fn sign_then_verify_round_trip() {
        let chain = sample_chain();
        let mut envelope = Envelope::build("note", sample_content(), &chain, "2024-01-01T00:00:00Z").unwrap();
        let keypair = KeyPair::generate();
        envelope.sign(&keypair).unwrap();
        assert!(envelope.verify_signature().unwrap());
    }

    #[test]
    fn mutating_title_after_signing_invalidates_signature() {
        // S3.
        let chain = sample_chain();
        let mut envelope = Envelope::build("note", sample_content(), &chain, "2024-01-01T00:00:00Z").unwrap();
        let keypair = KeyPair::generate();
        envelope.sign(&keypair).unwrap();
        assert!(envelope.verify_signature().unwrap());

        let original_title = envelope.title.clone();
        envelope.title = "tampered".to_string();
        assert!(!envelope.verify_signature().unwrap());

        envelope.title = original_title;
        assert!(envelope.verify_signature().unwrap());
    }

    #[test]
    fn verify_signature_fails_when_fields_missing() {
        let chain = sample_chain();
        let envelope = Envelope::build("note", sample_content(), &chain, "2024-01-01T00:00:00Z").unwrap();
        let err = envelope.verify_signature().unwrap_err();
        assert!(matches!(err, EnvelopeError::MissingField("publicKey")));
    }
}
