//! At-rest symmetric wrapping of a saved document (spec.md §6): AES-256-
//! GCM over the canonical JSON encoding of an [`Envelope`], keyed by a
//! key the key store collaborator derives. Title and timestamp stay
//! plaintext so a file browser can list saves without decrypting them.
//!
//! Grounded on the teacher's direct `aes-gcm` dependency declaration
//! (the teacher's own manifest lists it, unused by its kept modules)
//! and `src/wallet.rs::load_or_create`'s plain `std::fs::read`/
//! `std::fs::write` persistence idiom.

use crate::envelope::Envelope;
use crate::error::StorageError;
use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedMetadata {
    pub title: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedPayload {
    pub iv: Vec<u8>,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedDocument {
    pub metadata: SavedMetadata,
    pub payload: SavedPayload,
}

/// Encrypt an envelope for local storage. `key` is a 32-byte AES-256 key
/// (e.g. from [`crate::keystore::derive_symmetric_key`]).
pub fn seal(envelope: &Envelope, key: &[u8; 32]) -> Result<SavedDocument, StorageError> {
    let plaintext = serde_json::to_vec(envelope)?;
    let cipher = Aes256Gcm::new_from_slice(key).expect("32-byte key is always valid for AES-256-GCM");

    let mut iv = [0u8; 12];
    OsRng.fill_bytes(&mut iv);
    let nonce = Nonce::from_slice(&iv);
    let content = cipher
        .encrypt(nonce, plaintext.as_ref())
        .expect("AES-256-GCM encryption of an in-memory buffer cannot fail");

    Ok(SavedDocument {
        metadata: SavedMetadata { title: envelope.title.clone(), timestamp: envelope.timestamp.clone() },
        payload: SavedPayload { iv: iv.to_vec(), content },
    })
}

/// Decrypt a saved document back into an [`Envelope`]. Fails with
/// [`StorageError::DecryptionFailed`] on a wrong key or corrupted/
/// tampered ciphertext.
pub fn open(saved: &SavedDocument, key: &[u8; 32]) -> Result<Envelope, StorageError> {
    let cipher = Aes256Gcm::new_from_slice(key).expect("32-byte key is always valid for AES-256-GCM");
    let nonce = Nonce::from_slice(&saved.payload.iv);
    let plaintext = cipher.decrypt(nonce, saved.payload.content.as_ref()).map_err(|_| StorageError::DecryptionFailed)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

/// Write a sealed document to disk, rejecting saves over `max_bytes`
/// (spec.md §7 "Storage failures: quota exceeded").
pub fn save_to_path(path: &Path, saved: &SavedDocument, max_bytes: u64) -> Result<(), StorageError> {
    let encoded = serde_json::to_vec(saved)?;
    if encoded.len() as u64 > max_bytes {
        return Err(StorageError::QuotaExceeded);
    }
    std::fs::write(path, encoded)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> Result<SavedDocument, StorageError> {
    let data = std::fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::EpochChain;
    use crate::envelope::EnvelopeContent;
    use serde_json::json;

    fn sample_envelope() -> Envelope {
        let mut chain = EpochChain::new();
        chain.genesis();
        Envelope::build(
            "note",
            EnvelopeContent { html: "<p>hi</p>".to_string(), delta: json!({"ops": []}) },
            chain.epochs(),
            "2024-01-01T00:00:00Z",
        )
        .unwrap()
    }

    #[test]
    fn seal_then_open_round_trip() {
        let envelope = sample_envelope();
        let key = [9u8; 32];
        let saved = seal(&envelope, &key).unwrap();
        assert_eq!(saved.metadata.title, "note");
        let opened = open(&saved, &key).unwrap();
        assert_eq!(opened.metadata.document_hash, envelope.metadata.document_hash);
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let envelope = sample_envelope();
        let saved = seal(&envelope, &[1u8; 32]).unwrap();
        let err = open(&saved, &[2u8; 32]).unwrap_err();
        assert!(matches!(err, StorageError::DecryptionFailed));
    }

    #[test]
    fn tampered_ciphertext_fails_decryption() {
        let envelope = sample_envelope();
        let key = [3u8; 32];
        let mut saved = seal(&envelope, &key).unwrap();
        let last = saved.payload.content.len() - 1;
        saved.payload.content[last] ^= 0xFF;
        let err = open(&saved, &key).unwrap_err();
        assert!(matches!(err, StorageError::DecryptionFailed));
    }

    #[test]
    fn save_rejects_oversized_documents() {
        let envelope = sample_envelope();
        let saved = seal(&envelope, &[4u8; 32]).unwrap();
        let path = std::env::temp_dir().join("bitquill-storage-quota-test.json");
        let err = save_to_path(&path, &saved, 4).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded));
    }

    #[test]
    fn save_then_load_round_trip() {
        let envelope = sample_envelope();
        let key = [5u8; 32];
        let saved = seal(&envelope, &key).unwrap();
        let path = std::env::temp_dir().join("bitquill-storage-round-trip-test.json");
        save_to_path(&path, &saved, 1_000_000).unwrap();
        let loaded = load_from_path(&path).unwrap();
        let opened = open(&loaded, &key).unwrap();
        assert_eq!(opened.metadata.document_hash, envelope.metadata.document_hash);
        let _ = std::fs::remove_file(&path);
    }
}
