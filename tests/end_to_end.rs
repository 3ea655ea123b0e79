//! Cross-module scenarios from spec.md §8, exercised against the public
//! API exactly as an external consumer (editor UI, CLI) would use it.

use bitquill_core::chain::EpochChain;
use bitquill_core::delta::EditDeltaGroup;
use bitquill_core::envelope::{Envelope, EnvelopeContent};
use bitquill_core::keystore::KeyPair;
use bitquill_core::storage;
use bitquill_core::vdf::Vdf;
use bitquill_core::verifier;
use num_bigint::BigUint;
use serde_json::json;

fn small_vdf() -> Vdf {
    Vdf::new(BigUint::from(2088769923527729741573924049279569u128)).unwrap()
}

fn sealed_chain(vdf: &Vdf, labels: &[&str]) -> Vec<bitquill_core::chain::Epoch> {
    let mut chain = EpochChain::new();
    chain.genesis();
    for label in labels {
        let tip = chain.current_tip().unwrap().hash().to_string();
        let proof = vdf.compute_proof(&tip, 15, None).unwrap();
        chain.append(vec![EditDeltaGroup::new(json!([{"insert": label}]))], proof, 15, 1.0).unwrap();
    }
    chain.epochs().to_vec()
}

/// S1: the same inputs (same tip, same iteration count) always produce
/// the same VDF proof and the same sealed-epoch hash.
#[test]
fn deterministic_sealing_across_two_independent_chains() {
    let vdf = small_vdf();
    let chain_a = sealed_chain(&vdf, &["alpha", "beta"]);
    let chain_b = sealed_chain(&vdf, &["alpha", "beta"]);
    assert_eq!(chain_a[1].hash(), chain_b[1].hash());
    assert_eq!(chain_a[2].hash(), chain_b[2].hash());
}

/// A full document life cycle: seal several epochs, build an envelope,
/// sign it, seal it at rest, reload it, and verify it end to end.
#[test]
fn full_document_lifecycle_round_trips_and_verifies() {
    let vdf = small_vdf();
    let chain = sealed_chain(&vdf, &["first paragraph", "a small revision", "final thoughts"]);

    let content = EnvelopeContent { html: "<p>first paragraph a small revision final thoughts</p>".to_string(), delta: json!({"ops": []}) };
    let mut envelope = Envelope::build("My Essay", content, &chain, "2024-06-01T12:00:00Z").unwrap();

    let keypair = KeyPair::generate();
    envelope.sign(&keypair).unwrap();

    let key = [42u8; 32];
    let saved = storage::seal(&envelope, &key).unwrap();
    let reopened = storage::open(&saved, &key).unwrap();

    let report = verifier::verify(&reopened, &vdf, true, None);
    assert!(report.valid, "errors: {:?}", report.errors);
    assert_eq!(report.verified_epochs, 3);
    assert!(report.signature_valid);
}

/// S3: tampering any signed field after the fact invalidates the
/// signature, discovered the moment an external verifier re-checks it —
/// not only at `Envelope::verify_signature` call sites in isolation.
#[test]
fn tampering_content_after_signing_fails_end_to_end_verification() {
    let vdf = small_vdf();
    let chain = sealed_chain(&vdf, &["original text"]);
    let content = EnvelopeContent { html: "<p>original text</p>".to_string(), delta: json!({"ops": []}) };
    let mut envelope = Envelope::build("note", content, &chain, "2024-06-01T12:00:00Z").unwrap();

    let keypair = KeyPair::generate();
    envelope.sign(&keypair).unwrap();
    assert!(verifier::verify(&envelope, &vdf, true, None).valid);

    envelope.content.html = "<p>forged text</p>".to_string();
    let report = verifier::verify(&envelope, &vdf, true, None);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.contains("signature")));
}

/// S2 cross-module: a tampered-and-rehashed epoch is caught as a broken
/// link by the verifier when driven through the full envelope, not just
/// against a bare chain.
#[test]
fn tampered_epoch_breaks_the_chain_through_the_full_envelope() {
    let vdf = small_vdf();
    let mut chain = sealed_chain(&vdf, &["a", "b", "c"]);
    if let bitquill_core::chain::Epoch::Sealed(sealed) = &mut chain[1] {
        sealed.deltas = vec![EditDeltaGroup::new(json!([{"insert": "forged"}]))];
    }
    let content = EnvelopeContent { html: "<p/>".to_string(), delta: json!({"ops": []}) };
    let envelope = Envelope::build("note", content, &chain, "2024-06-01T12:00:00Z").unwrap();

    let report = verifier::verify(&envelope, &vdf, false, None);
    assert!(!report.valid);
}

/// Wrong decryption key on a saved document surfaces as a storage error,
/// never as a silently-corrupt envelope.
#[test]
fn wrong_key_never_produces_a_garbage_envelope() {
    let vdf = small_vdf();
    let chain = sealed_chain(&vdf, &["text"]);
    let content = EnvelopeContent { html: "<p>text</p>".to_string(), delta: json!({"ops": []}) };
    let envelope = Envelope::build("note", content, &chain, "2024-06-01T12:00:00Z").unwrap();

    let saved = storage::seal(&envelope, &[1u8; 32]).unwrap();
    assert!(storage::open(&saved, &[2u8; 32]).is_err());
}
