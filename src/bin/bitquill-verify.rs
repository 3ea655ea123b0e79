/// Offline verification of a saved BitQuill document (spec.md §4.G).
///
/// Usage:
///   bitquill-verify document.json                 # plaintext envelope JSON
///   bitquill-verify document.json <32-byte-hex>   # AES-256-GCM sealed document

use bitquill_core::envelope::Envelope;
use bitquill_core::storage::{self, SavedDocument};
use bitquill_core::vdf::Vdf;
use bitquill_core::verifier;
use std::process;

fn main() {
    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: bitquill-verify <path> [symmetric-key-hex]");
        process::exit(2);
    };
    let key_hex = args.next();

    let envelope = match load_envelope(&path, key_hex.as_deref()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("failed to load {path}: {e}");
            process::exit(1);
        }
    };

    let vdf = Vdf::with_default_modulus();
    let report = verifier::verify(&envelope, &vdf, true, None);

    println!("document: {}", envelope.title);
    println!("epochs verified: {}/{}", report.verified_epochs, report.total_epochs);
    println!("signature valid: {}", report.signature_valid);
    if report.valid {
        println!("result: VALID");
    } else {
        println!("result: INVALID");
        for error in &report.errors {
            println!("  - {error}");
        }
        process::exit(1);
    }
}

fn load_envelope(path: &str, key_hex: Option<&str>) -> Result<Envelope, Box<dyn std::error::Error>> {
    match key_hex {
        Some(hex_key) => {
            let saved: SavedDocument = serde_json::from_slice(&std::fs::read(path)?)?;
            let key_bytes = hex::decode(hex_key)?;
            let mut key = [0u8; 32];
            let n = key_bytes.len().min(32);
            key[..n].copy_from_slice(&key_bytes[..n]);
            Ok(storage::open(&saved, &key)?)
        }
        None => Ok(serde_json::from_slice(&std::fs::read(path)?)?),
    }
}
