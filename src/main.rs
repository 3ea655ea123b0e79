//! Interactive demo binary: drives one editing session end to end —
//! buffer keystrokes, seal epochs under the VDF, sign the finished
//! envelope, save it to disk, then verify and score it back.
//!
//! Grounded on the teacher's `src/main.rs` `tokio::select!` event loop
//! (one `Arc<Mutex<_>>`-guarded state machine polled on an interval)
//! generalized from a P2P mining loop to an editing session with no
//! network component (spec.md §1 Non-goals).

use bitquill_core::analyzer;
use bitquill_core::chain::GENESIS_HASH;
use bitquill_core::config::ObserverConfig;
use bitquill_core::delta::EditDeltaGroup;
use bitquill_core::envelope::{Envelope, EnvelopeContent};
use bitquill_core::keystore::KeyPair;
use bitquill_core::session::EditingSession;
use bitquill_core::storage;
use bitquill_core::vdf::Vdf;
use bitquill_core::verifier;
use std::error::Error;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, Duration};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("--------------------------------------------------");
    println!("BitQuill — tamper-evident authorship observer");
    println!("Type lines of text; each line becomes an edit.");
    println!("Send EOF (Ctrl-D) to seal, sign, and save the document.");
    println!("--------------------------------------------------");

    let config = ObserverConfig::default();
    let vdf = Vdf::with_default_modulus();
    let session = EditingSession::new(vdf, config);
    session.start_worker().await;

    let mut html = String::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut poll = interval(Duration::from_millis(200));
    let mut stdin_open = true;

    loop {
        tokio::select! {
            result = lines.next_line(), if stdin_open => match result {
                Ok(Some(line)) => {
                    html.push_str(&line);
                    html.push('\n');
                    session.submit_delta(EditDeltaGroup::new(serde_json::json!([{"insert": line}]))).await;
                }
                Ok(None) | Err(_) => {
                    stdin_open = false;
                }
            },
            _ = poll.tick() => {
                if let Ok(Some(epoch)) = session.poll_worker_completion().await {
                    println!("sealed epoch {} ({} epochs total)", epoch.epoch_number(), epoch.epoch_number() + 1);
                }
                if !stdin_open {
                    break;
                }
            }
        }
    }

    // Drain whatever the worker was mid-computation on when stdin closed,
    // so the last typed line isn't lost from the sealed chain.
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(200)).await;
        if let Ok(Some(epoch)) = session.poll_worker_completion().await {
            println!("sealed epoch {} ({} epochs total)", epoch.epoch_number(), epoch.epoch_number() + 1);
            break;
        }
    }

    let chain = session.snapshot_chain().await;
    let content = EnvelopeContent { html, delta: serde_json::json!({"ops": []}) };
    let timestamp = chrono::Utc::now().to_rfc3339();
    let mut envelope = Envelope::build("untitled", content, &chain, timestamp)?;

    let keypair = KeyPair::generate();
    envelope.sign(&keypair)?;

    let report = verifier::verify(&envelope, &Vdf::with_default_modulus(), true, None);
    println!("verification: valid={} verified_epochs={}/{} signature_valid={}",
        report.valid, report.verified_epochs, report.total_epochs, report.signature_valid);
    for error in &report.errors {
        println!("  - {error}");
    }

    let authorship = analyzer::analyze(&chain);
    println!("authorship score: {:.2}", authorship.human_score);

    let symmetric_key = bitquill_core::keystore::derive_symmetric_key(
        &{
            let mut seed = [0u8; 32];
            let bytes = keypair.to_bytes();
            let n = bytes.len().min(32);
            seed[..n].copy_from_slice(&bytes[..n]);
            seed
        },
        b"bitquill-at-rest-v1",
    );
    let saved = storage::seal(&envelope, &symmetric_key)?;
    let out_path = PathBuf::from("bitquill-document.json");
    storage::save_to_path(&out_path, &saved, 10 * 1024 * 1024)?;
    println!("saved {} (genesis {})", out_path.display(), GENESIS_HASH);

    Ok(())
}
