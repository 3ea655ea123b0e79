/// Generates a P-384 signing keypair for the document envelope.
///
/// Usage:
///   bitquill-keygen                      # print the public JWK to stdout
///   bitquill-keygen out/signing-key.hex  # also write the private key (hex) to a file

use bitquill_core::keystore::KeyPair;
use std::process;

fn main() {
    let keypair = KeyPair::generate();
    let jwk = keypair.public_key_jwk();

    println!("generated P-384 signing key");
    println!("public key (JWK): {}", serde_json::to_string_pretty(&jwk).expect("JWK always serializes"));

    if let Some(path) = std::env::args().nth(1) {
        let hex = hex::encode(keypair.to_bytes());
        if let Err(e) = std::fs::write(&path, hex) {
            eprintln!("failed to write private key to {path}: {e}");
            process::exit(1);
        }
        println!("private key written to {path} — keep this file secret");
    } else {
        println!("no output path given; private key was not persisted");
    }
}
