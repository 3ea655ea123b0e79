/// Benchmarks the VDF squaring loop and estimates iteration counts for
/// a target epoch duration (spec.md §4.B `benchmark`).
///
/// Usage:
///   bitquill-benchmark                 # 1000ms probe, 10s target epoch
///   bitquill-benchmark 2000            # custom probe duration in ms
///   bitquill-benchmark 2000 30         # also report iterations for a 30s epoch

use bitquill_core::vdf::Vdf;

fn main() {
    let mut args = std::env::args().skip(1);
    let probe_ms: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(1000);
    let target_seconds: f64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10.0);

    println!("BitQuill VDF benchmark");
    println!("  modulus: RSA-2048 default");
    println!("  probe duration: {probe_ms}ms");

    let vdf = Vdf::with_default_modulus();
    let rate = vdf.benchmark(probe_ms);
    println!("  measured rate: {rate:.1} iterations/sec");

    let iterations = vdf.estimate_iterations_for_seconds(target_seconds);
    println!("  iterations for a {target_seconds:.1}s epoch: {iterations}");
}
