//! The editing session: buffers edit deltas, drives the background VDF
//! worker, and owns the only writer of the epoch chain (spec.md §4.E,
//! §5 concurrency model).
//!
//! Grounded on the teacher's `tokio::sync::mpsc` + `tokio::spawn`
//! worker-task idiom (`src/network/peer_manager.rs`,
//! `src/network/gossip_handler.rs`) and the single
//! `Arc<Mutex<_>>`-guarded mutable-state-on-one-task pattern in
//! `src/main.rs`'s guardian loop, generalized from guarding an AI
//! model to guarding the epoch chain. Cancellation uses a generation
//! counter rather than aborting the task directly, matching spec.md
//! §9's "identity-based cancellation" design note: a superseded
//! worker's completion message is simply ignored because its
//! generation no longer matches.

use crate::chain::{Clock, Epoch, EpochChain, SystemClock};
use crate::config::ObserverConfig;
use crate::delta::EditDeltaGroup;
use crate::error::SessionError;
use crate::vdf::{Vdf, VdfProof};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

/// A VDF worker's result, tagged with the generation it was spawned
/// for. Messages whose generation has been superseded are dropped by
/// the receiver without being interpreted (spec.md §5 Cancellation).
struct WorkerResult {
    generation: u64,
    outcome: Result<(VdfProof, u64, f64), String>,
}

pub struct EditingSession {
    vdf: Arc<Vdf>,
    config: ObserverConfig,
    chain: Mutex<EpochChain<SystemClock>>,
    buffer: Mutex<Vec<EditDeltaGroup>>,
    current_iterations: AtomicU64,
    generation: Arc<AtomicU64>,
    worker_rx: Mutex<Option<mpsc::UnboundedReceiver<WorkerResult>>>,
}

impl EditingSession {
    pub fn new(vdf: Vdf, config: ObserverConfig) -> Arc<Self> {
        let initial_iterations = crate::chain::cold_start_calibration(&vdf, &config);
        let mut chain = EpochChain::new();
        chain.genesis();
        let session = Arc::new(Self {
            vdf: Arc::new(vdf),
            config,
            chain: Mutex::new(chain),
            buffer: Mutex::new(Vec::new()),
            current_iterations: AtomicU64::new(initial_iterations),
            generation: Arc::new(AtomicU64::new(0)),
            worker_rx: Mutex::new(None),
        });
        session
    }

    /// Buffer one arriving delta group in arrival order (spec.md §4.E,
    /// §5: non-suspending, therefore atomic with respect to the worker).
    pub async fn submit_delta(&self, group: EditDeltaGroup) {
        self.buffer.lock().await.push(group);
    }

    /// Start the VDF loop over the current tip. Spawns a background
    /// worker tagged with the session's current generation.
    pub async fn start_worker(self: &Arc<Self>) {
        let generation = self.generation.load(Ordering::SeqCst);
        let tip_hash = self.chain.lock().await.current_tip().expect("genesis always present").hash().to_string();
        let iterations = self.current_iterations.load(Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        *self.worker_rx.lock().await = Some(rx);

        let vdf = Arc::clone(&self.vdf);
        tokio::spawn(async move {
            let outcome = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                let proof = vdf.compute_proof(&tip_hash, iterations, None).map_err(|e| e.to_string())?;
                Ok::<_, String>((proof, iterations, start.elapsed().as_secs_f64()))
            })
            .await
            .unwrap_or_else(|e| Err(format!("VDF worker panicked: {e}")));

            let _ = tx.send(WorkerResult { generation, outcome });
        });
    }

    /// Poll for a completed VDF proof and, if one is ready, apply
    /// spec.md §4.E's completion logic: discard-and-restart on an empty
    /// buffer, or seal a new epoch and restart over the new tip.
    pub async fn poll_worker_completion(self: &Arc<Self>) -> Result<Option<Epoch>, SessionError> {
        let message = {
            let mut guard = self.worker_rx.lock().await;
            match guard.as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            }
        };
        let Some(message) = message else { return Ok(None) };

        if message.generation != self.generation.load(Ordering::SeqCst) {
            debug!(
                stale_generation = message.generation,
                "dropping completion from a superseded VDF worker"
            );
            return Ok(None);
        }

        let (proof, iterations, duration) = match message.outcome {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "VDF computation error; chain left unadvanced");
                self.start_worker().await;
                return Err(SessionError::ComputationFailed(e));
            }
        };

        let snapshot: Vec<EditDeltaGroup> = {
            let mut buffer = self.buffer.lock().await;
            std::mem::take(&mut *buffer)
        };

        if snapshot.is_empty() {
            debug!("empty epoch discarded; restarting VDF over the same tip");
            self.start_worker().await;
            return Ok(None);
        }

        let next_iterations = crate::chain::adjust_iterations(duration, self.config.target_epoch_seconds, iterations);
        self.current_iterations.store(next_iterations, Ordering::SeqCst);

        let sealed = {
            let mut chain = self.chain.lock().await;
            chain.append(snapshot, proof, iterations, duration)?.clone()
        };
        info!(epoch = sealed.epoch_number(), iterations = next_iterations, "epoch sealed");

        self.start_worker().await;
        Ok(Some(sealed))
    }

    /// Terminate any in-flight worker (by identity — its completion
    /// will be ignored once it arrives) and reset the session against a
    /// freshly loaded or new chain (spec.md §4.E, §5 Cancellation).
    pub async fn reset(self: &Arc<Self>, loaded_chain: Option<EpochChain<SystemClock>>) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.buffer.lock().await = Vec::new();
        *self.worker_rx.lock().await = None;

        let mut chain = self.chain.lock().await;
        *chain = match loaded_chain {
            Some(c) => c,
            None => {
                let mut c = EpochChain::new();
                c.genesis();
                c
            }
        };
        drop(chain);
        self.start_worker().await;
    }

    pub async fn snapshot_chain(&self) -> Vec<Epoch> {
        self.chain.lock().await.epochs().to_vec()
    }
}
