//! The authorship analyzer (spec.md §4.H): a pure function of the
//! sealed chain that scores how "human" the editing pattern looks.
//!
//! No teacher analogue exists for statistical scoring; this is written
//! fresh from spec.md §4.H's explicit formulas, in the teacher's style
//! of small pure free functions over plain structs (cf.
//! `economics::block_reward` in the original teacher tree) rather than
//! a single monolithic method.

use crate::chain::Epoch;
use crate::delta::Op;
use serde::Serialize;
use std::collections::HashMap;

/// `details` carries either the nine component scores, or a short-
/// circuit's single `anomalyReason` string (spec.md §4.H, S5).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyzerDetails {
    ShortCircuit {
        #[serde(rename = "anomalyReason")]
        anomaly_reason: String,
    },
    Components(HashMap<String, f64>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorshipReport {
    pub human_score: f64,
    pub details: AnalyzerDetails,
    pub metrics: HashMap<String, f64>,
}

struct EpochView {
    ops: Vec<Op>,
    duration: f64,
    #[allow(dead_code)]
    epoch_number: u64,
}

const MICRO_BURSTS_WEIGHT: f64 = 0.15;
const REVISION_COHERENCE_WEIGHT: f64 = 0.15;
const MOMENTUM_WEIGHT: f64 = 0.10;
const SEMANTIC_COHERENCE_WEIGHT: f64 = 0.10;
const CROSS_EPOCH_CONSISTENCY_WEIGHT: f64 = 0.05;
const BURST_VARIANCE_RATIO_WEIGHT: f64 = 0.15;
const PAUSE_RATIO_WEIGHT: f64 = 0.10;
const EDIT_TYPE_ENTROPY_WEIGHT: f64 = 0.10;
const SPEED_GAUSSIAN_WEIGHT: f64 = 0.10;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-0.5 * ((x - mu) / sigma).powi(2)).exp()
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if mean <= 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt() / mean)
}

/// Score the sealed portion of a chain (spec.md §4.H operates on
/// `proofChain[1..]`, i.e. every epoch but genesis).
pub fn analyze(chain: &[Epoch]) -> AuthorshipReport {
    let epochs: Vec<EpochView> = chain
        .iter()
        .filter(|e| !matches!(e, Epoch::Genesis(_)))
        .map(|e| EpochView {
            ops: e.deltas().iter().flat_map(|group| group.parse_ops()).collect(),
            duration: e.epoch_duration().unwrap_or(0.0),
            epoch_number: e.epoch_number(),
        })
        .collect();

    if epochs.iter().any(|e| e.ops.len() > 200) {
        return AuthorshipReport {
            human_score: 0.05,
            details: AnalyzerDetails::ShortCircuit { anomaly_reason: "Edit storm detected.".to_string() },
            metrics: HashMap::new(),
        };
    }
    if epochs.iter().any(|e| e.ops.iter().any(|op| matches!(op, Op::Insert{text} if text.chars().count() > 100))) {
        return AuthorshipReport {
            human_score: 0.10,
            details: AnalyzerDetails::ShortCircuit { anomaly_reason: "Large paste detected.".to_string() },
            metrics: HashMap::new(),
        };
    }

    let mut scores = HashMap::new();
    scores.insert("microBursts".to_string(), micro_bursts(&epochs));
    scores.insert("revisionCoherence".to_string(), revision_coherence(&epochs));
    scores.insert("momentum".to_string(), momentum(&epochs));
    scores.insert("semanticCoherence".to_string(), semantic_coherence(&epochs));
    scores.insert("crossEpochConsistency".to_string(), cross_epoch_consistency(&epochs));
    scores.insert("burstVarianceRatio".to_string(), burst_variance_ratio(&epochs));
    scores.insert("pauseRatio".to_string(), pause_ratio(&epochs));
    scores.insert("editTypeEntropy".to_string(), edit_type_entropy(&epochs));
    scores.insert("speedGaussian".to_string(), speed_gaussian(&epochs));

    let human_score = clamp01(
        scores["microBursts"] * MICRO_BURSTS_WEIGHT
            + scores["revisionCoherence"] * REVISION_COHERENCE_WEIGHT
            + scores["momentum"] * MOMENTUM_WEIGHT
            + scores["semanticCoherence"] * SEMANTIC_COHERENCE_WEIGHT
            + scores["crossEpochConsistency"] * CROSS_EPOCH_CONSISTENCY_WEIGHT
            + scores["burstVarianceRatio"] * BURST_VARIANCE_RATIO_WEIGHT
            + scores["pauseRatio"] * PAUSE_RATIO_WEIGHT
            + scores["editTypeEntropy"] * EDIT_TYPE_ENTROPY_WEIGHT
            + scores["speedGaussian"] * SPEED_GAUSSIAN_WEIGHT,
    );

    let metrics = HashMap::from([
        ("epochCount".to_string(), epochs.len() as f64),
        ("totalInsertedChars".to_string(), epochs.iter().flat_map(|e| &e.ops).filter_map(Op::insert_len).sum::<usize>() as f64),
    ]);

    AuthorshipReport { human_score, details: AnalyzerDetails::Components(scores), metrics }
}

fn chars_per_sec(epoch: &EpochView) -> f64 {
    let chars: usize = epoch.ops.iter().filter_map(Op::insert_len).sum();
    if epoch.duration <= 0.0 {
        return 0.0;
    }
    chars as f64 / epoch.duration
}

/// Component 1 (weight 0.15): coefficient of variation of chars/sec
/// across bursts separated by >2s gaps within an epoch.
fn micro_bursts(epochs: &[EpochView]) -> f64 {
    let mut burst_rates = Vec::new();
    for epoch in epochs {
        let n = epoch.ops.len();
        if n == 0 {
            continue;
        }
        let timestamps: Vec<f64> = (0..n).map(|i| (i as f64 / n as f64) * epoch.duration).collect();
        let mut burst_start = 0usize;
        for i in 1..=n {
            let boundary = i == n || (timestamps[i] - timestamps[i - 1] > 2.0);
            if boundary {
                let burst_ops = &epoch.ops[burst_start..i];
                let span = (timestamps[i - 1] - timestamps[burst_start]).max(0.001);
                let chars: usize = burst_ops.iter().filter_map(Op::insert_len).sum();
                if chars > 0 {
                    burst_rates.push(chars as f64 / span);
                }
                burst_start = i;
            }
        }
    }
    match coefficient_of_variation(&burst_rates) {
        Some(cv) => clamp01(sigmoid(-4.0 * (cv - 0.3) + 2.0)),
        None => 0.5,
    }
}

/// Component 2 (weight 0.15): delete-length classification and
/// immediate-correction behavior.
fn revision_coherence(epochs: &[EpochView]) -> f64 {
    let mut typo = 0u32;
    let mut word = 0u32;
    let mut sentence = 0u32;
    let mut total = 0u32;
    let mut immediate_correction = 0u32;

    for epoch in epochs {
        for (i, op) in epoch.ops.iter().enumerate() {
            if let Op::Delete { len } = op {
                total += 1;
                if *len <= 3 {
                    typo += 1;
                } else if *len <= 20 {
                    word += 1;
                } else {
                    sentence += 1;
                }
                if matches!(epoch.ops.get(i + 1), Some(Op::Insert { .. })) {
                    immediate_correction += 1;
                }
            }
        }
    }
    let _ = word;
    if total == 0 {
        return 0.5;
    }
    let typo_ratio = typo as f64 / total as f64;
    let immediate_ratio = immediate_correction as f64 / total as f64;
    let sentence_ratio = sentence as f64 / total as f64;

    let a = sigmoid(-6.0 * (typo_ratio - 0.6).abs() + 3.0);
    let b = sigmoid(-6.0 * (immediate_ratio - 0.3).abs() + 3.0);
    let c = clamp01(1.0 - (sentence_ratio - 0.1).abs());
    clamp01((a + b + c) / 3.0)
}

/// Component 3 (weight 0.10): warmup, fatigue, and pause-recovery shape
/// of the per-epoch typing rate.
fn momentum(epochs: &[EpochView]) -> f64 {
    let rates: Vec<f64> = epochs.iter().map(chars_per_sec).collect();
    let mut subscores = Vec::new();

    if rates.len() >= 5 {
        let exceeding = (1..5).filter(|&i| rates[i] > 0.9 * rates[i - 1]).count();
        subscores.push(exceeding as f64 / 4.0);
    }

    if rates.len() >= 10 {
        let seg_len = rates.len() / 5;
        let seg_means: Vec<f64> = (0..5)
            .map(|s| {
                let start = s * seg_len;
                let end = if s == 4 { rates.len() } else { (s + 1) * seg_len };
                let seg = &rates[start..end];
                seg.iter().sum::<f64>() / seg.len().max(1) as f64
            })
            .collect();
        let declines = (1..5).filter(|&i| seg_means[i] < seg_means[i - 1]).count();
        subscores.push(declines as f64 / 4.0);
    }

    let durations: Vec<f64> = epochs.iter().map(|e| e.duration).collect();
    if durations.len() >= 2 {
        let median = {
            let mut sorted = durations.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
            sorted[sorted.len() / 2]
        };
        let pause_threshold = median * 2.0;
        let mut recovery_checks = Vec::new();
        for i in 0..epochs.len() {
            if durations[i] <= pause_threshold || i == 0 {
                continue;
            }
            let pre_pause_rate = rates[i - 1];
            if pre_pause_rate <= 0.0 {
                continue;
            }
            let window: Vec<f64> = rates.iter().skip(i + 1).take(3).cloned().collect();
            if window.len() < 3 {
                continue;
            }
            let dipped = window.iter().any(|r| *r < 0.8 * pre_pause_rate);
            let recovered = window[2] > 0.7 * pre_pause_rate;
            recovery_checks.push(if dipped && recovered { 1.0 } else { 0.0 });
        }
        if !recovery_checks.is_empty() {
            subscores.push(recovery_checks.iter().sum::<f64>() / recovery_checks.len() as f64);
        }
    }

    if subscores.is_empty() {
        0.5
    } else {
        clamp01(subscores.iter().sum::<f64>() / subscores.len() as f64)
    }
}

/// Component 4 (weight 0.10): shape of inserted prose (sentence-length
/// variability, punctuation diversity, capitalization pattern).
fn semantic_coherence(epochs: &[EpochView]) -> f64 {
    let text: String = epochs
        .iter()
        .flat_map(|e| &e.ops)
        .filter_map(|op| match op {
            Op::Insert { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    if text.trim().is_empty() {
        return 0.5;
    }

    let sentences: Vec<&str> = text.split(['.', '!', '?']).map(str::trim).filter(|s| !s.is_empty()).collect();
    let lengths: Vec<f64> = sentences.iter().map(|s| s.chars().count() as f64).collect();
    let sentence_cv_score = match coefficient_of_variation(&lengths) {
        Some(cv) => gaussian(cv, 0.6, 0.3),
        None => 0.5,
    };

    let has = |pred: fn(char) -> bool| text.chars().any(pred);
    let categories = [
        has(|c| c == '.' || c == '!' || c == '?'),
        has(|c| c == ',' || c == ';' || c == ':'),
        has(|c| c == '"' || c == '\''),
        has(|c| "()-—".contains(c)),
    ];
    let punctuation_score = categories.iter().filter(|c| **c).count() as f64 / 4.0;

    let mut sentence_initial_caps = 0u32;
    let mut sentence_initial_total = 0u32;
    let mut mid_caps = 0u32;
    let mut mid_total = 0u32;
    let mut at_sentence_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_sentence_start {
                sentence_initial_total += 1;
                if c.is_uppercase() {
                    sentence_initial_caps += 1;
                }
            } else {
                mid_total += 1;
                if c.is_uppercase() {
                    mid_caps += 1;
                }
            }
            at_sentence_start = false;
        } else if c == '.' || c == '!' || c == '?' {
            at_sentence_start = true;
        }
    }
    let sentence_cap_ratio = if sentence_initial_total > 0 { sentence_initial_caps as f64 / sentence_initial_total as f64 } else { 0.0 };
    let mid_cap_ratio = if mid_total > 0 { mid_caps as f64 / mid_total as f64 } else { 0.0 };
    let capitalization_score = if sentence_cap_ratio > 0.8 && (0.10..=0.40).contains(&mid_cap_ratio) { 1.0 } else { 0.3 };

    clamp01((sentence_cv_score + punctuation_score + capitalization_score) / 3.0)
}

/// Component 5 (weight 0.05): per-epoch metric consistency (chars/op,
/// delete ratio, ops/sec) plus a slow-down-over-time evolution bonus.
fn cross_epoch_consistency(epochs: &[EpochView]) -> f64 {
    let chars_per_op: Vec<f64> = epochs
        .iter()
        .map(|e| {
            let chars: usize = e.ops.iter().filter_map(Op::insert_len).sum();
            if e.ops.is_empty() { 0.0 } else { chars as f64 / e.ops.len() as f64 }
        })
        .collect();
    let delete_ratio: Vec<f64> = epochs
        .iter()
        .map(|e| {
            if e.ops.is_empty() {
                return 0.0;
            }
            let deletes = e.ops.iter().filter(|op| matches!(op, Op::Delete { .. })).count();
            deletes as f64 / e.ops.len() as f64
        })
        .collect();
    let ops_per_sec: Vec<f64> = epochs.iter().map(|e| if e.duration > 0.0 { e.ops.len() as f64 / e.duration } else { 0.0 }).collect();

    let bell = |series: &[f64]| match coefficient_of_variation(series) {
        Some(cv) => gaussian(cv, 0.4, 0.25),
        None => 0.5,
    };

    let mut score = (bell(&chars_per_op) + bell(&delete_ratio) + bell(&ops_per_sec)) / 3.0;

    if ops_per_sec.len() >= 15 {
        let seg = ops_per_sec.len() / 3;
        let early = &ops_per_sec[0..seg];
        let middle = &ops_per_sec[seg..2 * seg];
        let late = &ops_per_sec[2 * seg..];
        let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len().max(1) as f64;
        let (early_mean, middle_mean, late_mean) = (mean(early), mean(middle), mean(late));
        if middle_mean >= 0.9 * early_mean && late_mean <= 1.1 * middle_mean {
            score = clamp01(score + 0.1);
        }
    }
    clamp01(score)
}

/// Legacy component: burst-separated (5s gap) chars/sec variance ratio.
fn burst_variance_ratio(epochs: &[EpochView]) -> f64 {
    let mut burst_rates = Vec::new();
    for epoch in epochs {
        let n = epoch.ops.len();
        if n == 0 {
            continue;
        }
        let timestamps: Vec<f64> = (0..n).map(|i| (i as f64 / n as f64) * epoch.duration).collect();
        let mut burst_start = 0usize;
        for i in 1..=n {
            if i == n || timestamps[i] - timestamps[i - 1] > 5.0 {
                let span = (timestamps[i - 1] - timestamps[burst_start]).max(0.001);
                let chars: usize = epoch.ops[burst_start..i].iter().filter_map(Op::insert_len).sum();
                if chars > 0 {
                    burst_rates.push(chars as f64 / span);
                }
                burst_start = i;
            }
        }
    }
    match coefficient_of_variation(&burst_rates) {
        Some(cv) => clamp01(sigmoid(-4.0 * (cv - 0.5) + 2.0)),
        None => 0.5,
    }
}

/// Legacy component: fraction of epochs whose duration is an outlier
/// pause relative to the chain's median.
fn pause_ratio(epochs: &[EpochView]) -> f64 {
    let durations: Vec<f64> = epochs.iter().map(|e| e.duration).collect();
    if durations.len() < 2 {
        return 0.5;
    }
    let mut sorted = durations.clone();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = sorted[sorted.len() / 2];
    if median <= 0.0 {
        return 0.5;
    }
    let pauses = durations.iter().filter(|d| **d > median * 2.0).count();
    let ratio = pauses as f64 / durations.len() as f64;
    clamp01(gaussian(ratio, 0.2, 0.15))
}

/// Legacy component: Shannon entropy of the insert/delete/retain
/// op-type distribution, normalized to `[0,1]`.
fn edit_type_entropy(epochs: &[EpochView]) -> f64 {
    let mut insert = 0u32;
    let mut delete = 0u32;
    let mut retain = 0u32;
    for epoch in epochs {
        for op in &epoch.ops {
            match op {
                Op::Insert { .. } => insert += 1,
                Op::Delete { .. } => delete += 1,
                Op::Retain { .. } => retain += 1,
            }
        }
    }
    let total = (insert + delete + retain) as f64;
    if total == 0.0 {
        return 0.5;
    }
    let probs = [insert as f64 / total, delete as f64 / total, retain as f64 / total];
    let entropy: f64 = probs.iter().filter(|p| **p > 0.0).map(|p| -p * p.log2()).sum();
    clamp01(entropy / 3f64.log2())
}

/// Legacy component: overall typing speed against a 5 chars/sec human
/// baseline.
fn speed_gaussian(epochs: &[EpochView]) -> f64 {
    let total_chars: usize = epochs.iter().flat_map(|e| &e.ops).filter_map(Op::insert_len).sum();
    let total_duration: f64 = epochs.iter().map(|e| e.duration).sum();
    if total_duration <= 0.0 {
        return 0.5;
    }
    clamp01(gaussian(total_chars as f64 / total_duration, 5.0, 3.0))
}
