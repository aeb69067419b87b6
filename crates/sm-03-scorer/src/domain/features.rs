//! Feature assembly from incident member signals.

use shared_types::{IncidentView, ScoreFactor, SignalKind};
use std::collections::BTreeMap;

/// Assemble the feature map handed to the scoring capability.
///
/// Deterministic: the same view and corroboration value always produce the
/// same map (`BTreeMap` keeps key order stable for capabilities that care).
pub fn assemble_features(view: &IncidentView, peer_corroboration: f64) -> BTreeMap<String, f64> {
    let mut features = BTreeMap::new();
    let signals = &view.signals;
    let count = signals.len() as f64;

    features.insert("signal_count".to_string(), count);
    features.insert(
        "entity_count".to_string(),
        view.incident.affected_entities.len() as f64,
    );

    let mut kind_counts: BTreeMap<&str, f64> = BTreeMap::new();
    let mut confidence_sum = 0.0;
    let mut confidence_max: f64 = 0.0;
    let mut decoy = 0.0;
    for signal in signals {
        *kind_counts.entry(signal.kind.label()).or_insert(0.0) += 1.0;
        confidence_sum += signal.confidence;
        confidence_max = confidence_max.max(signal.confidence);
        if signal.kind == SignalKind::DecoyInteraction {
            decoy = 1.0;
        }
    }
    for (label, kind_count) in kind_counts {
        features.insert(format!("kind_{label}_count"), kind_count);
    }

    if count > 0.0 {
        features.insert("mean_confidence".to_string(), confidence_sum / count);
    } else {
        features.insert("mean_confidence".to_string(), 0.0);
    }
    features.insert("max_confidence".to_string(), confidence_max);

    // Signals per second over the incident's span.
    let span_secs =
        (view.incident.last_seen_ms.saturating_sub(view.incident.first_seen_ms) as f64 / 1_000.0)
            .max(1.0);
    features.insert("burst_rate".to_string(), count / span_secs);

    features.insert("decoy_interaction".to_string(), decoy);
    features.insert(
        "peer_corroboration".to_string(),
        peer_corroboration.clamp(0.0, 1.0),
    );

    features
}

/// Derive the recorded contributing factors from the feature map: the
/// highest-weighted terms, in descending weight order.
pub fn contributing_factors(
    features: &BTreeMap<String, f64>,
    max_factors: usize,
) -> Vec<ScoreFactor> {
    let mut factors: Vec<ScoreFactor> = features
        .iter()
        .filter(|(_, weight)| **weight > 0.0)
        .map(|(name, weight)| ScoreFactor {
            name: name.clone(),
            weight: *weight,
        })
        .collect();
    factors.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    factors.truncate(max_factors);
    factors
}
