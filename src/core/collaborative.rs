//! Neighbor-based collaborative filtering over historical interaction
//! records. Produces a predicted affinity in [0, 1] per candidate, with a
//! neutral 0.5 whenever the data cannot support a real prediction.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use moka::sync::Cache;

use crate::config::CollaborativeSettings;
use crate::models::{InteractionAction, InteractionRecord, Requester};

/// Requester-by-provider affinity matrix, built once per process from
/// the interaction log.
pub type AffinityMatrix = HashMap<String, HashMap<String, f64>>;

/// Cache key for a prediction batch: the requester plus a fingerprint of
/// the first ten candidate ids, sorted.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PredictionKey {
    requester_id: String,
    candidate_fingerprint: String,
}

impl PredictionKey {
    fn new(requester_id: &str, candidate_ids: &[String]) -> Self {
        let mut ids: Vec<&str> = candidate_ids.iter().take(10).map(String::as_str).collect();
        ids.sort_unstable();
        Self {
            requester_id: requester_id.to_string(),
            candidate_fingerprint: ids.join(","),
        }
    }
}

pub struct CollaborativeEngine {
    settings: CollaborativeSettings,
    matrix: OnceLock<AffinityMatrix>,
    prediction_cache: Cache<PredictionKey, Arc<HashMap<String, f64>>>,
}

impl CollaborativeEngine {
    pub fn new(settings: CollaborativeSettings) -> Self {
        let prediction_cache = Cache::new(settings.prediction_cache_capacity);
        Self {
            settings,
            matrix: OnceLock::new(),
            prediction_cache,
        }
    }

    /// Predicted affinity per candidate id. Requesters without usable
    /// history get the neutral 0.5 across the board.
    pub fn predictions(
        &self,
        requester: &Requester,
        candidate_ids: &[String],
        interactions: &[InteractionRecord],
    ) -> Arc<HashMap<String, f64>> {
        let neutral = || {
            Arc::new(
                candidate_ids
                    .iter()
                    .map(|id| (id.clone(), 0.5))
                    .collect::<HashMap<String, f64>>(),
            )
        };

        if !requester.has_history() {
            tracing::debug!("No usable history, returning neutral predictions");
            return neutral();
        }
        let Some(requester_id) = &requester.requester_id else {
            return neutral();
        };

        let cache_key = PredictionKey::new(requester_id, candidate_ids);
        if let Some(cached) = self.prediction_cache.get(&cache_key) {
            return cached;
        }

        let matrix = self.matrix.get_or_init(|| build_matrix(interactions));
        let Some(own_scores) = matrix.get(requester_id) else {
            return neutral();
        };
        if own_scores.is_empty() {
            return neutral();
        }

        let neighbors = self.find_neighbors(requester_id, own_scores, matrix);
        if neighbors.is_empty() {
            tracing::debug!("No neighbors with enough overlap");
            return neutral();
        }

        let mut predictions = HashMap::with_capacity(candidate_ids.len());
        for candidate_id in candidate_ids {
            // Candidates the requester already scored keep the neutral
            // value; their real signal flows through the history boost.
            if own_scores.contains_key(candidate_id) {
                predictions.insert(candidate_id.clone(), 0.5);
                continue;
            }

            let neighbor_scores: Vec<f64> = neighbors
                .iter()
                .filter_map(|neighbor_id| {
                    matrix
                        .get(neighbor_id)
                        .and_then(|scores| scores.get(candidate_id))
                        .copied()
                })
                .collect();

            let prediction = if neighbor_scores.is_empty() {
                0.5
            } else {
                neighbor_scores.iter().sum::<f64>() / neighbor_scores.len() as f64
            };
            predictions.insert(candidate_id.clone(), prediction);
        }

        let predictions = Arc::new(predictions);
        self.prediction_cache
            .insert(cache_key, Arc::clone(&predictions));
        predictions
    }

    /// Requesters sharing at least `min_common_providers` rated providers,
    /// capped at `neighbor_limit`.
    fn find_neighbors(
        &self,
        requester_id: &str,
        own_scores: &HashMap<String, f64>,
        matrix: &AffinityMatrix,
    ) -> Vec<String> {
        let mut neighbors = Vec::new();
        for (other_id, other_scores) in matrix {
            if other_id == requester_id {
                continue;
            }
            let common = own_scores
                .keys()
                .filter(|provider_id| other_scores.contains_key(*provider_id))
                .count();
            if common >= self.settings.min_common_providers {
                neighbors.push(other_id.clone());
            }
            if neighbors.len() >= self.settings.neighbor_limit {
                break;
            }
        }
        neighbors
    }
}

/// Fold the interaction log into per-pair affinities, keeping the
/// strongest signal per (requester, provider) pair.
pub fn build_matrix(interactions: &[InteractionRecord]) -> AffinityMatrix {
    let mut matrix: AffinityMatrix = HashMap::new();
    for interaction in interactions {
        let score = interaction_affinity(interaction);
        let entry = matrix
            .entry(interaction.requester_id.clone())
            .or_default()
            .entry(interaction.provider_id.clone())
            .or_insert(f64::MIN);
        if score > *entry {
            *entry = score;
        }
    }
    tracing::info!("Affinity matrix built for {} requesters", matrix.len());
    matrix
}

/// Affinity of a single interaction, in [-1, 1]. Fast decisions and a
/// scheduled appointment amplify the base action signal.
pub fn interaction_affinity(interaction: &InteractionRecord) -> f64 {
    let mut score: f64 = match interaction.action {
        InteractionAction::Booked => 1.0,
        InteractionAction::Contacted => 0.7,
        InteractionAction::Clicked => 0.4,
        InteractionAction::Viewed => 0.2,
        InteractionAction::Ignored => 0.0,
        InteractionAction::Rejected => -0.5,
    };

    if let Some(seconds) = interaction.time_to_action_secs {
        if seconds < 60.0 {
            score *= 1.2;
        } else if seconds < 180.0 {
            score *= 1.1;
        }
    }

    if interaction.appointment_scheduled == Some(true) {
        score *= 1.3;
    }

    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StatedPreferences, Tier, Urgency};

    fn record(
        requester: &str,
        provider: &str,
        action: InteractionAction,
    ) -> InteractionRecord {
        InteractionRecord {
            requester_id: requester.to_string(),
            provider_id: provider.to_string(),
            action,
            time_to_action_secs: None,
            appointment_scheduled: None,
        }
    }

    fn requester_with_bookings(id: &str, booked: &[&str]) -> Requester {
        Requester {
            requester_id: Some(id.to_string()),
            tier: Tier::Complete,
            preferences: StatedPreferences {
                region: "CA".to_string(),
                service_type: "therapy".to_string(),
                language: "English".to_string(),
                gender_preference: None,
                clinical_needs: vec![],
                preferred_time_slots: vec![],
                urgency: Urgency::Flexible,
                insurance: None,
            },
            profile: None,
            history: Some(crate::models::InteractionHistory {
                booked: booked.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            }),
            preference_vector: None,
        }
    }

    #[test]
    fn test_interaction_affinity_base_values() {
        assert_eq!(
            interaction_affinity(&record("r", "p", InteractionAction::Booked)),
            1.0
        );
        assert_eq!(
            interaction_affinity(&record("r", "p", InteractionAction::Viewed)),
            0.2
        );
        assert_eq!(
            interaction_affinity(&record("r", "p", InteractionAction::Rejected)),
            -0.5
        );
    }

    #[test]
    fn test_fast_decision_amplifies() {
        let mut fast = record("r", "p", InteractionAction::Contacted);
        fast.time_to_action_secs = Some(30.0);
        assert!((interaction_affinity(&fast) - 0.84).abs() < 1e-9);

        let mut medium = record("r", "p", InteractionAction::Contacted);
        medium.time_to_action_secs = Some(120.0);
        assert!((interaction_affinity(&medium) - 0.77).abs() < 1e-9);
    }

    #[test]
    fn test_affinity_clamped_to_one() {
        let mut best = record("r", "p", InteractionAction::Booked);
        best.time_to_action_secs = Some(10.0);
        best.appointment_scheduled = Some(true);
        assert_eq!(interaction_affinity(&best), 1.0);
    }

    #[test]
    fn test_fast_rejection_amplifies_negative() {
        let mut rejection = record("r", "p", InteractionAction::Rejected);
        rejection.time_to_action_secs = Some(10.0);
        assert!((interaction_affinity(&rejection) - (-0.6)).abs() < 1e-9);
    }

    #[test]
    fn test_matrix_keeps_strongest_signal() {
        let interactions = vec![
            record("r1", "p1", InteractionAction::Viewed),
            record("r1", "p1", InteractionAction::Booked),
            record("r1", "p1", InteractionAction::Clicked),
        ];
        let matrix = build_matrix(&interactions);
        assert_eq!(matrix["r1"]["p1"], 1.0);
    }

    #[test]
    fn test_neutral_predictions_without_history() {
        let engine = CollaborativeEngine::new(CollaborativeSettings::default());
        let requester = requester_with_bookings("r1", &[]);
        let candidates = vec!["p1".to_string(), "p2".to_string()];
        let predictions = engine.predictions(&requester, &candidates, &[]);
        assert_eq!(predictions["p1"], 0.5);
        assert_eq!(predictions["p2"], 0.5);
    }

    #[test]
    fn test_neighbor_predictions() {
        let engine = CollaborativeEngine::new(CollaborativeSettings::default());
        // r1 and r2 share two rated providers; r2 also booked p_new.
        let interactions = vec![
            record("r1", "p1", InteractionAction::Booked),
            record("r1", "p2", InteractionAction::Contacted),
            record("r2", "p1", InteractionAction::Booked),
            record("r2", "p2", InteractionAction::Booked),
            record("r2", "p_new", InteractionAction::Booked),
        ];
        let requester = requester_with_bookings("r1", &["p1"]);
        let candidates = vec!["p_new".to_string()];

        let predictions = engine.predictions(&requester, &candidates, &interactions);
        assert_eq!(predictions["p_new"], 1.0);
    }

    #[test]
    fn test_already_rated_candidate_stays_neutral() {
        let engine = CollaborativeEngine::new(CollaborativeSettings::default());
        let interactions = vec![
            record("r1", "p1", InteractionAction::Booked),
            record("r1", "p2", InteractionAction::Viewed),
            record("r2", "p1", InteractionAction::Rejected),
            record("r2", "p2", InteractionAction::Booked),
        ];
        let requester = requester_with_bookings("r1", &["p1"]);
        let predictions =
            engine.predictions(&requester, &["p1".to_string()], &interactions);
        assert_eq!(predictions["p1"], 0.5);
    }
}
