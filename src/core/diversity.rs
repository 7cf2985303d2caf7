//! Diversity re-ranking. Keeps the top of the list untouched and nudges
//! the tail toward attribute variety, with an extra exploration pass for
//! requesters whose history would otherwise narrow their results.

use std::collections::HashSet;

use crate::config::BlendSettings;
use crate::core::similarity::provider_similarity;
use crate::models::{Provider, ScoreComponents};

/// A candidate carried through the ranking pipeline with its running
/// score and component breakdown.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub provider: Provider,
    pub score: f64,
    pub components: ScoreComponents,
}

const GENDER_BOOST: f64 = 1.05;
const SPECIALTY_BOOST: f64 = 1.03;
const LANGUAGE_BOOST: f64 = 1.02;

#[derive(Default)]
struct SeenAttributes {
    genders: HashSet<String>,
    specialties: HashSet<String>,
    languages: HashSet<String>,
}

impl SeenAttributes {
    fn record(&mut self, provider: &Provider) {
        self.genders.insert(provider.profile.gender.clone());
        for specialty in provider.profile.specialties.iter().take(2) {
            self.specialties.insert(specialty.clone());
        }
        if let Some(language) = provider.profile.languages.first() {
            self.languages.insert(language.clone());
        }
    }

    fn boost_for(&self, provider: &Provider) -> f64 {
        let mut boost = 1.0;
        if !self.genders.contains(&provider.profile.gender) {
            boost *= GENDER_BOOST;
        }
        if provider
            .profile
            .specialties
            .iter()
            .any(|s| !self.specialties.contains(s))
        {
            boost *= SPECIALTY_BOOST;
        }
        if provider
            .profile
            .languages
            .iter()
            .any(|l| !self.languages.contains(l))
        {
            boost *= LANGUAGE_BOOST;
        }
        boost
    }
}

/// Basic diversity pass: the top three stay exactly where scoring put
/// them, the rest get multiplicative boosts for unseen attributes and
/// are re-sorted among themselves.
pub fn rerank(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    if candidates.len() <= 3 {
        return candidates;
    }

    let mut seen = SeenAttributes::default();
    for candidate in candidates.iter().take(3) {
        seen.record(&candidate.provider);
    }

    for candidate in candidates.iter_mut().skip(3) {
        let boost = seen.boost_for(&candidate.provider);
        candidate.components.diversity_boost = boost;
        candidate.score *= boost;
        seen.record(&candidate.provider);
    }

    let tail = candidates.split_off(3);
    candidates.extend(sorted_by_score(tail));
    candidates
}

/// Exploration-aware pass for requesters with history: the head of the
/// list gets the basic diversity treatment, the tail competes on novelty
/// relative to previously successful providers, and the final list takes
/// a fixed share from each side.
pub fn rerank_with_exploration(
    candidates: Vec<ScoredCandidate>,
    positive: &[Provider],
    limit: usize,
    blending: &BlendSettings,
) -> Vec<ScoredCandidate> {
    if candidates.len() <= 5 {
        return candidates;
    }

    let exploitation_size =
        ((candidates.len() as f64) * blending.exploitation_ratio) as usize;
    let mut exploitation = candidates;
    let exploration = exploitation.split_off(exploitation_size);

    let exploitation_diverse = rerank(exploitation);

    if positive.is_empty() || exploration.is_empty() {
        return exploitation_diverse;
    }

    let recent_positive: Vec<&Provider> = positive.iter().take(5).collect();
    let mut exploration_boosted: Vec<ScoredCandidate> = exploration
        .into_iter()
        .map(|mut candidate| {
            let avg_similarity = recent_positive
                .iter()
                .map(|p| provider_similarity(&candidate.provider, p))
                .sum::<f64>()
                / recent_positive.len() as f64;
            let novelty = 1.0 - avg_similarity;
            let boost = 1.0 + novelty * blending.novelty_scale;
            candidate.components.novelty_boost = Some(boost);
            candidate.score *= boost;
            candidate
        })
        .collect();
    exploration_boosted = sorted_by_score(exploration_boosted);

    let exploitation_share =
        ((limit as f64) * blending.exploitation_ratio).ceil() as usize;
    let exploration_share = limit.saturating_sub(exploitation_share);

    let mut result: Vec<ScoredCandidate> = exploitation_diverse
        .into_iter()
        .take(exploitation_share)
        .collect();
    result.extend(exploration_boosted.into_iter().take(exploration_share));
    result
}

fn sorted_by_score(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityInfo, PerformanceMetrics, ProviderProfile};

    fn candidate(id: &str, gender: &str, specialty: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            provider: Provider {
                provider_id: id.to_string(),
                full_name: format!("Provider {id}"),
                licensed_regions: vec!["CA".to_string()],
                service_types: vec!["therapy".to_string()],
                profile: ProviderProfile {
                    specialties: vec![specialty.to_string()],
                    languages: vec!["English".to_string()],
                    gender: gender.to_string(),
                    years_experience: 8,
                    age_groups_served: vec![],
                },
                availability: AvailabilityInfo {
                    immediate_availability: true,
                    accepting_new: true,
                    current_load: 5,
                    max_load: 20,
                    availability_score: 0.8,
                },
                metrics: PerformanceMetrics::default(),
                embedding: None,
            },
            score,
            components: ScoreComponents::default(),
        }
    }

    #[test]
    fn test_small_list_untouched() {
        let candidates = vec![
            candidate("p1", "female", "anxiety", 0.9),
            candidate("p2", "female", "anxiety", 0.8),
        ];
        let result = rerank(candidates);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].components.diversity_boost, 1.0);
    }

    #[test]
    fn test_top_three_preserved() {
        let candidates = vec![
            candidate("p1", "female", "anxiety", 0.9),
            candidate("p2", "female", "anxiety", 0.85),
            candidate("p3", "female", "anxiety", 0.8),
            candidate("p4", "male", "trauma", 0.5),
            candidate("p5", "female", "anxiety", 0.52),
        ];
        let result = rerank(candidates);
        assert_eq!(result[0].provider.provider_id, "p1");
        assert_eq!(result[1].provider.provider_id, "p2");
        assert_eq!(result[2].provider.provider_id, "p3");
        assert_eq!(result[0].score, 0.9, "top three keep their scores");
    }

    #[test]
    fn test_unseen_attributes_can_overtake_in_tail() {
        let candidates = vec![
            candidate("p1", "female", "anxiety", 0.9),
            candidate("p2", "female", "anxiety", 0.85),
            candidate("p3", "female", "anxiety", 0.8),
            candidate("p4", "female", "anxiety", 0.60),
            // Lower raw score but a new gender and specialty.
            candidate("p5", "male", "trauma", 0.59),
        ];
        let result = rerank(candidates);
        // 0.59 * 1.05 * 1.03 > 0.60
        assert_eq!(result[3].provider.provider_id, "p5");
        assert!(result[3].components.diversity_boost > 1.0);
    }

    #[test]
    fn test_exploration_blend_sizes() {
        let blending = BlendSettings::default();
        let candidates: Vec<ScoredCandidate> = (0..20)
            .map(|i| {
                candidate(
                    &format!("p{i}"),
                    "female",
                    "anxiety",
                    1.0 - (i as f64) * 0.01,
                )
            })
            .collect();
        let positive = vec![candidate("prev", "female", "anxiety", 1.0).provider];

        let result = rerank_with_exploration(candidates, &positive, 10, &blending);
        // ceil(10 * 0.7) = 7 from exploitation, 3 from exploration.
        assert_eq!(result.len(), 10);
        assert!(result[7..]
            .iter()
            .all(|c| c.components.novelty_boost.is_some()));
        assert!(result[..7]
            .iter()
            .all(|c| c.components.novelty_boost.is_none()));
    }

    #[test]
    fn test_exploration_skipped_without_positive_history() {
        let blending = BlendSettings::default();
        let candidates: Vec<ScoredCandidate> = (0..10)
            .map(|i| candidate(&format!("p{i}"), "female", "anxiety", 0.9))
            .collect();
        let result = rerank_with_exploration(candidates, &[], 10, &blending);
        assert!(result.iter().all(|c| c.components.novelty_boost.is_none()));
    }

    #[test]
    fn test_novel_candidates_rank_higher_in_exploration() {
        let blending = BlendSettings::default();
        // 10 candidates, exploitation zone of 7. The exploration zone
        // holds two equal-scored candidates, one familiar and one novel.
        let mut candidates: Vec<ScoredCandidate> = (0..10)
            .map(|i| {
                candidate(
                    &format!("p{i}"),
                    "female",
                    "anxiety",
                    1.0 - (i as f64) * 0.01,
                )
            })
            .collect();
        candidates[8] = candidate("familiar", "female", "anxiety", 0.5);
        candidates[9] = candidate("novel", "male", "art_therapy", 0.5);
        let positive = vec![candidate("prev", "female", "anxiety", 1.0).provider];

        let result = rerank_with_exploration(candidates, &positive, 10, &blending);
        let novel_pos = result
            .iter()
            .position(|c| c.provider.provider_id == "novel")
            .expect("novel candidate survives the blend");
        let familiar_pos = result
            .iter()
            .position(|c| c.provider.provider_id == "familiar")
            .expect("familiar candidate survives the blend");
        assert!(novel_pos < familiar_pos);
    }
}
