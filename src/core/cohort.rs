//! Heuristic cohort assignment and peer discovery for registered
//! requesters. Cohorts group requesters with similar situations so
//! popularity among peers can inform ranking before any individual
//! history exists.

use std::sync::Arc;

use moka::sync::Cache;

use crate::config::CohortSettings;
use crate::core::similarity::jaccard;
use crate::models::{ExperienceLevel, Requester, Tier};

/// Requester cohorts, assigned by a fixed decision tree. Earlier rules
/// win; the ids are stable and surfaced in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cohort {
    YoungFirstTimer,
    Experienced,
    UrgentInsured,
    FlexibleUninsured,
    RelationshipCare,
    Medication,
    TraumaCare,
    General,
}

impl Cohort {
    pub fn id(self) -> u8 {
        match self {
            Cohort::YoungFirstTimer => 0,
            Cohort::Experienced => 1,
            Cohort::UrgentInsured => 2,
            Cohort::FlexibleUninsured => 3,
            Cohort::RelationshipCare => 4,
            Cohort::Medication => 5,
            Cohort::TraumaCare => 6,
            Cohort::General => 7,
        }
    }

    /// Walk the decision tree: service type first, then clinical needs,
    /// then urgency/insurance, then experience and age.
    pub fn assign(requester: &Requester) -> Cohort {
        let prefs = &requester.preferences;

        if prefs.service_type == "medication" {
            return Cohort::Medication;
        }

        let needs: Vec<&str> = prefs.clinical_needs.iter().map(String::as_str).collect();
        if needs
            .iter()
            .any(|n| matches!(*n, "trauma" | "ptsd" | "abuse"))
        {
            return Cohort::TraumaCare;
        }
        if needs
            .iter()
            .any(|n| matches!(*n, "relationships" | "couples" | "family"))
        {
            return Cohort::RelationshipCare;
        }

        let urgent = requester.is_urgent();
        let insured = requester.has_insurance();
        if urgent && insured {
            return Cohort::UrgentInsured;
        }
        if !urgent && !insured {
            return Cohort::FlexibleUninsured;
        }

        if let Some(profile) = &requester.profile {
            match profile.experience_level {
                Some(ExperienceLevel::FirstTime) => {
                    if matches!(profile.age_bracket.as_deref(), Some("18-24") | Some("25-34")) {
                        return Cohort::YoungFirstTimer;
                    }
                }
                Some(ExperienceLevel::SomeExperience) | Some(ExperienceLevel::Experienced) => {
                    return Cohort::Experienced;
                }
                None => {}
            }
        }

        Cohort::General
    }
}

/// Cache key for a peer lookup. Peer sets depend on the requester and
/// the configured peer limit.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PeerCacheKey {
    requester_id: String,
    limit: usize,
}

/// Finds peers of a requester and folds their behavior into a boost.
pub struct CohortService {
    settings: CohortSettings,
    peer_cache: Cache<PeerCacheKey, Arc<Vec<Requester>>>,
}

impl CohortService {
    pub fn new(settings: CohortSettings) -> Self {
        let peer_cache = Cache::new(settings.peer_cache_capacity);
        Self {
            settings,
            peer_cache,
        }
    }

    /// The `peer_limit` most similar registered requesters in the same
    /// region. Results are cached per requester id; anonymous requesters
    /// are computed fresh every time.
    pub fn similar_requesters(
        &self,
        requester: &Requester,
        pool: &[Requester],
    ) -> Arc<Vec<Requester>> {
        let cache_key = requester.requester_id.as_ref().map(|id| PeerCacheKey {
            requester_id: id.clone(),
            limit: self.settings.peer_limit,
        });

        if let Some(key) = &cache_key {
            if let Some(cached) = self.peer_cache.get(key) {
                return cached;
            }
        }

        let mut scored: Vec<(f64, &Requester)> = pool
            .iter()
            .filter(|other| other.tier != Tier::Anonymous)
            .filter(|other| other.preferences.region == requester.preferences.region)
            .filter(|other| {
                other.requester_id.is_some() && other.requester_id != requester.requester_id
            })
            .map(|other| (peer_similarity(requester, other), other))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let peers: Arc<Vec<Requester>> = Arc::new(
            scored
                .into_iter()
                .take(self.settings.peer_limit)
                .map(|(_, other)| other.clone())
                .collect(),
        );

        tracing::debug!("Found {} peers", peers.len());

        if let Some(key) = cache_key {
            self.peer_cache.insert(key, Arc::clone(&peers));
        }

        peers
    }

    /// Popularity of a provider among the requester's peers, in [0, 1].
    /// Bookings count double against contacts; a provider no peer has
    /// even viewed gets no boost at all.
    pub fn cohort_boost(&self, provider_id: &str, peers: &[Requester]) -> f64 {
        if peers.is_empty() {
            return 0.0;
        }

        let mut viewed_count = 0u32;
        let mut positive_count = 0u32;
        for peer in peers {
            let Some(history) = &peer.history else {
                continue;
            };
            if history.viewed.iter().any(|id| id == provider_id) {
                viewed_count += 1;
            }
            if history.booked.iter().any(|id| id == provider_id) {
                positive_count += 2;
            }
            if history.contacted.iter().any(|id| id == provider_id) {
                positive_count += 1;
            }
        }

        if viewed_count == 0 {
            return 0.0;
        }

        (positive_count as f64 / peers.len() as f64).min(1.0)
    }
}

/// Weighted similarity between two requesters. Region is a hard gate;
/// every other factor contributes its score at a fixed weight, with the
/// optional demographic factors only counted when both sides carry them.
pub fn peer_similarity(a: &Requester, b: &Requester) -> f64 {
    let prefs_a = &a.preferences;
    let prefs_b = &b.preferences;

    if prefs_a.region != prefs_b.region {
        return 0.0;
    }

    let mut factors: Vec<(f64, f64)> = vec![(1.0, 1.0)];

    factors.push((
        if prefs_a.service_type == prefs_b.service_type {
            1.0
        } else {
            0.0
        },
        1.5,
    ));

    factors.push((
        if a.is_urgent() == b.is_urgent() {
            0.8
        } else {
            0.2
        },
        0.8,
    ));

    factors.push((
        if a.has_insurance() == b.has_insurance() {
            0.7
        } else {
            0.3
        },
        0.7,
    ));

    // Clinical needs: top three of each side, Jaccard. Two requesters
    // with no declared needs are mildly similar, not identical.
    let needs_a: Vec<String> = prefs_a.clinical_needs.iter().take(3).cloned().collect();
    let needs_b: Vec<String> = prefs_b.clinical_needs.iter().take(3).cloned().collect();
    let needs_score = if !needs_a.is_empty() && !needs_b.is_empty() {
        jaccard(&needs_a, &needs_b)
    } else if needs_a.is_empty() && needs_b.is_empty() {
        0.5
    } else {
        0.0
    };
    factors.push((needs_score, 1.3));

    factors.push((
        if prefs_a.gender_preference == prefs_b.gender_preference {
            0.6
        } else {
            0.4
        },
        0.6,
    ));

    factors.push((
        if prefs_a.language == prefs_b.language {
            0.7
        } else {
            0.3
        },
        0.7,
    ));

    let bracket_a = a.profile.as_ref().and_then(|p| p.age_bracket.as_deref());
    let bracket_b = b.profile.as_ref().and_then(|p| p.age_bracket.as_deref());
    if let (Some(bracket_a), Some(bracket_b)) = (bracket_a, bracket_b) {
        factors.push((age_bracket_similarity(bracket_a, bracket_b), 0.8));
    }

    let exp_a = a.profile.as_ref().and_then(|p| p.experience_level);
    let exp_b = b.profile.as_ref().and_then(|p| p.experience_level);
    if let (Some(exp_a), Some(exp_b)) = (exp_a, exp_b) {
        factors.push((if exp_a == exp_b { 0.9 } else { 0.4 }, 0.9));
    }

    let goals_a = a.profile.as_ref().map(|p| p.goals.as_slice()).unwrap_or(&[]);
    let goals_b = b.profile.as_ref().map(|p| p.goals.as_slice()).unwrap_or(&[]);
    if !goals_a.is_empty() && !goals_b.is_empty() {
        factors.push((jaccard(goals_a, goals_b), 1.0));
    }

    let total_weight: f64 = factors.iter().map(|(_, w)| w).sum();
    let weighted_sum: f64 = factors.iter().map(|(s, w)| s * w).sum();
    weighted_sum / total_weight
}

fn age_bracket_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 0.8;
    }
    const BRACKETS: [&str; 6] = ["18-24", "25-34", "35-44", "45-54", "55-64", "65+"];
    let idx_a = BRACKETS.iter().position(|bracket| *bracket == a);
    let idx_b = BRACKETS.iter().position(|bracket| *bracket == b);
    match (idx_a, idx_b) {
        (Some(i), Some(j)) if i.abs_diff(j) == 1 => 0.5,
        _ => 0.2,
    }
}
