//! Similarity primitives and deterministic eligibility signals shared by
//! the filter, scoring, and cohort stages.

use crate::models::Provider;

/// Jaccard overlap of two string sets. Empty-on-either-side yields 0.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: std::collections::HashSet<&str> = a.iter().map(String::as_str).collect();
    let set_b: std::collections::HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f64 / union as f64
}

/// Cosine similarity of two numeric vectors, guarding against zero norms
/// and mismatched lengths.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// FNV-1a 64-bit hash. Stable across runs and platforms; the matching
/// pipeline relies on bit-reproducible eligibility signals.
pub fn stable_hash(input: &str) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic stand-in for a real insurance-eligibility lookup: maps
/// (provider id, insurance name) into [0, 100) and compares against a
/// per-network acceptance probability.
pub fn accepts_insurance(provider_id: &str, insurance: &str) -> bool {
    let acceptance_prob = match insurance {
        "Aetna" | "Blue Cross" | "United Healthcare" => 85,
        "Medicaid" | "Medicare" => 60,
        _ => 70,
    };
    (stable_hash(&format!("{provider_id}{insurance}")) % 100) < acceptance_prob
}

/// Deterministic stand-in for a real calendar lookup: whether a provider
/// has openings in a named time slot.
pub fn slot_available(provider_id: &str, slot: &str) -> bool {
    let probability = match slot {
        "mornings" => 80,
        "afternoons" => 90,
        "evenings" => 70,
        "weekends" => 50,
        _ => 50,
    };
    (stable_hash(&format!("{provider_id}{slot}")) % 100) < probability
}

/// Whether a provider counts as recently onboarded. Simulated from the
/// provider id until onboarding dates reach the data store; roughly 10%
/// of ids qualify.
pub fn is_new_provider(provider_id: &str) -> bool {
    (stable_hash(&format!("{provider_id}new")) % 100) < 10
}

/// Multi-factor similarity between two providers: specialty Jaccard,
/// gender, experience distance, language Jaccard, and embedding cosine
/// when both sides carry vectors. Mean of the computable factors.
pub fn provider_similarity(a: &Provider, b: &Provider) -> f64 {
    let mut scores = Vec::with_capacity(5);

    if !a.profile.specialties.is_empty() && !b.profile.specialties.is_empty() {
        scores.push(jaccard(&a.profile.specialties, &b.profile.specialties));
    }

    scores.push(if a.profile.gender == b.profile.gender {
        0.8
    } else {
        0.2
    });

    let exp_a = a.profile.years_experience as f64;
    let exp_b = b.profile.years_experience as f64;
    let exp_max = exp_a.max(exp_b).max(1.0);
    scores.push(1.0 - (exp_a - exp_b).abs() / exp_max);

    if !a.profile.languages.is_empty() && !b.profile.languages.is_empty() {
        scores.push(jaccard(&a.profile.languages, &b.profile.languages));
    }

    if let (Some(emb_a), Some(emb_b)) = (&a.embedding, &b.embedding) {
        if emb_a.len() == emb_b.len() && !emb_a.is_empty() {
            scores.push(cosine(emb_a, emb_b).max(0.0));
        }
    }

    if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityInfo, PerformanceMetrics, ProviderProfile};

    fn provider(id: &str, specialties: &[&str], gender: &str, years: u32) -> Provider {
        Provider {
            provider_id: id.to_string(),
            full_name: format!("Provider {id}"),
            licensed_regions: vec!["CA".to_string()],
            service_types: vec!["therapy".to_string()],
            profile: ProviderProfile {
                specialties: specialties.iter().map(|s| s.to_string()).collect(),
                languages: vec!["English".to_string()],
                gender: gender.to_string(),
                years_experience: years,
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
        }
    }

    #[test]
    fn test_jaccard_overlap() {
        let a = vec!["anxiety".to_string(), "depression".to_string()];
        let b = vec!["anxiety".to_string(), "trauma".to_string()];
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_jaccard_empty() {
        let a: Vec<String> = vec![];
        let b = vec!["anxiety".to_string()];
        assert_eq!(jaccard(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![0.5, 0.5, 0.2];
        assert!((cosine(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_zero_norm() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_length_mismatch() {
        let a = vec![1.0, 2.0];
        let b = vec![1.0, 2.0, 3.0];
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn test_stable_hash_reproducible() {
        let first = stable_hash("prov_0001Aetna");
        let second = stable_hash("prov_0001Aetna");
        assert_eq!(first, second);
        assert_ne!(first, stable_hash("prov_0002Aetna"));
    }

    #[test]
    fn test_acceptance_reproducible() {
        for _ in 0..5 {
            assert_eq!(
                accepts_insurance("prov_42", "Aetna"),
                accepts_insurance("prov_42", "Aetna")
            );
        }
    }

    #[test]
    fn test_provider_similarity_identical() {
        let a = provider("p1", &["anxiety", "depression"], "female", 8);
        let b = provider("p2", &["anxiety", "depression"], "female", 8);
        let sim = provider_similarity(&a, &b);
        assert!(sim > 0.9, "identical profiles should be near 1.0, got {sim}");
    }

    #[test]
    fn test_provider_similarity_disjoint() {
        let a = provider("p1", &["anxiety"], "female", 2);
        let b = provider("p2", &["couples"], "male", 25);
        let sim = provider_similarity(&a, &b);
        assert!(sim < 0.5, "dissimilar profiles should score low, got {sim}");
    }
}
