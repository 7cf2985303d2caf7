//! Explanation synthesis: turns a score breakdown into short
//! human-readable reasons, strategy-specific insights, and a confidence
//! level.

use std::collections::BTreeMap;

use crate::core::filters::FilterAnnotations;
use crate::models::{
    ConfidenceLevel, MatchExplanation, Provider, Requester, ScoreComponents,
};

/// Which ranking strategy produced a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    ContentBased,
    CohortEnriched,
    Collaborative,
}

impl MatchStrategy {
    /// Per-match strategy label.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStrategy::ContentBased => "content_based",
            MatchStrategy::CohortEnriched => "content_cohort",
            MatchStrategy::Collaborative => "collaborative_ml",
        }
    }

    /// Response-level strategy label.
    pub fn response_label(self) -> &'static str {
        match self {
            MatchStrategy::ContentBased => "content_based_anonymous",
            MatchStrategy::CohortEnriched => "content_based_cohort",
            MatchStrategy::Collaborative => "collaborative_filtering_ml",
        }
    }
}

/// Build the explanation for one ranked match.
pub fn generate(
    provider: &Provider,
    requester: &Requester,
    components: &ScoreComponents,
    annotations: &FilterAnnotations,
    strategy: MatchStrategy,
) -> MatchExplanation {
    let mut primary_reasons = Vec::new();
    let mut matching_attributes = Vec::new();

    if provider.availability.immediate_availability {
        if requester.is_urgent() {
            primary_reasons.push("Available right away".to_string());
        } else {
            primary_reasons.push("Available for appointments".to_string());
        }
        matching_attributes.push("availability".to_string());
    }

    if components.insurance_match == 1.0 {
        if let Some(insurance) = &requester.preferences.insurance {
            primary_reasons.push(format!("Accepts {insurance}"));
            matching_attributes.push("insurance".to_string());
        }
    } else if components.insurance_match == 0.5 && !requester.has_insurance() {
        primary_reasons.push("Accepts clients without insurance".to_string());
    }

    let needs = &requester.preferences.clinical_needs;
    if !needs.is_empty() {
        let matched: Vec<&String> = needs
            .iter()
            .filter(|need| provider.profile.specialties.contains(need))
            .take(2)
            .collect();
        if !matched.is_empty() {
            let listed = matched
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            primary_reasons.push(format!("Specializes in {listed}"));
            for specialty in matched {
                matching_attributes.push(specialty.clone());
            }
        }
    } else if !provider.profile.specialties.is_empty() {
        let listed = provider
            .profile
            .specialties
            .iter()
            .take(2)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        primary_reasons.push(format!("Specializes in {listed}"));
    }

    if primary_reasons.is_empty() {
        if provider.availability.accepting_new {
            primary_reasons.push("Accepting new clients".to_string());
        }
        if provider.profile.years_experience > 5 {
            primary_reasons.push(format!(
                "{} years of experience",
                provider.profile.years_experience
            ));
        }
        if provider.profile.languages.len() > 1 {
            primary_reasons.push("Multilingual".to_string());
        }
    }

    if !annotations.matching_time_slots.is_empty() {
        matching_attributes.push("time_slots".to_string());
    }

    primary_reasons.truncate(3);
    matching_attributes.dedup();

    MatchExplanation {
        primary_reasons,
        matching_attributes,
        score_breakdown: score_breakdown(components),
        insights: insights_for(components, strategy),
        confidence_level: confidence_for(components, strategy),
    }
}

fn score_breakdown(components: &ScoreComponents) -> BTreeMap<String, u32> {
    let mut breakdown = BTreeMap::from([
        (
            "availability".to_string(),
            to_percent(components.availability_match),
        ),
        (
            "compatibility".to_string(),
            to_percent(components.specialty_match),
        ),
        (
            "preferences".to_string(),
            to_percent(components.preference_match),
        ),
    ]);
    if let Some(collaborative) = components.collaborative_score {
        breakdown.insert("predicted_affinity".to_string(), to_percent(collaborative));
    }
    breakdown
}

fn to_percent(score: f64) -> u32 {
    (score * 100.0).round().clamp(0.0, 100.0) as u32
}

fn insights_for(components: &ScoreComponents, strategy: MatchStrategy) -> Vec<String> {
    let mut insights = Vec::new();
    match strategy {
        MatchStrategy::ContentBased => {
            insights.push("Recommended for profile compatibility".to_string());
        }
        MatchStrategy::CohortEnriched => {
            if components.cohort_boost.is_some_and(|boost| boost > 1.1) {
                insights.push("Popular among people in similar situations".to_string());
            }
        }
        MatchStrategy::Collaborative => {
            if components
                .collaborative_score
                .is_some_and(|score| score > 0.7)
            {
                insights.push("High predicted fit based on your history".to_string());
            }
            if components.novelty_boost.is_some_and(|boost| boost > 1.2) {
                insights.push("A different profile to broaden your options".to_string());
            }
        }
    }
    insights
}

/// Confidence: collaborative predictions carry their own scale, everything
/// else falls back to the mean of the three visible sub-scores.
fn confidence_for(components: &ScoreComponents, strategy: MatchStrategy) -> ConfidenceLevel {
    if strategy == MatchStrategy::Collaborative {
        if let Some(collaborative) = components.collaborative_score {
            if collaborative > 0.8 {
                return ConfidenceLevel::VeryHigh;
            }
            if collaborative > 0.6 {
                return ConfidenceLevel::High;
            }
        }
    }

    let avg = (components.availability_match
        + components.specialty_match
        + components.preference_match)
        / 3.0;
    if avg > 0.8 {
        ConfidenceLevel::High
    } else if avg > 0.6 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::annotate_provider;
    use crate::models::{
        AvailabilityInfo, PerformanceMetrics, ProviderProfile, StatedPreferences, Tier, Urgency,
    };

    fn provider() -> Provider {
        Provider {
            provider_id: "p1".to_string(),
            full_name: "Provider p1".to_string(),
            licensed_regions: vec!["CA".to_string()],
            service_types: vec!["therapy".to_string()],
            profile: ProviderProfile {
                specialties: vec!["anxiety".to_string(), "depression".to_string()],
                languages: vec!["English".to_string()],
                gender: "female".to_string(),
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
        }
    }

    fn requester(urgency: Urgency, needs: &[&str], insurance: Option<&str>) -> Requester {
        Requester {
            requester_id: None,
            tier: Tier::Anonymous,
            preferences: StatedPreferences {
                region: "CA".to_string(),
                service_type: "therapy".to_string(),
                language: "English".to_string(),
                gender_preference: None,
                clinical_needs: needs.iter().map(|n| n.to_string()).collect(),
                preferred_time_slots: vec![],
                urgency,
                insurance: insurance.map(|i| i.to_string()),
            },
            profile: None,
            history: None,
            preference_vector: None,
        }
    }

    #[test]
    fn test_urgent_availability_reason() {
        let provider = provider();
        let requester = requester(Urgency::Immediate, &["anxiety"], None);
        let annotations = annotate_provider(&provider, &requester.preferences, None);
        let components = ScoreComponents {
            availability_match: 1.0,
            ..Default::default()
        };

        let explanation = generate(
            &provider,
            &requester,
            &components,
            &annotations,
            MatchStrategy::ContentBased,
        );
        assert_eq!(explanation.primary_reasons[0], "Available right away");
        assert!(explanation
            .matching_attributes
            .contains(&"availability".to_string()));
    }

    #[test]
    fn test_specialty_reason_lists_matched_needs() {
        let provider = provider();
        let requester = requester(Urgency::Flexible, &["anxiety", "couples"], None);
        let annotations = annotate_provider(&provider, &requester.preferences, None);
        let components = ScoreComponents::default();

        let explanation = generate(
            &provider,
            &requester,
            &components,
            &annotations,
            MatchStrategy::ContentBased,
        );
        assert!(explanation
            .primary_reasons
            .iter()
            .any(|r| r == "Specializes in anxiety"));
        assert!(explanation
            .matching_attributes
            .contains(&"anxiety".to_string()));
        assert!(!explanation
            .matching_attributes
            .contains(&"couples".to_string()));
    }

    #[test]
    fn test_reasons_capped_at_three() {
        let provider = provider();
        let requester = requester(Urgency::Flexible, &["anxiety"], Some("Aetna"));
        let annotations = annotate_provider(&provider, &requester.preferences, None);
        let components = ScoreComponents {
            insurance_match: 1.0,
            ..Default::default()
        };

        let explanation = generate(
            &provider,
            &requester,
            &components,
            &annotations,
            MatchStrategy::ContentBased,
        );
        assert!(explanation.primary_reasons.len() <= 3);
        assert!(explanation
            .primary_reasons
            .iter()
            .any(|r| r == "Accepts Aetna"));
    }

    #[test]
    fn test_collaborative_confidence_levels() {
        let mut components = ScoreComponents::default();
        components.collaborative_score = Some(0.9);
        assert_eq!(
            confidence_for(&components, MatchStrategy::Collaborative),
            ConfidenceLevel::VeryHigh
        );

        components.collaborative_score = Some(0.7);
        assert_eq!(
            confidence_for(&components, MatchStrategy::Collaborative),
            ConfidenceLevel::High
        );
    }

    #[test]
    fn test_content_confidence_from_sub_scores() {
        let components = ScoreComponents {
            availability_match: 0.9,
            specialty_match: 0.9,
            preference_match: 0.9,
            ..Default::default()
        };
        assert_eq!(
            confidence_for(&components, MatchStrategy::ContentBased),
            ConfidenceLevel::High
        );

        let weak = ScoreComponents {
            availability_match: 0.3,
            specialty_match: 0.3,
            preference_match: 0.3,
            ..Default::default()
        };
        assert_eq!(
            confidence_for(&weak, MatchStrategy::ContentBased),
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn test_breakdown_includes_prediction_when_present() {
        let components = ScoreComponents {
            availability_match: 0.8,
            specialty_match: 0.6,
            preference_match: 0.4,
            collaborative_score: Some(0.75),
            ..Default::default()
        };
        let breakdown = score_breakdown(&components);
        assert_eq!(breakdown["availability"], 80);
        assert_eq!(breakdown["predicted_affinity"], 75);
    }

    #[test]
    fn test_novelty_insight() {
        let components = ScoreComponents {
            novelty_boost: Some(1.25),
            collaborative_score: Some(0.5),
            ..Default::default()
        };
        let insights = insights_for(&components, MatchStrategy::Collaborative);
        assert!(insights
            .iter()
            .any(|i| i == "A different profile to broaden your options"));
    }
}
