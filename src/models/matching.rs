use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named sub-scores and adjustment factors for one (requester, provider)
/// pair. Sub-scores are in [0, 1]; adjustment factors are multiplicative
/// and default to the neutral 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreComponents {
    #[serde(rename = "availabilityMatch")]
    pub availability_match: f64,
    #[serde(rename = "insuranceMatch")]
    pub insurance_match: f64,
    #[serde(rename = "specialtyMatch")]
    pub specialty_match: f64,
    #[serde(rename = "preferenceMatch")]
    pub preference_match: f64,
    #[serde(rename = "loadBalanceScore")]
    pub load_balance_score: f64,

    // Tier 2+ components
    #[serde(rename = "demographicMatch", skip_serializing_if = "Option::is_none")]
    pub demographic_match: Option<f64>,
    #[serde(rename = "experienceMatch", skip_serializing_if = "Option::is_none")]
    pub experience_match: Option<f64>,
    #[serde(rename = "successPrediction", skip_serializing_if = "Option::is_none")]
    pub success_prediction: Option<f64>,
    #[serde(rename = "collaborativeScore", skip_serializing_if = "Option::is_none")]
    pub collaborative_score: Option<f64>,
    #[serde(rename = "contentScore", skip_serializing_if = "Option::is_none")]
    pub content_score: Option<f64>,

    // Multiplicative adjustment factors
    #[serde(rename = "diversityBoost")]
    pub diversity_boost: f64,
    #[serde(rename = "newProviderBoost")]
    pub new_provider_boost: f64,
    #[serde(rename = "overloadPenalty")]
    pub overload_penalty: f64,
    #[serde(rename = "cohortBoost", skip_serializing_if = "Option::is_none")]
    pub cohort_boost: Option<f64>,
    #[serde(rename = "historyBoost", skip_serializing_if = "Option::is_none")]
    pub history_boost: Option<f64>,
    #[serde(rename = "noveltyBoost", skip_serializing_if = "Option::is_none")]
    pub novelty_boost: Option<f64>,
    #[serde(rename = "ratingBoost", skip_serializing_if = "Option::is_none")]
    pub rating_boost: Option<f64>,
    #[serde(rename = "criticalPreferenceBoost", skip_serializing_if = "Option::is_none")]
    pub critical_preference_boost: Option<f64>,
    #[serde(rename = "rejectionRisk", skip_serializing_if = "Option::is_none")]
    pub rejection_risk: Option<f64>,
    #[serde(rename = "trendingBoost", skip_serializing_if = "Option::is_none")]
    pub trending_boost: Option<f64>,
}

impl Default for ScoreComponents {
    fn default() -> Self {
        Self {
            availability_match: 0.0,
            insurance_match: 0.0,
            specialty_match: 0.0,
            preference_match: 0.0,
            load_balance_score: 0.0,
            demographic_match: None,
            experience_match: None,
            success_prediction: None,
            collaborative_score: None,
            content_score: None,
            diversity_boost: 1.0,
            new_provider_boost: 1.0,
            overload_penalty: 1.0,
            cohort_boost: None,
            history_boost: None,
            novelty_boost: None,
            rating_boost: None,
            critical_preference_boost: None,
            rejection_risk: None,
            trending_boost: None,
        }
    }
}

/// Per-attribute compatibility flags between requester and provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlappingAttributes {
    pub region: bool,
    pub language: bool,
    #[serde(rename = "genderPreference")]
    pub gender_preference: bool,
    pub insurance: bool,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(rename = "timeSlots", default)]
    pub time_slots: Vec<String>,
    #[serde(rename = "serviceType")]
    pub service_type: bool,
}

/// Confidence in a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// Human-readable rationale for a ranked match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExplanation {
    #[serde(rename = "primaryReasons")]
    pub primary_reasons: Vec<String>,
    #[serde(rename = "matchingAttributes")]
    pub matching_attributes: Vec<String>,
    /// Percentage breakdown per criterion, ordered by criterion name.
    #[serde(rename = "scoreBreakdown")]
    pub score_breakdown: BTreeMap<String, u32>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(rename = "confidenceLevel")]
    pub confidence_level: ConfidenceLevel,
}

/// One ranked result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMatch {
    #[serde(rename = "providerId")]
    pub provider_id: String,
    #[serde(rename = "providerName")]
    pub provider_name: String,
    #[serde(rename = "matchScore")]
    pub match_score: f64,
    #[serde(rename = "rankPosition")]
    pub rank_position: usize,
    #[serde(rename = "isAvailable")]
    pub is_available: bool,
    #[serde(rename = "acceptsInsurance")]
    pub accepts_insurance: bool,
    pub specialties: Vec<String>,
    pub languages: Vec<String>,
    pub gender: String,
    #[serde(rename = "yearsExperience")]
    pub years_experience: u32,
    #[serde(rename = "overlappingAttributes")]
    pub overlapping_attributes: OverlappingAttributes,
    #[serde(rename = "scoreComponents")]
    pub score_components: ScoreComponents,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<MatchExplanation>,
    #[serde(rename = "matchingStrategy")]
    pub matching_strategy: String,
    #[serde(rename = "matchedAt")]
    pub matched_at: chrono::DateTime<chrono::Utc>,
}
