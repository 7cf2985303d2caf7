use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::matching::RankedMatch;
use crate::models::requester::Tier;

/// Full response of a ranking run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(rename = "requestId")]
    pub request_id: uuid::Uuid,
    #[serde(rename = "userType")]
    pub user_type: Tier,
    #[serde(rename = "totalMatches")]
    pub total_matches: usize,
    pub matches: Vec<RankedMatch>,
    #[serde(rename = "processingTimeMs")]
    pub processing_time_ms: f64,
    #[serde(rename = "filtersApplied")]
    pub filters_applied: FiltersSummary,
    #[serde(rename = "weightsUsed")]
    pub weights_used: BTreeMap<String, f64>,
    #[serde(rename = "matchingStrategy")]
    pub matching_strategy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Cohort assigned to the requester (basic tier only).
    #[serde(rename = "cohortId", skip_serializing_if = "Option::is_none")]
    pub cohort_id: Option<u8>,
    /// Number of collaborative predictions used (complete tier only).
    #[serde(rename = "predictionsUsed", skip_serializing_if = "Option::is_none")]
    pub predictions_used: Option<usize>,
}

/// Summary of the filter criteria applied to the candidate pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiltersSummary {
    pub region: String,
    #[serde(rename = "serviceType")]
    pub service_type: String,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance: Option<String>,
    pub urgency: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
