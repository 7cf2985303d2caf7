use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Profile attributes of a service provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProfile {
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default = "default_unknown")]
    pub gender: String,
    #[serde(rename = "yearsExperience", default)]
    pub years_experience: u32,
    #[serde(rename = "ageGroupsServed", default)]
    pub age_groups_served: Vec<String>,
}

fn default_unknown() -> String {
    "unknown".to_string()
}

/// Current availability and capacity of a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityInfo {
    #[serde(rename = "immediateAvailability", default)]
    pub immediate_availability: bool,
    #[serde(rename = "acceptingNew", default)]
    pub accepting_new: bool,
    #[serde(rename = "currentLoad", default)]
    pub current_load: u32,
    #[serde(rename = "maxLoad", default)]
    pub max_load: u32,
    #[serde(rename = "availabilityScore", default = "default_availability_score")]
    pub availability_score: f64,
}

fn default_availability_score() -> f64 {
    0.5
}

impl AvailabilityInfo {
    /// Current load as a fraction of capacity. A provider with zero
    /// capacity counts as fully loaded.
    pub fn load_ratio(&self) -> f64 {
        if self.max_load == 0 {
            return 1.0;
        }
        self.current_load as f64 / self.max_load as f64
    }
}

/// Aggregated performance metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    #[serde(rename = "avgRating", default)]
    pub avg_rating: Option<f64>,
    #[serde(rename = "retentionRate", default)]
    pub retention_rate: Option<f64>,
    #[serde(rename = "successBySpecialty", default)]
    pub success_by_specialty: HashMap<String, f64>,
}

/// A service-provider record. Immutable for the duration of a ranking run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    #[serde(rename = "providerId")]
    pub provider_id: String,
    #[serde(rename = "fullName", default = "default_name")]
    pub full_name: String,
    #[serde(rename = "licensedRegions", default)]
    pub licensed_regions: Vec<String>,
    #[serde(rename = "serviceTypes", default)]
    pub service_types: Vec<String>,
    pub profile: ProviderProfile,
    pub availability: AvailabilityInfo,
    #[serde(default)]
    pub metrics: PerformanceMetrics,
    /// Optional fixed-length specialty feature vector.
    #[serde(default)]
    pub embedding: Option<Vec<f64>>,
}

fn default_name() -> String {
    "Unknown".to_string()
}

impl Provider {
    pub fn licensed_in(&self, region: &str) -> bool {
        self.licensed_regions.iter().any(|r| r == region)
    }

    pub fn offers(&self, service_type: &str) -> bool {
        self.service_types.iter().any(|s| s == service_type)
    }

    pub fn speaks(&self, language: &str) -> bool {
        self.profile.languages.iter().any(|l| l == language)
    }
}
