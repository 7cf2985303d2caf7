use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub blending: BlendSettings,
    #[serde(default)]
    pub cohort: CohortSettings,
    #[serde(default)]
    pub collaborative: CollaborativeSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            matching: MatchingSettings::default(),
            scoring: ScoringSettings::default(),
            blending: BlendSettings::default(),
            cohort: CohortSettings::default(),
            collaborative: CollaborativeSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_result_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
    /// Strict insurance/time-slot filters auto-relax below this pool size.
    #[serde(default = "default_min_strict_results")]
    pub min_strict_results: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_result_limit(),
            max_limit: default_max_limit(),
            min_strict_results: default_min_strict_results(),
        }
    }
}

fn default_result_limit() -> usize {
    10
}
fn default_max_limit() -> usize {
    50
}
fn default_min_strict_results() -> usize {
    3
}

/// Per-criterion weight table
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WeightsConfig {
    pub availability: f64,
    pub insurance: f64,
    pub specialties: f64,
    pub load_balance: f64,
    pub preferences: f64,
}

impl WeightsConfig {
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("availability".to_string(), self.availability),
            ("insurance".to_string(), self.insurance),
            ("specialties".to_string(), self.specialties),
            ("load_balance".to_string(), self.load_balance),
            ("preferences".to_string(), self.preferences),
        ])
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_weights_urgent")]
    pub weights_urgent: WeightsConfig,
    #[serde(default = "default_weights_flexible")]
    pub weights_flexible: WeightsConfig,
    /// Fixed demographic weight share added for tiers 2-3 before
    /// re-normalization.
    #[serde(default = "default_demographic_weight")]
    pub demographic_weight: f64,
    #[serde(default = "default_new_provider_boost")]
    pub new_provider_boost: f64,
    #[serde(default = "default_overload_threshold")]
    pub overload_threshold: f64,
    #[serde(default = "default_overload_penalty")]
    pub overload_penalty: f64,
    #[serde(default = "default_rating_boost_threshold")]
    pub rating_boost_threshold: f64,
    #[serde(default = "default_rating_boost")]
    pub rating_boost: f64,
    #[serde(default = "default_critical_preference_boost")]
    pub critical_preference_boost: f64,
    #[serde(default = "default_rejection_similarity_threshold")]
    pub rejection_similarity_threshold: f64,
    #[serde(default = "default_rejection_penalty")]
    pub rejection_penalty: f64,
    #[serde(default = "default_trending_boost")]
    pub trending_boost: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            weights_urgent: default_weights_urgent(),
            weights_flexible: default_weights_flexible(),
            demographic_weight: default_demographic_weight(),
            new_provider_boost: default_new_provider_boost(),
            overload_threshold: default_overload_threshold(),
            overload_penalty: default_overload_penalty(),
            rating_boost_threshold: default_rating_boost_threshold(),
            rating_boost: default_rating_boost(),
            critical_preference_boost: default_critical_preference_boost(),
            rejection_similarity_threshold: default_rejection_similarity_threshold(),
            rejection_penalty: default_rejection_penalty(),
            trending_boost: default_trending_boost(),
        }
    }
}

fn default_weights_urgent() -> WeightsConfig {
    WeightsConfig {
        availability: 0.40,
        insurance: 0.20,
        specialties: 0.20,
        load_balance: 0.10,
        preferences: 0.10,
    }
}

fn default_weights_flexible() -> WeightsConfig {
    WeightsConfig {
        availability: 0.25,
        insurance: 0.25,
        specialties: 0.25,
        load_balance: 0.15,
        preferences: 0.10,
    }
}

fn default_demographic_weight() -> f64 {
    0.15
}
fn default_new_provider_boost() -> f64 {
    1.1
}
fn default_overload_threshold() -> f64 {
    0.85
}
fn default_overload_penalty() -> f64 {
    0.7
}
fn default_rating_boost_threshold() -> f64 {
    4.5
}
fn default_rating_boost() -> f64 {
    1.05
}
fn default_critical_preference_boost() -> f64 {
    1.1
}
fn default_rejection_similarity_threshold() -> f64 {
    0.7
}
fn default_rejection_penalty() -> f64 {
    0.7
}
fn default_trending_boost() -> f64 {
    1.05
}

/// Ratios combining the separate scoring signals. Fixed constants in the
/// product today; kept configurable with no derivation implied.
#[derive(Debug, Clone, Deserialize)]
pub struct BlendSettings {
    /// Content share of the tier-3 content/collaborative blend.
    #[serde(default = "default_content_ratio")]
    pub content_ratio: f64,
    #[serde(default = "default_cohort_boost_scale")]
    pub cohort_boost_scale: f64,
    #[serde(default = "default_history_boost_scale")]
    pub history_boost_scale: f64,
    /// Exploitation share of the tier-3 diversity blend.
    #[serde(default = "default_exploitation_ratio")]
    pub exploitation_ratio: f64,
    #[serde(default = "default_novelty_scale")]
    pub novelty_scale: f64,
}

impl Default for BlendSettings {
    fn default() -> Self {
        Self {
            content_ratio: default_content_ratio(),
            cohort_boost_scale: default_cohort_boost_scale(),
            history_boost_scale: default_history_boost_scale(),
            exploitation_ratio: default_exploitation_ratio(),
            novelty_scale: default_novelty_scale(),
        }
    }
}

fn default_content_ratio() -> f64 {
    0.6
}
fn default_cohort_boost_scale() -> f64 {
    0.2
}
fn default_history_boost_scale() -> f64 {
    0.15
}
fn default_exploitation_ratio() -> f64 {
    0.7
}
fn default_novelty_scale() -> f64 {
    0.3
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohortSettings {
    #[serde(default = "default_peer_limit")]
    pub peer_limit: usize,
    #[serde(default = "default_peer_cache_capacity")]
    pub peer_cache_capacity: u64,
}

impl Default for CohortSettings {
    fn default() -> Self {
        Self {
            peer_limit: default_peer_limit(),
            peer_cache_capacity: default_peer_cache_capacity(),
        }
    }
}

fn default_peer_limit() -> usize {
    20
}
fn default_peer_cache_capacity() -> u64 {
    4096
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaborativeSettings {
    #[serde(default = "default_neighbor_limit")]
    pub neighbor_limit: usize,
    /// Minimum number of co-rated providers to count as a neighbor.
    #[serde(default = "default_min_common_providers")]
    pub min_common_providers: usize,
    #[serde(default = "default_prediction_cache_capacity")]
    pub prediction_cache_capacity: u64,
}

impl Default for CollaborativeSettings {
    fn default() -> Self {
        Self {
            neighbor_limit: default_neighbor_limit(),
            min_common_providers: default_min_common_providers(),
            prediction_cache_capacity: default_prediction_cache_capacity(),
        }
    }
}

fn default_neighbor_limit() -> usize {
    10
}
fn default_min_common_providers() -> usize {
    2
}
fn default_prediction_cache_capacity() -> u64 {
    8192
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SOLACE_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g. SOLACE__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SOLACE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SOLACE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_urgent_weights() {
        let weights = default_weights_urgent();
        assert_eq!(weights.availability, 0.40);
        assert_eq!(weights.insurance, 0.20);
        assert_eq!(weights.specialties, 0.20);
        assert_eq!(weights.load_balance, 0.10);
        assert_eq!(weights.preferences, 0.10);
    }

    #[test]
    fn test_default_blend_ratios() {
        let blending = BlendSettings::default();
        assert_eq!(blending.content_ratio, 0.6);
        assert_eq!(blending.exploitation_ratio, 0.7);
    }

    #[test]
    fn test_weights_as_map() {
        let map = default_weights_flexible().as_map();
        assert_eq!(map["availability"], 0.25);
        assert_eq!(map.len(), 5);
    }
}
