use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::requester::{ProfileData, StatedPreferences};

/// Query parameters shared by the match endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_explain")]
    pub explain: bool,
}

fn default_limit() -> usize {
    10
}

fn default_explain() -> bool {
    true
}

/// Request body for anonymous matching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymousMatchRequest {
    pub preferences: StatedPreferences,
}

/// Request body for basic-tier matching
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BasicMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub preferences: StatedPreferences,
    pub profile: ProfileData,
}

/// Request body for complete-tier matching
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CompleteMatchRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "user_id", rename = "userId")]
    pub user_id: String,
    pub preferences: StatedPreferences,
    pub profile: ProfileData,
    #[serde(alias = "use_history", rename = "useHistory", default = "default_use_history")]
    pub use_history: bool,
}

fn default_use_history() -> bool {
    true
}
