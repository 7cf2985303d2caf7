use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Registration tier of a requester. The tier determines which optional
/// sub-objects of [`Requester`] the engine is allowed to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Anonymous,
    Basic,
    Complete,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Anonymous => "anonymous",
            Tier::Basic => "basic",
            Tier::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Immediate,
    Flexible,
}

impl Default for Urgency {
    fn default() -> Self {
        Urgency::Flexible
    }
}

/// Level of prior experience with the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    FirstTime,
    SomeExperience,
    Experienced,
}

/// Preferences declared by the requester (present for all tiers)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatedPreferences {
    pub region: String,
    #[serde(rename = "serviceType")]
    pub service_type: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(rename = "genderPreference", default)]
    pub gender_preference: Option<String>,
    #[serde(rename = "clinicalNeeds", default)]
    pub clinical_needs: Vec<String>,
    #[serde(rename = "preferredTimeSlots", default)]
    pub preferred_time_slots: Vec<String>,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default)]
    pub insurance: Option<String>,
}

fn default_language() -> String {
    "English".to_string()
}

/// Profile data supplied by registered (basic/complete) requesters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileData {
    #[serde(rename = "ageBracket", default)]
    pub age_bracket: Option<String>,
    #[serde(rename = "experienceLevel", default)]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default)]
    pub goals: Vec<String>,
}

/// Past interactions of a complete-tier requester
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionHistory {
    #[serde(default)]
    pub viewed: Vec<String>,
    #[serde(default)]
    pub contacted: Vec<String>,
    #[serde(default)]
    pub booked: Vec<String>,
    #[serde(default)]
    pub rejected: Vec<String>,
    #[serde(rename = "avgSessionRating", default)]
    pub avg_session_rating: Option<f64>,
    #[serde(rename = "sessionsCompleted", default)]
    pub sessions_completed: u32,
}

/// A requester, constructed per ranking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    #[serde(rename = "requesterId", default)]
    pub requester_id: Option<String>,
    pub tier: Tier,
    pub preferences: StatedPreferences,
    #[serde(default)]
    pub profile: Option<ProfileData>,
    #[serde(default)]
    pub history: Option<InteractionHistory>,
    #[serde(rename = "preferenceVector", default)]
    pub preference_vector: Option<Vec<f64>>,
}

impl Requester {
    pub fn is_urgent(&self) -> bool {
        self.preferences.urgency == Urgency::Immediate
    }

    pub fn has_insurance(&self) -> bool {
        self.preferences.insurance.is_some()
    }

    /// True when the requester has usable booking history.
    pub fn has_history(&self) -> bool {
        self.tier == Tier::Complete
            && self
                .history
                .as_ref()
                .is_some_and(|h| !h.booked.is_empty())
    }

    /// Provider ids with positive interactions (booked or contacted),
    /// excluding anything later rejected.
    pub fn positive_providers(&self) -> Vec<String> {
        let Some(history) = &self.history else {
            return Vec::new();
        };
        let rejected: HashSet<&String> = history.rejected.iter().collect();
        let mut seen = HashSet::new();
        let mut positive = Vec::new();
        for id in history.booked.iter().chain(history.contacted.iter()) {
            if !rejected.contains(id) && seen.insert(id.clone()) {
                positive.push(id.clone());
            }
        }
        positive
    }

    pub fn rejected_providers(&self) -> Vec<String> {
        self.history
            .as_ref()
            .map(|h| h.rejected.clone())
            .unwrap_or_default()
    }
}

/// Historical interaction record, source data for collaborative prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(rename = "requesterId")]
    pub requester_id: String,
    #[serde(rename = "providerId")]
    pub provider_id: String,
    pub action: InteractionAction,
    #[serde(rename = "timeToActionSecs", default)]
    pub time_to_action_secs: Option<f64>,
    #[serde(rename = "appointmentScheduled", default)]
    pub appointment_scheduled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Viewed,
    Clicked,
    Contacted,
    Booked,
    Ignored,
    Rejected,
}
