// Model exports
pub mod matching;
pub mod provider;
pub mod requester;
pub mod requests;
pub mod responses;

pub use matching::{
    ConfidenceLevel, MatchExplanation, OverlappingAttributes, RankedMatch, ScoreComponents,
};
pub use provider::{AvailabilityInfo, PerformanceMetrics, Provider, ProviderProfile};
pub use requester::{
    ExperienceLevel, InteractionAction, InteractionHistory, InteractionRecord, ProfileData,
    Requester, StatedPreferences, Tier, Urgency,
};
pub use requests::{AnonymousMatchRequest, BasicMatchRequest, CompleteMatchRequest, MatchQuery};
pub use responses::{ErrorResponse, FiltersSummary, HealthResponse, MatchResponse};
