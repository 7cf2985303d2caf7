//! Solace Match - provider matching and ranking service for the Solace
//! care platform.
//!
//! Ranks care providers for a requester through a tiered pipeline: hard
//! filtering, per-tier content scoring, cohort and collaborative
//! enrichment, diversity re-ranking, and explanation synthesis.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use config::Settings;
pub use core::{MatchEngine, MatchStrategy};
pub use error::{MatchError, StoreError};
pub use models::{MatchResponse, Provider, RankedMatch, Requester, Tier};
pub use services::{JsonStore, ProviderStore};
