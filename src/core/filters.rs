//! Filter stage: hard filters that remove candidates, and soft filters
//! that only annotate compatibility for scoring and explanation.

use std::collections::HashSet;

use crate::core::similarity::{accepts_insurance, slot_available};
use crate::models::{InteractionHistory, Provider, StatedPreferences};

/// Language compatibility between requester and provider. Language is a
/// matching signal, never a hard filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCompat {
    /// Provider speaks the requested language.
    Exact,
    /// No requested-language match, but the provider speaks English.
    EnglishFallback,
    None,
}

impl LanguageCompat {
    pub fn score(self) -> f64 {
        match self {
            LanguageCompat::Exact => 1.0,
            LanguageCompat::EnglishFallback => 0.5,
            LanguageCompat::None => 0.0,
        }
    }
}

/// Prior interaction of the requester with a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviousInteraction {
    Viewed,
    Contacted,
    Booked,
}

/// Soft-filter annotations for one candidate. Computed once per
/// (requester, provider) pair; candidates themselves stay untouched.
#[derive(Debug, Clone)]
pub struct FilterAnnotations {
    pub language: LanguageCompat,
    pub accepts_insurance: Option<bool>,
    pub matching_time_slots: Vec<String>,
    pub slot_match_ratio: f64,
    pub previous_interaction: Option<PreviousInteraction>,
}

/// Apply the mandatory filters: licensed region, offered service type,
/// and accepting-new status. Order of survivors is preserved.
pub fn apply_hard_filters(
    providers: Vec<Provider>,
    preferences: &StatedPreferences,
) -> Vec<Provider> {
    let initial_count = providers.len();

    let filtered: Vec<Provider> = providers
        .into_iter()
        .filter(|p| p.licensed_in(&preferences.region))
        .filter(|p| p.offers(&preferences.service_type))
        .filter(|p| p.availability.accepting_new)
        .collect();

    let removed = initial_count - filtered.len();
    tracing::debug!(
        "Hard filters: {} -> {} candidates (-{})",
        initial_count,
        filtered.len(),
        removed
    );

    filtered
}

/// Compute the soft-filter annotations for one candidate.
pub fn annotate_provider(
    provider: &Provider,
    preferences: &StatedPreferences,
    history: Option<&InteractionHistory>,
) -> FilterAnnotations {
    let language = if provider.speaks(&preferences.language) {
        LanguageCompat::Exact
    } else if provider.speaks("English") {
        LanguageCompat::EnglishFallback
    } else {
        LanguageCompat::None
    };

    let accepts = preferences
        .insurance
        .as_deref()
        .map(|insurance| accepts_insurance(&provider.provider_id, insurance));

    let matching_time_slots: Vec<String> = preferences
        .preferred_time_slots
        .iter()
        .filter(|slot| slot_available(&provider.provider_id, slot))
        .cloned()
        .collect();
    let slot_match_ratio = if preferences.preferred_time_slots.is_empty() {
        0.0
    } else {
        matching_time_slots.len() as f64 / preferences.preferred_time_slots.len() as f64
    };

    let previous_interaction = history.and_then(|h| {
        if h.booked.contains(&provider.provider_id) {
            Some(PreviousInteraction::Booked)
        } else if h.contacted.contains(&provider.provider_id) {
            Some(PreviousInteraction::Contacted)
        } else if h.viewed.contains(&provider.provider_id) {
            Some(PreviousInteraction::Viewed)
        } else {
            None
        }
    });

    FilterAnnotations {
        language,
        accepts_insurance: accepts,
        matching_time_slots,
        slot_match_ratio,
        previous_interaction,
    }
}

/// Remove specific provider ids (previously rejected, already booked).
pub fn apply_exclusions(providers: Vec<Provider>, excluded: &HashSet<String>) -> Vec<Provider> {
    if excluded.is_empty() {
        return providers;
    }
    let initial_count = providers.len();
    let filtered: Vec<Provider> = providers
        .into_iter()
        .filter(|p| !excluded.contains(&p.provider_id))
        .collect();
    tracing::debug!("Excluded {} providers", initial_count - filtered.len());
    filtered
}

/// Strict insurance filter. Removes non-accepting providers, but relaxes
/// back to the full pool when fewer than `min_results` survive.
pub fn apply_insurance_filter(
    providers: Vec<Provider>,
    insurance: Option<&str>,
    min_results: usize,
) -> Vec<Provider> {
    let Some(insurance) = insurance else {
        return providers;
    };

    let accepting: Vec<Provider> = providers
        .iter()
        .filter(|p| accepts_insurance(&p.provider_id, insurance))
        .cloned()
        .collect();

    if accepting.len() < min_results {
        tracing::warn!(
            "Only {} providers accept {}, relaxing insurance filter",
            accepting.len(),
            insurance
        );
        return providers;
    }

    accepting
}

/// Strict time-slot filter. Keeps providers with at least one matching
/// slot, relaxing when fewer than `min_results` survive.
pub fn apply_time_slot_filter(
    providers: Vec<Provider>,
    preferred_slots: &[String],
    min_results: usize,
) -> Vec<Provider> {
    if preferred_slots.is_empty() {
        return providers;
    }

    let matching: Vec<Provider> = providers
        .iter()
        .filter(|p| {
            preferred_slots
                .iter()
                .any(|slot| slot_available(&p.provider_id, slot))
        })
        .cloned()
        .collect();

    if matching.len() < min_results {
        tracing::warn!(
            "Only {} providers match preferred time slots, relaxing slot filter",
            matching.len()
        );
        return providers;
    }

    matching
}
