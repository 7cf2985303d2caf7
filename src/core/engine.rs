//! Match engine: orchestrates filtering, scoring, cohort and
//! collaborative enrichment, diversity re-ranking, and response
//! assembly. One strategy per requester tier.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::Settings;
use crate::core::cohort::{Cohort, CohortService};
use crate::core::collaborative::CollaborativeEngine;
use crate::core::diversity::{self, ScoredCandidate};
use crate::core::explain::{self, MatchStrategy};
use crate::core::filters::{annotate_provider, apply_exclusions, apply_hard_filters};
use crate::core::scoring::{HistoryContext, ScoringEngine};
use crate::core::similarity::accepts_insurance;
use crate::error::MatchError;
use crate::models::{
    FiltersSummary, MatchResponse, OverlappingAttributes, Provider, RankedMatch, Requester,
    Tier, Urgency,
};
use crate::services::store::ProviderStore;

pub struct MatchEngine {
    settings: Settings,
    store: Arc<dyn ProviderStore>,
    scoring: ScoringEngine,
    cohorts: CohortService,
    collaborative: CollaborativeEngine,
}

impl MatchEngine {
    pub fn new(settings: Settings, store: Arc<dyn ProviderStore>) -> Self {
        let scoring = ScoringEngine::new(settings.scoring.clone());
        let cohorts = CohortService::new(settings.cohort.clone());
        let collaborative = CollaborativeEngine::new(settings.collaborative.clone());
        Self {
            settings,
            store,
            scoring,
            cohorts,
            collaborative,
        }
    }

    /// Rank providers for a requester. The single entry point used by the
    /// transport layer.
    pub fn rank(
        &self,
        requester: &Requester,
        limit: usize,
        include_explanations: bool,
    ) -> Result<MatchResponse, MatchError> {
        let started = Instant::now();
        validate_preferences(requester)?;

        tracing::info!(
            tier = requester.tier.as_str(),
            region = %requester.preferences.region,
            service = %requester.preferences.service_type,
            "Starting match run"
        );

        let mut response = match requester.tier {
            Tier::Anonymous => self.rank_anonymous(requester, limit, include_explanations)?,
            Tier::Basic => self.rank_basic(requester, limit, include_explanations)?,
            Tier::Complete => self.rank_complete(requester, limit, include_explanations)?,
        };

        response.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            matches = response.total_matches,
            elapsed_ms = response.processing_time_ms,
            strategy = %response.matching_strategy,
            "Match run complete"
        );
        Ok(response)
    }

    /// Tier 1: content-only scoring from declared preferences. No profile
    /// or history access.
    fn rank_anonymous(
        &self,
        requester: &Requester,
        limit: usize,
        include_explanations: bool,
    ) -> Result<MatchResponse, MatchError> {
        let strategy = MatchStrategy::ContentBased;
        let candidates = apply_hard_filters(self.store.all_providers()?, &requester.preferences);
        if candidates.is_empty() {
            return Ok(self.empty_response(requester, strategy));
        }

        let weights = self.scoring.weights_for(requester);
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|provider| {
                let annotations = annotate_provider(&provider, &requester.preferences, None);
                let (score, components) =
                    self.scoring
                        .score_anonymous(&provider, requester, &annotations, &weights);
                ScoredCandidate {
                    provider,
                    score,
                    components,
                }
            })
            .collect();

        sort_by_score(&mut scored);
        scored.truncate(limit);

        let matches = self.assemble_matches(scored, requester, include_explanations, strategy);
        Ok(self.response(requester, matches, weights.as_map(), strategy, None, None))
    }

    /// Tier 2: enriched content scoring plus cohort popularity.
    fn rank_basic(
        &self,
        requester: &Requester,
        limit: usize,
        include_explanations: bool,
    ) -> Result<MatchResponse, MatchError> {
        let strategy = MatchStrategy::CohortEnriched;
        let candidates = apply_hard_filters(self.store.all_providers()?, &requester.preferences);
        if candidates.is_empty() {
            return Ok(self.empty_response(requester, strategy));
        }

        let cohort = Cohort::assign(requester);
        let peer_pool = self.store.all_requesters()?;
        let peers = self.cohorts.similar_requesters(requester, &peer_pool);
        tracing::debug!(
            cohort = cohort.id(),
            peers = peers.len(),
            "Cohort context resolved"
        );

        let weights = self.scoring.weights_for(requester);
        let boost_scale = self.settings.blending.cohort_boost_scale;
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|provider| {
                let annotations = annotate_provider(&provider, &requester.preferences, None);
                let (base, mut components) =
                    self.scoring
                        .score_basic(&provider, requester, &annotations, &weights);

                let boost = self.cohorts.cohort_boost(&provider.provider_id, &peers);
                let factor = 1.0 + boost * boost_scale;
                components.cohort_boost = Some(factor);

                ScoredCandidate {
                    provider,
                    score: (base * factor).min(1.0),
                    components,
                }
            })
            .collect();

        sort_by_score(&mut scored);
        scored = diversity::rerank(scored);
        scored.truncate(limit);

        let matches = self.assemble_matches(scored, requester, include_explanations, strategy);
        Ok(self.response(
            requester,
            matches,
            weights.as_map(),
            strategy,
            Some(cohort.id()),
            None,
        ))
    }

    /// Tier 3: hybrid content + collaborative scoring with history-aware
    /// adjustments and exploration.
    fn rank_complete(
        &self,
        requester: &Requester,
        limit: usize,
        include_explanations: bool,
    ) -> Result<MatchResponse, MatchError> {
        let strategy = MatchStrategy::Collaborative;
        let mut candidates =
            apply_hard_filters(self.store.all_providers()?, &requester.preferences);

        // Rejected and already-booked providers never reappear.
        let excluded: HashSet<String> = requester
            .rejected_providers()
            .into_iter()
            .chain(
                requester
                    .history
                    .as_ref()
                    .map(|h| h.booked.clone())
                    .unwrap_or_default(),
            )
            .collect();
        candidates = apply_exclusions(candidates, &excluded);

        if candidates.is_empty() {
            return Ok(self.empty_response(requester, strategy));
        }

        let history = self.resolve_history(requester)?;
        let weights = self
            .scoring
            .adapt_weights(self.scoring.weights_for(requester), &history.positive);

        let candidate_ids: Vec<String> = candidates
            .iter()
            .map(|p| p.provider_id.clone())
            .collect();
        let interactions = self.store.all_interactions()?;
        let predictions = self
            .collaborative
            .predictions(requester, &candidate_ids, &interactions);

        let blending = &self.settings.blending;
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|provider| {
                let annotations = annotate_provider(
                    &provider,
                    &requester.preferences,
                    requester.history.as_ref(),
                );
                let (content, mut components) = self.scoring.content_score_complete(
                    &provider,
                    requester,
                    &annotations,
                    &weights,
                    &history,
                );

                let cf_score = predictions
                    .get(&provider.provider_id)
                    .copied()
                    .unwrap_or(0.5);
                components.content_score = Some(content);
                components.collaborative_score = Some(cf_score);
                let mut score =
                    content * blending.content_ratio + cf_score * (1.0 - blending.content_ratio);

                let history_similarity = self
                    .scoring
                    .historical_similarity(&provider, &history.positive);
                let history_factor = 1.0 + history_similarity * blending.history_boost_scale;
                components.history_boost = Some(history_factor);
                score *= history_factor;

                let score = self.scoring.apply_complete_adjustments(
                    score,
                    &provider,
                    requester,
                    &mut components,
                    &history,
                );

                ScoredCandidate {
                    provider,
                    score,
                    components,
                }
            })
            .collect();

        sort_by_score(&mut scored);
        scored =
            diversity::rerank_with_exploration(scored, &history.positive, limit, blending);
        scored.truncate(limit);

        let matches = self.assemble_matches(scored, requester, include_explanations, strategy);
        let predictions_used = Some(predictions.len());
        Ok(self.response(
            requester,
            matches,
            weights.as_map(),
            strategy,
            None,
            predictions_used,
        ))
    }

    /// Resolve the history's provider ids against the store. Unresolvable
    /// ids are skipped; they must not abort the run.
    fn resolve_history(&self, requester: &Requester) -> Result<HistoryContext, MatchError> {
        let mut history = HistoryContext::default();
        for provider_id in requester.positive_providers().iter().take(10) {
            match self.store.provider(provider_id)? {
                Some(provider) => history.positive.push(provider),
                None => tracing::debug!(%provider_id, "Positive provider not in store, skipping"),
            }
        }
        for provider_id in requester.rejected_providers().iter().take(3) {
            match self.store.provider(provider_id)? {
                Some(provider) => history.rejected.push(provider),
                None => tracing::debug!(%provider_id, "Rejected provider not in store, skipping"),
            }
        }
        Ok(history)
    }

    fn assemble_matches(
        &self,
        scored: Vec<ScoredCandidate>,
        requester: &Requester,
        include_explanations: bool,
        strategy: MatchStrategy,
    ) -> Vec<RankedMatch> {
        scored
            .into_iter()
            .enumerate()
            .map(|(index, candidate)| {
                let ScoredCandidate {
                    provider,
                    score,
                    components,
                } = candidate;
                let annotations = annotate_provider(
                    &provider,
                    &requester.preferences,
                    requester.history.as_ref(),
                );

                let explanation = include_explanations.then(|| {
                    explain::generate(&provider, requester, &components, &annotations, strategy)
                });

                RankedMatch {
                    provider_id: provider.provider_id.clone(),
                    provider_name: provider.full_name.clone(),
                    match_score: score.min(1.0),
                    rank_position: index + 1,
                    is_available: provider.availability.immediate_availability,
                    accepts_insurance: insurance_flag(&provider, requester),
                    specialties: provider.profile.specialties.clone(),
                    languages: provider.profile.languages.clone(),
                    gender: provider.profile.gender.clone(),
                    years_experience: provider.profile.years_experience,
                    overlapping_attributes: overlapping_attributes(
                        &provider,
                        requester,
                        &annotations,
                    ),
                    score_components: components,
                    explanation,
                    matching_strategy: strategy.as_str().to_string(),
                    matched_at: chrono::Utc::now(),
                }
            })
            .collect()
    }

    fn response(
        &self,
        requester: &Requester,
        matches: Vec<RankedMatch>,
        weights_used: BTreeMap<String, f64>,
        strategy: MatchStrategy,
        cohort_id: Option<u8>,
        predictions_used: Option<usize>,
    ) -> MatchResponse {
        MatchResponse {
            request_id: Uuid::new_v4(),
            user_type: requester.tier,
            total_matches: matches.len(),
            matches,
            processing_time_ms: 0.0,
            filters_applied: filters_summary(requester),
            weights_used,
            matching_strategy: strategy.response_label().to_string(),
            message: None,
            suggestions: Vec::new(),
            cohort_id,
            predictions_used,
        }
    }

    /// No candidates survived filtering. A successful, explicitly empty
    /// response with suggestions.
    fn empty_response(&self, requester: &Requester, strategy: MatchStrategy) -> MatchResponse {
        tracing::info!(
            region = %requester.preferences.region,
            service = %requester.preferences.service_type,
            "No providers survived filtering"
        );
        MatchResponse {
            request_id: Uuid::new_v4(),
            user_type: requester.tier,
            total_matches: 0,
            matches: Vec::new(),
            processing_time_ms: 0.0,
            filters_applied: filters_summary(requester),
            weights_used: BTreeMap::new(),
            matching_strategy: strategy.response_label().to_string(),
            message: Some("No providers matched the requested criteria".to_string()),
            suggestions: vec![
                "Consider broadening your search criteria".to_string(),
                "Try a different region or service type".to_string(),
            ],
            cohort_id: None,
            predictions_used: None,
        }
    }
}

fn validate_preferences(requester: &Requester) -> Result<(), MatchError> {
    let prefs = &requester.preferences;
    if prefs.region.trim().is_empty() {
        return Err(MatchError::Validation("region must not be empty".to_string()));
    }
    if prefs.service_type.trim().is_empty() {
        return Err(MatchError::Validation(
            "serviceType must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn sort_by_score(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn insurance_flag(provider: &Provider, requester: &Requester) -> bool {
    match &requester.preferences.insurance {
        Some(insurance) => accepts_insurance(&provider.provider_id, insurance),
        None => true,
    }
}

fn overlapping_attributes(
    provider: &Provider,
    requester: &Requester,
    annotations: &crate::core::filters::FilterAnnotations,
) -> OverlappingAttributes {
    let prefs = &requester.preferences;
    let matched_specialties: Vec<String> = prefs
        .clinical_needs
        .iter()
        .filter(|need| provider.profile.specialties.contains(need))
        .cloned()
        .collect();

    OverlappingAttributes {
        region: provider.licensed_in(&prefs.region),
        language: provider.speaks(&prefs.language),
        gender_preference: prefs
            .gender_preference
            .as_ref()
            .is_some_and(|pref| &provider.profile.gender == pref),
        insurance: annotations.accepts_insurance.unwrap_or(false),
        specialties: matched_specialties,
        time_slots: annotations.matching_time_slots.clone(),
        service_type: provider.offers(&prefs.service_type),
    }
}

fn filters_summary(requester: &Requester) -> FiltersSummary {
    let prefs = &requester.preferences;
    FiltersSummary {
        region: prefs.region.clone(),
        service_type: prefs.service_type.clone(),
        language: prefs.language.clone(),
        insurance: prefs.insurance.clone(),
        urgency: match prefs.urgency {
            Urgency::Immediate => "immediate".to_string(),
            Urgency::Flexible => "flexible".to_string(),
        },
    }
}
