//! Scoring engine: computes a normalized [0, 1] compatibility score and a
//! per-criterion breakdown, with one strategy per requester tier. Each
//! strategy is a monotonic extension of the previous one.

use std::collections::HashMap;

use crate::config::{ScoringSettings, WeightsConfig};
use crate::core::filters::FilterAnnotations;
use crate::core::similarity::{cosine, is_new_provider, provider_similarity};
use crate::models::{
    ExperienceLevel, ProfileData, Provider, Requester, ScoreComponents,
};

/// Resolved history context for complete-tier scoring. The orchestrator
/// resolves provider ids against the store; ids it cannot resolve are
/// simply absent here.
#[derive(Debug, Default)]
pub struct HistoryContext {
    pub positive: Vec<Provider>,
    pub rejected: Vec<Provider>,
}

/// Attribute patterns observed across a requester's positively-rated
/// providers.
#[derive(Debug, Default)]
pub struct PreferencePatterns {
    genders: HashMap<String, u32>,
    languages: HashMap<String, u32>,
    experience_years: Vec<f64>,
    specialties: HashMap<String, u32>,
}

impl PreferencePatterns {
    pub fn is_empty(&self) -> bool {
        self.genders.is_empty() && self.experience_years.is_empty()
    }

    /// The single gender every positive provider shares, if any.
    pub fn dominant_gender(&self) -> Option<&String> {
        if self.genders.len() == 1 {
            self.genders.keys().next()
        } else {
            None
        }
    }

    pub fn top_specialty_count(&self) -> u32 {
        self.specialties.values().copied().max().unwrap_or(0)
    }
}

pub struct ScoringEngine {
    settings: ScoringSettings,
}

impl ScoringEngine {
    pub fn new(settings: ScoringSettings) -> Self {
        Self { settings }
    }

    /// Weight table for the requester's urgency level.
    pub fn weights_for(&self, requester: &Requester) -> WeightsConfig {
        if requester.is_urgent() {
            self.settings.weights_urgent
        } else {
            self.settings.weights_flexible
        }
    }

    /// Tier 1: content-only scoring from declared preferences.
    pub fn score_anonymous(
        &self,
        provider: &Provider,
        requester: &Requester,
        annotations: &FilterAnnotations,
        weights: &WeightsConfig,
    ) -> (f64, ScoreComponents) {
        let mut components = ScoreComponents {
            availability_match: self.score_availability(provider, requester),
            insurance_match: score_insurance(annotations),
            specialty_match: score_specialties_basic(provider, requester),
            preference_match: self.score_preferences_basic(provider, requester, annotations),
            load_balance_score: score_load_balance(provider),
            ..Default::default()
        };

        let base = weighted_score(&components, weights);
        let final_score = self.apply_basic_adjustments(base, provider, &mut components);

        (final_score, components)
    }

    /// Tier 2: tier 1 plus demographic fit and performance-informed
    /// specialty blending.
    pub fn score_basic(
        &self,
        provider: &Provider,
        requester: &Requester,
        annotations: &FilterAnnotations,
        weights: &WeightsConfig,
    ) -> (f64, ScoreComponents) {
        let mut components = ScoreComponents {
            availability_match: self.score_availability(provider, requester),
            insurance_match: score_insurance(annotations),
            specialty_match: score_specialties_enhanced(provider, requester),
            preference_match: self.score_preferences_enhanced(provider, requester, annotations),
            load_balance_score: score_load_balance(provider),
            demographic_match: Some(score_demographics(provider, requester.profile.as_ref())),
            ..Default::default()
        };

        let base = self.weighted_score_with_demographics(&components, weights);
        let final_score =
            self.apply_enhanced_adjustments(base, provider, requester, &mut components);

        (final_score, components)
    }

    /// Tier 3 content score: tier-2-equivalent plus experience-match and
    /// success-prediction components. Returns the unadjusted weighted
    /// score; the orchestrator blends in the collaborative prediction
    /// before adjustments are applied.
    pub fn content_score_complete(
        &self,
        provider: &Provider,
        requester: &Requester,
        annotations: &FilterAnnotations,
        weights: &WeightsConfig,
        history: &HistoryContext,
    ) -> (f64, ScoreComponents) {
        let specialty = score_specialties_complete(provider, requester);
        let components = ScoreComponents {
            availability_match: self.score_availability(provider, requester),
            insurance_match: score_insurance(annotations),
            specialty_match: specialty,
            preference_match: self.score_preferences_complete(
                provider,
                requester,
                annotations,
                &history.positive,
            ),
            load_balance_score: score_load_balance(provider),
            demographic_match: Some(score_demographics(provider, requester.profile.as_ref())),
            experience_match: Some(score_experience_match(provider, &history.positive)),
            success_prediction: Some(self.predict_success(
                provider,
                specialty,
                &history.positive,
            )),
            ..Default::default()
        };

        let base = self.weighted_score_with_demographics(&components, weights);

        // Fold in the history-dependent components at fixed shares.
        let mut extension = 0.0;
        let mut extension_weight = 0.0;
        if let Some(experience) = components.experience_match {
            extension += experience * 0.1;
            extension_weight += 0.1;
        }
        if let Some(success) = components.success_prediction {
            extension += success * 0.2;
            extension_weight += 0.2;
        }
        let content = if extension_weight > 0.0 {
            (base + extension) / (1.0 + extension_weight)
        } else {
            base
        };

        (content.min(1.0), components)
    }

    /// Tier 3 post-blend adjustments: the tier-2 set plus rejection-risk
    /// penalty and trending boost.
    pub fn apply_complete_adjustments(
        &self,
        score: f64,
        provider: &Provider,
        requester: &Requester,
        components: &mut ScoreComponents,
        history: &HistoryContext,
    ) -> f64 {
        let mut final_score =
            self.apply_enhanced_adjustments(score, provider, requester, components);

        let rejected_similarity = history
            .rejected
            .iter()
            .take(3)
            .map(|rejected| provider_similarity(provider, rejected))
            .fold(0.0_f64, f64::max);
        if rejected_similarity > self.settings.rejection_similarity_threshold {
            components.rejection_risk = Some(self.settings.rejection_penalty);
            final_score *= self.settings.rejection_penalty;
        }

        if has_positive_trend(provider) {
            components.trending_boost = Some(self.settings.trending_boost);
            final_score *= self.settings.trending_boost;
        }

        final_score.min(1.0)
    }

    /// Mean similarity between a candidate and the requester's recent
    /// successful providers. Used for the history boost and for success
    /// prediction.
    pub fn historical_similarity(&self, provider: &Provider, positive: &[Provider]) -> f64 {
        if positive.is_empty() {
            return 0.0;
        }
        let similarities: Vec<f64> = positive
            .iter()
            .take(5)
            .map(|p| provider_similarity(provider, p))
            .collect();
        similarities.iter().sum::<f64>() / similarities.len() as f64
    }

    /// Re-weight the base table from behavioral patterns: a requester who
    /// consistently picks one gender gets a heavier preference share, one
    /// who repeats specialties gets a heavier specialty share.
    pub fn adapt_weights(&self, weights: WeightsConfig, positive: &[Provider]) -> WeightsConfig {
        if positive.is_empty() {
            return weights;
        }
        let patterns = extract_patterns(positive);
        let mut adapted = weights;
        if patterns.dominant_gender().is_some() {
            adapted.preferences *= 1.3;
        }
        if patterns.top_specialty_count() >= 3 {
            adapted.specialties *= 1.2;
        }
        normalize_weights(adapted)
    }

    fn score_availability(&self, provider: &Provider, requester: &Requester) -> f64 {
        if requester.is_urgent() {
            // Urgent requesters: immediate availability is all that counts.
            if provider.availability.immediate_availability {
                1.0
            } else {
                0.2
            }
        } else {
            let mut base = provider.availability.availability_score;
            if provider.availability.accepting_new {
                base = (base + 0.2).min(1.0);
            }
            base
        }
    }

    fn score_preferences_basic(
        &self,
        provider: &Provider,
        requester: &Requester,
        annotations: &FilterAnnotations,
    ) -> f64 {
        let prefs = &requester.preferences;
        let mut scores = Vec::with_capacity(3);

        if let Some(gender_pref) = &prefs.gender_preference {
            scores.push(if &provider.profile.gender == gender_pref {
                1.0
            } else {
                0.0
            });
        }

        scores.push(annotations.language.score());

        if !prefs.preferred_time_slots.is_empty() {
            scores.push(annotations.slot_match_ratio);
        }

        if scores.is_empty() {
            0.5
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        }
    }

    fn score_preferences_enhanced(
        &self,
        provider: &Provider,
        requester: &Requester,
        annotations: &FilterAnnotations,
    ) -> f64 {
        let mut score = self.score_preferences_basic(provider, requester, annotations);

        if let Some(age_bracket) = requester
            .profile
            .as_ref()
            .and_then(|p| p.age_bracket.as_deref())
        {
            let group = age_group_for_bracket(age_bracket);
            let served = &provider.profile.age_groups_served;
            if served.iter().any(|g| g == group) || served.iter().any(|g| g == "adults") {
                score = (score + 0.1).min(1.0);
            }
        }

        score
    }

    fn score_preferences_complete(
        &self,
        provider: &Provider,
        requester: &Requester,
        annotations: &FilterAnnotations,
        positive: &[Provider],
    ) -> f64 {
        let enhanced = self.score_preferences_enhanced(provider, requester, annotations);

        if positive.is_empty() {
            return enhanced;
        }

        let patterns = extract_patterns(positive);
        let pattern_score = match_patterns(provider, &patterns);
        enhanced * 0.4 + pattern_score * 0.6
    }

    fn weighted_score_with_demographics(
        &self,
        components: &ScoreComponents,
        weights: &WeightsConfig,
    ) -> f64 {
        // Re-normalize so the demographic share fits alongside the base
        // weights.
        let demo_weight = self.settings.demographic_weight;
        let total = weights.availability
            + weights.insurance
            + weights.specialties
            + weights.load_balance
            + weights.preferences
            + demo_weight;

        let scaled = WeightsConfig {
            availability: weights.availability / total,
            insurance: weights.insurance / total,
            specialties: weights.specialties / total,
            load_balance: weights.load_balance / total,
            preferences: weights.preferences / total,
        };

        let mut score = weighted_score(components, &scaled);
        if let Some(demographic) = components.demographic_match {
            score += (demo_weight / total) * demographic;
        }
        score.min(1.0)
    }

    fn apply_basic_adjustments(
        &self,
        base: f64,
        provider: &Provider,
        components: &mut ScoreComponents,
    ) -> f64 {
        let mut final_score = base;

        if is_new_provider(&provider.provider_id) {
            components.new_provider_boost = self.settings.new_provider_boost;
            final_score *= self.settings.new_provider_boost;
        }

        if provider.availability.load_ratio() > self.settings.overload_threshold {
            components.overload_penalty = self.settings.overload_penalty;
            final_score *= self.settings.overload_penalty;
        }

        final_score.min(1.0)
    }

    fn apply_enhanced_adjustments(
        &self,
        base: f64,
        provider: &Provider,
        requester: &Requester,
        components: &mut ScoreComponents,
    ) -> f64 {
        let mut final_score = self.apply_basic_adjustments(base, provider, components);

        if provider
            .metrics
            .avg_rating
            .is_some_and(|rating| rating >= self.settings.rating_boost_threshold)
        {
            components.rating_boost = Some(self.settings.rating_boost);
            final_score *= self.settings.rating_boost;
        }

        // First-time requesters with a stated gender preference get a
        // stronger nudge toward an exact match.
        if let Some(gender_pref) = &requester.preferences.gender_preference {
            let first_time = requester
                .profile
                .as_ref()
                .is_some_and(|p| p.experience_level == Some(ExperienceLevel::FirstTime));
            if first_time && &provider.profile.gender == gender_pref {
                components.critical_preference_boost =
                    Some(self.settings.critical_preference_boost);
                final_score *= self.settings.critical_preference_boost;
            }
        }

        final_score.min(1.0)
    }

    fn predict_success(
        &self,
        provider: &Provider,
        specialty_score: f64,
        positive: &[Provider],
    ) -> f64 {
        if positive.is_empty() {
            return 0.5;
        }

        let mut factors: Vec<(f64, f64)> = Vec::with_capacity(4);
        if let Some(rating) = provider.metrics.avg_rating {
            if rating > 0.0 {
                factors.push((rating / 5.0, 0.2));
            }
        }
        if let Some(retention) = provider.metrics.retention_rate {
            factors.push((retention, 0.3));
        }
        factors.push((specialty_score, 0.3));
        factors.push((self.historical_similarity(provider, positive), 0.2));

        let total_weight: f64 = factors.iter().map(|(_, w)| w).sum();
        let weighted: f64 = factors.iter().map(|(f, w)| f * w / total_weight).sum();
        weighted.min(1.0)
    }
}

/// Weighted sum over the five base components.
fn weighted_score(components: &ScoreComponents, weights: &WeightsConfig) -> f64 {
    weights.availability * components.availability_match
        + weights.insurance * components.insurance_match
        + weights.specialties * components.specialty_match
        + weights.load_balance * components.load_balance_score
        + weights.preferences * components.preference_match
}

fn normalize_weights(weights: WeightsConfig) -> WeightsConfig {
    let total = weights.availability
        + weights.insurance
        + weights.specialties
        + weights.load_balance
        + weights.preferences;
    WeightsConfig {
        availability: weights.availability / total,
        insurance: weights.insurance / total,
        specialties: weights.specialties / total,
        load_balance: weights.load_balance / total,
        preferences: weights.preferences / total,
    }
}

fn score_insurance(annotations: &FilterAnnotations) -> f64 {
    match annotations.accepts_insurance {
        None => 0.5,
        Some(true) => 1.0,
        Some(false) => 0.0,
    }
}

/// Direct overlap ratio against the requester's clinical needs. An empty
/// need list is neutral, not zero.
fn score_specialties_basic(provider: &Provider, requester: &Requester) -> f64 {
    let needs = &requester.preferences.clinical_needs;
    if needs.is_empty() {
        return 0.5;
    }
    let specialties = &provider.profile.specialties;
    if specialties.is_empty() {
        return 0.0;
    }
    let matching = needs
        .iter()
        .filter(|need| specialties.contains(need))
        .count();
    matching as f64 / needs.len() as f64
}

/// Tier 2: blend the raw overlap with the provider's success rate in the
/// matched specialties, when available.
fn score_specialties_enhanced(provider: &Provider, requester: &Requester) -> f64 {
    let base = score_specialties_basic(provider, requester);
    if base == 0.0 {
        return 0.0;
    }

    let success_rates: Vec<f64> = requester
        .preferences
        .clinical_needs
        .iter()
        .filter_map(|need| provider.metrics.success_by_specialty.get(need).copied())
        .collect();

    if success_rates.is_empty() {
        return base;
    }

    let avg_success = success_rates.iter().sum::<f64>() / success_rates.len() as f64;
    base * 0.6 + avg_success * 0.4
}

/// Tier 3: blend in embedding similarity when both parties expose vectors.
fn score_specialties_complete(provider: &Provider, requester: &Requester) -> f64 {
    let enhanced = score_specialties_enhanced(provider, requester);

    if let (Some(provider_vec), Some(requester_vec)) =
        (&provider.embedding, &requester.preference_vector)
    {
        if provider_vec.len() == requester_vec.len() && !provider_vec.is_empty() {
            let similarity = cosine(provider_vec, requester_vec).max(0.0);
            return enhanced * 0.5 + similarity * 0.5;
        }
    }

    enhanced
}

/// Demographic fit: experience-level preference against provider years,
/// plus goal-to-specialty overlap. Mean of present factors; 0.5 when
/// nothing is present.
fn score_demographics(provider: &Provider, profile: Option<&ProfileData>) -> f64 {
    let Some(profile) = profile else {
        return 0.5;
    };

    let mut score = 0.0;
    let mut factors = 0u32;
    let years = provider.profile.years_experience;

    if let Some(experience_level) = profile.experience_level {
        score += match experience_level {
            ExperienceLevel::FirstTime => {
                // First-timers tend to do best with mid-career providers.
                if (3..=10).contains(&years) {
                    1.0
                } else if years > 10 {
                    0.7
                } else {
                    0.5
                }
            }
            ExperienceLevel::SomeExperience | ExperienceLevel::Experienced => {
                if years > 5 {
                    (years as f64 / 20.0).min(1.0)
                } else {
                    0.5
                }
            }
        };
        factors += 1;
    }

    if !profile.goals.is_empty() {
        let matched = profile
            .goals
            .iter()
            .filter(|goal| {
                goal_specialties(goal)
                    .iter()
                    .any(|s| provider.profile.specialties.iter().any(|ps| ps == s))
            })
            .count();
        score += matched as f64 / profile.goals.len() as f64;
        factors += 1;
    }

    if factors == 0 {
        0.5
    } else {
        score / factors as f64
    }
}

fn goal_specialties(goal: &str) -> &'static [&'static str] {
    match goal {
        "manage_symptoms" => &["anxiety", "depression", "stress"],
        "personal_growth" => &["self_esteem", "life_coaching", "mindfulness"],
        "relationship_issues" => &["relationships", "couples", "family"],
        "trauma_healing" => &["trauma", "ptsd", "abuse"],
        _ => &[],
    }
}

/// Distance between provider experience and the mean experience of the
/// requester's previously-successful providers, stepped into four bands.
fn score_experience_match(provider: &Provider, positive: &[Provider]) -> f64 {
    if positive.is_empty() {
        return 0.5;
    }
    let values: Vec<f64> = positive
        .iter()
        .take(5)
        .map(|p| p.profile.years_experience as f64)
        .collect();
    let preferred = values.iter().sum::<f64>() / values.len() as f64;
    let diff = (provider.profile.years_experience as f64 - preferred).abs();

    if diff <= 2.0 {
        1.0
    } else if diff <= 5.0 {
        0.8
    } else if diff <= 10.0 {
        0.6
    } else {
        0.4
    }
}

/// Inverse of current load, stepped into five bands.
fn score_load_balance(provider: &Provider) -> f64 {
    if provider.availability.max_load == 0 {
        return 0.0;
    }
    let ratio = provider.availability.load_ratio();
    if ratio < 0.5 {
        1.0
    } else if ratio < 0.7 {
        0.8
    } else if ratio < 0.85 {
        0.6
    } else if ratio < 0.95 {
        0.3
    } else {
        0.1
    }
}

fn has_positive_trend(provider: &Provider) -> bool {
    provider.metrics.avg_rating.is_some_and(|r| r >= 4.3)
        && provider.metrics.retention_rate.is_some_and(|r| r >= 0.8)
}

fn age_group_for_bracket(bracket: &str) -> &'static str {
    match bracket {
        "18-24" => "young_adults",
        "25-34" | "35-44" | "45-54" => "adults",
        "55-64" => "older_adults",
        "65+" => "seniors",
        _ => "adults",
    }
}

pub fn extract_patterns(positive: &[Provider]) -> PreferencePatterns {
    let mut patterns = PreferencePatterns::default();
    for provider in positive.iter().take(10) {
        *patterns
            .genders
            .entry(provider.profile.gender.clone())
            .or_insert(0) += 1;
        for language in &provider.profile.languages {
            *patterns.languages.entry(language.clone()).or_insert(0) += 1;
        }
        patterns
            .experience_years
            .push(provider.profile.years_experience as f64);
        for specialty in &provider.profile.specialties {
            *patterns.specialties.entry(specialty.clone()).or_insert(0) += 1;
        }
    }
    patterns
}

/// How well a candidate matches the observed patterns. Mean of the
/// factors with data behind them.
fn match_patterns(provider: &Provider, patterns: &PreferencePatterns) -> f64 {
    if patterns.is_empty() {
        return 0.5;
    }

    let mut scores = Vec::with_capacity(4);

    if let Some((preferred_gender, _)) = patterns.genders.iter().max_by_key(|(_, count)| **count) {
        scores.push(if &provider.profile.gender == preferred_gender {
            1.0
        } else {
            0.5
        });
    }

    let recurring_languages: Vec<&String> = patterns
        .languages
        .iter()
        .filter(|(_, count)| **count >= 2)
        .map(|(language, _)| language)
        .collect();
    if !recurring_languages.is_empty() {
        let overlap = provider
            .profile
            .languages
            .iter()
            .any(|l| recurring_languages.contains(&l));
        scores.push(if overlap { 1.0 } else { 0.3 });
    }

    if !patterns.experience_years.is_empty() {
        let avg = patterns.experience_years.iter().sum::<f64>()
            / patterns.experience_years.len() as f64;
        let diff = (provider.profile.years_experience as f64 - avg).abs();
        scores.push(if diff <= 3.0 {
            1.0
        } else if diff <= 6.0 {
            0.7
        } else {
            0.4
        });
    }

    let recurring_specialties: Vec<&String> = patterns
        .specialties
        .iter()
        .filter(|(_, count)| **count >= 2)
        .map(|(specialty, _)| specialty)
        .collect();
    if !recurring_specialties.is_empty() {
        let overlap = provider
            .profile
            .specialties
            .iter()
            .filter(|s| recurring_specialties.contains(s))
            .count();
        if overlap > 0 {
            let ratio = overlap as f64 / recurring_specialties.len() as f64;
            scores.push((ratio * 1.5).min(1.0));
        } else {
            scores.push(0.3);
        }
    }

    if scores.is_empty() {
        0.5
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}
