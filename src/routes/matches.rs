use actix_web::{web, HttpResponse};
use std::sync::Arc;
use validator::Validate;

use crate::core::MatchEngine;
use crate::error::MatchError;
use crate::models::{
    AnonymousMatchRequest, BasicMatchRequest, CompleteMatchRequest, HealthResponse,
    InteractionHistory, MatchQuery, Requester, StatedPreferences, Tier,
};
use crate::services::ProviderStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    pub store: Arc<dyn ProviderStore>,
    pub max_limit: usize,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/match", web::post().to(match_anonymous))
        .route("/match/basic", web::post().to(match_basic))
        .route("/match/complete", web::post().to(match_complete));
}

/// Health check endpoint
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

async fn match_anonymous(
    state: web::Data<AppState>,
    query: web::Query<MatchQuery>,
    body: web::Json<AnonymousMatchRequest>,
) -> Result<HttpResponse, MatchError> {
    let requester = Requester {
        requester_id: None,
        tier: Tier::Anonymous,
        preferences: sanitize_preferences(body.into_inner().preferences),
        profile: None,
        history: None,
        preference_vector: None,
    };

    let response = state
        .engine
        .rank(&requester, clamp_limit(&query, &state), query.explain)?;
    Ok(HttpResponse::Ok().json(response))
}

async fn match_basic(
    state: web::Data<AppState>,
    query: web::Query<MatchQuery>,
    body: web::Json<BasicMatchRequest>,
) -> Result<HttpResponse, MatchError> {
    let request = body.into_inner();
    request
        .validate()
        .map_err(|e| MatchError::Validation(e.to_string()))?;

    let requester = Requester {
        requester_id: Some(request.user_id),
        tier: Tier::Basic,
        preferences: sanitize_preferences(request.preferences),
        profile: Some(request.profile),
        history: None,
        preference_vector: None,
    };

    let response = state
        .engine
        .rank(&requester, clamp_limit(&query, &state), query.explain)?;
    Ok(HttpResponse::Ok().json(response))
}

async fn match_complete(
    state: web::Data<AppState>,
    query: web::Query<MatchQuery>,
    body: web::Json<CompleteMatchRequest>,
) -> Result<HttpResponse, MatchError> {
    let request = body.into_inner();
    request
        .validate()
        .map_err(|e| MatchError::Validation(e.to_string()))?;

    let (history, preference_vector) = if request.use_history {
        lookup_history(&state, &request.user_id)?
    } else {
        (None, None)
    };

    let requester = Requester {
        requester_id: Some(request.user_id),
        tier: Tier::Complete,
        preferences: sanitize_preferences(request.preferences),
        profile: Some(request.profile),
        history,
        preference_vector,
    };

    let response = state
        .engine
        .rank(&requester, clamp_limit(&query, &state), query.explain)?;
    Ok(HttpResponse::Ok().json(response))
}

/// Fetch the stored history for a requester who explicitly asked for it.
/// A missing record or a record without history is a 404, not a silent
/// downgrade to history-free matching.
fn lookup_history(
    state: &AppState,
    user_id: &str,
) -> Result<(Option<InteractionHistory>, Option<Vec<f64>>), MatchError> {
    let stored = state
        .store
        .requester(user_id)?
        .ok_or_else(|| MatchError::NotFound(format!("no stored requester {user_id}")))?;
    let Some(history) = stored.history else {
        return Err(MatchError::NotFound(format!(
            "no interaction history for requester {user_id}"
        )));
    };
    Ok((Some(history), stored.preference_vector))
}

/// Medication appointments are matched on prescriber availability, not
/// clinical needs; the need list is cleared before the core ever sees it.
fn sanitize_preferences(mut preferences: StatedPreferences) -> StatedPreferences {
    if preferences.service_type == "medication" && !preferences.clinical_needs.is_empty() {
        tracing::debug!("Clearing clinical needs for medication request");
        preferences.clinical_needs.clear();
    }
    preferences
}

fn clamp_limit(query: &MatchQuery, state: &AppState) -> usize {
    query.limit.clamp(1, state.max_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::{
        AvailabilityInfo, PerformanceMetrics, Provider, ProviderProfile, Urgency,
    };
    use crate::services::JsonStore;
    use actix_web::{test, App};

    fn preferences(service: &str, needs: &[&str]) -> StatedPreferences {
        StatedPreferences {
            region: "CA".to_string(),
            service_type: service.to_string(),
            language: "English".to_string(),
            gender_preference: None,
            clinical_needs: needs.iter().map(|n| n.to_string()).collect(),
            preferred_time_slots: vec![],
            urgency: Urgency::Flexible,
            insurance: None,
        }
    }

    #[::core::prelude::v1::test]
    fn test_medication_clears_needs() {
        let sanitized = sanitize_preferences(preferences("medication", &["anxiety", "trauma"]));
        assert!(sanitized.clinical_needs.is_empty());
    }

    #[::core::prelude::v1::test]
    fn test_therapy_keeps_needs() {
        let sanitized = sanitize_preferences(preferences("therapy", &["anxiety"]));
        assert_eq!(sanitized.clinical_needs, vec!["anxiety".to_string()]);
    }

    fn test_provider(id: &str) -> Provider {
        Provider {
            provider_id: id.to_string(),
            full_name: format!("Provider {id}"),
            licensed_regions: vec!["CA".to_string()],
            service_types: vec!["therapy".to_string()],
            profile: ProviderProfile {
                specialties: vec!["anxiety".to_string()],
                languages: vec!["English".to_string()],
                gender: "female".to_string(),
                years_experience: 8,
                age_groups_served: vec!["adults".to_string()],
            },
            availability: AvailabilityInfo {
                immediate_availability: true,
                accepting_new: true,
                current_load: 5,
                max_load: 20,
                availability_score: 0.8,
            },
            metrics: PerformanceMetrics::default(),
            embedding: None,
        }
    }

    fn test_state() -> AppState {
        let store = Arc::new(JsonStore::from_records(
            vec![test_provider("p1"), test_provider("p2")],
            vec![],
            vec![],
        ));
        let engine = Arc::new(MatchEngine::new(Settings::default(), store.clone()));
        AppState {
            engine,
            store,
            max_limit: 50,
        }
    }

    #[actix_web::test]
    async fn test_health_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_anonymous_match_endpoint() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/match?limit=5")
            .set_json(serde_json::json!({
                "preferences": {
                    "region": "CA",
                    "serviceType": "therapy",
                    "clinicalNeeds": ["anxiety"],
                    "urgency": "immediate"
                }
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["totalMatches"], 2);
        assert_eq!(body["matchingStrategy"], "content_based_anonymous");
    }

    #[actix_web::test]
    async fn test_complete_match_missing_history_is_404() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .configure(crate::routes::configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/match/complete")
            .set_json(serde_json::json!({
                "userId": "unknown_user",
                "preferences": {"region": "CA", "serviceType": "therapy"},
                "profile": {},
                "useHistory": true
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
