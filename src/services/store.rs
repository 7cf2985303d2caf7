//! Provider and interaction data access. The engine only sees the
//! [`ProviderStore`] trait; the default implementation loads JSON
//! fixtures into memory at startup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::StoreError;
use crate::models::{InteractionRecord, Provider, Requester};

/// Read access to providers, registered requesters, and the interaction
/// log.
pub trait ProviderStore: Send + Sync {
    fn all_providers(&self) -> Result<Vec<Provider>, StoreError>;

    fn provider(&self, provider_id: &str) -> Result<Option<Provider>, StoreError>;

    /// All registered requesters, the peer pool for cohort matching.
    fn all_requesters(&self) -> Result<Vec<Requester>, StoreError>;

    fn requester(&self, requester_id: &str) -> Result<Option<Requester>, StoreError>;

    fn all_interactions(&self) -> Result<Vec<InteractionRecord>, StoreError>;
}

/// In-memory store backed by JSON files loaded once at startup.
pub struct JsonStore {
    providers: Vec<Provider>,
    providers_by_id: HashMap<String, usize>,
    requesters: Vec<Requester>,
    requesters_by_id: HashMap<String, usize>,
    interactions: Vec<InteractionRecord>,
}

impl JsonStore {
    /// Load `providers.json`, `requesters.json`, and `interactions.json`
    /// from the data directory. Providers are required; the other two
    /// files are optional and default to empty.
    pub fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let dir = data_dir.as_ref();

        let providers: Vec<Provider> =
            serde_json::from_str(&fs::read_to_string(dir.join("providers.json"))?)?;
        if providers.is_empty() {
            return Err(StoreError::InvalidRecord(
                "providers.json contains no providers".to_string(),
            ));
        }

        let requesters = read_optional(&dir.join("requesters.json"))?;
        let interactions = read_optional(&dir.join("interactions.json"))?;

        tracing::info!(
            "Loaded {} providers, {} requesters, {} interactions from {}",
            providers.len(),
            requesters.len(),
            interactions.len(),
            dir.display()
        );

        Ok(Self::from_records(providers, requesters, interactions))
    }

    /// Build a store directly from records. Used by tests and benchmarks.
    pub fn from_records(
        providers: Vec<Provider>,
        requesters: Vec<Requester>,
        interactions: Vec<InteractionRecord>,
    ) -> Self {
        let providers_by_id = providers
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.provider_id.clone(), idx))
            .collect();
        let requesters_by_id = requesters
            .iter()
            .enumerate()
            .filter_map(|(idx, r)| r.requester_id.clone().map(|id| (id, idx)))
            .collect();
        Self {
            providers,
            providers_by_id,
            requesters,
            requesters_by_id,
            interactions,
        }
    }
}

fn read_optional<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

impl ProviderStore for JsonStore {
    fn all_providers(&self) -> Result<Vec<Provider>, StoreError> {
        Ok(self.providers.clone())
    }

    fn provider(&self, provider_id: &str) -> Result<Option<Provider>, StoreError> {
        Ok(self
            .providers_by_id
            .get(provider_id)
            .map(|idx| self.providers[*idx].clone()))
    }

    fn all_requesters(&self) -> Result<Vec<Requester>, StoreError> {
        Ok(self.requesters.clone())
    }

    fn requester(&self, requester_id: &str) -> Result<Option<Requester>, StoreError> {
        Ok(self
            .requesters_by_id
            .get(requester_id)
            .map(|idx| self.requesters[*idx].clone()))
    }

    fn all_interactions(&self) -> Result<Vec<InteractionRecord>, StoreError> {
        Ok(self.interactions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AvailabilityInfo, PerformanceMetrics, ProviderProfile, StatedPreferences, Tier, Urgency,
    };

    fn provider(id: &str) -> Provider {
        Provider {
            provider_id: id.to_string(),
            full_name: format!("Provider {id}"),
            licensed_regions: vec!["CA".to_string()],
            service_types: vec!["therapy".to_string()],
            profile: ProviderProfile {
                specialties: vec!["anxiety".to_string()],
                languages: vec!["English".to_string()],
                gender: "female".to_string(),
                years_experience: 6,
                age_groups_served: vec![],
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

    fn requester(id: &str) -> Requester {
        Requester {
            requester_id: Some(id.to_string()),
            tier: Tier::Basic,
            preferences: StatedPreferences {
                region: "CA".to_string(),
                service_type: "therapy".to_string(),
                language: "English".to_string(),
                gender_preference: None,
                clinical_needs: vec![],
                preferred_time_slots: vec![],
                urgency: Urgency::Flexible,
                insurance: None,
            },
            profile: None,
            history: None,
            preference_vector: None,
        }
    }

    #[test]
    fn test_lookup_by_id() {
        let store = JsonStore::from_records(
            vec![provider("p1"), provider("p2")],
            vec![requester("r1")],
            vec![],
        );
        assert!(store.provider("p2").unwrap().is_some());
        assert!(store.provider("p9").unwrap().is_none());
        assert!(store.requester("r1").unwrap().is_some());
    }

    #[test]
    fn test_load_missing_optional_files() {
        let dir = std::env::temp_dir().join(format!("solace-store-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let json = serde_json::to_string(&vec![provider("p1")]).unwrap();
        std::fs::write(dir.join("providers.json"), json).unwrap();

        let store = JsonStore::load(&dir).unwrap();
        assert_eq!(store.all_providers().unwrap().len(), 1);
        assert!(store.all_requesters().unwrap().is_empty());
        assert!(store.all_interactions().unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_rejects_empty_provider_file() {
        let dir = std::env::temp_dir().join(format!("solace-store-empty-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("providers.json"), "[]").unwrap();

        assert!(matches!(
            JsonStore::load(&dir),
            Err(StoreError::InvalidRecord(_))
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
}
