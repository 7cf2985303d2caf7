// Criterion benchmarks for the scoring hot path

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use solace_match::config::{ScoringSettings, Settings};
use solace_match::core::filters::annotate_provider;
use solace_match::core::scoring::ScoringEngine;
use solace_match::core::MatchEngine;
use solace_match::models::{
    AvailabilityInfo, PerformanceMetrics, Provider, ProviderProfile, Requester,
    StatedPreferences, Tier, Urgency,
};
use solace_match::services::JsonStore;

fn create_provider(id: usize) -> Provider {
    let specialties = ["anxiety", "depression", "trauma", "couples", "stress"];
    Provider {
        provider_id: format!("prov_{}", id),
        full_name: format!("Provider {}", id),
        licensed_regions: vec!["CA".to_string()],
        service_types: vec!["therapy".to_string()],
        profile: ProviderProfile {
            specialties: vec![specialties[id % specialties.len()].to_string()],
            languages: vec!["English".to_string()],
            gender: if id % 2 == 0 { "female" } else { "male" }.to_string(),
            years_experience: (id % 25) as u32,
            age_groups_served: vec!["adults".to_string()],
        },
        availability: AvailabilityInfo {
            immediate_availability: id % 3 == 0,
            accepting_new: true,
            current_load: (id % 20) as u32,
            max_load: 20,
            availability_score: 0.5 + (id % 5) as f64 * 0.1,
        },
        metrics: PerformanceMetrics::default(),
        embedding: None,
    }
}

fn create_requester() -> Requester {
    Requester {
        requester_id: None,
        tier: Tier::Anonymous,
        preferences: StatedPreferences {
            region: "CA".to_string(),
            service_type: "therapy".to_string(),
            language: "English".to_string(),
            gender_preference: Some("female".to_string()),
            clinical_needs: vec!["anxiety".to_string()],
            preferred_time_slots: vec!["mornings".to_string()],
            urgency: Urgency::Immediate,
            insurance: Some("Aetna".to_string()),
        },
        profile: None,
        history: None,
        preference_vector: None,
    }
}

fn bench_anonymous_score(c: &mut Criterion) {
    let engine = ScoringEngine::new(ScoringSettings::default());
    let requester = create_requester();
    let weights = engine.weights_for(&requester);
    let provider = create_provider(7);
    let annotations = annotate_provider(&provider, &requester.preferences, None);

    c.bench_function("score_anonymous", |b| {
        b.iter(|| {
            engine.score_anonymous(
                black_box(&provider),
                black_box(&requester),
                black_box(&annotations),
                black_box(&weights),
            )
        })
    });
}

fn bench_rank_pool_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_anonymous");
    for pool_size in [100usize, 500, 1000] {
        let providers: Vec<Provider> = (0..pool_size).map(create_provider).collect();
        let store = Arc::new(JsonStore::from_records(providers, vec![], vec![]));
        let engine = MatchEngine::new(Settings::default(), store);
        let requester = create_requester();

        group.bench_with_input(
            BenchmarkId::from_parameter(pool_size),
            &pool_size,
            |b, _| b.iter(|| engine.rank(black_box(&requester), 10, false).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_anonymous_score, bench_rank_pool_sizes);
criterion_main!(benches);
