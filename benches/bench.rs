// Criterion benchmarks for the coliving match engine

use chrono::{NaiveDate, TimeZone, Utc};
use coliving_match::core::{
    normalize_preferences, CandidateFetcher, FetchSettings, FixedClock, MatchGenerator,
    ProfileReader, Scorer,
};
use coliving_match::models::{
    Lifestyle, ListingCandidate, ListingStatus, RawListing, RawPreferences, SearcherPreferences,
};
use coliving_match::services::{InMemoryStore, LogNotifier};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::sync::Arc;

const CITIES: [&str; 4] = ["Brussels", "Ghent", "Antwerp", "Liege"];

fn create_candidate(id: usize) -> ListingCandidate {
    ListingCandidate {
        listing_id: format!("listing-{}", id),
        owner_id: format!("owner-{}", id % 50),
        city: CITIES[id % CITIES.len()].to_string(),
        monthly_rent: 400 + (id % 20) as u32 * 40,
        charges: if id % 3 == 0 { Some(80) } else { None },
        bedrooms: 1 + (id % 4) as u16,
        furnished: id % 2 == 0,
        smoking_allowed: Some(id % 5 == 0),
        pets_allowed: if id % 7 == 0 { None } else { Some(id % 2 == 1) },
        available_from: NaiveDate::from_ymd_opt(2026, 1 + (id % 12) as u32, 1),
        status: ListingStatus::Published,
        listed_at: None,
    }
}

fn create_raw_listing(id: usize) -> RawListing {
    let candidate = create_candidate(id);
    RawListing {
        id: candidate.listing_id,
        owner_id: Some(candidate.owner_id),
        city: Some(candidate.city),
        monthly_rent: Some(candidate.monthly_rent as i64),
        charges: candidate.charges.map(i64::from),
        bedrooms: Some(candidate.bedrooms as i32),
        furnished: Some(candidate.furnished),
        smoking_allowed: candidate.smoking_allowed,
        pets_allowed: candidate.pets_allowed,
        available_from: candidate.available_from,
        status: "published".to_string(),
        listed_at: Some(Utc.with_ymd_and_hms(2025, 12, 1, 0, 0, 0).unwrap()),
    }
}

fn create_preferences() -> SearcherPreferences {
    SearcherPreferences {
        searcher_id: "searcher-1".to_string(),
        budget_min: Some(500),
        budget_max: Some(900),
        preferred_cities: vec!["Brussels".to_string(), "Ghent".to_string()],
        min_bedrooms: Some(2),
        lifestyle: Lifestyle {
            is_smoker: Some(false),
            has_pets: Some(true),
            cleanliness_level: Some(7),
        },
        move_in_date: NaiveDate::from_ymd_opt(2026, 6, 1),
    }
}

fn bench_score_single(c: &mut Criterion) {
    let scorer = Scorer::with_default_weights();
    let preferences = create_preferences();
    let candidate = create_candidate(3);

    c.bench_function("score_single_candidate", |b| {
        b.iter(|| scorer.score(black_box(&preferences), black_box(&candidate)));
    });
}

fn bench_score_catalog(c: &mut Criterion) {
    let scorer = Scorer::with_default_weights();
    let preferences = create_preferences();

    let mut group = c.benchmark_group("scoring");

    for candidate_count in [10, 100, 500, 1000].iter() {
        let candidates: Vec<ListingCandidate> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("score_catalog", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    candidates
                        .iter()
                        .map(|candidate| scorer.score(black_box(&preferences), candidate).overall_score)
                        .filter(|score| *score >= 40)
                        .count()
                });
            },
        );
    }

    group.finish();
}

fn bench_normalize_preferences(c: &mut Criterion) {
    let raw = RawPreferences::new(
        "searcher-1",
        json!({
            "min_budget": "500",
            "budgetMax": 900,
            "preferred_neighborhoods": "Brussels, Ghent",
            "minBedrooms": 2,
            "smoking": "no",
            "hasPets": true,
            "cleanliness": 7,
            "moveInDate": "2026-06-01T00:00:00Z",
        }),
    );

    c.bench_function("normalize_preferences", |b| {
        b.iter(|| normalize_preferences(black_box(&raw)));
    });
}

fn bench_generate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("generate_500_listings", |b| {
        b.iter_batched(
            || {
                let store = Arc::new(InMemoryStore::new());
                store.set_preferences("searcher-1", json!({ "budget_max": 900, "city": "Brussels" }));
                for i in 0..500 {
                    store.add_listing(create_raw_listing(i));
                }
                let clock = Arc::new(FixedClock::new(
                    Utc.with_ymd_and_hms(2026, 12, 15, 0, 0, 0).unwrap(),
                ));
                MatchGenerator::new(
                    ProfileReader::new(store.clone()),
                    CandidateFetcher::new(store.clone(), clock.clone(), FetchSettings::default()),
                    Scorer::with_default_weights(),
                    store,
                    Arc::new(LogNotifier),
                    clock,
                )
            },
            |generator| runtime.block_on(generator.generate("searcher-1", None)),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_score_single,
    bench_score_catalog,
    bench_normalize_preferences,
    bench_generate
);

criterion_main!(benches);
