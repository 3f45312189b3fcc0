//! Update cycles end to end: wiremock providers feeding an in-memory store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bizdb_collect::{
    collect_on_demand, CollectionRequest, CycleKind, CycleRunner, CycleState, ManualClock,
    Pipeline, Scheduler, WEEKLY_JOB_ID,
};
use bizdb_core::{AddressType, Business, CollectionPlan, GeoPoint, ProviderKind};
use bizdb_db::{
    connect_in_memory, count_businesses, list_collection_runs, load_all_businesses,
    save_businesses, TriggerSource,
};
use bizdb_providers::{GoogleClient, HttpSettings, Provider, YelpClient};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        user_agent: "bizdb-test/0.1".to_owned(),
        max_retries: 0,
        retry_backoff_base_ms: 0,
    }
}

fn plan(providers: Vec<ProviderKind>, categories: &[&str]) -> CollectionPlan {
    CollectionPlan {
        location: "Troy, MI".to_owned(),
        providers,
        categories: categories.iter().map(|c| (*c).to_owned()).collect(),
        ..CollectionPlan::default()
    }
}

fn yelp_business(id: &str, name: &str, address: &[&str], rating: f64) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "location": { "display_address": address },
        "rating": rating,
        "review_count": 12,
        "coordinates": { "latitude": 42.56, "longitude": -83.15 }
    })
}

async fn mount_yelp_term(server: &MockServer, term: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/businesses/search"))
        .and(query_param("term", term))
        .respond_with(response)
        .mount(server)
        .await;
}

fn yelp(server: &MockServer) -> Provider {
    Provider::from(YelpClient::with_base_url("yelp-key", &settings(), &server.uri()).unwrap())
}

#[tokio::test]
async fn failing_category_does_not_abort_the_others() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Marketing Firms",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("m-1", "BrandWorks", &["1 Tower Dr", "Floor 12"], 4.0)]
        })),
    )
    .await;
    mount_yelp_term(&server, "Lawyers", ResponseTemplate::new(500)).await;
    mount_yelp_term(
        &server,
        "Paralegal",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("p-1", "Para Pros", &["9 Elm Street"], 3.5)]
        })),
    )
    .await;

    let pool = connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp(&server)],
        plan(vec![ProviderKind::Yelp], &["Marketing Firms", "Lawyers", "Paralegal"]),
        2,
    );

    let report = pipeline.update_data(TriggerSource::Cli).await.unwrap();
    assert_eq!(report.collected, 2);
    assert_eq!(report.saved, 2);
    assert_eq!(report.by_category.len(), 3);
    assert_eq!(report.by_category[0].records, 1);
    assert!(report.by_category[1].is_failed());
    assert_eq!(report.by_category[1].failures[0].provider, "yelp");
    assert_eq!(report.by_category[2].records, 1);

    let stored = load_all_businesses(&pool).await.unwrap();
    let categories: Vec<&str> = stored.iter().map(|b| b.business_category.as_str()).collect();
    assert_eq!(categories, vec!["Marketing Firms", "Paralegal"]);
    assert_eq!(stored[0].address_type, AddressType::Commercial);
    assert_eq!(stored[1].address_type, AddressType::Residential);

    let runs = list_collection_runs(&pool, 5).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].run_type, "incremental");
    assert_eq!(runs[0].trigger_source, "cli");
    assert_eq!(runs[0].status, "succeeded");
    assert_eq!(runs[0].records_processed, 2);
}

#[tokio::test]
async fn update_appends_to_existing_data() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Lawyers",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("l-1", "Acme Legal", &["100 Main St"], 4.5)]
        })),
    )
    .await;

    let pool = connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp(&server)],
        plan(vec![ProviderKind::Yelp], &["Lawyers"]),
        1,
    );
    pipeline.update_data(TriggerSource::Scheduler).await.unwrap();
    pipeline.update_data(TriggerSource::Scheduler).await.unwrap();
    assert_eq!(count_businesses(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn full_refresh_with_no_results_leaves_store_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/businesses/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "businesses": [] })))
        .mount(&server)
        .await;

    let pool = connect_in_memory().await.unwrap();
    let existing = Business {
        name: "Stale Listing".to_owned(),
        address: "1 Old Rd".to_owned(),
        address_type: AddressType::Residential,
        phone: String::new(),
        rating: 0.0,
        review_count: 0,
        website: String::new(),
        business_category: "Lawyers".to_owned(),
        location: GeoPoint::UNKNOWN,
        source: "yelp".to_owned(),
        external_id: String::new(),
        categories: Vec::new(),
        created_at: None,
    };
    save_businesses(&pool, &[existing]).await.unwrap();

    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp(&server)],
        plan(vec![ProviderKind::Yelp], &["Lawyers", "Paralegal"]),
        1,
    );
    let report = pipeline.full_refresh(TriggerSource::Manual).await.unwrap();
    assert_eq!(report.collected, 0);
    assert_eq!(report.saved, 0);
    assert_eq!(count_businesses(&pool).await.unwrap(), 0);

    let runs = list_collection_runs(&pool, 5).await.unwrap();
    assert_eq!(runs[0].run_type, "full_refresh");
    assert_eq!(runs[0].status, "succeeded");
}

#[tokio::test]
async fn full_refresh_replaces_previous_dataset() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Lawyers",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("l-1", "Acme Legal", &["100 Main St"], 4.5)]
        })),
    )
    .await;

    let pool = connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp(&server)],
        plan(vec![ProviderKind::Yelp], &["Lawyers"]),
        1,
    );
    pipeline.update_data(TriggerSource::Scheduler).await.unwrap();
    pipeline.update_data(TriggerSource::Scheduler).await.unwrap();
    assert_eq!(count_businesses(&pool).await.unwrap(), 2);

    pipeline.full_refresh(TriggerSource::Scheduler).await.unwrap();
    assert_eq!(count_businesses(&pool).await.unwrap(), 1);
}

#[tokio::test]
async fn two_providers_merge_with_primary_preference() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Lawyers",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business(
                "acme-troy",
                "Acme Legal",
                &["100 Main St Suite 2", "Troy, MI"],
                4.0
            )]
        })),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/maps/api/geocode/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "results": [{ "geometry": { "location": { "lat": 42.6, "lng": -83.15 } } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/places:searchText"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [
                {
                    "id": "g-acme",
                    "displayName": { "text": "ACME  Legal" },
                    "formattedAddress": "100 Main St Suite 2  Troy, MI",
                    "internationalPhoneNumber": "+1 248-555-0100",
                    "rating": 3.0,
                    "userRatingCount": 40
                },
                {
                    "id": "g-other",
                    "displayName": { "text": "Second Chair Law" },
                    "formattedAddress": "7 Birch Lane, Troy, MI"
                }
            ]
        })))
        .mount(&server)
        .await;

    let google = GoogleClient::with_base_url("google-key", &settings(), &server.uri()).unwrap();
    let pool = connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp(&server), Provider::from(google)],
        plan(vec![ProviderKind::Yelp, ProviderKind::Google], &["Lawyers"]),
        1,
    );

    let report = pipeline.update_data(TriggerSource::Cli).await.unwrap();
    assert_eq!(report.collected, 2);

    let stored = load_all_businesses(&pool).await.unwrap();
    let acme = &stored[0];
    assert_eq!(acme.name, "Acme Legal");
    assert_eq!(acme.source, "yelp");
    assert!((acme.rating - 4.0).abs() < f64::EPSILON);
    assert_eq!(acme.review_count, 12);
    assert_eq!(acme.phone, "+1 248-555-0100");
    assert_eq!(stored[1].name, "Second Chair Law");
    assert_eq!(stored[1].source, "google");
}

#[tokio::test]
async fn on_demand_collection_saves_and_reports_empty() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Notaries",
        ResponseTemplate::new(200).set_body_json(json!({ "businesses": [] })),
    )
    .await;

    let pool = connect_in_memory().await.unwrap();
    let request =
        CollectionRequest::on_demand(&["Notaries".to_owned()], "Troy, MI", 5).unwrap();
    let outcome = collect_on_demand(&pool, &[yelp(&server)], &request, 1, TriggerSource::Api)
        .await
        .unwrap();

    assert_eq!(outcome.saved, 0);
    assert_eq!(
        outcome.collection.empty_reason(&request.location).as_deref(),
        Some("No businesses found in Troy, MI for the selected categories.")
    );
    let runs = list_collection_runs(&pool, 1).await.unwrap();
    assert_eq!(runs[0].run_type, "on_demand");
    assert_eq!(runs[0].trigger_source, "api");
}

#[tokio::test]
async fn timed_out_category_is_isolated() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Lawyers",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("l-1", "Acme Legal", &["100 Main St"], 4.5)]
        })),
    )
    .await;
    mount_yelp_term(
        &server,
        "Paralegal",
        ResponseTemplate::new(200)
            .set_body_json(json!({ "businesses": [] }))
            .set_delay(Duration::from_secs(4)),
    )
    .await;
    mount_yelp_term(
        &server,
        "Notaries",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("n-1", "Seal Co", &["7 Pine Street"], 4.0)]
        })),
    )
    .await;

    let quick = HttpSettings {
        timeout_secs: 1,
        ..settings()
    };
    let yelp = Provider::from(YelpClient::with_base_url("yelp-key", &quick, &server.uri()).unwrap());
    let pool = connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp],
        plan(vec![ProviderKind::Yelp], &["Lawyers", "Paralegal", "Notaries"]),
        1,
    );

    let started = Instant::now();
    let report = pipeline.update_data(TriggerSource::Cli).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(4));

    assert_eq!(report.collected, 2);
    assert_eq!(report.saved, 2);
    assert!(!report.by_category[0].is_failed());
    assert!(report.by_category[1].is_failed());
    assert_eq!(report.by_category[1].records, 0);
    assert!(!report.by_category[2].is_failed());
    assert_eq!(count_businesses(&pool).await.unwrap(), 2);
}

#[tokio::test]
async fn pipeline_runs_as_a_scheduled_job() {
    let server = MockServer::start().await;
    mount_yelp_term(
        &server,
        "Lawyers",
        ResponseTemplate::new(200).set_body_json(json!({
            "businesses": [yelp_business("l-1", "Acme Legal", &["100 Main St"], 4.5)]
        })),
    )
    .await;

    let pool = connect_in_memory().await.unwrap();
    let pipeline = Pipeline::new(
        pool.clone(),
        vec![yelp(&server)],
        plan(vec![ProviderKind::Yelp], &["Lawyers"]),
        1,
    );

    // The boxed cycle is Send + 'static, so it can run on its own task.
    let boxed = pipeline.run(CycleKind::Incremental, TriggerSource::Scheduler);
    let report = tokio::spawn(boxed).await.unwrap().unwrap();
    assert_eq!(report.saved, 1);

    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 1, 0, 0).unwrap()));
    let scheduler =
        Scheduler::for_plan(clock, Arc::new(pipeline.clone()), pipeline.plan()).unwrap();
    let report = scheduler.trigger_now(WEEKLY_JOB_ID).await.unwrap();
    assert_eq!(report.kind, CycleKind::FullRefresh);
    assert_eq!(report.saved, 1);
    assert_eq!(scheduler.status().cycle, CycleState::Idle);
    assert_eq!(count_businesses(&pool).await.unwrap(), 1);

    let runs = list_collection_runs(&pool, 5).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_type, "full_refresh");
    assert_eq!(runs[0].trigger_source, "manual");
    assert_eq!(runs[1].run_type, "incremental");
    assert_eq!(runs[1].trigger_source, "scheduler");
}
