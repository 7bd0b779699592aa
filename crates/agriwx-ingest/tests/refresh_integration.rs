//! Integration tests for the ingestion run using wiremock.
//!
//! Each test serves a feed from a mock server and checks what lands in a
//! store file on disk.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashSet;
use std::path::Path;

use agriwx_core::ApiConfig;
use agriwx_ingest::{CwaClient, Crawler, IngestError, ParseError};
use agriwx_store::{load_all, ForecastStore};
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED_PATH: &str = "/fileapi/v1/opendataapi/F-A0010-001";

/// Helper to build one location entry with a single day per element.
fn location(name: &str, days: &[(&str, f64, f64)]) -> Value {
    let max: Vec<Value> = days
        .iter()
        .map(|(date, max, _)| json!({ "dataDate": date, "temperature": max.to_string() }))
        .collect();
    let min: Vec<Value> = days
        .iter()
        .map(|(date, _, min)| json!({ "dataDate": date, "temperature": min.to_string() }))
        .collect();

    json!({
        "locationName": name,
        "weatherElements": {
            "MaxT": { "daily": max },
            "MinT": { "daily": min }
        }
    })
}

fn feed(locations: Vec<Value>) -> Value {
    json!({
        "cwaopendata": {
            "resources": {
                "resource": {
                    "data": {
                        "agrWeatherForecasts": {
                            "weatherForecasts": { "location": locations }
                        }
                    }
                }
            }
        }
    })
}

async fn serve(mock_server: &MockServer, body: Value) {
    mock_server.reset().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(mock_server)
        .await;
}

fn crawler(mock_server: &MockServer, db_path: &Path) -> Crawler {
    let config = ApiConfig {
        endpoint: format!("{}{}", mock_server.uri(), FEED_PATH),
        api_key: Some("test-key".to_string()),
        timeout_secs: 5,
        fallback_file: None,
    };
    let client = CwaClient::new(&config).unwrap();
    let store = ForecastStore::open(db_path).unwrap();
    Crawler::new(client, store)
}

fn may(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

#[tokio::test]
async fn test_fresh_run_stores_every_region() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        feed(vec![
            location("Taipei", &[("2024-05-01", 30.0, 22.0)]),
            location("Taichung", &[("2024-05-01", 30.0, 22.0)]),
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let report = crawler.refresh().await.unwrap();
    assert_eq!(report.rows_written, 2);
    assert_eq!(report.regions, vec!["Taipei", "Taichung"]);

    let table = load_all(&db_path).unwrap();
    assert_eq!(table.len(), 2);
    for row in table.iter() {
        assert_eq!(row.date, may(1));
        assert_eq!(row.max_temp, Some(30.0));
        assert_eq!(row.min_temp, Some(22.0));
        assert_eq!(row.fetched_at, report.fetched_at);
    }
    let regions: HashSet<&str> = table.locations().collect();
    assert_eq!(regions, HashSet::from(["Taipei", "Taichung"]));
}

#[tokio::test]
async fn test_second_run_overwrites_instead_of_duplicating() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    serve(
        &mock_server,
        feed(vec![
            location("Taipei", &[("2024-05-01", 30.0, 22.0)]),
            location("Taichung", &[("2024-05-01", 30.0, 22.0)]),
        ]),
    )
    .await;
    crawler
        .refresh_at(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();

    serve(
        &mock_server,
        feed(vec![
            location("Taipei", &[("2024-05-01", 31.0, 22.0)]),
            location("Taichung", &[("2024-05-01", 30.0, 22.0)]),
        ]),
    )
    .await;
    let second_run = Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap();
    crawler.refresh_at(second_run).await.unwrap();

    let table = load_all(&db_path).unwrap();
    let taipei: Vec<_> = table
        .iter()
        .filter(|r| r.location == "Taipei" && r.date == may(1))
        .collect();
    assert_eq!(taipei.len(), 1);
    assert_eq!(taipei[0].max_temp, Some(31.0));
    assert_eq!(taipei[0].fetched_at, second_run);
    assert_eq!(table.len(), 2);
}

#[tokio::test]
async fn test_repeated_runs_are_idempotent_except_fetched_at() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        feed(vec![
            location("北部地區", &[("2024-05-01", 30.0, 22.0), ("2024-05-02", 29.0, 21.0)]),
            location("中部地區", &[("2024-05-01", 32.0, 23.0)]),
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let first_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let second_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 5, 0).unwrap();

    crawler.refresh_at(first_at).await.unwrap();
    let first = load_all(&db_path).unwrap();
    crawler.refresh_at(second_at).await.unwrap();
    let second = load_all(&db_path).unwrap();

    let content = |table: &agriwx_store::ForecastTable| {
        table
            .iter()
            .map(|r| {
                let (location, date, max, min, description) = r.content_key();
                (
                    location.to_string(),
                    date,
                    max,
                    min,
                    description.map(str::to_string),
                )
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(content(&first), content(&second));
    assert!(first.fetched_ats().all(|t| t == first_at));
    assert!(second.fetched_ats().all(|t| t == second_at));
}

#[tokio::test]
async fn test_keys_stay_unique_across_runs() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let windows = [
        vec![("2024-05-01", 30.0, 22.0), ("2024-05-02", 30.0, 22.0)],
        vec![("2024-05-02", 28.0, 20.0), ("2024-05-03", 27.0, 19.0)],
        vec![("2024-05-03", 26.0, 18.0), ("2024-05-04", 25.0, 17.0)],
    ];
    for days in &windows {
        serve(
            &mock_server,
            feed(vec![location("Taipei", days), location("Taichung", days)]),
        )
        .await;
        crawler.refresh().await.unwrap();
    }

    let table = load_all(&db_path).unwrap();
    let keys: HashSet<(&str, NaiveDate)> =
        table.iter().map(|r| (r.location.as_str(), r.date)).collect();
    assert_eq!(keys.len(), table.len());
    assert_eq!(table.len(), 8);
}

#[tokio::test]
async fn test_repeated_location_counts_distinct_rows() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    serve(
        &mock_server,
        feed(vec![
            location("Taipei", &[("2024-05-01", 30.0, 22.0)]),
            location("Taipei", &[("2024-05-01", 31.0, 23.0)]),
        ]),
    )
    .await;

    let report = crawler.refresh().await.unwrap();

    assert_eq!(report.regions, vec!["Taipei"]);
    assert_eq!(report.rows_written, 1);
    assert_eq!(load_all(&db_path).unwrap().len(), 1);
}

#[tokio::test]
async fn test_malformed_payload_fails_and_leaves_store_unchanged() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    serve(
        &mock_server,
        feed(vec![location("Taipei", &[("2024-05-01", 30.0, 22.0)])]),
    )
    .await;
    crawler.refresh().await.unwrap();
    let before = load_all(&db_path).unwrap();

    // The first region parses; the second has no locationName.
    serve(
        &mock_server,
        feed(vec![
            location("Taipei", &[("2024-05-01", 35.0, 25.0)]),
            json!({ "weatherElements": {} }),
        ]),
    )
    .await;
    let result = crawler.refresh().await;

    assert!(matches!(
        result,
        Err(IngestError::Parse(ParseError::MissingField { .. }))
    ));
    assert_eq!(load_all(&db_path).unwrap(), before);
}

#[tokio::test]
async fn test_missing_region_container_is_parse_error() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        json!({ "cwaopendata": { "resources": { "resource": { "data": {} } } } }),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let result = crawler.refresh().await;

    assert!(matches!(
        result,
        Err(IngestError::Parse(ParseError::MissingField { .. }))
    ));
    assert!(load_all(&db_path).unwrap().is_empty());
}

#[tokio::test]
async fn test_http_failure_is_fetch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(FEED_PATH))
        .respond_with(ResponseTemplate::new(503))
        .expect(1) // no retries
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let result = crawler.refresh().await;

    assert!(matches!(result, Err(IngestError::Fetch(_))));
    assert!(load_all(&db_path).unwrap().is_empty());
}

#[tokio::test]
async fn test_inverted_range_is_flagged_but_stored() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        feed(vec![
            location("Taipei", &[("2024-05-01", 18.0, 22.0)]),
            location("Taichung", &[("2024-05-01", 30.0, 22.0)]),
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let report = crawler.refresh().await.unwrap();

    assert_eq!(report.inverted, vec![("Taipei".to_string(), may(1))]);
    assert_eq!(load_all(&db_path).unwrap().len(), 2);
}

#[tokio::test]
async fn test_successful_rows_keep_max_at_or_above_min() {
    let mock_server = MockServer::start().await;
    serve(
        &mock_server,
        feed(vec![
            location("北部地區", &[("2024-05-01", 30.0, 22.0), ("2024-05-02", 24.0, 24.0)]),
            location("南部地區", &[("2024-05-01", 33.0, 25.0)]),
        ]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path);

    let report = crawler.refresh().await.unwrap();

    assert!(report.inverted.is_empty());
    let table = load_all(&db_path).unwrap();
    assert!(table.iter().all(|r| match (r.max_temp, r.min_temp) {
        (Some(max), Some(min)) => max >= min,
        _ => true,
    }));
}

#[tokio::test]
async fn test_retention_prunes_past_dates() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sqlitedata.db");
    let mut crawler = crawler(&mock_server, &db_path).with_retention(Some(2));

    serve(
        &mock_server,
        feed(vec![location(
            "Taipei",
            &[("2024-05-01", 30.0, 22.0), ("2024-05-02", 30.0, 22.0)],
        )]),
    )
    .await;
    crawler
        .refresh_at(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        .await
        .unwrap();

    serve(
        &mock_server,
        feed(vec![location("Taipei", &[("2024-05-08", 30.0, 22.0)])]),
    )
    .await;
    let report = crawler
        .refresh_at(Utc.with_ymd_and_hms(2024, 5, 8, 0, 0, 0).unwrap())
        .await
        .unwrap();

    assert_eq!(report.pruned, 2);
    let dates: Vec<NaiveDate> = load_all(&db_path).unwrap().dates().collect();
    assert_eq!(dates, vec![may(8)]);
}
