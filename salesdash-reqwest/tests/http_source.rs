//! Integration tests for HttpSalesSource using wiremock.

use std::time::Duration;

use salesdash::retry::{MaxAttempts, RetryCondition, RetryError, RetryManager, RetryPolicy};
use salesdash::{CacheSet, CoordinatorOptions, PeriodType, RequestCoordinator};
use salesdash_core::{BreakdownRequest, DateRange, FetchError, SalesSource};
use salesdash_reqwest::{HttpSalesSource, HttpSourceConfig};
use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source(server: &MockServer) -> HttpSalesSource {
    HttpSalesSource::new(
        HttpSourceConfig::new(server.uri())
            .totals_path("/totals")
            .breakdown_path("/breakdown")
            .timeout(Duration::from_millis(200)),
    )
    .unwrap()
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
}

fn envelope(total: f64) -> Value {
    json!({
        "success": true,
        "data": {
            "sales": {"total": total, "subtotal": total * 0.84},
            "cards": {}
        }
    })
}

#[tokio::test]
async fn test_totals_posts_range_and_unwraps_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/totals"))
        .and(body_json(json!({"start_date": "2025-09-02", "end_date": "2025-09-08"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(180_000.0)))
        .expect(1)
        .mount(&server)
        .await;

    let data = source(&server)
        .fetch_totals(&range("2025-09-02", "2025-09-08"))
        .await
        .unwrap();
    assert_eq!(data["sales"]["total"], json!(180_000.0));
}

#[tokio::test]
async fn test_breakdown_posts_batched_days() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/breakdown"))
        .and(body_partial_json(json!({"dates": ["2025-09-02", "2025-09-03"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "2025-09-02": {"total": 100, "details": {}},
            "2025-09-03": {"total": 200, "details": {}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = BreakdownRequest::Days(vec![
        salesdash_core::parse_date("2025-09-02").unwrap(),
        salesdash_core::parse_date("2025-09-03").unwrap(),
    ]);
    let data = source(&server).fetch_breakdown(&request).await.unwrap();
    assert_eq!(data["2025-09-03"]["total"], json!(200));
}

#[tokio::test]
async fn test_status_errors_map_to_http() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_totals(&range("2025-09-02", "2025-09-08"))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Http { status: 503 });
    assert!(<RetryManager>::default().condition().should_retry(&err));
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "Unauthorized"
        })))
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_totals(&range("2025-09-02", "2025-09-08"))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Api("Unauthorized".to_owned()));
    assert!(!<RetryManager>::default().condition().should_retry(&err));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_totals(&range("2025-09-02", "2025-09-08"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(1.0))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = source(&server)
        .fetch_totals(&range("2025-09-02", "2025-09-08"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout(_)), "got {err:?}");
}

#[tokio::test]
async fn test_refused_connection_is_connection_error() {
    let source = HttpSalesSource::new(HttpSourceConfig::new("http://127.0.0.1:1")).unwrap();
    let err = source
        .fetch_totals(&range("2025-09-02", "2025-09-08"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Connection(_)), "got {err:?}");
}

#[tokio::test]
async fn test_retry_recovers_from_transient_status() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(path("/totals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(42.0)))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    let retry = RetryManager::new(RetryPolicy::new(
        MaxAttempts::new(3).unwrap(),
        Duration::from_millis(10),
        Duration::from_millis(20),
    ));
    let week = range("2025-09-02", "2025-09-08");
    let data = retry
        .execute_with_retry("totals", || source.fetch_totals(&week))
        .await
        .unwrap();
    assert_eq!(data["sales"]["total"], json!(42.0));
}

#[tokio::test]
async fn test_retry_stops_on_forbidden() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server);
    let week = range("2025-09-02", "2025-09-08");
    let err = <RetryManager>::default()
        .execute_with_retry("totals", || source.fetch_totals(&week))
        .await
        .unwrap_err();
    assert!(matches!(err, RetryError::NonRetryable { attempt: 1, .. }));
}

#[tokio::test]
async fn test_coordinates_weekly_period_over_http() {
    let server = MockServer::start().await;
    Mock::given(path("/totals"))
        .and(body_partial_json(json!({"start_date": "2025-09-02"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(180_000.0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/totals"))
        .and(body_partial_json(json!({"start_date": "2025-08-26"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(150_000.0)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(path("/breakdown"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"2025-09-02": {"total": 20000, "details": {}}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let coordinator =
        RequestCoordinator::new(source(&server), CacheSet::default(), CoordinatorOptions::default());

    for _ in 0..2 {
        let result = coordinator
            .coordinate("2025-09-02", "2025-09-08", PeriodType::Weekly)
            .await
            .unwrap()
            .settled()
            .unwrap();
        assert_eq!(result.percentage_change, 20.0);
        assert_eq!(result.previous_amount, 150_000.0);
        let chart = result.chart_data.unwrap();
        assert_eq!(chart.points.len(), 7);
        assert_eq!(chart.total(), 20_000.0);
    }
}
