//! End-to-end dispatcher scenarios against stub origin and provider.

use crate::common::fixtures::SAMPLE_PAGE;
use crate::common::servers::{
    spawn_gridshift, spawn_origin, spawn_provider, ProviderBehavior,
};
use crate::common::{init_test_logging, test_config};

/// Scenario: no cookies, geolocation resolves, empty cache, clean grid.
#[tokio::test]
async fn fresh_low_carbon_reading_themes_the_page() {
    init_test_logging();
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(85.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{app}/2024/03/some-post/"))
        .header("cf-ipcountry", "FR")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html;charset=UTF-8"
    );

    let body = resp.text().await.unwrap();
    assert!(body.contains("low-grid-intensity"));
    assert!(body.contains("/wp-content/uploads/site-logo-green.svg"));
    assert!(body.contains("src=\"/wp-content/uploads/2024/03/turbine.jpg\""));
    assert!(body.contains("<option value=\"low\" selected>"));
    assert_eq!(provider.call_count(), 1);
}

/// A second request for the same country is served from the cache.
#[tokio::test]
async fn cached_reading_avoids_second_provider_call() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(60.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let client = reqwest::Client::new();
    for _ in 0..3 {
        let resp = client
            .get(format!("{app}/post/"))
            .header("cf-ipcountry", "DE")
            .send()
            .await
            .unwrap();
        let body = resp.text().await.unwrap();
        assert!(body.contains("moderate-grid-intensity"));
    }
    assert_eq!(provider.call_count(), 1);
}

/// Scenario: override cookie forces the high theme, no data consulted.
#[tokio::test]
async fn override_cookie_forces_theme_without_provider_call() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(95.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let resp = reqwest::Client::new()
        .get(format!("{app}/post/"))
        .header("cf-ipcountry", "FR")
        .header("cookie", "selected-intensity=high")
        .send()
        .await
        .unwrap();

    let body = resp.text().await.unwrap();
    assert!(body.contains("high-grid-intensity"));
    assert!(body.contains("data-full-src=\"/wp-content/uploads/2024/03/turbine.jpg\""));
    assert!(body.contains("class=\"show-image\""));
    assert_eq!(provider.call_count(), 0);
}

/// Scenario: administrative paths pass through with no provider call.
#[tokio::test]
async fn excluded_path_passes_through_unchanged() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(85.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let resp = reqwest::Client::new()
        .get(format!("{app}/wp-admin/options.php"))
        .header("cf-ipcountry", "FR")
        .send()
        .await
        .unwrap();

    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let body = resp.text().await.unwrap();
    assert_eq!(body, SAMPLE_PAGE);
    assert_eq!(provider.call_count(), 0);
}

/// Scenario: provider failure serves the origin verbatim and caches nothing.
#[tokio::test]
async fn provider_error_fails_open_and_caches_nothing() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Fail).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let client = reqwest::Client::new();
    for expected_calls in 1..=2 {
        let resp = client
            .get(format!("{app}/post/"))
            .header("cf-ipcountry", "FR")
            .send()
            .await
            .unwrap();

        let body = resp.text().await.unwrap();
        assert_eq!(body, SAMPLE_PAGE);
        // An error is never cached: every request reaches the provider.
        assert_eq!(provider.call_count(), expected_calls);
    }
}

#[tokio::test]
async fn disable_cookie_passes_through_unchanged() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(85.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let resp = reqwest::Client::new()
        .get(format!("{app}/post/"))
        .header("cf-ipcountry", "FR")
        .header("cookie", "grid-aware=off")
        .send()
        .await
        .unwrap();

    // No content-type override, no body mutation.
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "text/html; charset=utf-8"
    );
    let body = resp.text().await.unwrap();
    assert_eq!(body, SAMPLE_PAGE);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn non_html_content_passes_through() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(85.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let resp = reqwest::Client::new()
        .get(format!("{app}/data.json"))
        .header("cf-ipcountry", "FR")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.headers().get("content-type").unwrap(), "application/json");
    assert_eq!(resp.text().await.unwrap(), r#"{"ok":true}"#);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn missing_geolocation_fails_open() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(85.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let resp = reqwest::Client::new()
        .get(format!("{app}/post/"))
        .send()
        .await
        .unwrap();

    let body = resp.text().await.unwrap();
    assert_eq!(body, SAMPLE_PAGE);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn healthz_reports_ok() {
    let origin = spawn_origin(SAMPLE_PAGE).await;
    let provider = spawn_provider(ProviderBehavior::Percentage(85.0)).await;
    let app = spawn_gridshift(test_config(&origin, &provider.base_url)).await;

    let resp = reqwest::Client::new()
        .get(format!("{app}/healthz"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
