//! Integration tests for cornbelt-core
//!
//! The Open-Meteo client is exercised against a throwaway HTTP server on
//! localhost; no external network access is needed.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use cornbelt_core::persist;
use cornbelt_core::quality;
use cornbelt_core::{Config, Error, OpenMeteoClient, Pipeline, PipelineOptions, RetryConfig};
use cornbelt_types::{QualityStatus, Variable};
use time::macros::date;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const DAILY_BODY: &str = r#"{
    "latitude": 41.6,
    "longitude": -93.6,
    "daily_units": {"time": "iso8601"},
    "daily": {
        "time": ["2025-09-25", "2025-09-26", "2025-09-27"],
        "weather_code": [3.0, 61.0, 0.0],
        "temperature_2m_max": [24.1, 19.8, 26.3],
        "temperature_2m_min": [11.2, 12.0, 9.7],
        "daylight_duration": [43000.5, 42800.0, 42600.1],
        "shortwave_radiation_sum": [15.2, 6.1, 17.9],
        "precipitation_sum": [0.0, 12.4, 0.0],
        "et0_fao_evapotranspiration": [3.1, 1.2, 3.6],
        "soil_moisture_0_to_100cm_mean": [0.31, null, 0.33],
        "vapour_pressure_deficit_max": [1.4, 0.5, 1.8]
    }
}"#;

/// Serve canned responses: the first `failures` requests get a 503, the
/// rest get `body`. Returns the base URL and a request counter.
async fn serve(failures: usize, body: &'static str) -> (String, Arc<AtomicUsize>) {
    serve_with(failures, "503 Service Unavailable", "", body).await
}

/// Like [`serve`], with a chosen failure status and extra failure headers.
async fn serve_with(
    failures: usize,
    failure_status: &'static str,
    failure_headers: &'static str,
    body: &'static str,
) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(read) => request.extend_from_slice(&buf[..read]),
                }
            }

            let (status, headers, payload) = if n < failures {
                (failure_status, failure_headers, r#"{"error": true, "reason": "busy"}"#)
            } else {
                ("200 OK", "", body)
            };
            let response = format!(
                "HTTP/1.1 {}\r\n{}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                headers,
                payload.len(),
                payload
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{}", addr), hits)
}

fn config_for(base: &str, dir: &std::path::Path) -> Config {
    let mut config = Config {
        output_dir: dir.to_path_buf(),
        ..Config::default()
    };
    config.api.archive_url = format!("{}/v1/archive", base);
    config.api.forecast_url = format!("{}/v1/forecast", base);
    config.api.timeout_secs = 5;
    config
}

fn fast_retry(retries: u32) -> RetryConfig {
    RetryConfig::new(retries)
        .initial_delay(Duration::from_millis(10))
        .jitter(false)
}

#[tokio::test]
async fn test_fetch_archive_decodes_columns() {
    let (base, hits) = serve(0, DAILY_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let client = OpenMeteoClient::new(&config_for(&base, dir.path()))
        .unwrap()
        .with_retry_config(fast_retry(0));

    let batch = client
        .fetch_archive(
            "iowa_center",
            41.6005,
            -93.6091,
            Some(date!(2025 - 09 - 25)),
            Some(date!(2025 - 09 - 27)),
        )
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(batch.records.len(), 3);
    let second = &batch.records[1];
    assert_eq!(second.date, date!(2025 - 09 - 26));
    assert_eq!(second.location, "iowa_center");
    assert_eq!(second.values.weather_code, Some(61));
    assert_eq!(second.get(Variable::PrecipitationSum), Some(12.4));
    assert_eq!(second.get(Variable::SoilMoisture0To100cmMean), None);
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let (base, hits) = serve(2, DAILY_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let client = OpenMeteoClient::new(&config_for(&base, dir.path()))
        .unwrap()
        .with_retry_config(fast_retry(3));

    let batch = client
        .fetch_outlook("iowa_center", 41.6005, -93.6091, 1, 7)
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(batch.records.len(), 3);
}

#[tokio::test]
async fn test_throttled_request_honors_retry_after() {
    let (base, hits) = serve_with(1, "429 Too Many Requests", "Retry-After: 0\r\n", DAILY_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    // without the server hint the first retry would wait a minute
    let retry = RetryConfig::new(2)
        .initial_delay(Duration::from_secs(60))
        .jitter(false);
    let client = OpenMeteoClient::new(&config_for(&base, dir.path()))
        .unwrap()
        .with_retry_config(retry);

    let batch = tokio::time::timeout(
        Duration::from_secs(10),
        client.fetch_outlook("iowa_center", 41.6005, -93.6091, 1, 7),
    )
    .await
    .expect("Retry-After: 0 should retry immediately")
    .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(batch.records.len(), 3);
}

#[tokio::test]
async fn test_api_error_after_retries() {
    let (base, hits) = serve(usize::MAX, DAILY_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let client = OpenMeteoClient::new(&config_for(&base, dir.path()))
        .unwrap()
        .with_retry_config(fast_retry(1));

    let result = client
        .fetch_outlook("iowa_center", 41.6005, -93.6091, 1, 7)
        .await;

    match result {
        Err(Error::Api { status, message, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "busy");
        }
        other => panic!("expected API error, got {:?}", other),
    }
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_pipeline_against_local_server() {
    let (base, _hits) = serve(0, DAILY_BODY).await;
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&base, dir.path());
    let client = OpenMeteoClient::new(&config)
        .unwrap()
        .with_retry_config(fast_retry(0));

    let pipeline = Pipeline::new(&client, &config).unwrap();
    let mut options = PipelineOptions::new(date!(2025 - 09 - 28));
    options.locations = vec!["iowa_center".to_string()];

    let report = pipeline.run(&options).await;
    assert!(report.any_success());
    assert_eq!(report.outcomes.len(), 1);
    assert!(report.outcomes[0].combined);

    let files = persist::list_json_files(dir.path()).unwrap();
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        [
            "combined_iowa_center_20250928.json",
            "forecast_iowa_center_20250928.json",
            "historical_iowa_center_2025-09-27.json",
        ]
    );

    // read back what was written and check it again
    let historical = persist::read_batch(&files[2]).unwrap();
    assert_eq!(historical.records.len(), 3);
    let report = quality::validate(&historical, "iowa_center");
    // one null in three soil moisture values is over the threshold
    assert_eq!(report.status, QualityStatus::Warning);

    let summary = persist::inspect(&files[2]).unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.first_date.as_deref(), Some("2025-09-25"));
    assert_eq!(
        summary.null_counts.get("soil_moisture_0_to_100cm_mean"),
        Some(&1)
    );
}
