// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end pipeline tests against a fake upstream collector and a fake
//! FHEM telnet port.

use axum::{extract::RawQuery, routing::get, Router};
use pws_core::{HttpContext, IngestPipeline, Settings, SinkFailure, SinkOutcome};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const UPLOAD_PATH: &str = "/weatherstation/updateweatherstation.php";

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new().route(
        UPLOAD_PATH,
        get(|RawQuery(query): RawQuery| async move {
            format!("upstream saw {}", query.unwrap_or_default())
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_fhem() -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = String::new();
        socket.read_to_string(&mut received).await.unwrap();
        received
    });
    (port, handle)
}

fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn read_entries(path: &Path) -> Vec<serde_json::Value> {
    let content = std::fs::read(path).unwrap();
    serde_json::Deserializer::from_slice(&content)
        .into_iter::<serde_json::Value>()
        .collect::<Result<_, _>>()
        .unwrap()
}

fn upload() -> (Vec<(String, String)>, HttpContext) {
    let query = "ID=KX1&PASSWORD=secret&tempf=32&windspeedmph=10&rainin=1&baromin=30&dateutc=now";
    let pairs = query
        .split('&')
        .filter_map(|kv| kv.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let ctx = HttpContext::new(
        Some("pws.lan:8080".to_string()),
        format!("{}?{}", UPLOAD_PATH, query),
    );
    (pairs, ctx)
}

#[tokio::test]
async fn test_full_pipeline_all_sinks() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = spawn_upstream().await;
    let (fhem_port, fhem) = spawn_fhem().await;

    let settings = Settings {
        json_data_logdir: dir.path().to_path_buf(),
        forward_server: upstream.to_string(),
        fhem_port,
        ..Default::default()
    };
    settings.validate().unwrap();
    let pipeline = IngestPipeline::new(Arc::new(settings)).unwrap();

    let (pairs, ctx) = upload();
    let report = pipeline.ingest(pairs, &ctx).await;

    assert_eq!(report.acknowledgment(), "success");
    assert_eq!(report.device.as_str(), "weather_KX1");
    assert!(report.failed_sinks().is_empty(), "{:?}", report);

    let expected_body = format!("upstream saw {}", ctx.request_uri.split_once('?').unwrap().1);
    assert_eq!(
        report.relay,
        SinkOutcome::Success {
            response: Some(expected_body.clone())
        }
    );

    // Log: raw fields, relay fields, then derived fields.
    let entries = read_entries(&dir.path().join("weather_KX1.json"));
    assert_eq!(entries.len(), 1);
    let entry = entries[0].as_object().unwrap();
    let names: Vec<_> = entry.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![
            "ID",
            "PASSWORD",
            "tempf",
            "windspeedmph",
            "rainin",
            "baromin",
            "dateutc",
            "forward_url",
            "forward",
            "tempc",
            "windspeedkmh",
            "windspeedkts",
            "rainmm",
            "baromhpa",
        ]
    );
    assert_eq!(
        entry["forward_url"],
        format!("http://{}{}", upstream, ctx.request_uri)
    );
    assert_eq!(entry["forward"], expected_body);
    assert_ne!(entry["dateutc"], "now");
    assert!(!entry.contains_key("settings_device"));

    let raw = std::fs::read_to_string(dir.path().join("weather_KX1.json")).unwrap();
    assert!(raw.contains(r#""tempc":0.00"#));
    assert!(raw.contains(r#""windspeedkmh":16.09"#));
    assert!(raw.contains(r#""rainmm":25.40"#));
    assert!(raw.contains(r#""baromhpa":1015.80"#));

    // FHEM: define, one setreading per field (payload + settings last), exit.
    let received = fhem.await.unwrap();
    let lines: Vec<_> = received.split_terminator("\r\n").collect();
    assert_eq!(lines.first(), Some(&"define weather_KX1 dummy"));
    assert_eq!(lines.last(), Some(&"exit"));
    assert_eq!(lines[1], "setreading weather_KX1 ID KX1");
    assert!(lines.contains(&"setreading weather_KX1 tempc 0.00"));
    assert!(lines.contains(&"setreading weather_KX1 settings_device weather_KX1"));
    assert!(lines.contains(&"setreading weather_KX1 url http://pws.lan:8080/weatherstation/updateweatherstation.php?ID=KX1&PASSWORD=secret&tempf=32&windspeedmph=10&rainin=1&baromin=30&dateutc=now"));
    assert!(lines.contains(&format!("setreading weather_KX1 settings_FHEM_port {}", fhem_port).as_str()));
    let json_line = lines
        .iter()
        .find(|l| l.starts_with("setreading weather_KX1 json "))
        .unwrap();
    assert_eq!(json_line.trim_start_matches("setreading weather_KX1 json "), raw);
}

#[tokio::test]
async fn test_unreachable_fhem_does_not_block_log() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        json_data_logdir: dir.path().to_path_buf(),
        forward_data: false,
        fhem_server: "127.0.0.1".to_string(),
        fhem_port: closed_port(),
        fhem_timeout_ms: 1000,
        ..Default::default()
    };
    let pipeline = IngestPipeline::new(Arc::new(settings)).unwrap();

    let report = pipeline
        .ingest([("ID", "KX2"), ("tempf", "212")], &HttpContext::default())
        .await;

    assert_eq!(report.acknowledgment(), "success");
    assert!(report.json_log.is_success());
    assert_eq!(report.fhem.failure(), Some(SinkFailure::Connection));
    assert_eq!(report.failed_sinks(), vec!["fhem"]);

    let entries = read_entries(&dir.path().join("weather_KX2.json"));
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["tempc"].as_f64(), Some(100.0));
}

#[tokio::test]
async fn test_failed_relay_records_nothing_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        json_data_logdir: dir.path().to_path_buf(),
        forward_server: format!("127.0.0.1:{}", closed_port()),
        forward_timeout_ms: 1000,
        fhem_data_log: false,
        device: "garden".to_string(),
        ..Default::default()
    };
    let pipeline = IngestPipeline::new(Arc::new(settings)).unwrap();

    let report = pipeline
        .ingest(
            [("ID", "KX3"), ("rainin", "0.5")],
            &HttpContext::new(None, "/up?ID=KX3&rainin=0.5"),
        )
        .await;

    assert!(report.relay.is_failed());
    assert!(report.json_log.is_success());
    assert!(report.fhem.is_skipped());
    assert_eq!(report.device.as_str(), "garden");

    let entries = read_entries(&dir.path().join("garden.json"));
    let entry = entries[0].as_object().unwrap();
    assert!(entry.contains_key("forward_url"));
    assert!(!entry.contains_key("forward"));
    assert_eq!(entry["rainmm"].as_f64(), Some(12.7));
}

#[tokio::test]
async fn test_missing_station_id_logs_to_bare_prefix() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        json_data_logdir: dir.path().to_path_buf(),
        forward_data: false,
        fhem_data_log: false,
        ..Default::default()
    };
    let pipeline = IngestPipeline::new(Arc::new(settings)).unwrap();

    let report = pipeline
        .ingest([("tempf", "50")], &HttpContext::default())
        .await;
    assert_eq!(report.device.as_str(), "weather_");
    assert!(dir.path().join("weather_.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_uploads_same_device_never_interleave() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        json_data_logdir: dir.path().to_path_buf(),
        forward_data: false,
        fhem_data_log: false,
        ..Default::default()
    };
    let pipeline = Arc::new(IngestPipeline::new(Arc::new(settings)).unwrap());

    let note_a = "a".repeat(128 * 1024);
    let note_b = "b".repeat(128 * 1024);

    let (p1, p2) = (pipeline.clone(), pipeline.clone());
    let t1 = tokio::spawn(async move {
        p1.ingest([("ID", "KX4".to_string()), ("note", note_a)], &HttpContext::default())
            .await
    });
    let t2 = tokio::spawn(async move {
        p2.ingest([("ID", "KX4".to_string()), ("note", note_b)], &HttpContext::default())
            .await
    });
    assert!(t1.await.unwrap().json_log.is_success());
    assert!(t2.await.unwrap().json_log.is_success());

    let entries = read_entries(&dir.path().join("weather_KX4.json"));
    assert_eq!(entries.len(), 2);
    let mut notes: Vec<char> = entries
        .iter()
        .map(|e| e["note"].as_str().unwrap().chars().next().unwrap())
        .collect();
    notes.sort_unstable();
    assert_eq!(notes, vec!['a', 'b']);
    for entry in &entries {
        let note = entry["note"].as_str().unwrap();
        assert!(note.chars().all(|c| c == note.chars().next().unwrap()));
    }
}
