use anyhow::{Context, Result};
use colored::*;
use reqwest::StatusCode;
use std::time::{Duration, Instant};

use crate::api_client::ApiClient;
use crate::output::{print_event, TestResult};
use crate::stream_client::Connection;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn test_connection(
    api_client: &ApiClient,
    stream1: &mut Connection,
    stream2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection ===".bright_cyan().bold());

    // Give both streams a moment to register with the hub
    tokio::time::sleep(Duration::from_millis(500)).await;

    let health = api_client.health().await?;
    let connections = health["connections"].as_u64().unwrap_or_default();

    println!(
        "{} {} and {} connected, server reports {} live connections",
        "→".blue(),
        stream1.label,
        stream2.label,
        connections
    );

    if connections >= 2 {
        println!("{} Both listeners registered", "✓".green());
        Ok(TestResult::pass("connection_test", start.elapsed()))
    } else {
        Ok(TestResult::fail(
            "connection_test",
            format!("Expected at least 2 live connections, got {}", connections),
            start.elapsed(),
        ))
    }
}

pub async fn test_invalid_id(api_client: &ApiClient) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Invalid Stream ID ===".bright_cyan().bold());

    let (status, body) = api_client.open_invalid_stream().await?;
    println!("{} Server answered {} {}", "→".blue(), status, body);

    if status == StatusCode::BAD_REQUEST && body["error"] == "Invalid ID" {
        println!("{} Malformed stream id rejected", "✓".green());
        Ok(TestResult::pass("invalid_id", start.elapsed()))
    } else {
        Ok(TestResult::fail(
            "invalid_id",
            format!("Expected 400 Invalid ID, got {} {}", status, body),
            start.elapsed(),
        ))
    }
}

pub async fn test_job_succeeded(
    api_client: &ApiClient,
    stream: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Job Succeeded ===".bright_cyan().bold());

    println!("{} Submitting job for {}...", "→".blue(), stream.label);
    let job = api_client
        .submit_job(&stream.stream_id, "a lighthouse at dusk")
        .await?;
    let job_id = job["id"].as_str().context("No job ID in response")?.to_string();
    println!("{} Job queued (ID: {})", "✓".green(), job_id);

    let steps: [(&str, &[&str]); 3] = [
        ("queued", &[]),
        ("processing", &[]),
        ("succeeded", &["https://cdn.example.com/outputs/lighthouse.png"]),
    ];

    for (status, outputs) in steps {
        if status != "queued" {
            println!("{} Worker reporting {}...", "→".blue(), status);
            let (code, body) = api_client
                .send_callback(&job_id, &stream.stream_id, status, outputs, None)
                .await?;
            if code != StatusCode::OK || body["status"] != "accepted" {
                return Ok(TestResult::fail(
                    "job_succeeded",
                    format!("Callback {} answered {} {}", status, code, body),
                    start.elapsed(),
                ));
            }
        }

        match stream.wait_for_status(&job_id, status, EVENT_TIMEOUT).await {
            Ok(event) => print_event(&stream.label, &event),
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                return Ok(TestResult::fail(
                    "job_succeeded",
                    e.to_string(),
                    start.elapsed(),
                ));
            }
        }
    }

    // The job is settled, so a late duplicate must be dropped
    let (_, body) = api_client
        .send_callback(&job_id, &stream.stream_id, "failed", &[], Some("late"))
        .await?;
    if body["status"] != "ignored" {
        return Ok(TestResult::fail(
            "job_succeeded",
            format!("Late callback was not ignored: {}", body),
            start.elapsed(),
        ));
    }

    println!("{} Full lifecycle delivered in order", "✓".green());
    Ok(TestResult::pass("job_succeeded", start.elapsed()))
}

pub async fn test_fan_out(
    api_client: &ApiClient,
    stream1: &mut Connection,
    stream2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Fan Out ===".bright_cyan().bold());

    if stream1.stream_id != stream2.stream_id {
        anyhow::bail!("Fan out requires both listeners on the same stream id");
    }

    let job = api_client
        .submit_job(&stream1.stream_id, "two listeners one job")
        .await?;
    let job_id = job["id"].as_str().context("No job ID in response")?.to_string();
    println!("{} Job queued (ID: {})", "✓".green(), job_id);

    api_client
        .send_callback(
            &job_id,
            &stream1.stream_id,
            "failed",
            &[],
            Some("worker out of memory"),
        )
        .await?;

    for stream in [stream1, stream2] {
        println!("{} Waiting for {} to see the failure...", "→".blue(), stream.label);

        match stream.wait_for_status(&job_id, "failed", EVENT_TIMEOUT).await {
            Ok(event) => print_event(&stream.label, &event),
            Err(e) => {
                return Ok(TestResult::fail(
                    "fan_out",
                    format!("{}: {}", stream.label, e),
                    start.elapsed(),
                ));
            }
        }
    }

    println!("{} Both listeners received the update", "✓".green());
    Ok(TestResult::pass("fan_out", start.elapsed()))
}
