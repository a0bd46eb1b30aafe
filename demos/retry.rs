//! Example demonstrating status-code driven retries.
//!
//! This example shows how to:
//! - Enable retries with the default policy
//! - Tune attempts, delay and backoff
//! - Replace the retry requirement and observe each retry
//! - Inspect the final response once retries run out
//!
//! Run with: `cargo run --example retry`

use restwright::{Error, HttpClient};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("restwright=info,retry=info")
        .init();

    let client = HttpClient::builder()
        .base_address("https://httpbin.org")?
        .timeout(Duration::from_secs(10))
        .build()?;

    println!("=== Default Retry Policy ===");
    // 503 is retryable: three retries, waiting 1s, 2s and 4s.
    let response = client
        .rest()?
        .set_paths(["status", "503"])
        .use_retry()
        .get()
        .await?;
    println!(
        "Final status {} after {} attempt(s) in {:?}",
        response.status, response.attempts, response.latency
    );
    println!();

    println!("=== Custom Retry Policy ===");
    let response = client
        .rest()?
        .set_paths(["status", "409"])
        .configure_retry(|retry| {
            retry.maximum_attempts = 2;
            retry.delay = Duration::from_millis(250);
            retry.backoff_factor = 1.5;
            // Conflicts are transient for this endpoint.
            retry.set_requirement(|response| response.status.as_u16() != 409);
            retry.set_acknowledgement(|attempt, status| {
                println!("  retry #{attempt} after {status}");
            });
        })
        .get()
        .await?;

    if response.is_success() {
        println!("Succeeded with {}", response.status);
    } else {
        println!(
            "Gave up with {} after {} attempt(s)",
            response.status, response.attempts
        );
    }

    Ok(())
}
