use adeypay::config::ClientConfig;
use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn simulated() -> Command {
    let mut cmd = Command::new(cargo_bin!());
    cmd.args([
        "--simulate",
        "--api-key",
        "test-key",
        "--callback-url",
        "https://shop.example/callback",
        "--poll-interval-ms",
        "10",
    ]);
    cmd
}

#[test]
fn test_cli_simulated_payment_is_approved() -> Result<(), Box<dyn std::error::Error>> {
    simulated()
        .args(["--amount", "25.50", "--note", "order 42"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Complete the payment at https://adey.pages.dev/pay/p1",
        ))
        .stdout(predicate::str::contains("created p1"))
        .stdout(predicate::str::contains("approved p1"));

    Ok(())
}

#[test]
fn test_cli_rejects_non_positive_amount() -> Result<(), Box<dyn std::error::Error>> {
    simulated()
        .args(["--amount", "0"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("created").not())
        .stderr(predicate::str::contains("amount"));

    simulated()
        .args(["--amount", "-3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("amount"));

    Ok(())
}

#[test]
fn test_cli_requires_api_key() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.args([
        "--simulate",
        "--amount",
        "10",
        "--callback-url",
        "https://shop.example/callback",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("apiKey is required"));

    Ok(())
}

#[test]
fn test_cli_reads_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("adeypay.toml");
    let mut config = ClientConfig::default()
        .with_api_key("from-file")
        .with_callback_url("https://shop.example/callback");
    config.surface.base_url = Url::parse("http://pay.localhost:5174/")?;
    config.poll.interval_ms = 10;
    config.to_file(&config_path)?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("--config")
        .arg(&config_path)
        .args(["--simulate", "--amount", "5"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Complete the payment at http://pay.localhost:5174/p1",
        ))
        .stdout(predicate::str::contains("approved p1"));

    Ok(())
}

#[test]
fn test_cli_rejects_invalid_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join("broken.toml");
    std::fs::write(&config_path, "poll = \"fast\"")?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("--config")
        .arg(&config_path)
        .args(["--simulate", "--amount", "5"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cli_reports_failed_payment() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/create-payment-request"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"paymentId": "p-77"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/payment-status/p-77"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "failed"})),
        )
        .mount(&server)
        .await;

    let service_base = server.uri();
    let assert = tokio::task::spawn_blocking(move || {
        Command::new(cargo_bin!())
            .args([
                "--service-base",
                &service_base,
                "--api-key",
                "test-key",
                "--callback-url",
                "https://shop.example/callback",
                "--poll-interval-ms",
                "10",
                "--amount",
                "10",
            ])
            .assert()
    })
    .await
    .unwrap();

    assert
        .failure()
        .stdout(predicate::str::contains("created p-77"))
        .stderr(predicate::str::contains("Payment failed"));
}
