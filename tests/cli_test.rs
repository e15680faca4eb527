mod common;

use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use common::{SECRET, create_op, write_requests};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::process::Command;
use tempfile::tempdir;

fn cli() -> Command {
    let mut cmd = Command::new(cargo_bin!("checkout-engine"));
    cmd.env("CHECKOUT_GATEWAY_SECRET", SECRET)
        .env_remove("CHECKOUT_DB_PATH")
        .env("RUST_LOG", "info");
    cmd
}

fn responses(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("requests.jsonl");
    write_requests(
        &input,
        &[
            create_op("ORD-CLI-1", "COD"),
            create_op("ORD-CLI-2", "Gateway"),
            json!({"op": "initiate_payment", "orderId": "ORD-CLI-2"}),
            json!({"op": "simulate_payment", "gatewayOrderId": "order_ORDCLI2"}),
            json!({"op": "get_order", "orderId": "ORD-CLI-1"}),
        ],
    )?;

    let output = cli().arg("process").arg(&input).output()?;
    assert!(output.status.success());

    let out = responses(&output.stdout);
    assert_eq!(out.len(), 5);
    assert!(out.iter().all(|r| r["ok"] == json!(true)), "{out:?}");
    assert_eq!(out[0]["result"]["paymentStatus"], json!("Success"));
    assert_eq!(out[2]["result"]["gatewayOrderId"], json!("order_ORDCLI2"));
    assert_eq!(out[2]["result"]["amount"], json!(50000));
    assert!(out[4]["result"].get("customer").is_none());

    Ok(())
}

#[test]
fn test_cli_reports_bad_lines_and_continues() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("requests.jsonl");
    std::fs::write(
        &input,
        format!(
            "{}\nthis is not json\n{}\n",
            create_op("ORD-CLI-3", "COD"),
            json!({"op": "update_status", "orderId": "ORD-CLI-3", "status": "Delivered"})
        ),
    )?;

    let output = cli().arg("process").arg(&input).output()?;
    assert!(output.status.success());

    let out = responses(&output.stdout);
    assert_eq!(out.len(), 3);
    assert_eq!(out[1]["ok"], json!(false));
    assert_eq!(out[1]["error"]["status"], json!(400));
    assert_eq!(out[2]["result"]["orderStatus"], json!("Delivered"));

    Ok(())
}

#[test]
fn test_cli_requires_gateway_secret() {
    let mut cmd = Command::new(cargo_bin!("checkout-engine"));
    cmd.env_remove("CHECKOUT_GATEWAY_SECRET").arg("pending");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no gateway secret"));
}

#[test]
fn test_cli_rejects_out_of_range_expiry_window() {
    cli()
        .env("CHECKOUT_EXPIRY_MINUTES", i64::MAX.to_string())
        .arg("pending")
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"))
        .stderr(predicate::str::contains("panicked").not());

    cli()
        .env("CHECKOUT_EXPIRY_MINUTES", "1000000000000")
        .arg("pending")
        .assert()
        .failure()
        .stderr(predicate::str::contains("payment window must not exceed"));
}

#[test]
fn test_cli_pending_report_header() {
    cli()
        .arg("pending")
        .assert()
        .success()
        .stdout(predicate::str::is_empty().or(predicate::str::contains("orderId")));
}

#[test]
fn test_cli_reap_once() {
    cli()
        .arg("reap")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"purged\":0"));
}
