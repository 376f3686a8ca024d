//! Fetch command - One paid HTTP request

use std::sync::Arc;

use agentpay_sdk::AgentPayConfig;
use agentpay_session::{SessionKey, SessionKeyManager};
use agentpay_types::system_clock;
use agentpay_x402::{BudgetTracker, PaymentOutcome, ReqwestTransport, X402Transport};
use anyhow::Context;
use bytes::Bytes;
use colored::*;
use http::{Method, Request};

use crate::display;

pub struct FetchRequest {
    pub url: String,
    pub method: String,
    pub body: Option<String>,
    pub headers: Vec<String>,
}

impl FetchRequest {
    fn build(self) -> anyhow::Result<Request<Bytes>> {
        let method = Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .with_context(|| format!("invalid method {}", self.method))?;
        let mut builder = Request::builder().method(method).uri(&self.url);
        for header in &self.headers {
            let (name, value) = header
                .split_once(':')
                .with_context(|| format!("header '{}' is not 'name: value'", header))?;
            builder = builder.header(name.trim(), value.trim());
        }
        let body = self.body.map(Bytes::from).unwrap_or_default();
        builder.body(body).context("building request")
    }
}

pub async fn run(
    config: &AgentPayConfig,
    request: FetchRequest,
    encoded_key: &str,
    auto_pay: bool,
) -> anyhow::Result<()> {
    let key = SessionKey::deserialize(encoded_key.trim()).context("could not decode session key")?;
    let request = request.build()?;
    let target = request.uri().to_string();

    let clock = system_clock();
    let budget = Arc::new(BudgetTracker::new(
        config.x402.policy(),
        config.x402.period()?,
        clock.clone(),
    ));
    let mut x402 = config.x402.transport_config();
    x402.auto_pay = x402.auto_pay && auto_pay;

    let transport = X402Transport::new(
        ReqwestTransport::new(config.http.timeout)?,
        SessionKeyManager::new(clock),
        key,
        x402,
    )
    .with_budget(budget)
    .with_policy(config.x402.policy());

    let outcome = transport
        .execute(request)
        .await
        .with_context(|| format!("fetching {}", target))?;

    display::section(&target);
    match &outcome {
        PaymentOutcome::Paid { record, .. } => {
            display::success("Payment accepted");
            if let Some(record) = record {
                display::kv("Amount", &record.amount.to_string());
                display::kv("Paid to", &record.pay_to.to_checksum(None));
                display::kv("Network", &record.network);
                if let Some(reference) = &record.tx_reference {
                    display::kv("Reference", reference);
                }
            }
        }
        PaymentOutcome::Declined { reason, .. } => {
            display::warning(&format!("Not paid: {}", reason));
        }
        PaymentOutcome::Passthrough(_) => {}
    }

    let response = outcome.into_response();
    let status = response.status();
    let status_line = status.to_string();
    if status.is_success() {
        display::kv("Status", &status_line.bright_green().to_string());
    } else {
        display::kv("Status", &status_line.bright_red().to_string());
    }
    println!();
    println!("{}", String::from_utf8_lossy(response.body()));

    if !status.is_success() {
        anyhow::bail!("request failed with status {}", status);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, headers: &[&str]) -> FetchRequest {
        FetchRequest {
            url: "https://api.example.com/report".into(),
            method: method.into(),
            body: Some("{}".into()),
            headers: headers.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn builds_request_with_headers() {
        let built = request("post", &["content-type: application/json", "x-trace:  abc "])
            .build()
            .unwrap();
        assert_eq!(built.method(), Method::POST);
        assert_eq!(built.headers()["content-type"], "application/json");
        assert_eq!(built.headers()["x-trace"], "abc");
        assert_eq!(built.body().as_ref(), b"{}");
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(request("GET", &["no-colon"]).build().is_err());
    }
}
