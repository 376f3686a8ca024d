//! Client wiring: agents, policies and paid requests

use std::sync::Arc;

use agentpay_policy::SpendingLimit;
use agentpay_sdk::{
    Action, AgentConfig, AgentPayClient, AgentPayConfig, AgentPayError, AgentStatus, Clock,
    ErrorKind, HttpTransport, ManualClock, Policy, PolicyId, Result, U256,
};
use agentpay_types::Address;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Duration;
use http::{Request, Response, StatusCode};

fn wallet() -> Address {
    Address::repeat_byte(0x5A)
}

fn client(clock: Arc<ManualClock>) -> AgentPayClient {
    let config = AgentPayConfig::from_json_str(
        r#"{
            "chain_id": 8453,
            "session_duration": "1h",
            "x402": { "max_per_request": "500", "max_per_period": "800", "budget_period": "1h" }
        }"#,
    )
    .unwrap();
    AgentPayClient::with_clock(config, clock).unwrap()
}

/// Charges `price` for every unpaid request
#[derive(Debug)]
struct Meter {
    price: &'static str,
}

#[async_trait]
impl HttpTransport for Meter {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        if request.headers().contains_key("x-payment") {
            return Ok(Response::new(Bytes::from_static(b"ok")));
        }
        let body = format!(
            r#"{{"scheme":"exact","network":"base","maxAmountRequired":"{}","payTo":"0x3333333333333333333333333333333333333333"}}"#,
            self.price
        );
        Ok(Response::builder()
            .status(StatusCode::PAYMENT_REQUIRED)
            .body(Bytes::from(body))
            .unwrap())
    }
}

fn get() -> Request<Bytes> {
    Request::builder()
        .uri("https://meter.test/data")
        .body(Bytes::new())
        .unwrap()
}

#[tokio::test]
async fn agent_pays_until_budget_runs_out() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let client = client(clock.clone());
    let agent = client.create_agent("crawler", wallet()).unwrap();
    let transport = client
        .payment_transport(&agent.id, Meter { price: "300" })
        .unwrap();

    for _ in 0..2 {
        let response = transport.send(get()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    // 600 spent of 800
    let response = transport.send(get()).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert_eq!(client.budget(&agent.id).records().len(), 2);

    clock.advance(Duration::hours(1));
    let response = transport.send(get()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn per_request_ceiling_from_config() {
    let client = client(Arc::new(ManualClock::at_unix(1_700_000_000)));
    let agent = client.create_agent("big-spender", wallet()).unwrap();
    let transport = client
        .payment_transport(&agent.id, Meter { price: "501" })
        .unwrap();

    let response = transport.send(get()).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    assert!(client.budget(&agent.id).records().is_empty());
}

#[test]
fn inactive_agents_get_no_transport() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let client = client(clock.clone());

    let revoked = client.create_agent("revoked", wallet()).unwrap();
    client.revoke_agent(&revoked.id).unwrap();
    let err = client
        .payment_transport(&revoked.id, Meter { price: "1" })
        .unwrap_err();
    assert!(matches!(err, AgentPayError::AgentInactive { .. }));

    let expiring = client.create_agent("expiring", wallet()).unwrap();
    clock.advance(Duration::hours(2));
    assert_eq!(
        client.registry().get(&expiring.id).unwrap().status,
        AgentStatus::Expired
    );
    let err = client
        .payment_transport(&expiring.id, Meter { price: "1" })
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[test]
fn agent_actions_are_bounded_by_policy() {
    let clock = Arc::new(ManualClock::at_unix(1_700_000_000));
    let client = client(clock.clone());
    let token = Address::repeat_byte(0x01);

    let policy = client
        .create_policy(Policy::new().with_spending_limit(SpendingLimit::new(
            token,
            U256::from(100),
            Duration::days(1),
            clock.now(),
        )))
        .unwrap();
    let agent = client
        .create_agent_with(
            AgentConfig::new("trader", wallet(), Duration::hours(1))
                .with_policy(policy.id.clone().unwrap()),
        )
        .unwrap();

    let action = |amount: u64| {
        Action::new(
            Address::repeat_byte(0x02),
            "transfer(address,uint256)",
            token,
            U256::from(amount),
        )
    };
    client.authorize(&agent.id, &action(60)).unwrap();
    let err = client.authorize(&agent.id, &action(41)).unwrap_err();
    assert!(matches!(err, AgentPayError::ExceedsLimit { .. }));
}

#[test]
fn agent_without_policy_is_refused() {
    let client = client(Arc::new(ManualClock::at_unix(1_700_000_000)));
    let agent = client.create_agent("unbound", wallet()).unwrap();
    assert!(agent.policy_id.is_none());

    let action = Action::new(
        Address::repeat_byte(0x02),
        "transfer(address,uint256)",
        Address::repeat_byte(0x01),
        U256::from(1),
    );
    let err = client.authorize(&agent.id, &action).unwrap_err();
    assert!(matches!(err, AgentPayError::NoPolicy { .. }));
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
}

#[test]
fn unknown_policy_is_rejected_at_creation() {
    let client = client(Arc::new(ManualClock::at_unix(1_700_000_000)));
    let err = client
        .create_agent_with(
            AgentConfig::new("orphan", wallet(), Duration::hours(1)).with_policy(PolicyId::new()),
        )
        .unwrap_err();
    assert!(matches!(err, AgentPayError::PolicyNotFound { .. }));
    assert!(client.registry().is_empty());
}
