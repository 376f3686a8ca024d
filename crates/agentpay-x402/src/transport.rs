//! HTTP 402 transport decorator
//!
//! [`X402Transport`] wraps any [`HttpTransport`]. A `402 Payment Required`
//! response is answered by signing an EIP-3009 authorization with the agent's
//! session key and retrying the request once with an `X-PAYMENT` header.
//!
//! Anything that stops a payment short of the retry (policy, budget, an
//! unparseable body, no acceptable scheme) hands the original 402 back to the
//! caller. Only a failure of the first dispatch or of session-key signing is
//! an error.

use std::sync::Arc;
use std::time::Duration;

use agentpay_session::{SessionKey, SessionKeyManager};
use agentpay_types::{
    parse_amount, require_positive, Address, AgentPayError, Clock, Result, U256,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::HeaderName;
use http::{HeaderValue, Request, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::budget::BudgetTracker;
use crate::payment::{build_payment_header, parse_requirements, select_requirement, usdc_address};
use crate::types::{
    PaymentRecord, PaymentRequirement, X402Config, X402Policy, PAYMENT_HEADER,
    PAYMENT_RESPONSE_HEADER,
};

/// Request/response exchange with a fully buffered body
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        (**self).send(request).await
    }
}

/// Why a 402 was not paid
#[derive(Debug, thiserror::Error)]
pub enum DeclineReason {
    #[error("auto-pay disabled")]
    AutoPayDisabled,
    #[error("unparseable payment requirements: {0}")]
    Unparseable(AgentPayError),
    #[error("no acceptable payment scheme")]
    NoAcceptableScheme,
    #[error("payment rejected: {0}")]
    Rejected(AgentPayError),
    #[error("no token contract known for chain {chain_id}")]
    UnknownToken { chain_id: u64 },
    #[error("paid retry failed: {0}")]
    RetryFailed(AgentPayError),
    #[error("paid retry answered {0}")]
    RetryStatus(StatusCode),
}

/// Result of one request through the decorator
#[derive(Debug)]
pub enum PaymentOutcome {
    /// Payment sent and the resource answered 2xx. `record` is `None` when
    /// no budget tracker is attached or tracking failed after the fact.
    Paid {
        response: Response<Bytes>,
        record: Option<PaymentRecord>,
    },
    /// A 402 that was not paid, or a paid retry that did not succeed
    Declined {
        response: Response<Bytes>,
        reason: DeclineReason,
    },
    /// No payment was requested
    Passthrough(Response<Bytes>),
}

impl PaymentOutcome {
    pub fn response(&self) -> &Response<Bytes> {
        match self {
            PaymentOutcome::Paid { response, .. }
            | PaymentOutcome::Declined { response, .. }
            | PaymentOutcome::Passthrough(response) => response,
        }
    }

    pub fn into_response(self) -> Response<Bytes> {
        match self {
            PaymentOutcome::Paid { response, .. }
            | PaymentOutcome::Declined { response, .. }
            | PaymentOutcome::Passthrough(response) => response,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentOutcome::Paid { .. })
    }
}

/// Pays x402 challenges on behalf of one session key
#[derive(Debug)]
pub struct X402Transport<T> {
    inner: T,
    sessions: SessionKeyManager,
    key: SessionKey,
    budget: Option<Arc<BudgetTracker>>,
    policy: Option<X402Policy>,
    config: X402Config,
}

impl<T: HttpTransport> X402Transport<T> {
    pub fn new(inner: T, sessions: SessionKeyManager, key: SessionKey, config: X402Config) -> Self {
        Self {
            inner,
            sessions,
            key,
            budget: None,
            policy: None,
            config,
        }
    }

    /// Account successful payments against `budget`
    pub fn with_budget(mut self, budget: Arc<BudgetTracker>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Pre-flight ceilings and allowlists applied before signing
    pub fn with_policy(mut self, policy: X402Policy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn session_address(&self) -> Address {
        self.key.address()
    }

    pub fn budget(&self) -> Option<&Arc<BudgetTracker>> {
        self.budget.as_ref()
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Send `request`, paying a 402 if policy and budget allow
    pub async fn execute(&self, request: Request<Bytes>) -> Result<PaymentOutcome> {
        let mut retry = clone_request(&request);
        let target = request.uri().to_string();
        let response = self.inner.send(request).await?;

        if response.status() != StatusCode::PAYMENT_REQUIRED {
            return Ok(PaymentOutcome::Passthrough(response));
        }
        if !self.config.auto_pay {
            return Ok(declined(response, DeclineReason::AutoPayDisabled));
        }

        let requirements = match parse_requirements(response.body()) {
            Ok(requirements) => requirements,
            Err(e) => return Ok(declined(response, DeclineReason::Unparseable(e))),
        };
        let Some(requirement) =
            select_requirement(&requirements, &self.config.allowed_schemes).cloned()
        else {
            return Ok(declined(response, DeclineReason::NoAcceptableScheme));
        };

        let amount = match self.preflight(&retry, &requirement) {
            Ok(amount) => amount,
            Err(e) => return Ok(declined(response, DeclineReason::Rejected(e))),
        };
        let Some(token) = self.token_contract() else {
            let chain_id = self.key.chain_id();
            return Ok(declined(response, DeclineReason::UnknownToken { chain_id }));
        };

        let header = build_payment_header(&self.sessions, &self.key, &requirement, token)?;
        let value = HeaderValue::from_str(&header.encode()?)
            .map_err(|e| AgentPayError::internal(format!("payment header: {}", e)))?;
        retry.headers_mut().insert(payment_header_name(PAYMENT_HEADER)?, value);

        debug!(
            pay_to = %requirement.pay_to,
            amount = %amount,
            scheme = %requirement.scheme,
            "Retrying with payment"
        );
        let paid = match self.inner.send(retry).await {
            Ok(paid) => paid,
            Err(e) => return Ok(declined(response, DeclineReason::RetryFailed(e))),
        };

        let status = paid.status();
        if !status.is_success() {
            return Ok(declined(paid, DeclineReason::RetryStatus(status)));
        }

        let record = self.budget.as_ref().and_then(|budget| {
            let resource = if requirement.resource.is_empty() {
                target.clone()
            } else {
                requirement.resource.clone()
            };
            let mut record = PaymentRecord::new(
                resource,
                amount,
                requirement.pay_to,
                requirement.network.clone(),
                self.sessions.clock().now(),
            );
            record.tx_reference = payment_reference(&paid);
            match budget.track(record.clone()) {
                Ok(()) => Some(record),
                Err(e) => {
                    warn!(error = %e, pay_to = %requirement.pay_to, "Paid but could not track payment");
                    None
                }
            }
        });

        info!(pay_to = %requirement.pay_to, amount = %amount, status = %status, "Payment accepted");
        Ok(PaymentOutcome::Paid {
            response: paid,
            record,
        })
    }

    /// Advisory checks ahead of signing; the budget is only charged by
    /// `track` after a successful retry.
    fn preflight(&self, request: &Request<Bytes>, requirement: &PaymentRequirement) -> Result<U256> {
        let amount = parse_amount("maxAmountRequired", &requirement.max_amount_required)?;
        let amount = require_positive("maxAmountRequired", amount)?;

        if let Some(policy) = &self.policy {
            if let Some(limit) = policy.max_per_request {
                if amount > limit {
                    return Err(AgentPayError::ExceedsPerRequestLimit {
                        requested: amount,
                        limit,
                    });
                }
            }
            if !policy.payee_allowed(&requirement.pay_to) {
                return Err(AgentPayError::PayeeNotAllowed {
                    payee: requirement.pay_to,
                });
            }
            let uri = request.uri();
            if !policy.domain_allowed(uri.host(), uri.authority().map(|a| a.as_str())) {
                return Err(AgentPayError::invalid_input(
                    "host",
                    format!("{} is not an allowed payment domain", uri.host().unwrap_or_default()),
                ));
            }
        }

        if let Some(budget) = &self.budget {
            budget.check(amount, &requirement.pay_to)?;
        }
        Ok(amount)
    }

    fn token_contract(&self) -> Option<Address> {
        self.config
            .token_contract
            .or_else(|| usdc_address(self.key.chain_id()))
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for X402Transport<T> {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.execute(request).await.map(PaymentOutcome::into_response)
    }
}

fn declined(response: Response<Bytes>, reason: DeclineReason) -> PaymentOutcome {
    warn!(status = %response.status(), reason = %reason, "Payment declined");
    PaymentOutcome::Declined { response, reason }
}

/// Method, target, version, headers and body; extensions are not carried over
fn clone_request(request: &Request<Bytes>) -> Request<Bytes> {
    let mut clone = Request::new(request.body().clone());
    *clone.method_mut() = request.method().clone();
    *clone.uri_mut() = request.uri().clone();
    *clone.version_mut() = request.version();
    *clone.headers_mut() = request.headers().clone();
    clone
}

fn payment_header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| AgentPayError::internal(format!("header name {}: {}", name, e)))
}

fn payment_reference(response: &Response<Bytes>) -> Option<String> {
    let name = payment_header_name(PAYMENT_RESPONSE_HEADER).ok()?;
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// [`HttpTransport`] over a `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentPayError::transport(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let (parts, body) = request.into_parts();
        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| AgentPayError::invalid_input("method", e.to_string()))?;

        let mut builder = self.client.request(method, parts.uri.to_string());
        for (name, value) in parts.headers.iter() {
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let upstream = builder
            .body(body)
            .send()
            .await
            .map_err(|e| AgentPayError::transport(e.to_string()))?;

        let mut response = Response::builder().status(upstream.status().as_u16());
        for (name, value) in upstream.headers().iter() {
            response = response.header(name.as_str(), value.as_bytes());
        }
        let body = upstream
            .bytes()
            .await
            .map_err(|e| AgentPayError::transport(e.to_string()))?;

        response
            .body(body)
            .map_err(|e| AgentPayError::internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[test]
    fn clone_keeps_request_shape() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("https://api.example.com/v1/quote?x=1")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{\"q\":1}"))
            .unwrap();

        let clone = clone_request(&request);
        assert_eq!(clone.method(), Method::POST);
        assert_eq!(clone.uri(), request.uri());
        assert_eq!(clone.headers(), request.headers());
        assert_eq!(clone.body(), request.body());
    }

    #[test]
    fn payment_header_names_are_valid() {
        assert_eq!(payment_header_name(PAYMENT_HEADER).unwrap().as_str(), "x-payment");
        assert_eq!(
            payment_header_name(PAYMENT_RESPONSE_HEADER).unwrap().as_str(),
            "x-payment-response"
        );
    }

    #[test]
    fn outcome_exposes_response() {
        let response = Response::builder()
            .status(StatusCode::PAYMENT_REQUIRED)
            .body(Bytes::new())
            .unwrap();
        let outcome = PaymentOutcome::Declined {
            response,
            reason: DeclineReason::AutoPayDisabled,
        };
        assert!(!outcome.is_paid());
        assert_eq!(outcome.response().status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(outcome.into_response().status(), 402);
    }
}
