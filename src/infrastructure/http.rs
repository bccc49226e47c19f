use crate::domain::ports::StatusGateway;
use crate::domain::status::{
    PaymentStatus, StatusError, StatusPayload, StatusResult, StatusSnapshot,
};
use crate::error::{PaywatchError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP adapter for the payment gateway's status endpoint.
///
/// Sends `POST { "identifier": <target_id> }` and decodes the JSON response
/// into a `StatusResult`. Transport and decode failures never escape as
/// crate errors; they are normalized into transient or fatal status errors
/// so the polling loop keeps full control of retry behavior.
pub struct HttpStatusGateway {
    http: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpStatusGateway {
    /// Creates a gateway client for `endpoint`, optionally authenticating
    /// with a bearer `api_key`.
    pub fn new(endpoint: &str, api_key: Option<String>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PaywatchError::Config(format!("invalid gateway endpoint: {e}")))?;
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint,
            api_key,
        })
    }
}

#[derive(Serialize)]
struct StatusRequest<'a> {
    identifier: &'a str,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    qr_code: Option<String>,
    #[serde(default)]
    iccid: Option<String>,
    #[serde(default)]
    smdp_address: Option<String>,
    #[serde(default)]
    activation_code: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl StatusResponse {
    fn into_snapshot(self) -> StatusSnapshot {
        let extra = if self.extra.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::Value::Object(self.extra)
        };
        StatusSnapshot {
            status: PaymentStatus::from_wire(&self.status),
            payload: StatusPayload {
                order_id: self.order_id,
                amount: self.amount,
                currency: self.currency,
                qr_code: self.qr_code,
                iccid: self.iccid,
                smdp_address: self.smdp_address,
                activation_code: self.activation_code,
                extra,
            },
        }
    }
}

#[async_trait]
impl StatusGateway for HttpStatusGateway {
    async fn query_status(&self, target_id: &str) -> StatusResult {
        let mut request = self
            .http
            .post(self.endpoint.clone())
            .json(&StatusRequest {
                identifier: target_id,
            });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                return Err(StatusError::transient(format!(
                    "gateway request failed: {error}"
                )));
            }
        };
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StatusError::fatal(format!(
                "gateway rejected credentials ({status})"
            )));
        }
        if !status.is_success() {
            return Err(StatusError::transient(format!("gateway returned {status}")));
        }
        match response.json::<StatusResponse>().await {
            Ok(body) => Ok(body.into_snapshot()),
            Err(error) => Err(StatusError::transient(format!(
                "undecodable gateway response: {error}"
            ))),
        }
    }
}
