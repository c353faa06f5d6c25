use crate::transmit::{DeliveryError, IngestEndpoint};
use logship_types::{IngestBatch, IngestReport};
use std::time::Duration;

/// HTTP endpoint speaking the batch ingest protocol.
///
/// POST {base_url}/v1/ingest with a JSON `IngestBatch` body; a 200 carries
/// an `IngestReport`. Status mapping:
///   401/403  -> Rejected (credentials will not improve on retry)
///   429      -> QuotaExceeded, Retry-After honored when parseable
///   4xx      -> Rejected (malformed batch)
///   5xx      -> Transient
pub struct HttpEndpoint {
    client: reqwest::blocking::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpEndpoint {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> crate::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| crate::Error::Config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_token,
        })
    }

    fn ingest_url(&self) -> String {
        format!("{}/v1/ingest", self.base_url.trim_end_matches('/'))
    }
}

impl IngestEndpoint for HttpEndpoint {
    fn submit(&self, batch: &IngestBatch) -> Result<IngestReport, DeliveryError> {
        let mut request = self.client.post(self.ingest_url()).json(batch);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| DeliveryError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<IngestReport>()
                .map_err(|e| DeliveryError::Transient(format!("invalid report body: {}", e)));
        }

        match status.as_u16() {
            401 | 403 => Err(DeliveryError::Rejected(format!(
                "authentication failed ({})",
                status
            ))),
            429 => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(DeliveryError::QuotaExceeded { retry_after })
            }
            code if (400..500).contains(&code) => {
                let body = response.text().unwrap_or_default();
                Err(DeliveryError::Rejected(format!("{}: {}", status, body)))
            }
            _ => Err(DeliveryError::Transient(format!(
                "server error ({})",
                status
            ))),
        }
    }
}
