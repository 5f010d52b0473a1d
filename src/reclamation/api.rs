use crate::{
    error::{Error, ErrorKey, Result},
    reclamation::schema::{NewReclamation, Reclamation, ValidationError},
};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const RECLAMATION_PATH: &str = "/reclamation";
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Unvalidated list response: the JSON body and the raw total-count header.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub body: Value,
    pub total_count: Option<String>,
}

/// REST collaborator for reclamation records. Payloads come back raw; the
/// service validates them.
#[async_trait]
pub trait ReclamationApi: Send + Sync + 'static {
    async fn list(&self, page: u32, size: u32) -> Result<RawPage>;
    async fn get(&self, id: i64) -> Result<Value>;
    async fn update(&self, record: &Reclamation) -> Result<Value>;
    async fn create(&self, payload: &NewReclamation) -> Result<Value>;
    async fn delete(&self, id: i64) -> Result<()>;
}

/// reqwest-backed client for `{base_url}/reclamation`.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}{}", self.base_url, RECLAMATION_PATH)
    }

    fn record_url(&self, id: i64) -> String {
        format!("{}{}/{}", self.base_url, RECLAMATION_PATH, id)
    }
}

/// Turn a non-2xx response into `Error::Rejected`, keeping the server's
/// `errorKey` when the body carries one.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(rejection(status, &text))
}

fn rejection(status: StatusCode, text: &str) -> Error {
    let body: Option<Value> = serde_json::from_str(text).ok();
    let field = |name: &str| {
        body.as_ref()
            .and_then(|b| b.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let error_key = field("errorKey").map(|k| ErrorKey::parse(&k));
    let message = field("message")
        .or_else(|| field("detail"))
        .or_else(|| field("title"))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    Error::Rejected {
        status: status.as_u16(),
        error_key,
        message,
    }
}

/// Read a success body as JSON. Transport failures stay `Network`; a body
/// that is not JSON is a payload error and is never retried.
async fn json_body(response: Response) -> Result<Value> {
    let bytes = response.bytes().await?;
    parse_body(&bytes)
}

fn parse_body(bytes: &[u8]) -> Result<Value> {
    serde_json::from_slice(bytes).map_err(|_| {
        Error::Validation(ValidationError {
            path: "$".to_string(),
            expected: "JSON",
            found: if bytes.is_empty() { "nothing" } else { "malformed body" },
        })
    })
}

#[async_trait]
impl ReclamationApi for HttpApi {
    async fn list(&self, page: u32, size: u32) -> Result<RawPage> {
        debug!("GET {} page={} size={}", self.url(), page, size);
        let response = self
            .client
            .get(self.url())
            .query(&[
                ("page", page.to_string()),
                ("size", size.to_string()),
                ("sort", "id,desc".to_string()),
            ])
            .send()
            .await?;
        let response = check(response).await?;

        let total_count = response
            .headers()
            .get(TOTAL_COUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = json_body(response).await?;

        Ok(RawPage { body, total_count })
    }

    async fn get(&self, id: i64) -> Result<Value> {
        debug!("GET {}", self.record_url(id));
        let response = self.client.get(self.record_url(id)).send().await?;
        json_body(check(response).await?).await
    }

    async fn update(&self, record: &Reclamation) -> Result<Value> {
        debug!("PUT {} id={}", self.url(), record.id);
        let response = self.client.put(self.url()).json(record).send().await?;
        json_body(check(response).await?).await
    }

    async fn create(&self, payload: &NewReclamation) -> Result<Value> {
        debug!("POST {}", self.url());
        let response = self.client.post(self.url()).json(payload).send().await?;
        json_body(check(response).await?).await
    }

    async fn delete(&self, id: i64) -> Result<()> {
        debug!("DELETE {}", self.record_url(id));
        let response = self.client.delete(self.record_url(id)).send().await?;
        check(response).await?;
        Ok(())
    }
}
