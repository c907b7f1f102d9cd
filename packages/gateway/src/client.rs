//! `reqwest`-backed [`RecordSource`] for `PostgREST`-compatible gateways.

use async_trait::async_trait;
use kartlag_layer_models::{BoundingBox, QueryFilter, RawRecord};
use serde_json::Value;

use crate::{GatewayConfig, GatewayError, RecordSource};

/// Maximum length of the response body preview included in logs.
const BODY_PREVIEW_LEN: usize = 200;

/// Client for a `PostgREST`-compatible REST API.
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PostgrestClient {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the base URL or API key
    /// is empty, and [`GatewayError::Http`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        if config.base_url.trim().is_empty() {
            return Err(GatewayError::configuration("gateway base URL is empty"));
        }
        if config.api_key.is_empty() {
            return Err(GatewayError::configuration("gateway API key is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.base_url)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Sends the request and returns the body of a 2xx response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, GatewayError> {
        let response = self.authorized(request).send().await?;
        let url = response.url().to_string();
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log::warn!(
                "Upstream request failed\n  url: {url}\n  status: {status}\n  body preview: {}",
                preview(&body)
            );
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("{url}: {status}, {} bytes", body.len());
        Ok(body)
    }
}

#[async_trait]
impl RecordSource for PostgrestClient {
    async fn fetch(
        &self,
        table: &str,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<RawRecord>, GatewayError> {
        if table.trim().is_empty() {
            return Err(GatewayError::configuration(
                "table name has not been set",
            ));
        }

        let mut request = self
            .client
            .get(self.rest_url(table))
            .query(&[("select", "*")]);
        if let Some(filter) = filter.filter(|f| !f.is_blank()) {
            log::debug!("{table}: filtering on {filter}");
            request = request.query(&[filter.query_pair()]);
        }

        let body = self.send(request).await?;
        let rows = parse_rows(&body)?;
        log::info!("{table}: fetched {} rows", rows.len());
        Ok(rows)
    }

    async fn fetch_by_bbox(
        &self,
        rpc: &str,
        bbox: &BoundingBox,
    ) -> Result<Vec<RawRecord>, GatewayError> {
        if rpc.trim().is_empty() {
            return Err(GatewayError::configuration("RPC name has not been set"));
        }

        let request = self
            .client
            .post(self.rest_url(&format!("rpc/{rpc}")))
            .json(bbox);

        let body = self.send(request).await?;
        let rows = parse_rows(&body)?;
        log::info!(
            "{rpc}: fetched {} rows in [{}, {}, {}, {}]",
            rows.len(),
            bbox.min_lng,
            bbox.min_lat,
            bbox.max_lng,
            bbox.max_lat
        );
        Ok(rows)
    }

    async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
        let body = self.send(self.client.get(self.rest_url(""))).await?;
        parse_table_names(&body)
    }
}

/// Parses a response body that must be a JSON array of objects.
fn parse_rows(body: &str) -> Result<Vec<RawRecord>, GatewayError> {
    let value: Value = serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        message: format!("response is not JSON: {e} (body preview: {})", preview(body)),
    })?;

    let Value::Array(items) = value else {
        return Err(GatewayError::Decode {
            message: format!("expected a JSON array, got: {}", preview(body)),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(GatewayError::Decode {
                message: format!("row {i} is not an object: {other}"),
            }),
        })
        .collect()
}

/// Reads table names from the gateway's `OpenAPI` root document.
///
/// Uses the keys of `definitions` when present, otherwise the top-level
/// keys.
fn parse_table_names(body: &str) -> Result<Vec<String>, GatewayError> {
    let value: Value = serde_json::from_str(body).map_err(|e| GatewayError::Decode {
        message: format!("schema document is not JSON: {e}"),
    })?;

    let root = value.as_object().ok_or_else(|| GatewayError::Decode {
        message: "schema document is not an object".to_string(),
    })?;

    let names = root
        .get("definitions")
        .and_then(Value::as_object)
        .unwrap_or(root)
        .keys()
        .cloned()
        .collect();

    Ok(names)
}

fn preview(body: &str) -> String {
    if body.chars().count() > BODY_PREVIEW_LEN {
        let head: String = body.chars().take(BODY_PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
