use reqwest::header;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::SupabaseConfig;

/// Failure surfaced by the remote store gateway. Non-2xx responses carry the
/// upstream status and body for diagnosis; the gateway never retries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("transport: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("row decode: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store returned no rows")]
    NoRows,
}

/// CRUD-over-HTTP client for the hosted store's PostgREST surface.
///
/// Equality filters are conjunctive `column=eq.value` query parameters; writes
/// ask for the affected rows back via `Prefer: return=representation`. This is
/// a dumb pipe: all domain logic lives in the handlers above it.
#[derive(Clone)]
pub struct RemoteStore {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl RemoteStore {
    pub fn new(config: &SupabaseConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn eq_params(filters: &[(&str, &str)]) -> Vec<(String, String)> {
        filters
            .iter()
            .map(|(column, value)| (column.to_string(), format!("eq.{value}")))
            .collect()
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = request
            .header("apikey", self.api_key.as_str())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    pub async fn select(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, &str)],
        order: Option<&str>,
    ) -> Result<Vec<Value>, StoreError> {
        let mut params = vec![("select".to_string(), columns.to_string())];
        params.extend(Self::eq_params(filters));
        if let Some(order) = order {
            params.push(("order".to_string(), order.to_string()));
        }

        debug!(table, columns, ?order, "store select");
        let request = self.http.get(self.table_url(table)).query(&params);
        let rows = self.execute(request).await?.json().await?;
        Ok(rows)
    }

    pub async fn insert(&self, table: &str, rows: &Value) -> Result<Vec<Value>, StoreError> {
        debug!(table, "store insert");
        let request = self
            .http
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(rows);
        let inserted = self.execute(request).await?.json().await?;
        Ok(inserted)
    }

    pub async fn update(
        &self,
        table: &str,
        patch: &Value,
        filters: &[(&str, &str)],
    ) -> Result<Vec<Value>, StoreError> {
        debug!(table, "store update");
        let request = self
            .http
            .patch(self.table_url(table))
            .query(&Self::eq_params(filters))
            .header("Prefer", "return=representation")
            .json(patch);
        let updated = self.execute(request).await?.json().await?;
        Ok(updated)
    }

    pub async fn delete(&self, table: &str, filters: &[(&str, &str)]) -> Result<(), StoreError> {
        debug!(table, "store delete");
        let request = self.http.delete(self.table_url(table)).query(&Self::eq_params(filters));
        self.execute(request).await?;
        Ok(())
    }
}

/// Decode raw store rows into typed records at the gateway boundary. A schema
/// mismatch is a typed error, not a silently-missing field.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(StoreError::Decode))
        .collect()
}
