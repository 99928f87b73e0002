//! HTTP client for the remote finance API
//!
//! Every call is a JSON `POST` below the configured base URL:
//!
//! | Operation                   | Path                        |
//! |-----------------------------|-----------------------------|
//! | `find_accounts`             | `accounts/lookup`           |
//! | `find_existing_identifiers` | `transactions/identifiers`  |
//! | `create_transactions`       | `transactions/batch`        |

use crate::core::traits::TransactionApi;
use crate::types::{Account, BatchResult, IdentifierKind, ImportError, NewTransaction};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountLookupRequest<'a> {
    identifier_kind: IdentifierKind,
    values: &'a [String],
}

#[derive(Serialize)]
struct IdentifierRequest<'a> {
    identifiers: &'a [String],
}

#[derive(Serialize)]
struct CreateManyRequest<'a> {
    transactions: &'a [NewTransaction],
}

/// reqwest-backed [`TransactionApi`]
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpApi {
    /// Create a client for `base_url`, optionally sending a bearer token
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ImportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ImportError::api("client setup", e))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<B, R>(&self, operation: &str, path: &str, body: &B) -> Result<R, ImportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, operation, "POST");

        let mut request = self.client.post(&url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ImportError::api(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ImportError::api(
                operation,
                format!("HTTP {}: {}", status, text),
            ));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ImportError::api(operation, e))
    }
}

#[async_trait]
impl TransactionApi for HttpApi {
    async fn find_accounts(
        &self,
        kind: IdentifierKind,
        values: &[String],
    ) -> Result<Vec<Account>, ImportError> {
        let body = AccountLookupRequest {
            identifier_kind: kind,
            values,
        };
        self.post("find_accounts", "accounts/lookup", &body).await
    }

    async fn find_existing_identifiers(
        &self,
        identifiers: &[String],
    ) -> Result<Vec<String>, ImportError> {
        let body = IdentifierRequest { identifiers };
        self.post("find_existing_identifiers", "transactions/identifiers", &body)
            .await
    }

    async fn create_transactions(
        &self,
        transactions: &[NewTransaction],
    ) -> Result<BatchResult, ImportError> {
        let body = CreateManyRequest { transactions };
        self.post("create_transactions", "transactions/batch", &body)
            .await
    }
}
