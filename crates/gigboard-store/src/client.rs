//! Firestore REST API client.
//!
//! Thin client with:
//! - Cached service-account tokens with a refresh margin
//! - Emulator mode (plain HTTP, static owner token) for local runs and tests
//! - Bounded request/connect timeouts
//! - Tracing spans and request metrics

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::{Client, StatusCode};
use tracing::{debug, info_span, warn, Instrument};

use crate::error::{StoreError, StoreResult};
use crate::metrics::record_request;
use crate::retry::RetryConfig;
use crate::types::{Document, RunQueryRequest, RunQueryResponse, StructuredQuery, Value};

/// OAuth scope for Firestore/Datastore access.
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Refresh tokens 60 seconds before they expire.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative TTL when the provider does not report an expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

// =============================================================================
// Configuration
// =============================================================================

/// Store client configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// GCP project ID
    pub project_id: String,
    /// Database ID (usually "(default)")
    pub database_id: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Emulator host ("host:port"); when set, auth is bypassed
    pub emulator_host: Option<String>,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        let project_id = std::env::var("GCP_PROJECT_ID")
            .or_else(|_| std::env::var("FIREBASE_PROJECT_ID"))
            .map_err(|_| {
                StoreError::auth_error(
                    "GCP_PROJECT_ID or FIREBASE_PROJECT_ID must be set to access the store",
                )
            })?;

        if project_id.is_empty() {
            return Err(StoreError::auth_error(
                "GCP_PROJECT_ID or FIREBASE_PROJECT_ID cannot be empty",
            ));
        }

        let timeout_secs: u64 = std::env::var("STORE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        let connect_timeout_secs: u64 = std::env::var("STORE_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            project_id,
            database_id: std::env::var("FIRESTORE_DATABASE_ID")
                .unwrap_or_else(|_| "(default)".to_string()),
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            retry: RetryConfig::from_env(),
            emulator_host: std::env::var("FIRESTORE_EMULATOR_HOST").ok(),
        })
    }
}

// =============================================================================
// Token cache
// =============================================================================

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Access-token source: a cached service-account token, or the emulator's
/// static "owner" token.
enum TokenSource {
    Emulator,
    ServiceAccount {
        provider: Arc<dyn TokenProvider>,
        cache: tokio::sync::RwLock<Option<CachedToken>>,
    },
}

impl TokenSource {
    async fn get(&self) -> StoreResult<String> {
        match self {
            Self::Emulator => Ok("owner".to_string()),
            Self::ServiceAccount { provider, cache } => {
                // Fast path under the read lock.
                {
                    let cached = cache.read().await;
                    if let Some(t) = cached.as_ref() {
                        if t.is_fresh() {
                            return Ok(t.access_token.clone());
                        }
                    }
                }

                let mut cached = cache.write().await;
                // Another task may have refreshed while we waited.
                if let Some(t) = cached.as_ref() {
                    if t.is_fresh() {
                        return Ok(t.access_token.clone());
                    }
                }

                match provider.token(&[DATASTORE_SCOPE]).await {
                    Ok(token) => {
                        let access_token = token.as_str().to_string();
                        let now = chrono::Utc::now();
                        let exp = token.expires_at();
                        let expires_at = if exp > now {
                            match (exp - now).to_std() {
                                Ok(ttl) => Instant::now() + ttl,
                                Err(_) => Instant::now() + TOKEN_DEFAULT_TTL,
                            }
                        } else {
                            Instant::now()
                        };

                        *cached = Some(CachedToken {
                            access_token: access_token.clone(),
                            expires_at,
                        });
                        debug!("refreshed store auth token");
                        Ok(access_token)
                    }
                    Err(e) => {
                        // Keep serving with the old token while it is usable.
                        if let Some(t) = cached.as_ref() {
                            if t.is_usable() {
                                warn!("token refresh failed, using existing token: {}", e);
                                return Ok(t.access_token.clone());
                            }
                        }
                        Err(StoreError::auth_error(format!(
                            "failed to obtain auth token: {}",
                            e
                        )))
                    }
                }
            }
        }
    }

    async fn invalidate(&self) {
        if let Self::ServiceAccount { cache, .. } = self {
            *cache.write().await = None;
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Firestore REST API client for the Gigboard collections.
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    config: StoreConfig,
    base_url: String,
    tokens: Arc<TokenSource>,
}

impl StoreClient {
    /// Create a new store client.
    pub async fn new(config: StoreConfig) -> StoreResult<Self> {
        let tokens = match &config.emulator_host {
            Some(_) => TokenSource::Emulator,
            None => TokenSource::ServiceAccount {
                provider: Self::create_auth_provider()?,
                cache: tokio::sync::RwLock::new(None),
            },
        };

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("gigboard-store/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Network)?;

        let base_url = match &config.emulator_host {
            Some(host) => format!(
                "http://{}/v1/projects/{}/databases/{}/documents",
                host, config.project_id, config.database_id
            ),
            None => format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
                config.project_id, config.database_id
            ),
        };

        Ok(Self {
            http,
            config,
            base_url,
            tokens: Arc::new(tokens),
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StoreResult<Self> {
        let config = StoreConfig::from_env()?;
        Self::new(config).await
    }

    fn create_auth_provider() -> StoreResult<Arc<dyn TokenProvider>> {
        let service_account = CustomServiceAccount::from_env().map_err(|e| {
            StoreError::auth_error(format!("Failed to load service account: {}", e))
        })?;

        match service_account {
            Some(sa) => Ok(Arc::new(sa)),
            None => Err(StoreError::auth_error(
                "GOOGLE_APPLICATION_CREDENTIALS not set. \
                 Set it to the path of your service account JSON file.",
            )),
        }
    }

    /// Retry configuration for callers that wrap operations in `with_retry`.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.config.retry
    }

    fn is_access_token_expired(body: &str) -> bool {
        body.contains("ACCESS_TOKEN_EXPIRED") || body.contains("\"UNAUTHENTICATED\"")
    }

    fn document_path(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}/{}", self.base_url, collection, doc_id)
    }

    /// Send an authorized request, replaying once after a token refresh if
    /// the access token expired mid-flight.
    async fn send_authorized<F>(&self, make: F) -> StoreResult<reqwest::Response>
    where
        F: Fn(&Client, String) -> reqwest::RequestBuilder,
    {
        let token = self.tokens.get().await?;
        let response = make(&self.http, token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            if Self::is_access_token_expired(&body) {
                self.tokens.invalidate().await;
                let token = self.tokens.get().await?;
                return Ok(make(&self.http, token).send().await?);
            }
            return Err(StoreError::from_http_status(401, body));
        }

        Ok(response)
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Get a document. Returns `None` when it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        doc_id: &str,
    ) -> StoreResult<Option<Document>> {
        let url = self.document_path(collection, doc_id);

        self.execute_request("get_document", collection, async {
            let response = self
                .send_authorized(|http, token| http.get(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let doc: Document = response.json().await?;
                    Ok(Some(doc))
                }
                StatusCode::NOT_FOUND => Ok(None),
                status => Err(Self::error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Create a document with an explicit id.
    ///
    /// Fails with `AlreadyExists` when a document with that id is present;
    /// this is what makes id-keyed inserts idempotency-safe.
    pub async fn create_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
    ) -> StoreResult<Document> {
        let url = format!("{}/{}?documentId={}", self.base_url, collection, doc_id);
        let body = Document::new(fields);

        self.execute_request("create_document", collection, async {
            let response = self
                .send_authorized(|http, token| http.post(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::CREATED => {
                    let doc: Document = response.json().await?;
                    Ok(doc)
                }
                StatusCode::CONFLICT => Err(StoreError::AlreadyExists(format!(
                    "{}/{}",
                    collection, doc_id
                ))),
                status => Err(Self::error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Patch a document (merge), limited to the masked fields.
    pub async fn patch_document(
        &self,
        collection: &str,
        doc_id: &str,
        fields: HashMap<String, Value>,
        update_mask: Vec<String>,
    ) -> StoreResult<Document> {
        let mut url = self.document_path(collection, doc_id);
        if !update_mask.is_empty() {
            let params: Vec<String> = update_mask
                .iter()
                .map(|f| format!("updateMask.fieldPaths={}", f))
                .collect();
            url = format!("{}?{}", url, params.join("&"));
        }
        let body = Document::new(fields);

        self.execute_request("patch_document", collection, async {
            let response = self
                .send_authorized(|http, token| http.patch(&url).bearer_auth(token).json(&body))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let doc: Document = response.json().await?;
                    Ok(doc)
                }
                StatusCode::NOT_FOUND => {
                    Err(StoreError::not_found(format!("{}/{}", collection, doc_id)))
                }
                status => Err(Self::error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Delete a document. Deleting an absent document is a no-op.
    pub async fn delete_document(&self, collection: &str, doc_id: &str) -> StoreResult<()> {
        let url = self.document_path(collection, doc_id);
        let coll = collection.to_string();
        let id = doc_id.to_string();

        self.execute_request("delete_document", collection, async {
            let response = self
                .send_authorized(|http, token| http.delete(&url).bearer_auth(token))
                .await?;

            match response.status() {
                StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
                StatusCode::NOT_FOUND => {
                    debug!("document {}/{} already deleted (idempotent)", coll, id);
                    Ok(())
                }
                status => Err(Self::error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Run a structured query against a root collection.
    pub async fn run_query(&self, query: StructuredQuery) -> StoreResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.base_url);
        let collection = query
            .from
            .first()
            .map(|s| s.collection_id.clone())
            .unwrap_or_default();
        let request = RunQueryRequest {
            structured_query: query,
        };

        self.execute_request("run_query", &collection, async {
            let response = self
                .send_authorized(|http, token| http.post(&url).bearer_auth(token).json(&request))
                .await?;

            match response.status() {
                StatusCode::OK => {
                    let body = response.text().await.unwrap_or_default();
                    // runQuery returns a JSON array of result elements; the
                    // trailing element may carry no document.
                    let results: Vec<RunQueryResponse> =
                        serde_json::from_str(&body).map_err(|e| {
                            // Truncate on char boundaries; a byte slice can
                            // split a multi-byte character and panic.
                            let preview: String = body.chars().take(200).collect();
                            StoreError::invalid_response(format!(
                                "failed to parse runQuery response: {} (body prefix: {})",
                                e, preview
                            ))
                        })?;

                    Ok(results.into_iter().filter_map(|r| r.document).collect())
                }
                status => Err(Self::error_response(status, &url, response).await),
            }
        })
        .await
    }

    /// Probe connectivity. Used at startup so the service refuses to come up
    /// without data access.
    pub async fn ping(&self) -> StoreResult<()> {
        self.get_document("job_postings", "__ping__").await?;
        Ok(())
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    async fn execute_request<T, F>(
        &self,
        operation: &str,
        collection: &str,
        fut: F,
    ) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        let span = info_span!("store_request", operation = %operation, collection = %collection);

        let start = Instant::now();
        let result = fut.instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn error_response(
        status: StatusCode,
        url: &str,
        response: reqwest::Response,
    ) -> StoreError {
        let body = response.text().await.unwrap_or_default();
        // The status is embedded in the message so the retry policy can
        // recognize 5xx responses.
        StoreError::from_http_status(
            status.as_u16(),
            format!("{} returned status {}: {}", url, status.as_u16(), body),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn emulator_config(host: &str) -> StoreConfig {
        StoreConfig {
            project_id: "test-project".to_string(),
            database_id: "(default)".to_string(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            retry: RetryConfig::default(),
            emulator_host: Some(host.to_string()),
        }
    }

    #[tokio::test]
    async fn emulator_base_url_is_plain_http() {
        let client = StoreClient::new(emulator_config("localhost:8080"))
            .await
            .unwrap();
        assert!(client.base_url.starts_with("http://localhost:8080/v1/"));
        assert_eq!(client.tokens.get().await.unwrap(), "owner");
    }

    #[tokio::test]
    async fn get_document_maps_404_to_none() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/v1/projects/test-project/databases/(default)/documents/job_postings/missing",
            ))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let host = server.uri().trim_start_matches("http://").to_string();
        let client = StoreClient::new(emulator_config(&host)).await.unwrap();

        let doc = client.get_document("job_postings", "missing").await.unwrap();
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn run_query_parse_error_survives_multibyte_bodies() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        // Unparseable body with a multi-byte char straddling the 200-byte mark
        let body = format!("{}é tail", "x".repeat(199));
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/test-project/databases/(default)/documents:runQuery",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let host = server.uri().trim_start_matches("http://").to_string();
        let client = StoreClient::new(emulator_config(&host)).await.unwrap();

        let result = client
            .run_query(StructuredQuery::collection("job_postings"))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn create_document_maps_409_to_already_exists() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/v1/projects/test-project/databases/(default)/documents/accepted_tasks",
            ))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let host = server.uri().trim_start_matches("http://").to_string();
        let client = StoreClient::new(emulator_config(&host)).await.unwrap();

        let result = client
            .create_document("accepted_tasks", "t1", HashMap::new())
            .await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }
}
