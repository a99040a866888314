//! Kubernetes control-plane client.
//!
//! Read-only view over the apiserver REST surface. The pipeline depends on
//! the [`ClusterClient`] trait; production code talks HTTP through
//! [`KubeApiClient`], tests substitute [`FakeClusterClient`] with canned
//! resources and no network.

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use askube_shared::{AskubeError, ExecutionErrorKind, ResourceKind};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::ClusterConfig;

/// Errors surfaced by a cluster client, classified for the executor.
#[derive(Error, Debug)]
pub enum ClusterError {
    /// The client does not expose this kind/scope combination.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The named resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The apiserver rejected the request.
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure before any apiserver answer.
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<ClusterError> for AskubeError {
    fn from(err: ClusterError) -> Self {
        let kind = match &err {
            ClusterError::Unsupported(_) => ExecutionErrorKind::ApiSurfaceMismatch,
            ClusterError::NotFound(_) => ExecutionErrorKind::NoResult,
            ClusterError::Api { .. } | ClusterError::Transport(_) => {
                ExecutionErrorKind::RuntimeError
            }
        };
        AskubeError::execution(kind, err.to_string())
    }
}

/// Read-only handle over cluster resource state.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List resources of a kind, optionally scoped to one namespace.
    /// Returns one summary object per resource.
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ClusterError>;

    /// Fetch a single named resource as a summary object.
    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, ClusterError>;

    /// Namespace names; the fixed listing behind `GET /test_connection`.
    async fn namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let items = self.list(ResourceKind::Namespaces, None).await?;
        Ok(items
            .iter()
            .filter_map(|item| item.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }
}

// ============================================================================
// Path resolution
// ============================================================================

/// Collection URL path for a kind/scope pair. Cluster-scoped kinds reject a
/// namespace qualifier; that mismatch is what the executor reports as an
/// unsupported operation.
fn collection_path(
    kind: ResourceKind,
    namespace: Option<&str>,
) -> Result<String, ClusterError> {
    match (kind, namespace) {
        (ResourceKind::Namespaces, None) => Ok("/api/v1/namespaces".to_string()),
        (ResourceKind::Nodes, None) => Ok("/api/v1/nodes".to_string()),
        (ResourceKind::Namespaces, Some(_)) | (ResourceKind::Nodes, Some(_)) => Err(
            ClusterError::Unsupported(format!("{} are cluster-scoped", kind)),
        ),
        (ResourceKind::Pods, Some(ns)) => Ok(format!("/api/v1/namespaces/{}/pods", ns)),
        (ResourceKind::Pods, None) => Ok("/api/v1/pods".to_string()),
        (ResourceKind::Services, Some(ns)) => {
            Ok(format!("/api/v1/namespaces/{}/services", ns))
        }
        (ResourceKind::Services, None) => Ok("/api/v1/services".to_string()),
        (ResourceKind::Deployments, Some(ns)) => {
            Ok(format!("/apis/apps/v1/namespaces/{}/deployments", ns))
        }
        (ResourceKind::Deployments, None) => Ok("/apis/apps/v1/deployments".to_string()),
    }
}

/// URL path of one named object. Namespaced kinds fall back to the
/// `default` namespace, matching kubectl.
fn object_path(
    kind: ResourceKind,
    namespace: Option<&str>,
    name: &str,
) -> Result<String, ClusterError> {
    let scope = if kind.is_namespaced() {
        Some(namespace.unwrap_or("default"))
    } else {
        namespace
    };
    let collection = collection_path(kind, scope)?;
    Ok(format!("{}/{}", collection, name))
}

/// Compress a raw apiserver object into the small summary the formatter sees.
fn summarize(kind: ResourceKind, item: &Value) -> Value {
    let metadata = item.get("metadata");
    let name = metadata
        .and_then(|m| m.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("");

    let mut summary = serde_json::Map::new();
    summary.insert("name".to_string(), json!(name));
    if let Some(ns) = metadata
        .and_then(|m| m.get("namespace"))
        .and_then(Value::as_str)
    {
        summary.insert("namespace".to_string(), json!(ns));
    }

    match kind {
        ResourceKind::Pods | ResourceKind::Namespaces => {
            if let Some(phase) = item.pointer("/status/phase").and_then(Value::as_str) {
                summary.insert("status".to_string(), json!(phase));
            }
        }
        ResourceKind::Nodes => {
            if let Some(conditions) = item.pointer("/status/conditions").and_then(Value::as_array)
            {
                let ready = conditions.iter().any(|c| {
                    c.get("type").and_then(Value::as_str) == Some("Ready")
                        && c.get("status").and_then(Value::as_str) == Some("True")
                });
                summary.insert("ready".to_string(), json!(ready));
            }
        }
        ResourceKind::Deployments => {
            if let Some(replicas) = item.pointer("/spec/replicas") {
                summary.insert("replicas".to_string(), replicas.clone());
            }
            if let Some(ready) = item.pointer("/status/readyReplicas") {
                summary.insert("ready_replicas".to_string(), ready.clone());
            }
        }
        ResourceKind::Services => {
            if let Some(svc_type) = item.pointer("/spec/type").and_then(Value::as_str) {
                summary.insert("type".to_string(), json!(svc_type));
            }
            if let Some(ip) = item.pointer("/spec/clusterIP").and_then(Value::as_str) {
                summary.insert("cluster_ip".to_string(), json!(ip));
            }
        }
    }

    Value::Object(summary)
}

// ============================================================================
// Apiserver client (production)
// ============================================================================

/// HTTP client for the Kubernetes apiserver, authenticated with a bearer
/// token when one is configured.
pub struct KubeApiClient {
    http_client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl KubeApiClient {
    pub fn new(config: &ClusterConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(ca_path) = &config.ca_path {
            let pem = fs::read(ca_path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }
        if config.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let token = match &config.token_path {
            Some(path) => Some(fs::read_to_string(path)?.trim().to_string()),
            None => std::env::var("KUBE_TOKEN").ok(),
        };

        Ok(Self {
            http_client: builder.build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn fetch(&self, path: &str) -> Result<Value, ClusterError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("apiserver GET {}", path);

        let mut request = self.http_client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ClusterError::Transport(e.to_string()));
        }

        // Apiserver errors carry a Status object with a message field
        let message = match response.json::<Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };

        Err(ClusterError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ClusterClient for KubeApiClient {
    async fn list(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Value>, ClusterError> {
        let path = collection_path(kind, namespace)?;
        let body = match self.fetch(&path).await {
            Ok(body) => body,
            // 404/405 on a collection path means this apiserver does not
            // serve the resource, not that the collection is empty
            Err(ClusterError::Api { status, message }) if status == 404 || status == 405 => {
                return Err(ClusterError::Unsupported(format!(
                    "{} not served by this apiserver: {}",
                    kind, message
                )));
            }
            Err(e) => return Err(e),
        };

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        Ok(items.iter().map(|item| summarize(kind, item)).collect())
    }

    async fn get(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, ClusterError> {
        let path = object_path(kind, namespace, name)?;
        match self.fetch(&path).await {
            Ok(body) => Ok(summarize(kind, &body)),
            Err(ClusterError::Api { status, message }) if status == 404 => Err(
                ClusterError::NotFound(format!("{} \"{}\": {}", kind, name, message)),
            ),
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Fake cluster client (testing)
// ============================================================================

/// Failure every fake call reports.
#[derive(Debug, Clone)]
pub enum FakeClusterFailure {
    Unsupported(String),
    Api(u16, String),
    Transport(String),
}

impl FakeClusterFailure {
    fn to_error(&self) -> ClusterError {
        match self {
            FakeClusterFailure::Unsupported(msg) => ClusterError::Unsupported(msg.clone()),
            FakeClusterFailure::Api(status, msg) => ClusterError::Api {
                status: *status,
                message: msg.clone(),
            },
            FakeClusterFailure::Transport(msg) => ClusterError::Transport(msg.clone()),
        }
    }
}

/// In-memory cluster client for deterministic tests.
#[derive(Default)]
pub struct FakeClusterClient {
    lists: HashMap<ResourceKind, Vec<Value>>,
    objects: HashMap<(ResourceKind, String), Value>,
    failure: Option<FakeClusterFailure>,
    calls: Mutex<usize>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake with the given namespace names.
    pub fn with_namespaces(names: &[&str]) -> Self {
        Self::new().list_response(
            ResourceKind::Namespaces,
            names.iter().map(|n| json!({ "name": n })).collect(),
        )
    }

    /// Seed the list served for a kind.
    pub fn list_response(mut self, kind: ResourceKind, items: Vec<Value>) -> Self {
        self.lists.insert(kind, items);
        self
    }

    /// Seed a named object served by `get`.
    pub fn object(mut self, kind: ResourceKind, name: &str, value: Value) -> Self {
        self.objects.insert((kind, name.to_string()), value);
        self
    }

    /// Every call fails with an unsupported-operation error.
    pub fn unsupported(message: &str) -> Self {
        Self {
            failure: Some(FakeClusterFailure::Unsupported(message.to_string())),
            ..Self::default()
        }
    }

    /// Every call fails at the transport layer.
    pub fn transport_failing(message: &str) -> Self {
        Self {
            failure: Some(FakeClusterFailure::Transport(message.to_string())),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn record_call(&self) -> Result<(), ClusterError> {
        *self.calls.lock().unwrap() += 1;
        match &self.failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list(
        &self,
        kind: ResourceKind,
        _namespace: Option<&str>,
    ) -> Result<Vec<Value>, ClusterError> {
        self.record_call()?;
        Ok(self.lists.get(&kind).cloned().unwrap_or_default())
    }

    async fn get(
        &self,
        kind: ResourceKind,
        _namespace: Option<&str>,
        name: &str,
    ) -> Result<Value, ClusterError> {
        self.record_call()?;
        self.objects
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| ClusterError::NotFound(format!("{} \"{}\" not found", kind, name)))
    }
}
