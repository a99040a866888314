//! Command execution - second pipeline stage.
//!
//! Runs one typed operation in a context that exposes only the cluster
//! client, binds the retrieved value to the descriptor's output slot, and
//! classifies what happened. Failures never escape as panics; every outcome
//! is a tagged [`ExecutionOutcome`] value.

use std::collections::HashMap;

use askube_shared::{
    ExecutionErrorKind, ExecutionOutcome, Operation, OperationDescriptor,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::cluster::{ClusterClient, ClusterError};

pub struct CommandExecutor;

impl CommandExecutor {
    /// Run one descriptor against the cluster and read back its output slot.
    pub async fn execute(
        client: &dyn ClusterClient,
        descriptor: &OperationDescriptor,
    ) -> ExecutionOutcome {
        let mut bindings: HashMap<String, Value> = HashMap::new();

        match Self::run_operation(client, &descriptor.op).await {
            Ok(Some(value)) => {
                bindings.insert(descriptor.output.clone(), value);
            }
            // clean run with nothing to bind (named resource absent)
            Ok(None) => {}
            Err(ClusterError::Unsupported(message)) => {
                return ExecutionOutcome::Failure(
                    ExecutionErrorKind::ApiSurfaceMismatch,
                    message,
                );
            }
            Err(e) => {
                return ExecutionOutcome::Failure(
                    ExecutionErrorKind::RuntimeError,
                    e.to_string(),
                );
            }
        }

        match bindings.remove(&descriptor.output) {
            Some(value) => {
                debug!("slot \"{}\" bound", descriptor.output);
                ExecutionOutcome::Value(value)
            }
            None => ExecutionOutcome::NoResult,
        }
    }

    async fn run_operation(
        client: &dyn ClusterClient,
        op: &Operation,
    ) -> Result<Option<Value>, ClusterError> {
        match op {
            Operation::List { kind, namespace } => {
                let items = client.list(*kind, namespace.as_deref()).await?;
                Ok(Some(Value::Array(items)))
            }
            Operation::Count { kind, namespace } => {
                let items = client.list(*kind, namespace.as_deref()).await?;
                Ok(Some(json!(items.len())))
            }
            Operation::Get { kind, namespace, name } => {
                match client.get(*kind, namespace.as_deref(), name).await {
                    Ok(value) => Ok(Some(value)),
                    // absence is not a failure; the slot just stays unbound
                    Err(ClusterError::NotFound(_)) => Ok(None),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use askube_shared::ResourceKind;

    use crate::cluster::FakeClusterClient;

    fn pods(n: usize) -> Vec<Value> {
        (0..n)
            .map(|i| json!({ "name": format!("web-{}", i), "namespace": "default", "status": "Running" }))
            .collect()
    }

    #[tokio::test]
    async fn test_count_binds_slot_to_length() {
        let client = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(3));
        let descriptor = OperationDescriptor::new(Operation::Count {
            kind: ResourceKind::Pods,
            namespace: Some("default".to_string()),
        });

        let outcome = CommandExecutor::execute(&client, &descriptor).await;
        assert_eq!(outcome, ExecutionOutcome::Value(json!(3)));
    }

    #[tokio::test]
    async fn test_list_binds_slot_to_items() {
        let client = FakeClusterClient::new().list_response(ResourceKind::Pods, pods(2));
        let descriptor = OperationDescriptor::new(Operation::List {
            kind: ResourceKind::Pods,
            namespace: None,
        });

        match CommandExecutor::execute(&client, &descriptor).await {
            ExecutionOutcome::Value(Value::Array(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected bound array, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_missing_resource_leaves_slot_unbound() {
        let client = FakeClusterClient::new();
        let descriptor = OperationDescriptor::new(Operation::Get {
            kind: ResourceKind::Pods,
            namespace: Some("default".to_string()),
            name: "ghost".to_string(),
        });

        let outcome = CommandExecutor::execute(&client, &descriptor).await;
        assert_eq!(outcome, ExecutionOutcome::NoResult);
    }

    #[tokio::test]
    async fn test_get_existing_resource_binds_slot() {
        let client = FakeClusterClient::new().object(
            ResourceKind::Pods,
            "web-0",
            json!({ "name": "web-0", "status": "Running" }),
        );
        let descriptor = OperationDescriptor::new(Operation::Get {
            kind: ResourceKind::Pods,
            namespace: Some("default".to_string()),
            name: "web-0".to_string(),
        });

        let outcome = CommandExecutor::execute(&client, &descriptor).await;
        assert_eq!(
            outcome,
            ExecutionOutcome::Value(json!({ "name": "web-0", "status": "Running" }))
        );
    }

    #[tokio::test]
    async fn test_unsupported_capability_classified_as_mismatch() {
        let client = FakeClusterClient::unsupported("apps API not served");
        let descriptor = OperationDescriptor::new(Operation::List {
            kind: ResourceKind::Deployments,
            namespace: None,
        });

        match CommandExecutor::execute(&client, &descriptor).await {
            ExecutionOutcome::Failure(kind, message) => {
                assert_eq!(kind, ExecutionErrorKind::ApiSurfaceMismatch);
                assert!(message.contains("apps API not served"));
            }
            other => panic!("expected mismatch failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_error_classified_as_runtime() {
        let client = FakeClusterClient::transport_failing("connection refused");
        let descriptor = OperationDescriptor::new(Operation::Count {
            kind: ResourceKind::Pods,
            namespace: None,
        });

        match CommandExecutor::execute(&client, &descriptor).await {
            ExecutionOutcome::Failure(kind, message) => {
                assert_eq!(kind, ExecutionErrorKind::RuntimeError);
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected runtime failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_list_still_binds_slot() {
        let client = FakeClusterClient::new();
        let descriptor = OperationDescriptor::new(Operation::List {
            kind: ResourceKind::Services,
            namespace: Some("default".to_string()),
        });

        // an empty collection is a value, not an unbound slot
        let outcome = CommandExecutor::execute(&client, &descriptor).await;
        assert_eq!(outcome, ExecutionOutcome::Value(json!([])));
    }
}
