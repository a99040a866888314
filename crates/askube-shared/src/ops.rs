//! The closed vocabulary of retrieval operations.
//!
//! The synthesizer fills an [`OperationDescriptor`] instead of emitting
//! executable text, so the executor only ever runs operations enumerated
//! here. Every descriptor names exactly one output slot; the executor binds
//! the retrieved value to that slot.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExecutionErrorKind;

/// Resource kinds the cluster client can serve.
///
/// Singular aliases are accepted because small models frequently emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    #[serde(alias = "namespace")]
    Namespaces,
    #[serde(alias = "pod")]
    Pods,
    #[serde(alias = "node")]
    Nodes,
    #[serde(alias = "service")]
    Services,
    #[serde(alias = "deployment")]
    Deployments,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::Pods => "pods",
            ResourceKind::Nodes => "nodes",
            ResourceKind::Services => "services",
            ResourceKind::Deployments => "deployments",
        }
    }

    /// Whether instances of this kind live inside a namespace.
    pub fn is_namespaced(&self) -> bool {
        !matches!(self, ResourceKind::Namespaces | ResourceKind::Nodes)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single read-only retrieval operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Operation {
    /// List resources of a kind, optionally scoped to one namespace.
    List {
        kind: ResourceKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    /// Count resources of a kind, optionally scoped to one namespace.
    Count {
        kind: ResourceKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
    /// Fetch one resource by name.
    Get {
        kind: ResourceKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
        name: String,
    },
}

impl Operation {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Operation::List { kind, .. }
            | Operation::Count { kind, .. }
            | Operation::Get { kind, .. } => *kind,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::List { kind, namespace } => match namespace {
                Some(ns) => write!(f, "list {} in {}", kind, ns),
                None => write!(f, "list {}", kind),
            },
            Operation::Count { kind, namespace } => match namespace {
                Some(ns) => write!(f, "count {} in {}", kind, ns),
                None => write!(f, "count {}", kind),
            },
            Operation::Get { kind, namespace, name } => match namespace {
                Some(ns) => write!(f, "get {} {} in {}", kind, name, ns),
                None => write!(f, "get {} {}", kind, name),
            },
        }
    }
}

fn default_output_slot() -> String {
    "result".to_string()
}

/// The synthesized operation plus the single output slot it writes to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationDescriptor {
    #[serde(flatten)]
    pub op: Operation,
    /// Name of the slot the executor binds the retrieved value to.
    #[serde(default = "default_output_slot")]
    pub output: String,
}

impl OperationDescriptor {
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            output: default_output_slot(),
        }
    }

    /// Reject descriptors the executor must never see: an empty output slot,
    /// or a get without a resource name.
    pub fn validate(&self) -> Result<(), String> {
        if self.output.trim().is_empty() {
            return Err("descriptor has an empty output slot".to_string());
        }
        if let Operation::Get { name, .. } = &self.op {
            if name.trim().is_empty() {
                return Err("get operation is missing a resource name".to_string());
            }
        }
        Ok(())
    }
}

/// What the executor observed after running one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The output slot was bound to a value.
    Value(Value),
    /// The run completed cleanly but left the slot unbound.
    NoResult,
    /// The run failed, classified by kind.
    Failure(ExecutionErrorKind, String),
}
