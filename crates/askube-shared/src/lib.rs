//! Shared types for the askube daemon and CLI.

pub mod error;
pub mod ops;
pub mod rpc;

pub use error::{AskubeError, ExecutionErrorKind};
pub use ops::{ExecutionOutcome, Operation, OperationDescriptor, ResourceKind};
pub use rpc::{
    ErrorResponse, HealthResponse, NamespacesResponse, QueryRequest, QueryResponse,
};

/// Version embedded at build time, shared by both binaries.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
