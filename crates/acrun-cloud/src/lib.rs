//! acrun control plane boundary
//!
//! This crate holds what the reconciliation engine needs to know about the
//! outside world: the error taxonomy, the remote entity types and the
//! collaborator traits a cloud SDK wrapper implements.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   acrun-core                     │
//! │   codec · waiter · diff · deploy/rollback/delete │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                  acrun-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │  trait ControlPlane / trait InvokeApi     │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ remote state │  │  CloudError  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼────────────────┐
//! │  cloud SDK client impl │
//! └────────────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod provider;
pub mod state;

// Re-exports
pub use action::{Action, ActionType, Report, Summary, Target};
pub use error::{CloudError, Result, ResultExt};
pub use provider::{
    ControlPlane, CreateRuntimeRequest, EndpointRequest, InvocationHeaders, InvokeApi,
    InvokeRequest, InvokeResponse, UpdateRuntimeRequest,
};
pub use state::{
    CURRENT_ENDPOINT_NAME, DEFAULT_ENDPOINT_NAME, Endpoint, EndpointRevision, Page,
    RemoteRuntime, RuntimeRevision, RuntimeStatus, RuntimeSummary, VersionSummary,
    is_reserved_endpoint,
};
