//! acrun reconciliation engine
//!
//! Translates between the declared definition file and the control plane's
//! wire documents, and drives the command workflows against a
//! [`ControlPlane`](acrun_cloud::ControlPlane):
//!
//! - `path`, `walker`, `union`, `codec`: the definition codec
//! - `waiter`: bounded polling for eventually consistent reads
//! - `diff`: structural comparison of re-encoded documents
//! - `directory`: the per-run runtime name cache
//! - `commands`: init, invoke, diff, deploy, render, delete, rollback

pub mod app;
pub mod codec;
pub mod commands;
pub mod definition;
pub mod diff;
pub mod directory;
pub mod path;
pub mod union;
pub mod waiter;
pub mod walker;

pub use app::{App, Confirm, TemplateEngine};
pub use commands::OutputFormat;
pub use definition::RuntimeDefinition;
pub use directory::{RuntimeDirectory, RuntimeRef};
pub use path::Path;
pub use union::{Artifact, Authorizer, RequestHeaders, Strictness};
pub use waiter::{Check, Waiter};
