//! Reconciliation engine for the `Request` and `DisposableRequest` HTTP
//! resources. The orchestration framework (`kube::Client`, `Api`,
//! `Controller`, the apiserver transport) is an external dependency; this
//! crate only implements the templating/substitution/transport/status
//! pipeline and the outbound HTTP calls it drives.
pub mod checks;
pub mod error;
pub mod generator;
pub mod reconcile;
pub mod secret_store;
pub mod status;
pub mod substitution;
pub mod tls;
pub mod transport;

pub use error::{Error, Result};
