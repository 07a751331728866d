//! Status writer: tracks the `failed`/`error`/`synced` state machine
//! through a reconcile pass and writes the whole status subresource in a
//! single merge-patch round trip rather than a chain of per-field updates.
use std::fmt::Debug;

use kube::api::{Patch, PatchParams};
use kube::{Api, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// Tracks `failed`/`error`/`synced` through one reconcile pass, preserving
/// the original setter contract: `set_error(None)` still increments
/// `failed`; `set_error(Some(e))` sets `failed += 1, synced = true, error =
/// e`; `set_synced(true)` clears both `failed` and `error`.
#[derive(Clone, Debug, Default)]
pub struct FailureTracker {
    pub failed: i32,
    pub error: String,
    pub synced: bool,
}

impl FailureTracker {
    pub fn resume(failed: i32, error: String, synced: bool) -> Self {
        Self { failed, error, synced }
    }

    pub fn set_error(&mut self, err: Option<String>) {
        self.failed += 1;
        if let Some(err) = err {
            self.synced = true;
            self.error = err;
        }
    }

    pub fn set_synced(&mut self, synced: bool) {
        self.synced = synced;
        if synced {
            self.failed = 0;
            self.error.clear();
        }
    }
}

/// Apply a JSON merge-patch to `name`'s status subresource in one write.
pub async fn apply_status<K>(api: &Api<K>, name: &str, status: serde_json::Value) -> Result<()>
where
    K: Resource + Clone + DeserializeOwned + Debug + Serialize,
    K::DynamicType: Default,
{
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::default(), &Patch::Merge(patch)).await?;
    Ok(())
}
