//! The observed-response shape persisted on `status.response` / `status.cache`.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single captured HTTP response, as stored on a resource's status. Used
/// both for the live `response` and for the `cache` (the last response known
/// to satisfy every declared mapping).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseState {
    #[serde(default)]
    pub status_code: i32,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
}

impl ResponseState {
    pub fn is_empty(&self) -> bool {
        self.status_code == 0 && self.body.is_empty() && self.headers.is_empty()
    }
}
