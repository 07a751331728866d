//! The `DisposableRequest` resource: a fire-once (optionally rescheduled)
//! HTTP call.
use crate::{
    common::{SecretInjectionConfig, TlsConfig},
    mapping::Method,
    response::ResponseState,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use kube::core::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired state for a `DisposableRequest`. `url`, `method`, `headers`, and
/// `body` are immutable after creation; the reconciler assumes admission
/// enforces this.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisposableRequestParameters {
    pub url: String,
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_retries_limit: Option<i32>,
    #[serde(default, rename = "insecureSkipTLSVerify")]
    pub insecure_skip_tls_verify: bool,
    /// A jq boolean expression validated against the captured response.
    #[serde(default)]
    pub expected_response: String,
    #[serde(default)]
    pub secret_injections: Vec<SecretInjectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_reconcile: Option<Duration>,
    #[serde(default)]
    pub should_loop_infinitely: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<String>,
}

/// `status.forProvider` for a `DisposableRequest`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisposableRequestObservation {
    #[serde(default)]
    pub response: ResponseState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_details: Option<ResponseState>,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<String>,
}

/// A fire-once-with-retries HTTP call, optionally re-issued on a schedule.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "http.crossplane.io",
    version = "v1alpha2",
    kind = "DisposableRequest",
    status = "DisposableRequestObservation",
    shortname = "disreq",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"SYNCED", "type":"boolean", "jsonPath":".status.synced"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DisposableRequestSpec {
    pub for_provider: DisposableRequestParameters,
}
