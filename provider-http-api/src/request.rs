//! The `Request` resource: a stateful REST resource whose CRUD lifecycle is
//! mapped onto HTTP create/observe/update/remove calls.
use crate::{
    common::{SecretInjectionConfig, TlsConfig},
    mapping::{ExpectedResponseCheck, Mapping, Payload},
    response::ResponseState,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use kube::core::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired state for a `Request`: the CRUD mappings, the payload they
/// template against, and the checks that decide whether the observed
/// response is up to date or gone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestParameters {
    pub mappings: Vec<Mapping>,
    pub payload: Payload,
    #[serde(default)]
    pub expected_response_check: ExpectedResponseCheck,
    #[serde(default)]
    pub is_removed_check: ExpectedResponseCheck,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_timeout: Option<Duration>,
    #[serde(default, rename = "insecureSkipTLSVerify")]
    pub insecure_skip_tls_verify: bool,
    #[serde(default)]
    pub secret_injections: Vec<SecretInjectionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_retries_limit: Option<i32>,
    /// Name of the `ProviderConfig` to pull bearer/TLS defaults from;
    /// defaults to `"default"` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<String>,
}

/// `status.forProvider` for a `Request`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestObservation {
    #[serde(default)]
    pub response: ResponseState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_details: Option<Mapping>,
    #[serde(default)]
    pub failed: i32,
    #[serde(default)]
    pub cache: ResponseState,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<String>,
}

/// A stateful REST resource: the reconciler drives the live HTTP endpoint
/// towards `spec.forProvider` by issuing the declared CRUD mappings.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "http.crossplane.io",
    version = "v1alpha2",
    kind = "Request",
    status = "RequestObservation",
    shortname = "req",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"SYNCED", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Synced\")].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME", "type":"string", "jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub for_provider: RequestParameters,
}
