//! Types shared between `Request` and `DisposableRequest`: secret
//! references, TLS configuration, and the outbound secret-injection
//! declarations.
use k8s_openapi::ByteString;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A pointer to a single key inside a namespaced secret-store entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub name: String,
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
}

/// TLS material for the outbound HTTP transport. An inline `ca_bundle`
/// always wins over `ca_ref` when both are set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<ByteString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert_ref: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_ref: Option<ResourceRef>,
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Merge `resource`-scope values over `provider`-scope defaults,
    /// field-by-field. `insecure_skip_verify` is always taken from
    /// `resource` and never falls through to `provider`.
    pub fn merge(resource: Option<&TlsConfig>, provider: Option<&TlsConfig>) -> TlsConfig {
        let empty = TlsConfig::default();
        let resource = resource.unwrap_or(&empty);
        let provider = provider.unwrap_or(&empty);
        TlsConfig {
            ca_bundle: resource.ca_bundle.clone().or_else(|| provider.ca_bundle.clone()),
            ca_ref: resource.ca_ref.clone().or_else(|| provider.ca_ref.clone()),
            client_cert_ref: resource
                .client_cert_ref
                .clone()
                .or_else(|| provider.client_cert_ref.clone()),
            client_key_ref: resource
                .client_key_ref
                .clone()
                .or_else(|| provider.client_key_ref.clone()),
            insecure_skip_verify: resource.insecure_skip_verify,
        }
    }
}

/// What to do with a secret key when its source `response_jq` expression
/// fails, returns null, or addresses a missing field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum MissingFieldStrategy {
    /// Leave the existing secret entry untouched.
    Preserve,
    /// Overwrite the entry with an empty string.
    SetEmpty,
    /// Remove the key from the secret.
    #[default]
    Delete,
}

/// One response-to-secret-key extraction rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyInjection {
    pub secret_key: String,
    #[serde(rename = "responseJQ")]
    pub response_jq: String,
    #[serde(default)]
    pub missing_field_strategy: MissingFieldStrategy,
}

/// The deprecated single-pair shape, kept for backwards compatibility at the
/// edges: accepted on input and normalized into a one-element
/// `keyMappings` with `missing_field_strategy = Delete`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeprecatedKeyInjection {
    pub secret_key: String,
    pub response_path: String,
}

impl From<DeprecatedKeyInjection> for KeyInjection {
    fn from(d: DeprecatedKeyInjection) -> Self {
        KeyInjection {
            secret_key: d.secret_key,
            response_jq: d.response_path,
            missing_field_strategy: MissingFieldStrategy::Delete,
        }
    }
}

/// Labels/annotations to stamp on a get-or-created destination secret.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Outbound secret injection: where to write extracted response fragments.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretInjectionConfig {
    pub secret_ref: ResourceRef,
    #[serde(default)]
    pub key_mappings: Vec<KeyInjection>,
    #[serde(default)]
    pub metadata: SecretMetadata,
    #[serde(default)]
    pub set_owner_reference: bool,
}
