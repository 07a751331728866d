//! `ProviderConfig`: cluster-scoped defaults (bearer token, TLS) shared by
//! `Request`/`DisposableRequest` resources that reference it.
use crate::common::{ResourceRef, TlsConfig};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where the default bearer token comes from, if any.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token_secret_ref: Option<ResourceRef>,
}

/// Default credentials and TLS for `Request`/`DisposableRequest` resources
/// that don't override them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigParameters {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsConfig>,
}

/// The name resolved when a resource leaves `providerConfigRef` unset.
pub const DEFAULT_PROVIDER_CONFIG_NAME: &str = "default";

#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(group = "http.crossplane.io", version = "v1alpha2", kind = "ProviderConfig", shortname = "pc")]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    #[serde(flatten)]
    pub parameters: ProviderConfigParameters,
}
