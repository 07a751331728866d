//! Everything the `Request` and `DisposableRequest` reconcilers share: the
//! provider-config/bearer-token resolution chain, TLS-config-to-transport
//! wiring, and condition bookkeeping. The `kube::runtime::Controller`
//! wiring itself lives in the `provider-http` binary crate.
pub mod disposable;
pub mod request;

use std::time::Duration as StdDuration;

use chrono::Utc;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, OwnerReference, Time};
use kube::api::Api;
use kube::{Client, Resource, ResourceExt};
use provider_http_api::{ProviderConfig, ProviderConfigParameters, TlsConfig, DEFAULT_PROVIDER_CONFIG_NAME};

use crate::error::{Error, Result};
use crate::secret_store::{get_key, SecretStore};
use crate::transport::Transport;

/// Shared state handed to every reconcile invocation.
pub struct Context<S: SecretStore> {
    pub client: Client,
    pub secrets: S,
    pub requeue_default: StdDuration,
}

/// Resolve the `ProviderConfig` named `provider_config_ref` (or `"default"`
/// when unset).
pub async fn resolve_provider_config(
    client: &Client,
    provider_config_ref: Option<&str>,
) -> Result<ProviderConfigParameters> {
    let name = provider_config_ref.unwrap_or(DEFAULT_PROVIDER_CONFIG_NAME);
    let api: Api<ProviderConfig> = Api::all(client.clone());
    let config = api.get(name).await?;
    Ok(config.spec.parameters)
}

/// Resolve the bearer token named by a `ProviderConfig`'s credentials, if
/// any is configured.
pub async fn resolve_bearer_token<S: SecretStore>(
    store: &S,
    provider: &ProviderConfigParameters,
) -> Result<Option<String>> {
    let Some(secret_ref) = &provider.credentials.bearer_token_secret_ref else {
        return Ok(None);
    };
    let token = get_key(store, &secret_ref.namespace, &secret_ref.name, &secret_ref.key).await?;
    Ok(Some(token))
}

/// Build the rustls client config a reconcile's transport should use: the
/// merged resource/provider TLS config, resolved against the secret store.
pub async fn build_transport<S: SecretStore>(
    store: &S,
    resource_tls: Option<&TlsConfig>,
    provider_tls: Option<&TlsConfig>,
) -> Result<Transport> {
    let merged = TlsConfig::merge(resource_tls, provider_tls);
    let client_config = crate::tls::build_client_config(store, &merged).await?;
    Ok(Transport::new(client_config))
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn now_time() -> Time {
    Time(Utc::now())
}

fn condition(type_: &str, is_true: bool, reason: &str, message: &str) -> Condition {
    Condition {
        type_: type_.to_string(),
        status: if is_true { "True" } else { "False" }.to_string(),
        reason: reason.to_string(),
        message: message.to_string(),
        last_transition_time: now_time(),
        observed_generation: None,
    }
}

/// The standard `Ready` condition both reconcilers maintain: `True` once a
/// validated response lands, `False` with the last error message otherwise.
pub fn ready_condition(is_ready: bool, reason: &str, message: &str) -> Condition {
    condition("Ready", is_ready, reason, message)
}

/// The `Synced` condition: `True` once the reconciler has driven the
/// endpoint to the declared state without an outstanding failure.
pub fn synced_condition(is_synced: bool, reason: &str, message: &str) -> Condition {
    condition("Synced", is_synced, reason, message)
}

/// Replace any existing condition of the same `type` and append the new
/// one, matching the standard Kubernetes conditions-list convention.
pub fn upsert_condition(conditions: &mut Vec<Condition>, new: Condition) {
    conditions.retain(|c| c.type_ != new.type_);
    conditions.push(new);
}

/// Owner reference pointing at `obj`, used by outbound secret injection
/// when `setOwnerReference` is requested.
pub fn owner_reference<K>(obj: &K) -> Result<OwnerReference>
where
    K: Resource<DynamicType = ()> + ResourceExt,
{
    let name = obj.name_any();
    if name.is_empty() {
        return Err(Error::MissingMapping("object has no name".into()));
    }
    Ok(OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name,
        uid: obj.uid().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}
