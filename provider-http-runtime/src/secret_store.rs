//! The secret store is an external collaborator: a keyed K/V blob store
//! addressed by `(namespace, name)`, each entry holding a map from string to
//! opaque bytes. This module defines the trait the rest of the reconciler
//! programs against, plus the production implementation backed by
//! Kubernetes `Secret` objects.
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// The contents of one namespaced secret-store entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SecretEntry {
    pub data: BTreeMap<String, ByteString>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub owner_references: Vec<OwnerReference>,
}

impl SecretEntry {
    pub fn get_str(&self, key: &str) -> Option<String> {
        self.data
            .get(key)
            .and_then(|v| String::from_utf8(v.0.clone()).ok())
    }
}

/// A keyed K/V blob store: `Get`, `Create`, `Update`, one entry per
/// `(namespace, name)`.
pub trait SecretStore: Send + Sync {
    /// Fetch an entry. Returns `Ok(None)` if it doesn't exist.
    fn get(
        &self,
        namespace: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<SecretEntry>>> + Send;

    fn create(
        &self,
        namespace: &str,
        name: &str,
        entry: SecretEntry,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    fn update(
        &self,
        namespace: &str,
        name: &str,
        entry: SecretEntry,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Resolve a single key out of a secret-store entry, surfacing the exact
/// "secret <ns>/<name> does not contain key <k>" error the TLS loader and
/// inbound substitution both rely on.
pub async fn get_key<S: SecretStore>(
    store: &S,
    namespace: &str,
    name: &str,
    key: &str,
) -> Result<String> {
    let entry = store
        .get(namespace, name)
        .await?
        .ok_or_else(|| Error::SecretResolution(namespace.to_string(), name.to_string(), "not found".into()))?;
    entry
        .get_str(key)
        .ok_or_else(|| Error::MissingSecretKey {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: key.to_string(),
        })
}

/// Production secret store backed by Kubernetes `Secret` objects.
#[derive(Clone)]
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretEntry>> {
        match self.api(namespace).get_opt(name).await? {
            None => Ok(None),
            Some(secret) => Ok(Some(SecretEntry {
                data: secret.data.unwrap_or_default(),
                labels: secret.metadata.labels.unwrap_or_default(),
                annotations: secret.metadata.annotations.unwrap_or_default(),
                owner_references: secret.metadata.owner_references.unwrap_or_default(),
            })),
        }
    }

    async fn create(&self, namespace: &str, name: &str, entry: SecretEntry) -> Result<()> {
        let secret = to_secret(namespace, name, &entry);
        self.api(namespace).create(&PostParams::default(), &secret).await?;
        Ok(())
    }

    async fn update(&self, namespace: &str, name: &str, entry: SecretEntry) -> Result<()> {
        let secret = to_secret(namespace, name, &entry);
        self.api(namespace)
            .patch(name, &PatchParams::apply("provider-http"), &Patch::Apply(&secret))
            .await?;
        Ok(())
    }
}

fn to_secret(namespace: &str, name: &str, entry: &SecretEntry) -> Secret {
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(entry.labels.clone()),
            annotations: Some(entry.annotations.clone()),
            owner_references: Some(entry.owner_references.clone()),
            ..Default::default()
        },
        data: Some(entry.data.clone()),
        ..Default::default()
    }
}

#[cfg(any(test, feature = "test-util"))]
pub mod fake {
    //! An in-memory `SecretStore` used by unit and integration tests.
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemorySecretStore {
        entries: Mutex<HashMap<(String, String), SecretEntry>>,
    }

    impl SecretStore for InMemorySecretStore {
        async fn get(&self, namespace: &str, name: &str) -> Result<Option<SecretEntry>> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .get(&(namespace.to_string(), name.to_string()))
                .cloned())
        }

        async fn create(&self, namespace: &str, name: &str, entry: SecretEntry) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert((namespace.to_string(), name.to_string()), entry);
            Ok(())
        }

        async fn update(&self, namespace: &str, name: &str, entry: SecretEntry) -> Result<()> {
            self.entries
                .lock()
                .unwrap()
                .insert((namespace.to_string(), name.to_string()), entry);
            Ok(())
        }
    }

    impl InMemorySecretStore {
        pub fn with(namespace: &str, name: &str, key: &str, value: &str) -> Self {
            let store = Self::default();
            let mut data = BTreeMap::new();
            data.insert(key.to_string(), ByteString(value.as_bytes().to_vec()));
            store.entries.lock().unwrap().insert(
                (namespace.to_string(), name.to_string()),
                SecretEntry {
                    data,
                    ..Default::default()
                },
            );
            store
        }
    }
}
