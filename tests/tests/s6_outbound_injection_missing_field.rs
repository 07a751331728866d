//! S6: Outbound secret injection with a missing field. `refresh` isn't
//! present in the response and is configured with `setEmpty`, so it lands
//! as an empty string while `token` is base64-encoded normally.
use base64::Engine;
use provider_http_api::{KeyInjection, MissingFieldStrategy, ResourceRef, ResponseState, SecretInjectionConfig};
use provider_http_runtime::secret_store::fake::InMemorySecretStore;
use provider_http_runtime::secret_store::SecretStore;
use provider_http_runtime::substitution::apply_outbound_injections;

#[tokio::test]
async fn missing_field_is_set_empty_present_field_is_encoded() {
    let store = InMemorySecretStore::default();
    let response = ResponseState {
        status_code: 200,
        body: r#"{"token":"abc"}"#.into(),
        headers: Default::default(),
    };
    let injections = vec![SecretInjectionConfig {
        secret_ref: ResourceRef {
            name: "creds".into(),
            namespace: "default".into(),
            key: String::new(),
        },
        key_mappings: vec![
            KeyInjection {
                secret_key: "refresh".into(),
                response_jq: ".body.refresh".into(),
                missing_field_strategy: MissingFieldStrategy::SetEmpty,
            },
            KeyInjection {
                secret_key: "access".into(),
                response_jq: ".body.token".into(),
                missing_field_strategy: MissingFieldStrategy::Delete,
            },
        ],
        metadata: Default::default(),
        set_owner_reference: false,
    }];

    apply_outbound_injections(&store, &injections, &response, None).await.unwrap();

    let entry = store.get("default", "creds").await.unwrap().unwrap();
    assert_eq!(entry.get_str("refresh").unwrap(), "");
    let expected_access = base64::engine::general_purpose::STANDARD.encode("abc");
    assert_eq!(entry.get_str("access").unwrap(), expected_access);
}
