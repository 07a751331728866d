//! Bidirectional secret substitution: inbound token replacement for
//! outgoing request material, and outbound extraction of response
//! fragments into secret entries.
use base64::{engine::general_purpose::STANDARD, Engine};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use provider_http_api::{KeyInjection, MissingFieldStrategy, ResponseState, SecretInjectionConfig};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::secret_store::{get_key, SecretEntry, SecretStore};

/// A string that has gone through inbound substitution: `encrypted` is the
/// original, token-bearing text (safe to log and to keep in status for
/// audit); `decrypted` has every `{{name:ns:key}}` token replaced with the
/// resolved secret value and is what actually goes over the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Substituted {
    pub encrypted: String,
    pub decrypted: String,
}

struct Token {
    /// Byte range in the source string, including the `{{`/`}}` delimiters.
    span: (usize, usize),
    name: String,
    namespace: String,
    key: String,
}

fn find_tokens(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while let Some(start) = input[i..].find("{{") {
        let start = i + start;
        let Some(end_rel) = input[start + 2..].find("}}") else {
            break;
        };
        let end = start + 2 + end_rel + 2;
        let inner = &input[start + 2..start + 2 + end_rel];
        let parts: Vec<&str> = inner.split(':').map(str::trim).collect();
        if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
            tokens.push(Token {
                span: (start, end),
                name: parts[0].to_string(),
                namespace: parts[1].to_string(),
                key: parts[2].to_string(),
            });
        }
        i = end;
    }
    tokens
}

/// Replace every `{{ name:namespace:key }}` token in `input` with the value
/// read from the secret store, whitespace around each part tolerated.
pub async fn substitute_inbound<S: SecretStore>(store: &S, input: &str) -> Result<Substituted> {
    let tokens = find_tokens(input);
    if tokens.is_empty() {
        return Ok(Substituted {
            encrypted: input.to_string(),
            decrypted: input.to_string(),
        });
    }

    let mut decrypted = String::with_capacity(input.len());
    let mut cursor = 0;
    for token in &tokens {
        decrypted.push_str(&input[cursor..token.span.0]);
        let value = get_key(store, &token.namespace, &token.name, &token.key).await?;
        decrypted.push_str(&value);
        cursor = token.span.1;
    }
    decrypted.push_str(&input[cursor..]);

    Ok(Substituted {
        encrypted: input.to_string(),
        decrypted,
    })
}

/// Apply [`substitute_inbound`] to every value in a multi-value header map,
/// preserving key order is not required since headers are keyed maps.
pub async fn substitute_inbound_headers<S: SecretStore>(
    store: &S,
    headers: &BTreeMap<String, Vec<String>>,
) -> Result<(BTreeMap<String, Vec<String>>, BTreeMap<String, Vec<String>>)> {
    let mut encrypted = BTreeMap::new();
    let mut decrypted = BTreeMap::new();
    for (key, values) in headers {
        let mut enc_values = Vec::with_capacity(values.len());
        let mut dec_values = Vec::with_capacity(values.len());
        for v in values {
            let sub = substitute_inbound(store, v).await?;
            enc_values.push(sub.encrypted);
            dec_values.push(sub.decrypted);
        }
        encrypted.insert(key.clone(), enc_values);
        decrypted.insert(key.clone(), dec_values);
    }
    Ok((encrypted, decrypted))
}

/// Build the JSON context outbound injection's `responseJQ` expressions
/// evaluate against: `{statusCode, body (parsed if JSON), headers}`.
pub fn response_context(response: &ResponseState) -> Value {
    let body = if httpjq::is_json_string(&response.body) {
        Value::Object(httpjq::json_string_to_map(&response.body))
    } else {
        Value::String(response.body.clone())
    };
    serde_json::json!({
        "statusCode": response.status_code,
        "body": body,
        "headers": response.headers,
    })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Run every declared [`SecretInjectionConfig`] against `response`,
/// get-or-creating the destination secret and applying each key's
/// missing-field strategy.
pub async fn apply_outbound_injections<S: SecretStore>(
    store: &S,
    injections: &[SecretInjectionConfig],
    response: &ResponseState,
    owner: Option<&OwnerReference>,
) -> Result<()> {
    let context = response_context(response);
    for injection in injections {
        let namespace = &injection.secret_ref.namespace;
        let name = &injection.secret_ref.name;
        let existing = store.get(namespace, name).await?;
        let mut entry = existing.clone().unwrap_or_default();

        for (k, v) in &injection.metadata.labels {
            entry.labels.insert(k.clone(), v.clone());
        }
        for (k, v) in &injection.metadata.annotations {
            entry.annotations.insert(k.clone(), v.clone());
        }
        if injection.set_owner_reference {
            if let Some(owner) = owner {
                if !entry.owner_references.iter().any(|o| o.uid == owner.uid) {
                    entry.owner_references.push(owner.clone());
                }
            }
        }

        for mapping in &injection.key_mappings {
            apply_one_key(&mut entry, mapping, &context);
        }

        if existing.is_some() {
            store.update(namespace, name, entry).await?;
        } else {
            store.create(namespace, name, entry).await?;
        }
    }
    Ok(())
}

fn apply_one_key(entry: &mut SecretEntry, mapping: &KeyInjection, context: &Value) {
    let value = httpjq::parse_value(&mapping.response_jq, context).ok();

    match value {
        Some(value) if !value.is_null() => {
            let encoded = STANDARD.encode(stringify(&value));
            entry
                .data
                .insert(mapping.secret_key.clone(), ByteString(encoded.into_bytes()));
        }
        _ => match mapping.missing_field_strategy {
            MissingFieldStrategy::Preserve => {}
            MissingFieldStrategy::SetEmpty => {
                entry.data.insert(mapping.secret_key.clone(), ByteString(Vec::new()));
            }
            MissingFieldStrategy::Delete => {
                entry.data.remove(&mapping.secret_key);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret_store::fake::InMemorySecretStore;

    #[tokio::test]
    async fn substitutes_single_token() {
        let store = InMemorySecretStore::with("ns", "creds", "token", "s3cr3t");
        let sub = substitute_inbound(&store, "Bearer {{ creds:ns:token }}").await.unwrap();
        assert_eq!(sub.decrypted, "Bearer s3cr3t");
        assert_eq!(sub.encrypted, "Bearer {{ creds:ns:token }}");
    }

    #[tokio::test]
    async fn no_tokens_is_a_no_op() {
        let store = InMemorySecretStore::default();
        let sub = substitute_inbound(&store, "plain text").await.unwrap();
        assert_eq!(sub.decrypted, "plain text");
        assert_eq!(sub.encrypted, "plain text");
    }

    #[tokio::test]
    async fn missing_field_strategies_match_table() {
        let store = InMemorySecretStore::default();
        let response = ResponseState {
            status_code: 200,
            body: r#"{"token":"abc"}"#.to_string(),
            headers: Default::default(),
        };
        let injections = vec![SecretInjectionConfig {
            secret_ref: provider_http_api::ResourceRef {
                name: "out".into(),
                namespace: "ns".into(),
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
        let entry = store.get("ns", "out").await.unwrap().unwrap();
        assert_eq!(entry.data.get("refresh").unwrap().0, Vec::<u8>::new());
        let access_b64 = String::from_utf8(entry.data.get("access").unwrap().0.clone()).unwrap();
        assert_eq!(STANDARD.decode(access_b64).unwrap(), b"abc");
    }
}
