//! Request generator: build `{method, url, body, headers}` from a `Payload`
//! + `Mapping`, templated through the query engine against the payload and
//! the prior response, then patched for secret tokens.
use std::collections::BTreeMap;

use provider_http_api::{Mapping, Payload, ResponseState};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::secret_store::SecretStore;
use crate::substitution::{substitute_inbound, substitute_inbound_headers};
use crate::transport::OutboundRequest;

/// The result of generating one request: the decrypted form ready to send,
/// and the encrypted (token-preserving) form suitable for status/audit.
#[derive(Clone, Debug, Default)]
pub struct GeneratedRequest {
    pub outbound: OutboundRequest,
    pub encrypted_url: String,
    pub encrypted_body: String,
    pub encrypted_headers: BTreeMap<String, Vec<String>>,
}

/// Build the jq context templates evaluate against: the payload, plus the
/// prior response with any secret tokens it carries resolved first so
/// templates see real values rather than `{{ref}}` placeholders.
pub(crate) async fn template_context<S: SecretStore>(
    store: &S,
    payload: &Payload,
    response: &ResponseState,
) -> Result<Value> {
    let payload_map = httpjq::struct_to_map(payload).map_err(|e| Error::Template(httpjq::Error::Eval {
        expr: "payload".into(),
        detail: e.to_string(),
    }))?;
    let body = substitute_inbound(store, &response.body).await?.decrypted;
    let (_, headers) = substitute_inbound_headers(store, &response.headers).await?;
    let mut context = serde_json::json!({
        "payload": payload_map,
        "response": {
            "statusCode": response.status_code,
            "body": body,
            "headers": headers,
        },
    });
    httpjq::convert_json_strings_to_maps(&mut context);
    Ok(context)
}

fn well_formed(url: &str) -> bool {
    url.parse::<http::Uri>()
        .ok()
        .and_then(|u| u.scheme().cloned().zip(u.authority().cloned()))
        .is_some()
}

/// Template `mapping` against `payload`/`response`, then resolve any
/// `{{ name:ns:key }}` tokens the rendered body and header values contain.
/// The URL template is evaluated but not itself secret-patched.
pub async fn generate_request<S: SecretStore>(
    store: &S,
    payload: &Payload,
    mapping: &Mapping,
    response: &ResponseState,
    extra_headers: &BTreeMap<String, Vec<String>>,
) -> Result<GeneratedRequest> {
    let context = template_context(store, payload, response).await?;

    let method = mapping.effective_method().ok_or(Error::NoMethod)?;

    let url = httpjq::parse_string(&mapping.url_template, &context)?;
    if !well_formed(&url) {
        return Err(Error::InvalidUrl(url));
    }

    let rendered_body = match &mapping.body_template {
        Some(template) => httpjq::parse_string(template, &context)?,
        None => String::new(),
    };

    let mut rendered_headers = extra_headers.clone();
    if let Some(header_templates) = &mapping.headers {
        let resolved = httpjq::parse_map_of_string_lists(header_templates, &context)?;
        rendered_headers.extend(resolved);
    }

    let body_sub = substitute_inbound(store, &rendered_body).await?;
    let (encrypted_headers, decrypted_headers) = substitute_inbound_headers(store, &rendered_headers).await?;

    Ok(GeneratedRequest {
        outbound: OutboundRequest {
            method,
            url: url.clone(),
            body: body_sub.decrypted,
            headers: decrypted_headers,
        },
        encrypted_url: url,
        encrypted_body: body_sub.encrypted,
        encrypted_headers,
    })
}

/// `isValid`: the URL is non-empty and neither it nor the body contains a
/// literal `null` token — the tell that a template addressed a response
/// field that hasn't appeared yet.
fn is_valid(generated: &GeneratedRequest) -> bool {
    !generated.outbound.url.is_empty()
        && !generated.outbound.url.contains("null")
        && !generated.outbound.body.contains("null")
}

/// Generate against the live response; if that fails outright, or succeeds
/// but addresses data the live response doesn't have yet (`isValid` fails),
/// retry against the cached response before giving up.
pub async fn generate_valid_request_details<S: SecretStore>(
    store: &S,
    payload: &Payload,
    mapping: &Mapping,
    live_response: &ResponseState,
    cached_response: &ResponseState,
    extra_headers: &BTreeMap<String, Vec<String>>,
) -> Result<GeneratedRequest> {
    let live = generate_request(store, payload, mapping, live_response, extra_headers).await;
    match live {
        Ok(generated) if is_valid(&generated) => Ok(generated),
        Ok(invalid) if cached_response.is_empty() => Ok(invalid),
        Err(err) if cached_response.is_empty() => Err(err),
        live_result => {
            let fallback = generate_request(store, payload, mapping, cached_response, extra_headers).await;
            fallback.or(live_result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret_store::fake::InMemorySecretStore;
    use provider_http_api::Action;

    fn mapping(url: &str, body: Option<&str>) -> Mapping {
        Mapping {
            action: Action::Create,
            url_template: url.into(),
            body_template: body.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn renders_url_and_body_from_payload() {
        let store = InMemorySecretStore::default();
        let payload = Payload {
            base_url: "https://example.test/users".into(),
            body: r#"{"username":"alice"}"#.into(),
        };
        let response = ResponseState::default();
        let generated = generate_request(
            &store,
            &payload,
            &mapping(".payload.baseUrl", Some(".payload.body")),
            &response,
            &BTreeMap::new(),
        )
        .await
        .unwrap();

        assert_eq!(generated.outbound.url, "https://example.test/users");
        assert_eq!(generated.outbound.body, r#"{"username":"alice"}"#);
        assert_eq!(generated.outbound.method, http::Method::POST);
    }

    #[tokio::test]
    async fn resolves_secret_tokens_in_body() {
        let store = InMemorySecretStore::with("ns", "creds", "apiKey", "xyz");
        let payload = Payload {
            base_url: "https://example.test".into(),
            body: String::new(),
        };
        let response = ResponseState::default();
        let generated = generate_request(
            &store,
            &payload,
            &mapping(".payload.baseUrl", Some(r#""{\"key\":\"{{ creds:ns:apiKey }}\"}""#)),
            &response,
            &BTreeMap::new(),
        )
        .await
        .unwrap();

        assert_eq!(generated.outbound.body, r#"{"key":"xyz"}"#);
        assert!(generated.encrypted_body.contains("{{ creds:ns:apiKey }}"));
    }

    #[tokio::test]
    async fn invalid_url_template_errors() {
        let store = InMemorySecretStore::default();
        let payload = Payload::default();
        let response = ResponseState::default();
        let err = generate_request(&store, &payload, &mapping("\"not a url\"", None), &response, &BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[tokio::test]
    async fn falls_back_to_cache_when_live_template_fails() {
        let store = InMemorySecretStore::default();
        let payload = Payload {
            base_url: "https://example.test".into(),
            body: String::new(),
        };
        let live = ResponseState::default();
        let cached = ResponseState {
            status_code: 200,
            body: r#"{"id":"42"}"#.into(),
            headers: Default::default(),
        };
        let m = mapping(r#".payload.baseUrl + "/" + .response.body.id"#, None);
        let generated = generate_valid_request_details(&store, &payload, &m, &live, &cached, &BTreeMap::new())
            .await
            .unwrap();
        assert_eq!(generated.outbound.url, "https://example.test/42");
    }
}
