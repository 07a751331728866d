//! Response checks: decide whether an observed response means "up to
//! date", "removed", or "matches what was expected".
use std::collections::BTreeMap;

use provider_http_api::{Action, CheckType, ExpectedResponseCheck, Mapping, Payload, ResponseState};

use crate::error::{Error, Result};
use crate::generator::{generate_request, template_context};
use crate::secret_store::SecretStore;
use crate::substitution::substitute_inbound;

fn is_http_success(status_code: i32) -> bool {
    (200..300).contains(&status_code)
}

/// DEFAULT: generate the UPDATE mapping's body from the current context and
/// compare it against the observed response. CUSTOM: evaluate `logic`
/// against `{payload, response}`.
pub async fn is_up_to_date<S: SecretStore>(
    store: &S,
    check: &ExpectedResponseCheck,
    payload: &Payload,
    mappings: &[Mapping],
    response: &ResponseState,
    extra_headers: &BTreeMap<String, Vec<String>>,
) -> Result<bool> {
    match check.check_type {
        CheckType::Default => default_is_up_to_date(store, payload, mappings, response, extra_headers).await,
        CheckType::Custom => evaluate_custom(store, check, payload, response, "expectedResponseCheck.Logic").await,
    }
}

async fn default_is_up_to_date<S: SecretStore>(
    store: &S,
    payload: &Payload,
    mappings: &[Mapping],
    response: &ResponseState,
    extra_headers: &BTreeMap<String, Vec<String>>,
) -> Result<bool> {
    let Some(update_mapping) = mappings.iter().find(|m| m.action == Action::Update) else {
        return Ok(true);
    };

    let update = generate_request(store, payload, update_mapping, response, extra_headers).await?;
    let update_body = update.outbound.body;
    let response_body = substitute_inbound(store, &response.body).await?.decrypted;

    let update_is_json = httpjq::is_json_string(&update_body);
    let response_is_json = httpjq::is_json_string(&response_body);

    if update_is_json && response_is_json {
        let actual = serde_json::Value::Object(httpjq::json_string_to_map(&response_body));
        let desired = serde_json::Value::Object(httpjq::json_string_to_map(&update_body));
        Ok(httpjq::contains(&actual, &desired) && is_http_success(response.status_code))
    } else if update_is_json {
        Err(Error::InvalidResponseBody(response_body))
    } else {
        Ok(response_body.contains(&update_body) && is_http_success(response.status_code))
    }
}

/// DEFAULT: `statusCode == 404`. CUSTOM: the user's jq boolean expression.
pub async fn is_removed<S: SecretStore>(
    store: &S,
    check: &ExpectedResponseCheck,
    payload: &Payload,
    response: &ResponseState,
) -> Result<bool> {
    match check.check_type {
        CheckType::Default => Ok(response.status_code == 404),
        CheckType::Custom => evaluate_custom(store, check, payload, response, "isRemovedCheck.Logic").await,
    }
}

async fn evaluate_custom<S: SecretStore>(
    store: &S,
    check: &ExpectedResponseCheck,
    payload: &Payload,
    response: &ResponseState,
    field: &str,
) -> Result<bool> {
    let logic = check.logic.as_deref().unwrap_or("");
    let logic = substitute_inbound(store, logic).await?.decrypted;
    let context = template_context(store, payload, response).await?;
    httpjq::parse_bool(&logic, &context).map_err(|e| Error::CustomCheckNotBool {
        field: field.to_string(),
        detail: e.to_string(),
    })
}

/// `DisposableRequest`'s single jq-bool "expected response" check. An empty
/// expression is true; a never-executed call (`statusCode == 0`) is always
/// false regardless of the expression.
pub fn matches_expected_response(expression: &str, response: &ResponseState) -> Result<bool> {
    if response.status_code == 0 {
        return Ok(false);
    }
    let mut context = serde_json::json!({
        "statusCode": response.status_code,
        "body": response.body,
        "headers": response.headers,
    });
    httpjq::convert_json_strings_to_maps(&mut context);
    Ok(httpjq::parse_bool(expression, &context)?)
}
