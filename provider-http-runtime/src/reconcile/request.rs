//! Request reconciler: the stateful Request state machine. Observe decides
//! exists/up-to-date, the framework decides Create/Update/Delete from
//! that, and a response cache survives transient failures to template
//! against.
use std::sync::Arc;

use kube::api::Api;
use kube::runtime::controller::Action as ReconcileAction;
use kube::runtime::finalizer::{finalizer, Event};
use kube::ResourceExt;
use provider_http_api::{Action, Mapping, Request, RequestObservation, RequestParameters, ResponseState};
use tracing::{info, instrument, warn};

use super::{
    build_transport, owner_reference, ready_condition, resolve_bearer_token, resolve_provider_config,
    synced_condition, upsert_condition, now_rfc3339, Context,
};
use crate::error::{Error, Result};
use crate::generator::generate_valid_request_details;
use crate::secret_store::SecretStore;
use crate::substitution::apply_outbound_injections;
use crate::checks::{is_removed, is_up_to_date};

const FINALIZER: &str = "request.http.crossplane.io";

fn is_http_error(status_code: i32) -> bool {
    status_code >= 400
}

fn find_mapping(mappings: &[Mapping], action: Action) -> Option<&Mapping> {
    mappings
        .iter()
        .find(|m| m.action == action)
        .or_else(|| {
            let default_method = provider_http_api::Method::from_action(action).as_http();
            mappings.iter().find(|m| m.effective_method() == default_method && default_method.is_some())
        })
}

/// The result of running the Observe algorithm.
pub struct Observation {
    pub exists: bool,
    pub up_to_date: bool,
    pub response: Option<ResponseState>,
    pub request_details: Option<Mapping>,
    pub new_cache: Option<ResponseState>,
}

/// Run the Observe algorithm (the deletion check is the caller's
/// responsibility via the finalizer).
pub async fn observe<S: SecretStore>(
    store: &S,
    bearer: Option<&str>,
    transport: &crate::transport::Transport,
    spec: &RequestParameters,
    status: &RequestObservation,
) -> Result<Observation> {
    let last_method = status
        .request_details
        .as_ref()
        .and_then(|m| m.effective_method());
    let valid = status.response.status_code != 0
        && !(last_method == Some(http::Method::POST) && is_http_error(status.response.status_code));

    let Some(observe_mapping) = find_mapping(&spec.mappings, Action::Observe) else {
        if !valid {
            return Ok(Observation {
                exists: false,
                up_to_date: false,
                response: None,
                request_details: None,
                new_cache: None,
            });
        }
        return Err(Error::MissingMapping(
            "OBSERVE or GET mapping doesn't exist in request, skipping operation".into(),
        ));
    };

    let generated = match generate_valid_request_details(
        store,
        &spec.payload,
        observe_mapping,
        &status.response,
        &status.cache,
        &spec.headers,
    )
    .await
    {
        Ok(generated) => generated,
        Err(_) if !valid => {
            return Ok(Observation {
                exists: false,
                up_to_date: false,
                response: None,
                request_details: None,
                new_cache: None,
            });
        }
        Err(err) => return Err(err),
    };

    let sent = transport.send(generated.outbound.clone(), bearer, spec.wait_timeout.map(Into::into)).await;
    let raw = match sent {
        Ok(raw) => raw,
        Err(_) if !valid => {
            return Ok(Observation {
                exists: false,
                up_to_date: false,
                response: None,
                request_details: Some(observe_mapping.clone()),
                new_cache: None,
            });
        }
        Err(err) => return Err(err),
    };

    let response = ResponseState {
        status_code: raw.status_code as i32,
        body: raw.body,
        headers: raw.headers,
    };

    if !(200..300).contains(&response.status_code) && !valid {
        return Ok(Observation {
            exists: false,
            up_to_date: false,
            response: Some(response),
            request_details: Some(observe_mapping.clone()),
            new_cache: None,
        });
    }

    if is_removed(store, &spec.is_removed_check, &spec.payload, &response).await? {
        return Ok(Observation {
            exists: false,
            up_to_date: false,
            response: Some(response),
            request_details: Some(observe_mapping.clone()),
            new_cache: None,
        });
    }

    let owner = None;
    apply_outbound_injections(store, &spec.secret_injections, &response, owner).await?;

    let new_cache = templates_all_map(store, spec, &response).await.then(|| response.clone());

    let up_to_date = is_up_to_date(
        store,
        &spec.expected_response_check,
        &spec.payload,
        &spec.mappings,
        &response,
        &spec.headers,
    )
    .await?;

    Ok(Observation {
        exists: true,
        up_to_date,
        response: Some(response),
        request_details: Some(observe_mapping.clone()),
        new_cache,
    })
}

/// The cache only advances when *every* declared mapping can be templated
/// from this response.
async fn templates_all_map<S: SecretStore>(store: &S, spec: &RequestParameters, response: &ResponseState) -> bool {
    for mapping in &spec.mappings {
        if crate::generator::generate_request(store, &spec.payload, mapping, response, &spec.headers)
            .await
            .is_err()
        {
            return false;
        }
    }
    true
}

/// The outcome of one CREATE/UPDATE/REMOVE call: either it landed cleanly,
/// or it landed with a 4xx/5xx — both still carry a response to record on
/// status, unlike a transport failure which never gets one.
pub enum ActionResult {
    Success {
        response: ResponseState,
        request_details: Option<Mapping>,
    },
    HttpError {
        response: ResponseState,
        request_details: Option<Mapping>,
        status: u16,
        method: String,
    },
}

/// Issue one of CREATE/UPDATE/REMOVE. `owner` is only attached to outbound
/// secret injections outside of a deletion.
pub async fn execute_action<S: SecretStore>(
    store: &S,
    bearer: Option<&str>,
    transport: &crate::transport::Transport,
    spec: &RequestParameters,
    action: Action,
    live: &ResponseState,
    cached: &ResponseState,
    owner: Option<&k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference>,
) -> Result<ActionResult> {
    let Some(mapping) = find_mapping(&spec.mappings, action) else {
        return Err(Error::MissingMapping(format!("no mapping declared for action {action:?}")));
    };

    let generated = generate_valid_request_details(store, &spec.payload, mapping, live, cached, &spec.headers).await?;

    let raw = transport
        .send(generated.outbound.clone(), bearer, spec.wait_timeout.map(Into::into))
        .await?;

    let response = ResponseState {
        status_code: raw.status_code as i32,
        body: raw.body,
        headers: raw.headers,
    };

    if is_http_error(response.status_code) {
        return Ok(ActionResult::HttpError {
            status: response.status_code as u16,
            method: format!("{:?}", generated.outbound.method),
            response,
            request_details: Some(mapping.clone()),
        });
    }

    if action != Action::Remove {
        apply_outbound_injections(store, &spec.secret_injections, &response, owner).await?;
    }

    Ok(ActionResult::Success {
        response,
        request_details: Some(mapping.clone()),
    })
}

/// Top-level reconcile entry point wired to `kube::runtime::Controller`.
#[instrument(skip_all, fields(resource.kind = "Request", resource.name = %obj.name_any()))]
pub async fn reconcile<S: SecretStore>(obj: Arc<Request>, ctx: Arc<Context<S>>) -> Result<ReconcileAction> {
    let api: Api<Request> = Api::all(ctx.client.clone());
    finalizer(&api, FINALIZER, obj, |event| async {
        match event {
            Event::Apply(obj) => apply(&obj, &ctx).await,
            Event::Cleanup(obj) => cleanup(&obj, &ctx).await,
        }
    })
    .await
    .map_err(|e| Error::MissingMapping(e.to_string()))
}

async fn apply<S: SecretStore>(obj: &Request, ctx: &Context<S>) -> Result<ReconcileAction> {
    let spec = &obj.spec.for_provider;
    let status = obj.status.clone().unwrap_or_default();
    let provider = resolve_provider_config(&ctx.client, spec.provider_config_ref.as_deref()).await?;
    let bearer = resolve_bearer_token(&ctx.secrets, &provider).await?;
    let transport = build_transport(&ctx.secrets, spec.tls_config.as_ref(), provider.tls_config.as_ref()).await?;

    let mut next_status = status.clone();
    next_status.last_reconcile_time = Some(now_rfc3339());

    let observation = match observe(&ctx.secrets, bearer.as_deref(), &transport, spec, &status).await {
        Ok(obs) => obs,
        Err(err) => {
            // Template/secret-resolution errors propagate untouched; the
            // framework re-enters on the next reconcile.
            patch_status(&Api::all(ctx.client.clone()), &obj.name_any(), &next_status).await?;
            return Err(err);
        }
    };

    if let Some(response) = &observation.response {
        next_status.response = response.clone();
    }
    next_status.request_details = observation.request_details.clone();
    if let Some(cache) = &observation.new_cache {
        next_status.cache = cache.clone();
    }

    let (action, owner) = if !observation.exists {
        (Action::Create, owner_reference(obj).ok())
    } else if !observation.up_to_date {
        (Action::Update, owner_reference(obj).ok())
    } else {
        (Action::Unset, None)
    };

    if action != Action::Unset {
        let result = execute_action(
            &ctx.secrets,
            bearer.as_deref(),
            &transport,
            spec,
            action,
            &next_status.response,
            &next_status.cache,
            owner.as_ref(),
        )
        .await;

        match result {
            Ok(ActionResult::Success { response, request_details }) => {
                if templates_all_map(&ctx.secrets, spec, &response).await {
                    next_status.cache = response.clone();
                }
                next_status.response = response;
                next_status.request_details = request_details;
                next_status.failed = 0;
                upsert_condition(&mut next_status.conditions, ready_condition(true, "Available", ""));
                upsert_condition(&mut next_status.conditions, synced_condition(true, "ReconcileSuccess", ""));
                info!(action = ?action, "request action applied");
            }
            Ok(ActionResult::HttpError { response, request_details, status: code, method }) => {
                next_status.response = response;
                next_status.request_details = request_details;
                next_status.failed += 1;
                let msg = format!("HTTP {method} request failed with status code {code}");
                upsert_condition(&mut next_status.conditions, ready_condition(false, "HttpError", &msg));
                upsert_condition(&mut next_status.conditions, synced_condition(false, "HttpError", &msg));
                warn!(%msg, "request http error");
                patch_status(&Api::all(ctx.client.clone()), &obj.name_any(), &next_status).await?;
                return Err(Error::HttpStatus { method, status: code });
            }
            Err(Error::Transport(msg)) => {
                next_status.failed += 1;
                next_status.response.status_code = 0;
                upsert_condition(&mut next_status.conditions, ready_condition(false, "TransportError", &msg));
                upsert_condition(&mut next_status.conditions, synced_condition(false, "TransportError", &msg));
                warn!(error = %msg, "request transport failure");
                patch_status(&Api::all(ctx.client.clone()), &obj.name_any(), &next_status).await?;
                return Err(Error::Transport(msg));
            }
            Err(err) => {
                patch_status(&Api::all(ctx.client.clone()), &obj.name_any(), &next_status).await?;
                return Err(err);
            }
        }
    } else {
        upsert_condition(&mut next_status.conditions, ready_condition(true, "Available", ""));
        upsert_condition(&mut next_status.conditions, synced_condition(true, "ReconcileSuccess", ""));
        info!("request up to date");
    }

    patch_status(&Api::all(ctx.client.clone()), &obj.name_any(), &next_status).await?;
    Ok(ReconcileAction::requeue(ctx.requeue_default))
}

/// Delete: issue REMOVE once, best-effort; errors are logged, never fatal,
/// so the finalizer always clears.
async fn cleanup<S: SecretStore>(obj: &Request, ctx: &Context<S>) -> Result<ReconcileAction> {
    let spec = &obj.spec.for_provider;
    let status = obj.status.clone().unwrap_or_default();
    let provider = resolve_provider_config(&ctx.client, spec.provider_config_ref.as_deref()).await?;
    let bearer = resolve_bearer_token(&ctx.secrets, &provider).await?;

    if let Ok(transport) = build_transport(&ctx.secrets, spec.tls_config.as_ref(), provider.tls_config.as_ref()).await {
        if let Err(err) = execute_action(
            &ctx.secrets,
            bearer.as_deref(),
            &transport,
            spec,
            Action::Remove,
            &status.response,
            &status.cache,
            None,
        )
        .await
        {
            warn!(error = %err, "best-effort REMOVE failed during deletion");
        }
    }

    Ok(ReconcileAction::await_change())
}

async fn patch_status(api: &Api<Request>, name: &str, status: &RequestObservation) -> Result<()> {
    crate::status::apply_status(api, name, serde_json::to_value(status).map_err(|e| Error::Template(httpjq::Error::Eval {
        expr: "status".into(),
        detail: e.to_string(),
    }))?)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret_store::fake::InMemorySecretStore;
    use provider_http_api::{ExpectedResponseCheck, Method, Payload};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn insecure_transport() -> crate::transport::Transport {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let config = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        crate::transport::Transport::new(config)
    }

    fn mapping(action: Action, method: Method, url: &str) -> Mapping {
        Mapping {
            action,
            method,
            url_template: url.into(),
            body_template: None,
            headers: None,
        }
    }

    #[tokio::test]
    async fn observe_reports_not_found_on_no_prior_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = InMemorySecretStore::default();
        let transport = insecure_transport();
        let spec = RequestParameters {
            mappings: vec![mapping(
                Action::Observe,
                Method::Unset,
                &format!("\"{}/users/1\"", server.uri()),
            )],
            payload: Payload {
                base_url: server.uri(),
                body: String::new(),
            },
            expected_response_check: ExpectedResponseCheck::default(),
            is_removed_check: ExpectedResponseCheck::default(),
            ..Default::default()
        };
        let status = RequestObservation::default();

        let observation = observe(&store, None, &transport, &spec, &status).await.unwrap();
        assert!(!observation.exists);
    }

    #[tokio::test]
    async fn observe_reports_up_to_date_when_no_update_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"1"}"#))
            .mount(&server)
            .await;

        let store = InMemorySecretStore::default();
        let transport = insecure_transport();
        let spec = RequestParameters {
            mappings: vec![mapping(
                Action::Observe,
                Method::Unset,
                &format!("\"{}/users/1\"", server.uri()),
            )],
            payload: Payload {
                base_url: server.uri(),
                body: String::new(),
            },
            ..Default::default()
        };
        let status = RequestObservation {
            response: ResponseState {
                status_code: 200,
                body: r#"{"id":"1"}"#.into(),
                headers: Default::default(),
            },
            ..Default::default()
        };

        let observation = observe(&store, None, &transport, &spec, &status).await.unwrap();
        assert!(observation.exists);
        assert!(observation.up_to_date);
        assert!(observation.new_cache.is_some());
    }
}
