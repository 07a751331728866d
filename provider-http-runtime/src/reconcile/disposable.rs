//! DisposableRequest reconciler: a fire-once HTTP call with a
//! bounded retry budget, or a scheduled loop when `nextReconcile` is set.
//! Unlike `Request`, the URL/method/body/headers are plain immutable
//! strings — there is no templating step, only inbound secret patching.
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use kube::api::Api;
use kube::runtime::controller::Action as ReconcileAction;
use kube::ResourceExt;
use provider_http_api::{DisposableRequest, DisposableRequestObservation, DisposableRequestParameters, ResponseState};
use tracing::{info, instrument, warn};

use super::{
    build_transport, now_rfc3339, owner_reference, ready_condition, resolve_bearer_token, resolve_provider_config,
    upsert_condition, Context,
};
use crate::checks::matches_expected_response;
use crate::error::{Error, Result};
use crate::secret_store::SecretStore;
use crate::status::FailureTracker;
use crate::substitution::{apply_outbound_injections, substitute_inbound, substitute_inbound_headers};
use crate::transport::OutboundRequest;

/// Poll interval: reschedule at the remaining delta of
/// `nextReconcile` from `lastReconcileTime`, falling back to `default`.
pub fn poll_interval(
    status: &DisposableRequestObservation,
    next_reconcile: Option<kube::core::Duration>,
    default: StdDuration,
) -> StdDuration {
    let Some(next) = next_reconcile else { return default };
    let Some(last) = &status.last_reconcile_time else { return default };
    let Ok(last_time) = chrono::DateTime::parse_from_rfc3339(last) else { return default };
    let delta: StdDuration = next.into();
    let Ok(delta) = chrono::Duration::from_std(delta) else { return default };
    let target = last_time.with_timezone(&Utc) + delta;
    let now = Utc::now();
    if now < target {
        (target - now).to_std().unwrap_or(default)
    } else {
        default
    }
}

fn rollback_limit_reached(spec: &DisposableRequestParameters, status: &DisposableRequestObservation) -> bool {
    spec.rollback_retries_limit.map(|limit| status.failed >= limit).unwrap_or(false)
}

/// The `upToDate` formula: stop retrying once the rollback cap is hit,
/// keep going forever when looping with no cap declared.
fn is_up_to_date(spec: &DisposableRequestParameters, status: &DisposableRequestObservation) -> bool {
    let rollback_enabled = spec.rollback_retries_limit.is_some();
    let limit_reached = rollback_limit_reached(spec, status);
    let looping_forever = spec.should_loop_infinitely && spec.rollback_retries_limit.is_none();
    !(rollback_enabled && !limit_reached) && !looping_forever
}

/// The result of running the Observe algorithm.
pub struct Observation {
    pub exists: bool,
    pub up_to_date: bool,
    pub message: String,
}

fn apply_tracker(status: &mut DisposableRequestObservation, tracker: &FailureTracker) {
    status.failed = tracker.failed;
    status.error = tracker.error.clone();
    status.synced = tracker.synced;
}

/// Run the Observe steps (deletion is the caller's concern; there is
/// no finalizer since Delete never makes an external call).
pub async fn observe<S: SecretStore>(
    store: &S,
    spec: &DisposableRequestParameters,
    status: &DisposableRequestObservation,
) -> Result<Observation> {
    if !status.synced {
        return Ok(Observation {
            exists: false,
            up_to_date: false,
            message: String::new(),
        });
    }

    let message = if matches_expected_response(&spec.expected_response, &status.response)? {
        String::new()
    } else {
        Error::ResponseNotExpected.to_string()
    };

    let up_to_date = is_up_to_date(spec, status);

    if !status.response.is_empty() && !spec.secret_injections.is_empty() {
        apply_outbound_injections(store, &spec.secret_injections, &status.response, None).await?;
    }

    Ok(Observation {
        exists: true,
        up_to_date,
        message,
    })
}

/// Create/Update: issue the call unless it is already up to date or
/// the retry cap has been hit, then validate the response.
pub async fn apply<S: SecretStore>(obj: &DisposableRequest, ctx: &Context<S>) -> Result<ReconcileAction> {
    let spec = &obj.spec.for_provider;
    let status = obj.status.clone().unwrap_or_default();
    let api: Api<DisposableRequest> = Api::all(ctx.client.clone());

    let method = spec.method.as_http().ok_or(Error::NoMethod)?;
    spec.url.parse::<http::Uri>().map_err(|_| Error::InvalidUrl(spec.url.clone()))?;

    let observation = observe(&ctx.secrets, spec, &status).await?;
    let mut next_status = status.clone();

    if observation.up_to_date {
        if observation.message.is_empty() {
            upsert_condition(&mut next_status.conditions, ready_condition(true, "Available", ""));
        } else {
            upsert_condition(&mut next_status.conditions, ready_condition(false, "RetriesExhausted", &observation.message));
        }
        patch_status(&api, &obj.name_any(), &next_status).await?;
        let interval = poll_interval(&next_status, spec.next_reconcile.clone(), ctx.requeue_default);
        return Ok(ReconcileAction::requeue(interval));
    }

    upsert_condition(&mut next_status.conditions, ready_condition(false, "NotUpToDate", &observation.message));

    // The synced-and-not-looping and rollback-limit-reached checks are both
    // already folded into `is_up_to_date`'s formula above; the `up_to_date`
    // branch is the single no-op gate.
    let provider = resolve_provider_config(&ctx.client, spec.provider_config_ref.as_deref()).await?;
    let bearer = resolve_bearer_token(&ctx.secrets, &provider).await?;
    let transport = build_transport(&ctx.secrets, spec.tls_config.as_ref(), provider.tls_config.as_ref()).await?;

    let body = substitute_inbound(&ctx.secrets, &spec.body).await?.decrypted;
    let (_, headers) = substitute_inbound_headers(&ctx.secrets, &spec.headers).await?;
    let outbound = OutboundRequest {
        method,
        url: spec.url.clone(),
        body,
        headers,
    };

    next_status.last_reconcile_time = Some(now_rfc3339());
    let mut tracker = FailureTracker::resume(next_status.failed, next_status.error.clone(), next_status.synced);

    let sent = transport.send(outbound, bearer.as_deref(), spec.wait_timeout.clone().map(Into::into)).await;
    let raw = match sent {
        Ok(raw) => raw,
        Err(Error::Transport(msg)) => {
            tracker.set_error(Some(msg.clone()));
            apply_tracker(&mut next_status, &tracker);
            upsert_condition(&mut next_status.conditions, ready_condition(false, "TransportError", &msg));
            warn!(error = %msg, "disposable request transport failure");
            patch_status(&api, &obj.name_any(), &next_status).await?;
            return Err(Error::Transport(msg));
        }
        Err(err) => return Err(err),
    };

    let response = ResponseState {
        status_code: raw.status_code as i32,
        body: raw.body,
        headers: raw.headers,
    };
    next_status.response = response.clone();

    if raw.status_code >= 400 {
        let msg = format!("HTTP {method} request failed with status code {}", raw.status_code);
        tracker.set_error(Some(msg.clone()));
        apply_tracker(&mut next_status, &tracker);
        upsert_condition(&mut next_status.conditions, ready_condition(false, "HttpError", &msg));
        warn!(%msg, "disposable request http error");
        patch_status(&api, &obj.name_any(), &next_status).await?;
        return Err(Error::HttpStatus {
            method: format!("{method}"),
            status: raw.status_code,
        });
    }

    if matches_expected_response(&spec.expected_response, &response)? {
        let owner = owner_reference(obj).ok();
        apply_outbound_injections(&ctx.secrets, &spec.secret_injections, &response, owner.as_ref()).await?;
        tracker.set_synced(true);
        apply_tracker(&mut next_status, &tracker);
        upsert_condition(&mut next_status.conditions, ready_condition(true, "Available", ""));
        info!("disposable request synced");
    } else {
        let limit = spec.rollback_retries_limit.unwrap_or_default();
        let msg = format!("Response does not match the expected format, retries limit {limit}");
        tracker.set_error(Some(msg.clone()));
        apply_tracker(&mut next_status, &tracker);
        upsert_condition(&mut next_status.conditions, ready_condition(false, "ResponseNotExpected", &msg));
        warn!(%msg, "disposable request response not expected");
    }

    patch_status(&api, &obj.name_any(), &next_status).await?;
    let interval = poll_interval(&next_status, spec.next_reconcile.clone(), ctx.requeue_default);
    Ok(ReconcileAction::requeue(interval))
}

/// Delete: no external call is ever made, so there is nothing to clean up.
pub async fn cleanup() -> Result<ReconcileAction> {
    Ok(ReconcileAction::await_change())
}

#[instrument(skip_all, fields(resource.kind = "DisposableRequest", resource.name = %obj.name_any()))]
pub async fn reconcile<S: SecretStore>(obj: Arc<DisposableRequest>, ctx: Arc<Context<S>>) -> Result<ReconcileAction> {
    if obj.meta().deletion_timestamp.is_some() {
        return cleanup().await;
    }
    apply(&obj, &ctx).await
}

async fn patch_status(api: &Api<DisposableRequest>, name: &str, status: &DisposableRequestObservation) -> Result<()> {
    crate::status::apply_status(
        api,
        name,
        serde_json::to_value(status).map_err(|e| {
            Error::Template(httpjq::Error::Eval {
                expr: "status".into(),
                detail: e.to_string(),
            })
        })?,
    )
    .await
}
