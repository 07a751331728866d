//! S2: PUT triggered by drift. The observed body no longer contains the
//! desired username, so the DEFAULT up-to-date check fails and the caller
//! issues the UPDATE mapping.
mod common;

use provider_http_api::{Action, Mapping, Method, Payload, RequestObservation, RequestParameters, ResponseState};
use provider_http_runtime::checks::is_up_to_date;
use provider_http_runtime::reconcile::request::{execute_action, ActionResult};
use provider_http_runtime::secret_store::fake::InMemorySecretStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mappings() -> Vec<Mapping> {
    vec![Mapping {
        action: Action::Update,
        method: Method::Unset,
        url_template: r#".payload.baseUrl"#.into(),
        body_template: Some(r#".payload.body"#.into()),
        headers: None,
    }]
}

#[tokio::test]
async fn drift_triggers_put() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/u/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"1","username":"u2"}"#))
        .mount(&server)
        .await;

    let store = InMemorySecretStore::default();
    let transport = common::insecure_transport();
    let spec = RequestParameters {
        mappings: mappings(),
        payload: Payload {
            base_url: format!("{}/u/1", server.uri()),
            body: r#"{"username":"u2"}"#.into(),
        },
        ..Default::default()
    };

    let stale = ResponseState {
        status_code: 200,
        body: r#"{"id":"1","username":"u"}"#.into(),
        headers: Default::default(),
    };

    let up_to_date = is_up_to_date(&store, &spec.expected_response_check, &spec.payload, &spec.mappings, &stale, &spec.headers)
        .await
        .unwrap();
    assert!(!up_to_date, "stale username should not satisfy the desired body");

    let status = RequestObservation {
        response: stale.clone(),
        cache: stale.clone(),
        ..Default::default()
    };
    let result = execute_action(&store, None, &transport, &spec, Action::Update, &status.response, &status.cache, None)
        .await
        .unwrap();
    let ActionResult::Success { response, .. } = result else {
        panic!("expected PUT to succeed");
    };
    assert!(response.body.contains("u2"));

    let up_to_date = is_up_to_date(&store, &spec.expected_response_check, &spec.payload, &spec.mappings, &response, &spec.headers)
        .await
        .unwrap();
    assert!(up_to_date, "post-PUT body should now satisfy the desired state");
}
