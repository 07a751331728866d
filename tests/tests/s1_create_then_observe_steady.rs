//! S1: Create then Observe steady. POST creates the resource, a later
//! Observe against GET reports up to date without a second write.
mod common;

use provider_http_api::{Action, Mapping, Method, Payload, RequestObservation, RequestParameters, ResponseState};
use provider_http_runtime::reconcile::request::{execute_action, observe, ActionResult};
use provider_http_runtime::secret_store::fake::InMemorySecretStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mappings() -> Vec<Mapping> {
    vec![
        Mapping {
            action: Action::Create,
            method: Method::Unset,
            url_template: r#".payload.baseUrl"#.into(),
            body_template: Some(r#".payload.body"#.into()),
            headers: None,
        },
        Mapping {
            action: Action::Observe,
            method: Method::Unset,
            url_template: r#".payload.baseUrl + "/" + .response.body.id"#.into(),
            body_template: None,
            headers: None,
        },
    ]
}

#[tokio::test]
async fn create_then_steady_observe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/u"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":"1","username":"u"}"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/u/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"1","username":"u"}"#))
        .mount(&server)
        .await;

    let store = InMemorySecretStore::default();
    let transport = common::insecure_transport();
    let spec = RequestParameters {
        mappings: mappings(),
        payload: Payload {
            base_url: format!("{}/u", server.uri()),
            body: r#"{"username":"u"}"#.into(),
        },
        ..Default::default()
    };

    // First reconcile: nothing observed yet, so Observe's GET target can't
    // even be built (no cached id) -- the caller falls back to Create.
    let status = RequestObservation::default();
    let obs1 = observe(&store, None, &transport, &spec, &status).await.unwrap();
    assert!(!obs1.exists);

    let result = execute_action(&store, None, &transport, &spec, Action::Create, &status.response, &status.cache, None)
        .await
        .unwrap();
    let ActionResult::Success { response, .. } = result else {
        panic!("expected success");
    };
    assert_eq!(response.status_code, 201);
    assert!(response.body.contains("\"id\":\"1\""));

    // Second reconcile: Observe now has a response with `id` to GET against.
    let status2 = RequestObservation {
        response: response.clone(),
        cache: response,
        ..Default::default()
    };
    let obs2 = observe(&store, None, &transport, &spec, &status2).await.unwrap();
    assert!(obs2.exists);
    assert!(obs2.up_to_date, "identical GET body should report up to date");
}
