//! S3: 404 is removed. The DEFAULT `IsRemoved` check reports the resource
//! gone as soon as the endpoint starts returning 404, so Observe surfaces
//! `exists=false` and the framework would recreate via POST.
mod common;

use provider_http_api::{Action, Mapping, Method, Payload, RequestObservation, RequestParameters};
use provider_http_runtime::reconcile::request::observe;
use provider_http_runtime::secret_store::fake::InMemorySecretStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mappings() -> Vec<Mapping> {
    vec![Mapping {
        action: Action::Observe,
        method: Method::Unset,
        url_template: r#".payload.baseUrl"#.into(),
        body_template: None,
        headers: None,
    }]
}

#[tokio::test]
async fn missing_resource_is_reported_as_not_existing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/u/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = InMemorySecretStore::default();
    let transport = common::insecure_transport();
    let spec = RequestParameters {
        mappings: mappings(),
        payload: Payload {
            base_url: format!("{}/u/1", server.uri()),
            body: String::new(),
        },
        ..Default::default()
    };

    let status = RequestObservation {
        response: provider_http_api::ResponseState {
            status_code: 200,
            body: r#"{"id":"1"}"#.into(),
            headers: Default::default(),
        },
        ..Default::default()
    };

    let observation = observe(&store, None, &transport, &spec, &status).await.unwrap();
    assert!(!observation.exists);
    assert_eq!(observation.response.unwrap().status_code, 404);
}
