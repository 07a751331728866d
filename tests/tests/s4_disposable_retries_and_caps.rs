//! S4: DisposableRequest retries and caps. Three failing attempts bump
//! `failed` to the configured limit; once the limit is reached Observe
//! reports up to date and no further call is made, even once the endpoint
//! would now succeed.
mod common;

use provider_http_api::{DisposableRequestObservation, DisposableRequestParameters, Method, ResponseState};
use provider_http_runtime::checks::matches_expected_response;
use provider_http_runtime::reconcile::disposable::observe;
use provider_http_runtime::secret_store::fake::InMemorySecretStore;
use provider_http_runtime::transport::OutboundRequest;
use std::collections::BTreeMap;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

struct FlakyThenOk {
    remaining_failures: std::sync::atomic::AtomicU32,
}

impl Respond for FlakyThenOk {
    fn respond(&self, _req: &wiremock::Request) -> ResponseTemplate {
        if self.remaining_failures.fetch_sub(1, std::sync::atomic::Ordering::SeqCst) > 0 {
            ResponseTemplate::new(500)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

#[tokio::test]
async fn retries_cap_at_the_configured_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(FlakyThenOk {
            remaining_failures: std::sync::atomic::AtomicU32::new(3),
        })
        .mount(&server)
        .await;

    let store = InMemorySecretStore::default();
    let transport = common::insecure_transport();
    let spec = DisposableRequestParameters {
        url: server.uri(),
        method: Method::Post,
        rollback_retries_limit: Some(3),
        expected_response: "statusCode == 200".into(),
        ..Default::default()
    };

    let mut status = DisposableRequestObservation::default();

    // Reconciles 1-3: each attempt fails and bumps `failed`.
    for expected_failed in 1..=3 {
        let observation = observe(&store, &spec, &status).await.unwrap();
        assert!(!observation.up_to_date, "still under the retry cap");

        let raw = transport
            .send(
                OutboundRequest {
                    method: http::Method::POST,
                    url: spec.url.clone(),
                    body: String::new(),
                    headers: BTreeMap::new(),
                },
                None,
                None,
            )
            .await
            .unwrap();
        let response = ResponseState {
            status_code: raw.status_code as i32,
            body: raw.body,
            headers: raw.headers,
        };
        assert_eq!(response.status_code, 500);
        status.response = response.clone();
        status.failed += 1;
        status.synced = true;
        status.error = "HTTP POST request failed with status code 500".into();
        assert_eq!(status.failed, expected_failed);
        assert!(!matches_expected_response(&spec.expected_response, &response).unwrap());
    }

    // Reconcile 4: limit reached, Observe now reports up to date even
    // though the endpoint would succeed -- no further call is made.
    let observation = observe(&store, &spec, &status).await.unwrap();
    assert!(observation.up_to_date, "retry budget exhausted should be terminal until the user raises the limit");
}
