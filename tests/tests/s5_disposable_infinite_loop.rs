//! S5: DisposableRequest infinite loop. With `shouldLoopInfinitely=true` and
//! no retry cap, a validated response is never marked up to date, so a new
//! call is expected on every poll tick.
mod common;

use provider_http_api::{DisposableRequestObservation, DisposableRequestParameters, Method, ResponseState};
use provider_http_runtime::reconcile::disposable::{observe, poll_interval};
use provider_http_runtime::secret_store::fake::InMemorySecretStore;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn looping_request_never_settles() {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).mount(&server).await;

    let store = InMemorySecretStore::default();
    let spec = DisposableRequestParameters {
        url: server.uri(),
        method: Method::Post,
        should_loop_infinitely: true,
        rollback_retries_limit: None,
        expected_response: "statusCode == 200".into(),
        next_reconcile: Some(kube::core::Duration::from(Duration::from_secs(10))),
        ..Default::default()
    };

    let status = DisposableRequestObservation {
        synced: true,
        failed: 0,
        response: ResponseState {
            status_code: 200,
            body: String::new(),
            headers: Default::default(),
        },
        last_reconcile_time: Some(chrono::Utc::now().to_rfc3339()),
        ..Default::default()
    };

    for _ in 0..3 {
        let observation = observe(&store, &spec, &status).await.unwrap();
        assert!(!observation.up_to_date, "looping with no cap should never settle");
    }

    let interval = poll_interval(&status, spec.next_reconcile.clone(), Duration::from_secs(30));
    assert!(interval <= Duration::from_secs(10));
}
