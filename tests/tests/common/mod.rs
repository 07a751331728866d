//! Shared fixtures for the scenario tests.
use provider_http_runtime::transport::Transport;
use rustls::ClientConfig;

pub fn insecure_transport() -> Transport {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    Transport::new(config)
}
