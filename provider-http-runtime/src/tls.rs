//! TLS/credential loading: resolve CA bundle, client certificate, and
//! client key from inline bytes or secret references, and build a
//! `rustls::ClientConfig` the outbound transport can use.
use std::sync::Arc;

use provider_http_api::TlsConfig as TlsSpec;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use rustls_pemfile::Item;

use crate::error::{Error, Result};
use crate::secret_store::{get_key, SecretStore};

/// Resolve `spec` (already the result of [`TlsConfig::merge`]) against the
/// secret store and build a ready-to-use rustls client configuration.
pub async fn build_client_config<S: SecretStore>(store: &S, spec: &TlsSpec) -> Result<ClientConfig> {
    let ca_bundle = resolve_ca_bundle(store, spec).await?;
    let identity = resolve_identity(store, spec).await?;

    let builder = if let Some(ca_bundle) = &ca_bundle {
        ClientConfig::builder().with_root_certificates(root_store(ca_bundle)?)
    } else {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        ClientConfig::builder().with_root_certificates(roots)
    };

    let mut config = match identity {
        Some((chain, key)) => builder
            .with_client_auth_cert(chain, key)
            .map_err(|e| Error::TlsConfig(format!("invalid client certificate/key: {e}")))?,
        None => builder.with_no_client_auth(),
    };

    if spec.insecure_skip_verify {
        config
            .dangerous()
            .set_certificate_verifier(Arc::new(NoVerifier));
    }

    Ok(config)
}

async fn resolve_ca_bundle<S: SecretStore>(store: &S, spec: &TlsSpec) -> Result<Option<Vec<u8>>> {
    if let Some(inline) = &spec.ca_bundle {
        return Ok(Some(inline.0.clone()));
    }
    let Some(ca_ref) = &spec.ca_ref else {
        return Ok(None);
    };
    let pem = get_key(store, &ca_ref.namespace, &ca_ref.name, &ca_ref.key).await?;
    Ok(Some(pem.into_bytes()))
}

async fn resolve_identity<S: SecretStore>(
    store: &S,
    spec: &TlsSpec,
) -> Result<Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>> {
    let (Some(cert_ref), Some(key_ref)) = (&spec.client_cert_ref, &spec.client_key_ref) else {
        return Ok(None);
    };
    let cert_pem = get_key(store, &cert_ref.namespace, &cert_ref.name, &cert_ref.key).await?;
    let key_pem = get_key(store, &key_ref.namespace, &key_ref.name, &key_ref.key).await?;
    Ok(Some(parse_identity(cert_pem.as_bytes(), key_pem.as_bytes())?))
}

fn root_store(pem: &[u8]) -> Result<RootCertStore> {
    let mut store = RootCertStore::empty();
    let certs = rustls_pemfile::certs(&mut std::io::Cursor::new(pem))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::TlsConfig(format!("invalid CA bundle: {e}")))?;
    if certs.is_empty() {
        return Err(Error::TlsConfig("failed to parse CA bundle".into()));
    }
    for cert in certs {
        store
            .add(cert)
            .map_err(|e| Error::TlsConfig(format!("failed to add root certificate: {e}")))?;
    }
    Ok(store)
}

fn parse_identity(
    cert_pem: &[u8],
    key_pem: &[u8],
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut std::io::Cursor::new(cert_pem))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::TlsConfig(format!("invalid client certificate: {e}")))?;
    if chain.is_empty() {
        return Err(Error::TlsConfig("client certificate is missing".into()));
    }

    let mut reader = std::io::Cursor::new(key_pem);
    let key = loop {
        match rustls_pemfile::read_one(&mut reader)
            .map_err(|e| Error::TlsConfig(format!("invalid client key: {e}")))?
        {
            Some(Item::Pkcs8Key(key)) => break PrivateKeyDer::Pkcs8(key),
            Some(Item::Pkcs1Key(key)) => break PrivateKeyDer::Pkcs1(key),
            Some(Item::Sec1Key(key)) => break PrivateKeyDer::Sec1(key),
            Some(_) => continue,
            None => return Err(Error::TlsConfig("client key is missing a private key".into())),
        }
    };

    Ok((chain, key))
}

/// Used only when `insecureSkipVerify` is set on the resource. Always
/// attached by the caller, never the default.
#[derive(Debug)]
struct NoVerifier;

impl ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ED25519,
            SignatureScheme::RSA_PSS_SHA256,
        ]
    }
}
