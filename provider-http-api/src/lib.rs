//! CustomResourceDefinition types for the HTTP reconciler: `Request`,
//! `DisposableRequest`, and their shared `ProviderConfig`.

pub mod common;
pub mod disposable_request;
pub mod mapping;
pub mod provider_config;
pub mod request;
pub mod response;

pub use common::{
    DeprecatedKeyInjection, KeyInjection, MissingFieldStrategy, ResourceRef, SecretInjectionConfig,
    SecretMetadata, TlsConfig,
};
pub use disposable_request::{
    DisposableRequest, DisposableRequestObservation, DisposableRequestParameters, DisposableRequestSpec,
};
pub use mapping::{Action, CheckType, ExpectedResponseCheck, Mapping, Method, Payload};
pub use provider_config::{
    Credentials, ProviderConfig, ProviderConfigParameters, ProviderConfigSpec, DEFAULT_PROVIDER_CONFIG_NAME,
};
pub use request::{Request, RequestObservation, RequestParameters, RequestSpec};
pub use response::ResponseState;
