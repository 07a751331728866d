//! The declarative linkage between a CRUD action and a concrete HTTP method
//! plus templated URL/body/headers.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The reconciler's intent for a given HTTP call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Observe,
    Update,
    Remove,
    /// No action tag declared; the effective method is derived from
    /// `Mapping::method` alone.
    #[default]
    #[serde(rename = "")]
    Unset,
}

/// The HTTP method a mapping issues. `Unset` means the method is derived
/// from `Action` (CREATE -> POST, OBSERVE -> GET, UPDATE -> PUT,
/// REMOVE -> DELETE).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Method {
    pub fn as_http(self) -> Option<http::Method> {
        match self {
            Method::Get => Some(http::Method::GET),
            Method::Post => Some(http::Method::POST),
            Method::Put => Some(http::Method::PUT),
            Method::Patch => Some(http::Method::PATCH),
            Method::Delete => Some(http::Method::DELETE),
            Method::Head => Some(http::Method::HEAD),
            Method::Options => Some(http::Method::OPTIONS),
            Method::Unset => None,
        }
    }

    /// The method implied by a CRUD action, when the mapping itself didn't
    /// specify one.
    pub fn from_action(action: Action) -> Method {
        match action {
            Action::Create => Method::Post,
            Action::Observe => Method::Get,
            Action::Update => Method::Put,
            Action::Remove => Method::Delete,
            Action::Unset => Method::Unset,
        }
    }
}

/// One CRUD-to-HTTP mapping. `url_template` and `body_template` are jq-style
/// query expressions, not plain strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub method: Method,
    pub url_template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, Vec<String>>>,
}

impl Mapping {
    /// The method this mapping actually sends: the explicit `method` if set,
    /// else the one implied by `action`.
    pub fn effective_method(&self) -> Option<http::Method> {
        self.method
            .as_http()
            .or_else(|| Method::from_action(self.action).as_http())
    }
}

/// The desired state payload: a base URL and an arbitrary (typically JSON)
/// body, exposed to templates as `.payload.baseUrl` / `.payload.body`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub base_url: String,
    #[serde(default)]
    pub body: String,
}

/// Which family of "is up to date" / "is removed" check to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckType {
    #[default]
    #[serde(rename = "", alias = "DEFAULT")]
    Default,
    Custom,
}

/// A response-correctness predicate: either the built-in structural/404
/// check, or a user-supplied jq boolean expression.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedResponseCheck {
    #[serde(default, rename = "type")]
    pub check_type: CheckType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
}
