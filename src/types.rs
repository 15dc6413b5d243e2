use std::collections::BTreeMap;
use std::fmt;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Label put on every GameServer by the GameServerSet that owns it.
pub const OWNER_GSS_LABEL: &str = "game.kruise.io/owner-gss";

/// GameServerSpec is the part of a GameServer this tool reads and writes.
///
/// Fields not modelled here are kept in `extra`, since updates replace the
/// whole object.
#[derive(Serialize, Deserialize, JsonSchema, CustomResource, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "game.kruise.io",
    version = "v1alpha1",
    kind = "GameServer",
    namespaced
)]
#[kube(status = "GameServerStatus")]
#[serde(rename_all = "camelCase")]
pub struct GameServerSpec {
    /// Operational state set by operators or by the game itself.
    #[serde(default)]
    pub ops_state: OpsState,

    /// Whether network access of the game server is cut off.
    #[serde(default)]
    pub network_disabled: bool,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameServerStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_state: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Operational state of a GameServer.
///
/// The set of values is open (`None`, `Allocated`, `Maintaining`, `Kill`, ...),
/// so it is kept as a plain string.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OpsState(pub String);

impl OpsState {
    pub const NONE: &'static str = "None";
}

impl Default for OpsState {
    fn default() -> Self {
        OpsState(Self::NONE.to_string())
    }
}

impl From<&str> for OpsState {
    fn from(state: &str) -> Self {
        OpsState(state.to_string())
    }
}

impl fmt::Display for OpsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// GameServerSetSpec is only needed to discover GameServerSet names.
#[derive(Serialize, Deserialize, JsonSchema, CustomResource, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "game.kruise.io",
    version = "v1alpha1",
    kind = "GameServerSet",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct GameServerSetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
