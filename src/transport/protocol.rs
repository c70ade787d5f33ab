//! Message names and payload shapes exchanged between page and widget.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::object::ObjectType;

// page -> widget
pub const START: &str = "start";
pub const PROPERTY_CHANGE: &str = "propertyChange";
pub const ACTION_INVOKE: &str = "actionInvoke";
pub const EVENT_TRIGGER: &str = "eventTrigger";

// widget -> page
pub const INITIALIZED: &str = "initialized";
pub const START_ACK: &str = "startack";
pub const PROPERTY_CHANGED: &str = "propertyChanged";
pub const ACTION_INVOKED: &str = "actionInvoked";
pub const EVENT_TRIGGERED: &str = "eventTriggered";
pub const PARAM_ADDED: &str = "paramAdded";
pub const PARAM_REMOVED: &str = "paramRemoved";
pub const ACTION_ADDED: &str = "actionAdded";
pub const ACTION_REMOVED: &str = "actionRemoved";
pub const ACTION_PARAM_ADDED: &str = "actionParamAdded";
pub const ACTION_PARAM_REMOVED: &str = "actionParamRemoved";
pub const EVENT_ADDED: &str = "eventAdded";
pub const EVENT_REMOVED: &str = "eventRemoved";
pub const UNLOADED: &str = "unloaded";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartPayload {
    pub id: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default = "default_true")]
    pub connected: bool,
}

/// Property change request (page -> widget) or confirmation (widget -> page).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyChangePayload {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub name: String,
    /// Owning action, for action params.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub property_name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInvokePayload {
    pub action: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInvokedPayload {
    pub action: String,
    #[serde(default)]
    pub return_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTriggerPayload {
    pub event: String,
    #[serde(default)]
    pub value: Value,
}

/// Full description of a started widget, sent with `startack`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub connected: bool,
    #[serde(default)]
    pub params: Vec<Value>,
    #[serde(default)]
    pub actions: Vec<Value>,
    #[serde(default)]
    pub events: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovedPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionParamAddedPayload {
    pub action: String,
    pub param: Value,
}

fn default_true() -> bool {
    true
}

/// Decode a payload, logging and discarding anything malformed.
pub fn decode<T: DeserializeOwned>(name: &str, payload: Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::debug!(target: "svidget::protocol", message = name, error = %err, "ignoring malformed payload");
            None
        }
    }
}

/// Encode a payload. These types always serialize, so a failure degrades to
/// `null` instead of aborting the signal.
pub fn encode<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}
