use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wire shape shared by both transports. `widget` is present only on
/// messages travelling from a widget to its page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub name: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<String>,
}

impl Message {
    pub fn to_widget(name: &str, payload: Value) -> Self {
        Self {
            name: name.to_string(),
            payload,
            widget: None,
        }
    }

    pub fn to_parent(name: &str, payload: Value, widget: &str) -> Self {
        Self {
            name: name.to_string(),
            payload,
            widget: Some(widget.to_string()),
        }
    }
}

/// Where an inbound message should be handled.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    FromWidget {
        widget: String,
        name: String,
        payload: Value,
    },
    FromParent {
        name: String,
        payload: Value,
    },
}

impl From<Message> for Inbound {
    fn from(message: Message) -> Self {
        match message.widget {
            Some(widget) => Inbound::FromWidget {
                widget,
                name: message.name,
                payload: message.payload,
            },
            None => Inbound::FromParent {
                name: message.name,
                payload: message.payload,
            },
        }
    }
}
