use std::any::Any;
use std::rc::{Rc, Weak};

use serde_json::{json, Map, Value};
use thiserror::Error;
use url::Url;

use super::proxy::ProxyObject;
use super::widget_reference::{WidgetReference, WIDGET_REFERENCE_EVENTS};
use crate::config::SvidgetConfig;
use crate::event::EventContainer;
use crate::host::{HostEnvironment, HostError, MessageEvent, MessageReceiver, WindowId};
use crate::object::{Artifact, Eventer, ObjectBase, ObjectCollection, ObjectType};
use crate::transport::protocol::{
    self, ActionInvokePayload, ActionInvokedPayload, ActionParamAddedPayload,
    EventTriggerPayload, Manifest, PropertyChangePayload, RemovedPayload, StartPayload,
};
use crate::transport::{Communicator, Inbound};

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("widget id already in use: {0}")]
    DuplicateId(String),
    #[error("invalid widget url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Host(#[from] HostError),
}

/// How the page wants a widget embedded.
#[derive(Debug, Clone)]
pub struct WidgetOptions {
    /// Generated when `None`.
    pub id: Option<String>,
    pub url: String,
    pub params: Map<String, Value>,
    pub connected: bool,
}

impl WidgetOptions {
    pub fn new(url: &str) -> Self {
        Self {
            id: None,
            url: url.to_string(),
            params: Map::new(),
            connected: true,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_param(mut self, name: &str, value: Value) -> Self {
        self.params.insert(name.to_string(), value);
        self
    }

    pub fn with_connected(mut self, connected: bool) -> Self {
        self.connected = connected;
        self
    }
}

/// Coordinator living in the page window.
///
/// Embeds widgets, turns proxy requests into messages and routes the
/// widgets' answers back onto their proxies.
pub struct PageRoot {
    base: ObjectBase,
    host: Rc<HostEnvironment>,
    window: WindowId,
    widget_query_key: String,
    communicator: Communicator,
    widgets: ObjectCollection<WidgetReference>,
}

impl PageRoot {
    pub fn new(host: Rc<HostEnvironment>, window: WindowId, config: &SvidgetConfig) -> Rc<PageRoot> {
        if !host.has_document(window) {
            tracing::warn!(target: "svidget::page", window = %window, "page window has no document, communication disabled");
        }
        let root = Rc::new(PageRoot {
            base: ObjectBase::new("page", ObjectType::Root, &[], &Value::Null),
            host: Rc::clone(&host),
            window,
            widget_query_key: config.widget_query_key.clone(),
            communicator: Communicator::new(Rc::clone(&host), window, config),
            widgets: ObjectCollection::new(ObjectType::WidgetReference),
        });
        root.base.attach(Rc::downgrade(&root) as Weak<dyn Artifact>);

        let weak = Rc::downgrade(&root);
        root.widgets.set_added_callback(move |reference| {
            reference.event_container().register_bubble_callback(
                WIDGET_REFERENCE_EVENTS,
                &weak,
                |root: &PageRoot, event_type, event, origin| {
                    let target = event.target.or(Some(origin));
                    root.base.events().trigger(event_type, event.value, target);
                },
            );
        });
        root.widgets.set_removed_callback(|reference| {
            reference.event_container().clear_bubble_callbacks();
            reference.disconnect();
        });

        host.expose(window, Rc::downgrade(&root) as Weak<dyn MessageReceiver>);
        let weak = Rc::downgrade(&root);
        host.add_message_listener(
            window,
            Rc::new(move |event: &MessageEvent| {
                let Some(root) = weak.upgrade() else {
                    return;
                };
                if let Some(Inbound::FromWidget { widget, name, payload }) = Communicator::receive_xsm(event) {
                    root.receive_xsm_from_widget(event.source, &widget, &name, payload);
                }
            }),
        );
        root
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn communicator(&self) -> &Communicator {
        &self.communicator
    }

    pub fn widgets(&self) -> &ObjectCollection<WidgetReference> {
        &self.widgets
    }

    pub fn widget(&self, id: &str) -> Option<Rc<WidgetReference>> {
        self.widgets.get_by_name(id)
    }

    /// Open a child window for the widget and start tracking it. The widget
    /// learns its id from the `svidget` query parameter of its URL.
    pub fn add_widget(self: &Rc<Self>, options: WidgetOptions) -> Result<Rc<WidgetReference>, EmbedError> {
        let id = options
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        if self.widgets.get_by_name(&id).is_some() {
            return Err(EmbedError::DuplicateId(id));
        }
        let mut url = Url::parse(&options.url)?;
        url.query_pairs_mut()
            .append_pair(&self.widget_query_key, &id);
        let window = self.host.open_window(url.as_str(), Some(self.window))?;
        let reference = WidgetReference::new(
            &id,
            window,
            Rc::downgrade(self),
            options.params,
            options.connected,
        );
        self.widgets
            .add_item(Rc::clone(&reference))
            .ok_or_else(|| EmbedError::DuplicateId(id.clone()))?;
        tracing::debug!(target: "svidget::page", widget = %id, window = %window, "widget embedded");
        Ok(reference)
    }

    pub fn remove_widget(&self, id: &str) -> bool {
        let Some(reference) = self.widget(id) else {
            return false;
        };
        self.host.close_window(reference.window());
        self.widgets.remove(id)
    }

    /// Forget cached same-domain probes, e.g. after a widget frame navigated.
    pub fn clear_domain_cache(&self) {
        self.communicator.clear_domain_cache();
    }

    pub fn signal_property_change(
        &self,
        widget: &WidgetReference,
        object_type: ObjectType,
        name: &str,
        action: Option<&str>,
        property: &str,
        value: &Value,
    ) -> bool {
        let payload = PropertyChangePayload {
            object_type,
            name: name.to_string(),
            action: action.map(str::to_string),
            property_name: property.to_string(),
            value: value.clone(),
        };
        self.signal(widget, protocol::PROPERTY_CHANGE, protocol::encode(&payload))
    }

    pub fn signal_action_invoke(&self, widget: &WidgetReference, action: &str, args: Vec<Value>) -> bool {
        let payload = ActionInvokePayload {
            action: action.to_string(),
            args,
        };
        self.signal(widget, protocol::ACTION_INVOKE, protocol::encode(&payload))
    }

    pub fn signal_event_trigger(&self, widget: &WidgetReference, event: &str, value: Value) -> bool {
        let payload = EventTriggerPayload {
            event: event.to_string(),
            value,
        };
        self.signal(widget, protocol::EVENT_TRIGGER, protocol::encode(&payload))
    }

    /// Every outbound request is announced locally as a `signal` event
    /// before it is sent.
    fn signal(&self, widget: &WidgetReference, name: &str, payload: Value) -> bool {
        if !widget.connected() {
            tracing::debug!(target: "svidget::page", widget = widget.id(), message = name, "widget not connected, request dropped");
            return false;
        }
        self.base.events().trigger(
            "signal",
            json!({"widget": widget.id(), "name": name, "payload": payload}),
            None,
        );
        self.communicator
            .signal_widget(widget.window(), name, payload)
            .is_some()
    }

    fn receive_xsm_from_widget(&self, source: WindowId, widget: &str, name: &str, payload: Value) {
        match self.widget(widget) {
            Some(reference) if reference.window() != source => {
                tracing::debug!(target: "svidget::page", widget, source = %source, "message claims another widget's id, ignored");
            }
            _ => self.receive_from_widget(widget, name, payload),
        }
    }

    fn handle_initialized(&self, reference: &WidgetReference) {
        let start = StartPayload {
            id: reference.id().to_string(),
            params: reference.declared_params(),
            connected: reference.requested_connected(),
        };
        self.communicator
            .signal_widget(reference.window(), protocol::START, protocol::encode(&start));
    }

    fn handle_start_ack(&self, reference: &Rc<WidgetReference>, payload: Value) {
        let Some(manifest) = protocol::decode::<Manifest>(protocol::START_ACK, payload) else {
            return;
        };
        reference.start(&manifest);
        tracing::debug!(target: "svidget::page", widget = reference.id(), params = manifest.params.len(), "widget loaded");
        self.base.events().trigger(
            "widgetloaded",
            json!({"widget": reference.id()}),
            Some(Rc::clone(reference) as Rc<dyn Artifact>),
        );
    }

    fn handle_property_changed(&self, reference: &WidgetReference, payload: Value) {
        let Some(change) =
            protocol::decode::<PropertyChangePayload>(protocol::PROPERTY_CHANGED, payload)
        else {
            return;
        };
        let property = change.property_name.as_str();
        let applied = match change.object_type {
            ObjectType::Param => reference
                .param(&change.name)
                .map(|param| param.notify_property_change(property, change.value)),
            ObjectType::Action => reference
                .action(&change.name)
                .map(|action| action.notify_property_change(property, change.value)),
            ObjectType::ActionParam => change
                .action
                .as_deref()
                .and_then(|action| reference.action(action))
                .and_then(|action| action.param(&change.name))
                .map(|param| param.notify_property_change(property, change.value)),
            ObjectType::EventDesc => reference
                .event_desc(&change.name)
                .map(|desc| desc.notify_property_change(property, change.value)),
            _ => None,
        };
        if applied.is_none() {
            tracing::debug!(target: "svidget::page", widget = reference.id(), name = %change.name, "change for unknown proxy ignored");
        }
    }

    fn handle_added(&self, reference: &WidgetReference, name: &str, payload: Value) {
        let added = match name {
            protocol::PARAM_ADDED => reference.add_param_proxy(&payload).is_some(),
            protocol::ACTION_ADDED => reference.add_action_proxy(&payload).is_some(),
            protocol::EVENT_ADDED => reference.add_event_proxy(&payload).is_some(),
            _ => protocol::decode::<ActionParamAddedPayload>(name, payload)
                .and_then(|added| {
                    reference
                        .action(&added.action)?
                        .add_param_proxy(&added.param)
                })
                .is_some(),
        };
        if !added {
            tracing::debug!(target: "svidget::page", widget = reference.id(), message = name, "add rejected");
        }
    }

    fn handle_removed(&self, reference: &WidgetReference, name: &str, payload: Value) {
        let Some(removed) = protocol::decode::<RemovedPayload>(name, payload) else {
            return;
        };
        let done = match name {
            protocol::PARAM_REMOVED => reference.remove_param_proxy(&removed.name),
            protocol::ACTION_REMOVED => reference.remove_action_proxy(&removed.name),
            protocol::EVENT_REMOVED => reference.remove_event_proxy(&removed.name),
            _ => removed
                .action
                .as_deref()
                .and_then(|action| reference.action(action))
                .is_some_and(|action| action.remove_param_proxy(&removed.name)),
        };
        if !done {
            tracing::debug!(target: "svidget::page", widget = reference.id(), message = name, name = %removed.name, "nothing to remove");
        }
    }

    fn handle_unloaded(&self, reference: &Rc<WidgetReference>) {
        reference.disconnect();
        self.base.events().trigger(
            "widgetunloaded",
            json!({"widget": reference.id()}),
            Some(Rc::clone(reference) as Rc<dyn Artifact>),
        );
    }
}

impl MessageReceiver for PageRoot {
    fn receive_from_parent(&self, name: &str, _payload: Value) {
        tracing::debug!(target: "svidget::page", message = name, "page has no parent widget, ignored");
    }

    /// Unknown widget ids and message names are ignored.
    fn receive_from_widget(&self, widget: &str, name: &str, payload: Value) {
        let Some(reference) = self.widget(widget) else {
            tracing::debug!(target: "svidget::page", widget, message = name, "message from unknown widget ignored");
            return;
        };
        tracing::debug!(target: "svidget::page", widget, message = name, "received from widget");
        match name {
            protocol::INITIALIZED => self.handle_initialized(&reference),
            protocol::START_ACK => self.handle_start_ack(&reference, payload),
            protocol::PROPERTY_CHANGED => self.handle_property_changed(&reference, payload),
            protocol::ACTION_INVOKED => {
                if let Some(invoked) = protocol::decode::<ActionInvokedPayload>(name, payload) {
                    if let Some(action) = reference.action(&invoked.action) {
                        action.invoke_from_widget(invoked.return_value);
                    }
                }
            }
            protocol::EVENT_TRIGGERED => {
                if let Some(triggered) = protocol::decode::<EventTriggerPayload>(name, payload) {
                    if let Some(desc) = reference.event_desc(&triggered.event) {
                        desc.trigger_from_widget(triggered.value);
                    }
                }
            }
            protocol::PARAM_ADDED
            | protocol::ACTION_ADDED
            | protocol::EVENT_ADDED
            | protocol::ACTION_PARAM_ADDED => self.handle_added(&reference, name, payload),
            protocol::PARAM_REMOVED
            | protocol::ACTION_REMOVED
            | protocol::EVENT_REMOVED
            | protocol::ACTION_PARAM_REMOVED => self.handle_removed(&reference, name, payload),
            protocol::UNLOADED => self.handle_unloaded(&reference),
            other => {
                tracing::debug!(target: "svidget::page", widget, message = other, "unknown message ignored");
            }
        }
    }
}

impl Eventer for PageRoot {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for PageRoot {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Root
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
