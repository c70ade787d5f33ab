use std::any::Any;
use std::rc::{Rc, Weak};

use serde_json::Value;

use super::widget::{Widget, WidgetSignals, WIDGET_EVENTS};
use crate::config::SvidgetConfig;
use crate::event::EventContainer;
use crate::host::{HostEnvironment, MessageEvent, MessageReceiver, WindowId};
use crate::object::{Artifact, Eventer, GetSetter, ObjectBase, ObjectType, SetOutcome};
use crate::transport::protocol::{
    self, ActionInvokePayload, ActionInvokedPayload, ActionParamAddedPayload,
    EventTriggerPayload, PropertyChangePayload, RemovedPayload, StartPayload,
};
use crate::transport::{Communicator, Inbound};

/// Coordinator living in the widget's window.
///
/// Owns the [`Widget`], answers the page's requests and reports local
/// changes back to it. Without an id in its URL, or without a parent
/// window, the widget runs standalone and never talks to anyone.
pub struct WidgetRoot {
    base: ObjectBase,
    widget: Rc<Widget>,
    communicator: Communicator,
    standalone: bool,
}

impl WidgetRoot {
    pub fn new(host: Rc<HostEnvironment>, window: WindowId, config: &SvidgetConfig) -> Rc<WidgetRoot> {
        if !host.has_document(window) {
            tracing::warn!(target: "svidget::widget", window = %window, "widget window has no document, communication disabled");
        }
        let id = host.url(window).and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == &config.widget_query_key)
                .map(|(_, value)| value.into_owned())
        });
        let standalone = id.is_none() || host.parent(window).is_none();
        let widget = Widget::new(id.as_deref().unwrap_or_default());

        let root = Rc::new(WidgetRoot {
            base: ObjectBase::new("widget", ObjectType::Root, &[], &Value::Null),
            widget,
            communicator: Communicator::new(Rc::clone(&host), window, config),
            standalone,
        });
        root.base.attach(Rc::downgrade(&root) as Weak<dyn Artifact>);
        root.widget
            .set_signals(Rc::downgrade(&root) as Weak<dyn WidgetSignals>);
        root.widget.event_container().register_bubble_callback(
            WIDGET_EVENTS,
            &Rc::downgrade(&root),
            |root: &WidgetRoot, event_type, event, origin| {
                let target = event.target.or(Some(origin));
                root.base.events().trigger(event_type, event.value, target);
            },
        );

        host.expose(window, Rc::downgrade(&root) as Weak<dyn MessageReceiver>);
        let weak = Rc::downgrade(&root);
        let parent = host.parent(window);
        host.add_message_listener(
            window,
            Rc::new(move |event: &MessageEvent| {
                let Some(root) = weak.upgrade() else {
                    return;
                };
                if parent != Some(event.source) {
                    tracing::debug!(target: "svidget::widget", source = %event.source, "message from a window other than the parent, ignored");
                    return;
                }
                if let Some(Inbound::FromParent { name, payload }) = Communicator::receive_xsm(event) {
                    root.receive_from_parent(&name, payload);
                }
            }),
        );

        if standalone {
            tracing::debug!(target: "svidget::widget", window = %window, "no widget id or parent, running standalone");
            root.widget.start(&serde_json::Map::new(), false);
        }
        root
    }

    pub fn widget(&self) -> &Rc<Widget> {
        &self.widget
    }

    pub fn communicator(&self) -> &Communicator {
        &self.communicator
    }

    pub fn is_standalone(&self) -> bool {
        self.standalone
    }

    /// Tell the page this widget is ready to be started.
    pub fn load(&self) -> bool {
        if self.standalone {
            return false;
        }
        self.signal(protocol::INITIALIZED, Value::Null)
    }

    /// Tell the page this widget is going away. Nothing is signalled after.
    pub fn unload(&self) -> bool {
        if self.standalone || !self.widget.started() {
            return false;
        }
        let sent = self.widget.connected() && self.signal(protocol::UNLOADED, Value::Null);
        self.widget.stop();
        sent
    }

    fn signal(&self, name: &str, payload: Value) -> bool {
        self.communicator
            .signal_parent(name, payload, self.widget.id())
            .is_some()
    }

    fn handle_start(&self, payload: Value) {
        let Some(start) = protocol::decode::<StartPayload>(protocol::START, payload) else {
            return;
        };
        if start.id != self.widget.id() {
            tracing::debug!(target: "svidget::widget", expected = self.widget.id(), got = %start.id, "start for another widget ignored");
            return;
        }
        self.widget.start(&start.params, start.connected);
        tracing::debug!(target: "svidget::widget", widget = self.widget.id(), connected = start.connected, "widget started");
        self.signal(protocol::START_ACK, protocol::encode(&self.widget.manifest()));
    }

    /// Apply a page write. A write that leaves the artifact as it was (the
    /// coerced value equals the current one) is answered with the kept value
    /// so the page's speculative cache is corrected.
    fn handle_property_change(&self, payload: Value) {
        let Some(change) =
            protocol::decode::<PropertyChangePayload>(protocol::PROPERTY_CHANGE, payload)
        else {
            return;
        };
        let widget = &self.widget;
        let property = change.property_name.as_str();
        let applied = match change.object_type {
            ObjectType::Param => widget
                .param(&change.name)
                .filter(|param| param.is_external())
                .map(|param| (param.set_from_parent(property, change.value), param.get_property(property))),
            ObjectType::Action => widget
                .action(&change.name)
                .filter(|action| action.is_external())
                .map(|action| (action.set_from_parent(property, change.value), action.get_property(property))),
            ObjectType::EventDesc => widget
                .event_desc(&change.name)
                .filter(|desc| desc.is_external())
                .map(|desc| (desc.set_from_parent(property, change.value), desc.get_property(property))),
            _ => None,
        };
        match applied {
            Some((SetOutcome::Unchanged, Some(kept))) => {
                self.property_changed(change.object_type, &change.name, None, property, &kept);
            }
            Some(_) => {}
            None => {
                tracing::debug!(target: "svidget::widget", object = %change.object_type, name = %change.name, "property change for unknown artifact ignored");
            }
        }
    }

    fn handle_action_invoke(&self, payload: Value) {
        let Some(invoke) = protocol::decode::<ActionInvokePayload>(protocol::ACTION_INVOKE, payload)
        else {
            return;
        };
        match self.widget.action(&invoke.action) {
            Some(action) if action.is_external() => {
                action.invoke(&invoke.args);
            }
            _ => {
                tracing::debug!(target: "svidget::widget", action = %invoke.action, "invoke for unknown action ignored");
            }
        }
    }

    fn handle_event_trigger(&self, payload: Value) {
        let Some(trigger) = protocol::decode::<EventTriggerPayload>(protocol::EVENT_TRIGGER, payload)
        else {
            return;
        };
        match self.widget.event_desc(&trigger.event) {
            Some(desc) if desc.is_external() => {
                desc.trigger_event(trigger.value);
            }
            _ => {
                tracing::debug!(target: "svidget::widget", event = %trigger.event, "trigger for unknown event ignored");
            }
        }
    }
}

impl MessageReceiver for WidgetRoot {
    /// Requests other than `start` are ignored until the widget is started
    /// and connected.
    fn receive_from_parent(&self, name: &str, payload: Value) {
        tracing::debug!(target: "svidget::widget", widget = self.widget.id(), message = name, "received from parent");
        if name == protocol::START {
            self.handle_start(payload);
            return;
        }
        if !(self.widget.started() && self.widget.connected()) {
            tracing::debug!(target: "svidget::widget", message = name, "widget not connected, request ignored");
            return;
        }
        match name {
            protocol::PROPERTY_CHANGE => self.handle_property_change(payload),
            protocol::ACTION_INVOKE => self.handle_action_invoke(payload),
            protocol::EVENT_TRIGGER => self.handle_event_trigger(payload),
            other => {
                tracing::debug!(target: "svidget::widget", message = other, "unknown message ignored");
            }
        }
    }

    fn receive_from_widget(&self, widget: &str, name: &str, _payload: Value) {
        tracing::debug!(target: "svidget::widget", from = widget, message = name, "nested widgets are not supported");
    }
}

impl WidgetSignals for WidgetRoot {
    fn property_changed(
        &self,
        object_type: ObjectType,
        name: &str,
        action: Option<&str>,
        property: &str,
        value: &Value,
    ) {
        let payload = PropertyChangePayload {
            object_type,
            name: name.to_string(),
            action: action.map(str::to_string),
            property_name: property.to_string(),
            value: value.clone(),
        };
        self.signal(protocol::PROPERTY_CHANGED, protocol::encode(&payload));
    }

    fn action_invoked(&self, action: &str, return_value: &Value) {
        let payload = ActionInvokedPayload {
            action: action.to_string(),
            return_value: return_value.clone(),
        };
        self.signal(protocol::ACTION_INVOKED, protocol::encode(&payload));
    }

    fn event_triggered(&self, event: &str, value: &Value) {
        let payload = EventTriggerPayload {
            event: event.to_string(),
            value: value.clone(),
        };
        self.signal(protocol::EVENT_TRIGGERED, protocol::encode(&payload));
    }

    fn artifact_added(&self, object_type: ObjectType, transport: Value, action: Option<&str>) {
        match (object_type, action) {
            (ObjectType::Param, _) => self.signal(protocol::PARAM_ADDED, transport),
            (ObjectType::Action, _) => self.signal(protocol::ACTION_ADDED, transport),
            (ObjectType::EventDesc, _) => self.signal(protocol::EVENT_ADDED, transport),
            (ObjectType::ActionParam, Some(action)) => {
                let payload = ActionParamAddedPayload {
                    action: action.to_string(),
                    param: transport,
                };
                self.signal(protocol::ACTION_PARAM_ADDED, protocol::encode(&payload))
            }
            _ => false,
        };
    }

    fn artifact_removed(&self, object_type: ObjectType, name: &str, action: Option<&str>) {
        let payload = |action: Option<&str>| {
            protocol::encode(&RemovedPayload {
                name: name.to_string(),
                action: action.map(str::to_string),
            })
        };
        match (object_type, action) {
            (ObjectType::Param, _) => self.signal(protocol::PARAM_REMOVED, payload(None)),
            (ObjectType::Action, _) => self.signal(protocol::ACTION_REMOVED, payload(None)),
            (ObjectType::EventDesc, _) => self.signal(protocol::EVENT_REMOVED, payload(None)),
            (ObjectType::ActionParam, Some(action)) => {
                self.signal(protocol::ACTION_PARAM_REMOVED, payload(Some(action)))
            }
            _ => false,
        };
    }
}

impl Eventer for WidgetRoot {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for WidgetRoot {
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

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::event::handler;

    fn page_log(host: &HostEnvironment, page: WindowId) -> Rc<RefCell<Vec<(String, Value)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        host.add_message_listener(
            page,
            Rc::new(move |event: &MessageEvent| {
                if let Some(Inbound::FromWidget { name, payload, .. }) = Communicator::receive_xsm(event) {
                    sink.borrow_mut().push((name, payload));
                }
            }),
        );
        log
    }

    fn cross_origin_widget() -> (Rc<HostEnvironment>, WindowId, Rc<WidgetRoot>) {
        let host = HostEnvironment::new();
        let page = host.open_window("https://page.example/", None).unwrap();
        let window = host
            .open_window("https://cdn.example/w.svg?svidget=w1", Some(page))
            .unwrap();
        let root = WidgetRoot::new(Rc::clone(&host), window, &SvidgetConfig::default());
        (host, page, root)
    }

    #[test]
    fn standalone_without_id() {
        let host = HostEnvironment::new();
        let window = host.open_window("https://cdn.example/w.svg", None).unwrap();
        let root = WidgetRoot::new(Rc::clone(&host), window, &SvidgetConfig::default());
        assert!(root.is_standalone());
        assert!(root.widget().started());
        assert!(!root.widget().connected());
        assert!(!root.load());
    }

    #[test]
    fn start_is_acknowledged_with_manifest() {
        let (host, page, root) = cross_origin_widget();
        let log = page_log(&host, page);
        root.widget().add_param("color", &json!({"value": "red"}));

        assert!(root.load());
        root.receive_from_parent(
            protocol::START,
            json!({"id": "w1", "params": {"color": "blue"}, "connected": true}),
        );
        host.pump();

        let log = log.borrow();
        assert_eq!(log[0].0, protocol::INITIALIZED);
        assert_eq!(log[1].0, protocol::START_ACK);
        assert_eq!(log[1].1["params"][0]["value"], json!("blue"));
    }

    #[test]
    fn requests_before_start_are_ignored() {
        let (_host, _page, root) = cross_origin_widget();
        let color = root.widget().add_param("color", &json!({"value": "red"})).unwrap();
        root.receive_from_parent(
            protocol::PROPERTY_CHANGE,
            json!({"type": "param", "name": "color", "propertyName": "value", "value": "blue"}),
        );
        assert_eq!(color.value(), json!("red"));
    }

    #[test]
    fn page_requests_reach_artifacts() {
        let (host, page, root) = cross_origin_widget();
        let log = page_log(&host, page);
        let color = root.widget().add_param("color", &json!({"value": "red"})).unwrap();
        let action = root.widget().add_action("double", &json!({"params": [{"name": "x"}]})).unwrap();
        action.bind(|args| json!(args[0].as_f64().unwrap_or_default() * 2.0));
        root.receive_from_parent(protocol::START, json!({"id": "w1"}));

        root.receive_from_parent(
            protocol::PROPERTY_CHANGE,
            json!({"type": "param", "name": "color", "propertyName": "binding", "value": "#x"}),
        );
        assert_eq!(color.binding(), None);
        root.receive_from_parent(
            protocol::PROPERTY_CHANGE,
            json!({"type": "param", "name": "color", "propertyName": "value", "value": "blue"}),
        );
        assert_eq!(color.value(), json!("blue"));
        root.receive_from_parent(protocol::ACTION_INVOKE, json!({"action": "double", "args": [4]}));
        host.pump();

        let names: Vec<String> = log.borrow().iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(
            names,
            vec![protocol::START_ACK, protocol::PROPERTY_CHANGED, protocol::ACTION_INVOKED]
        );
        assert_eq!(log.borrow()[2].1, json!({"action": "double", "returnValue": 8.0}));
    }

    #[test]
    fn widget_events_bubble_to_root() {
        let (_host, _page, root) = cross_origin_widget();
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = Rc::clone(&seen);
            root.on(
                "eventtrigger",
                handler(move |event| *seen.borrow_mut() = Some(event.value.clone())),
            );
        }
        root.widget()
            .add_event("clicked", &json!({}))
            .unwrap()
            .trigger_event(json!({"x": 1}));
        assert_eq!(*seen.borrow(), Some(json!({"x": 1})));
    }

    #[test]
    fn unload_signals_once() {
        let (host, page, root) = cross_origin_widget();
        let log = page_log(&host, page);
        root.receive_from_parent(protocol::START, json!({"id": "w1"}));
        assert!(root.unload());
        assert!(!root.unload());
        host.pump();
        let names: Vec<String> = log.borrow().iter().map(|(name, _)| name.clone()).collect();
        assert_eq!(names, vec![protocol::START_ACK, protocol::UNLOADED]);
    }
}
