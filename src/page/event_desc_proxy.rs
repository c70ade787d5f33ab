use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::Value;

use super::proxy::{Proxy, ProxyObject};
use super::widget_reference::WidgetReference;
use crate::event::EventContainer;
use crate::object::{Artifact, Eventer, GetSetter, ObjectType, PropertyDescriptor, SetOutcome};

pub const EVENT_DESC_PROXY_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::readonly("description"),
    PropertyDescriptor::writable("enabled"),
    PropertyDescriptor::readonly("external"),
];

pub const EVENT_DESC_PROXY_EVENTS: &[&str] = &["change", "trigger"];

pub struct EventDescProxy {
    proxy: Proxy,
    reference: RefCell<Weak<WidgetReference>>,
}

impl EventDescProxy {
    pub fn new(name: &str, snapshot: &Value) -> Option<Rc<EventDescProxy>> {
        if name.is_empty() {
            return None;
        }
        let desc = Rc::new(EventDescProxy {
            proxy: Proxy::new(
                name,
                ObjectType::EventDescProxy,
                EVENT_DESC_PROXY_PROPERTIES,
                snapshot,
            ),
            reference: RefCell::new(Weak::new()),
        });
        desc.proxy
            .base()
            .attach(Rc::downgrade(&desc) as Weak<dyn Artifact>);
        Some(desc)
    }

    pub fn enabled(&self) -> bool {
        self.proxy.get_bool("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> SetOutcome {
        self.request_property_change("enabled", Value::Bool(enabled))
    }

    /// Ask the widget to raise this event.
    pub fn trigger_event(&self, value: Value) -> bool {
        if !self.connected() || !self.enabled() {
            return false;
        }
        match self.reference() {
            Some(reference) => reference.signal_event_trigger(self.proxy.name(), value),
            None => false,
        }
    }

    /// The widget raised this event.
    pub fn trigger_from_widget(&self, value: Value) {
        self.proxy.base().events().trigger("trigger", value, None);
    }

    pub fn reference(&self) -> Option<Rc<WidgetReference>> {
        self.reference.borrow().upgrade()
    }

    pub(crate) fn set_reference(&self, reference: Weak<WidgetReference>) {
        self.proxy
            .base()
            .set_parent(Some(reference.clone() as Weak<dyn Artifact>));
        *self.reference.borrow_mut() = reference;
    }

    pub(crate) fn detach(&self) {
        self.proxy.base().set_parent(None);
        self.proxy.base().events().clear_bubble_callbacks();
        *self.reference.borrow_mut() = Weak::new();
    }
}

impl ProxyObject for EventDescProxy {
    fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    fn handle_property_change(&self, name: &str, value: &Value) {
        if let Some(reference) = self.reference() {
            reference.signal_property_change(ObjectType::EventDesc, self.proxy.name(), None, name, value);
        }
    }
}

impl GetSetter for EventDescProxy {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.proxy.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        self.request_property_change(name, value)
    }
}

impl Eventer for EventDescProxy {
    fn event_container(&self) -> &EventContainer {
        self.proxy.base().events()
    }
}

impl Artifact for EventDescProxy {
    fn name(&self) -> String {
        self.proxy.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::EventDescProxy
    }

    fn parent(&self) -> Option<Rc<dyn Artifact>> {
        self.proxy.base().parent()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
