use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};

use super::proxy::{Proxy, ProxyObject};
use super::widget_reference::WidgetReference;
use crate::event::EventContainer;
use crate::object::{Artifact, Eventer, GetSetter, ObjectType, PropertyDescriptor, SetOutcome};

pub const PARAM_PROXY_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::readonly("shortname"),
    PropertyDescriptor::readonly("type"),
    PropertyDescriptor::readonly("subtype"),
    PropertyDescriptor::readonly("typedata"),
    PropertyDescriptor::readonly("coerce"),
    PropertyDescriptor::readonly("defvalue"),
    PropertyDescriptor::readonly("description"),
    PropertyDescriptor::readonly("group"),
    PropertyDescriptor::readonly("binding"),
    PropertyDescriptor::writable("enabled"),
    PropertyDescriptor::writable("value"),
    PropertyDescriptor::readonly("external"),
];

pub const PARAM_PROXY_EVENTS: &[&str] = &["change", "set"];

pub struct ParamProxy {
    proxy: Proxy,
    reference: RefCell<Weak<WidgetReference>>,
}

impl ParamProxy {
    pub fn new(name: &str, snapshot: &Value) -> Option<Rc<ParamProxy>> {
        if name.is_empty() {
            return None;
        }
        let param = Rc::new(ParamProxy {
            proxy: Proxy::new(name, ObjectType::ParamProxy, PARAM_PROXY_PROPERTIES, snapshot),
            reference: RefCell::new(Weak::new()),
        });
        param
            .proxy
            .base()
            .attach(Rc::downgrade(&param) as Weak<dyn Artifact>);
        Some(param)
    }

    pub fn value(&self) -> Value {
        self.proxy.get("value").unwrap_or(Value::Null)
    }

    /// Ask the widget to change the value.
    pub fn set_value(&self, value: Value) -> SetOutcome {
        self.request_property_change("value", value)
    }

    pub fn enabled(&self) -> bool {
        self.proxy.get_bool("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> SetOutcome {
        self.request_property_change("enabled", Value::Bool(enabled))
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

impl ProxyObject for ParamProxy {
    fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    fn handle_property_change(&self, name: &str, value: &Value) {
        if let Some(reference) = self.reference() {
            if name == "value" {
                reference.remember_param(self.proxy.name(), value.clone());
            }
            reference.signal_property_change(ObjectType::Param, self.proxy.name(), None, name, value);
        }
    }

    fn notify_property_change(&self, name: &str, value: Value) -> bool {
        if !self.proxy.notify_property_change(name, value.clone()) {
            return false;
        }
        if name == "value" {
            self.proxy
                .base()
                .events()
                .trigger("set", json!({"value": value}), None);
        }
        true
    }
}

impl GetSetter for ParamProxy {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.proxy.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        self.request_property_change(name, value)
    }
}

impl Eventer for ParamProxy {
    fn event_container(&self) -> &EventContainer {
        self.proxy.base().events()
    }
}

impl Artifact for ParamProxy {
    fn name(&self) -> String {
        self.proxy.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::ParamProxy
    }

    fn parent(&self) -> Option<Rc<dyn Artifact>> {
        self.proxy.base().parent()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
