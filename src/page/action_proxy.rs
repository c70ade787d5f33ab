use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};

use super::proxy::{Proxy, ProxyObject};
use super::widget_reference::WidgetReference;
use crate::event::{Event, EventContainer};
use crate::object::{
    Artifact, Eventer, GetSetter, ObjectCollection, ObjectType, PropertyDescriptor, SetOutcome,
};

pub const ACTION_PROXY_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::readonly("binding"),
    PropertyDescriptor::readonly("description"),
    PropertyDescriptor::writable("enabled"),
    PropertyDescriptor::readonly("external"),
];

pub const ACTION_PROXY_EVENTS: &[&str] = &["change", "invoke", "paramchange", "paramadd", "paramremove"];

pub const ACTION_PARAM_PROXY_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::readonly("type"),
    PropertyDescriptor::readonly("subtype"),
    PropertyDescriptor::readonly("typedata"),
    PropertyDescriptor::readonly("description"),
    PropertyDescriptor::readonly("defvalue"),
];

pub struct ActionProxy {
    proxy: Proxy,
    reference: RefCell<Weak<WidgetReference>>,
    params: ObjectCollection<ActionParamProxy>,
}

impl ActionProxy {
    /// `snapshot.params` holds the action's params as sent by the widget.
    pub fn new(name: &str, snapshot: &Value) -> Option<Rc<ActionProxy>> {
        if name.is_empty() {
            return None;
        }
        let action = Rc::new(ActionProxy {
            proxy: Proxy::new(name, ObjectType::ActionProxy, ACTION_PROXY_PROPERTIES, snapshot),
            reference: RefCell::new(Weak::new()),
            params: ObjectCollection::with_factory(
                ObjectType::ActionParamProxy,
                Rc::new(|name: &str, snapshot: &Value| ActionParamProxy::new(name, snapshot)),
            ),
        });
        action
            .proxy
            .base()
            .attach(Rc::downgrade(&action) as Weak<dyn Artifact>);

        let weak = Rc::downgrade(&action);
        action.params.set_added_callback({
            let weak = weak.clone();
            move |param| {
                if let Some(action) = weak.upgrade() {
                    action.param_added(param);
                }
            }
        });
        action.params.set_removed_callback(move |param| {
            if let Some(action) = weak.upgrade() {
                param.detach();
                action.proxy.base().events().trigger(
                    "paramremove",
                    json!({"name": param.name()}),
                    Some(Rc::clone(param) as Rc<dyn Artifact>),
                );
            }
        });

        if let Some(params) = snapshot.get("params").and_then(Value::as_array) {
            for entry in params {
                action.add_param_proxy(entry);
            }
        }
        Some(action)
    }

    pub fn params(&self) -> &ObjectCollection<ActionParamProxy> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<Rc<ActionParamProxy>> {
        self.params.get_by_name(name)
    }

    pub fn enabled(&self) -> bool {
        self.proxy.get_bool("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> SetOutcome {
        self.request_property_change("enabled", Value::Bool(enabled))
    }

    /// Ask the widget to run the action. The result comes back as an
    /// `invoke` event once the widget answers.
    pub fn invoke(&self, args: Vec<Value>) -> bool {
        if !self.connected() || !self.enabled() {
            return false;
        }
        match self.reference() {
            Some(reference) => reference.signal_action_invoke(self.proxy.name(), args),
            None => false,
        }
    }

    /// The widget ran the action.
    pub fn invoke_from_widget(&self, return_value: Value) {
        self.proxy
            .base()
            .events()
            .trigger("invoke", json!({"returnValue": return_value}), None);
    }

    pub fn reference(&self) -> Option<Rc<WidgetReference>> {
        self.reference.borrow().upgrade()
    }

    pub(crate) fn add_param_proxy(&self, snapshot: &Value) -> Option<Rc<ActionParamProxy>> {
        let name = snapshot.get("name").and_then(Value::as_str)?;
        self.params.add(name, snapshot)
    }

    pub(crate) fn remove_param_proxy(&self, name: &str) -> bool {
        self.params.remove(name)
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

    fn param_added(self: &Rc<Self>, param: &Rc<ActionParamProxy>) {
        param.set_action(Rc::downgrade(self));
        param.event_container().register_bubble_callback(
            &["change"],
            &Rc::downgrade(self),
            |action: &ActionProxy, _event_type, event: Event, origin| {
                let target = event.target.or(Some(origin));
                action
                    .proxy
                    .base()
                    .events()
                    .trigger("paramchange", event.value, target);
            },
        );
        self.proxy.base().events().trigger(
            "paramadd",
            param.proxy.base().snapshot(),
            Some(Rc::clone(param) as Rc<dyn Artifact>),
        );
    }
}

impl ProxyObject for ActionProxy {
    fn proxy(&self) -> &Proxy {
        &self.proxy
    }

    fn handle_property_change(&self, name: &str, value: &Value) {
        if let Some(reference) = self.reference() {
            reference.signal_property_change(ObjectType::Action, self.proxy.name(), None, name, value);
        }
    }
}

impl GetSetter for ActionProxy {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.proxy.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        self.request_property_change(name, value)
    }
}

impl Eventer for ActionProxy {
    fn event_container(&self) -> &EventContainer {
        self.proxy.base().events()
    }
}

impl Artifact for ActionProxy {
    fn name(&self) -> String {
        self.proxy.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::ActionProxy
    }

    fn parent(&self) -> Option<Rc<dyn Artifact>> {
        self.proxy.base().parent()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Read-only mirror of an action param.
pub struct ActionParamProxy {
    proxy: Proxy,
    action: RefCell<Weak<ActionProxy>>,
}

impl ActionParamProxy {
    pub fn new(name: &str, snapshot: &Value) -> Option<Rc<ActionParamProxy>> {
        if name.is_empty() {
            return None;
        }
        let param = Rc::new(ActionParamProxy {
            proxy: Proxy::new(
                name,
                ObjectType::ActionParamProxy,
                ACTION_PARAM_PROXY_PROPERTIES,
                snapshot,
            ),
            action: RefCell::new(Weak::new()),
        });
        param
            .proxy
            .base()
            .attach(Rc::downgrade(&param) as Weak<dyn Artifact>);
        Some(param)
    }

    pub fn action(&self) -> Option<Rc<ActionProxy>> {
        self.action.borrow().upgrade()
    }

    fn set_action(&self, action: Weak<ActionProxy>) {
        self.proxy
            .base()
            .set_parent(Some(action.clone() as Weak<dyn Artifact>));
        *self.action.borrow_mut() = action;
    }

    fn detach(&self) {
        self.proxy.base().set_parent(None);
        self.proxy.base().events().clear_bubble_callbacks();
        *self.action.borrow_mut() = Weak::new();
    }
}

impl ProxyObject for ActionParamProxy {
    fn proxy(&self) -> &Proxy {
        &self.proxy
    }
}

impl GetSetter for ActionParamProxy {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.proxy.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        self.request_property_change(name, value)
    }
}

impl Eventer for ActionParamProxy {
    fn event_container(&self) -> &EventContainer {
        self.proxy.base().events()
    }
}

impl Artifact for ActionParamProxy {
    fn name(&self) -> String {
        self.proxy.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::ActionParamProxy
    }

    fn parent(&self) -> Option<Rc<dyn Artifact>> {
        self.proxy.base().parent()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
