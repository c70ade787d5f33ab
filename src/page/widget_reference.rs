use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use serde_json::{json, Map, Value};

use super::action_proxy::{ActionProxy, ACTION_PROXY_EVENTS};
use super::event_desc_proxy::{EventDescProxy, EVENT_DESC_PROXY_EVENTS};
use super::param_proxy::{ParamProxy, PARAM_PROXY_EVENTS};
use super::proxy::ProxyObject;
use super::root::PageRoot;
use crate::event::{Event, EventContainer};
use crate::host::WindowId;
use crate::object::{Artifact, Eventer, ObjectBase, ObjectCollection, ObjectType, PropertyDescriptor};
use crate::transport::protocol::Manifest;

pub const WIDGET_REFERENCE_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("id"),
    PropertyDescriptor::readonly("enabled"),
];

/// Event types a reference raises, own or bubbled up from its proxies.
pub const WIDGET_REFERENCE_EVENTS: &[&str] = &[
    "paramchange",
    "paramset",
    "paramadd",
    "paramremove",
    "actionchange",
    "actioninvoke",
    "actionparamchange",
    "actionparamadd",
    "actionparamremove",
    "actionadd",
    "actionremove",
    "eventchange",
    "eventtrigger",
    "eventadd",
    "eventremove",
];

/// The page's handle on one embedded widget.
pub struct WidgetReference {
    base: ObjectBase,
    window: WindowId,
    root: Weak<PageRoot>,
    declared_params: RefCell<Map<String, Value>>,
    requested_connected: bool,
    connected: Cell<bool>,
    started: Cell<bool>,
    // set while proxies are rebuilt from a manifest or dropped on unload
    resyncing: Cell<bool>,
    params: ObjectCollection<ParamProxy>,
    actions: ObjectCollection<ActionProxy>,
    events: ObjectCollection<EventDescProxy>,
}

impl WidgetReference {
    pub(crate) fn new(
        id: &str,
        window: WindowId,
        root: Weak<PageRoot>,
        params: Map<String, Value>,
        connected: bool,
    ) -> Rc<WidgetReference> {
        let reference = Rc::new(WidgetReference {
            base: ObjectBase::new(
                id,
                ObjectType::WidgetReference,
                WIDGET_REFERENCE_PROPERTIES,
                &json!({"id": id, "enabled": true}),
            ),
            window,
            root,
            declared_params: RefCell::new(params),
            requested_connected: connected,
            connected: Cell::new(false),
            started: Cell::new(false),
            resyncing: Cell::new(false),
            params: ObjectCollection::with_factory(
                ObjectType::ParamProxy,
                Rc::new(|name: &str, snapshot: &Value| ParamProxy::new(name, snapshot)),
            ),
            actions: ObjectCollection::with_factory(
                ObjectType::ActionProxy,
                Rc::new(|name: &str, snapshot: &Value| ActionProxy::new(name, snapshot)),
            ),
            events: ObjectCollection::with_factory(
                ObjectType::EventDescProxy,
                Rc::new(|name: &str, snapshot: &Value| EventDescProxy::new(name, snapshot)),
            ),
        });
        reference
            .base
            .attach(Rc::downgrade(&reference) as Weak<dyn Artifact>);
        WidgetReference::wire_collections(&reference);
        reference
    }

    fn wire_collections(reference: &Rc<WidgetReference>) {
        let weak = Rc::downgrade(reference);

        let r = weak.clone();
        reference.params.set_added_callback(move |param| {
            let Some(reference) = r.upgrade() else {
                return;
            };
            param.set_reference(Rc::downgrade(&reference));
            param.event_container().register_bubble_callback(
                PARAM_PROXY_EVENTS,
                &Rc::downgrade(&reference),
                |reference: &WidgetReference, event_type, event, origin| {
                    let mapped = match event_type {
                        "set" => "paramset",
                        _ => "paramchange",
                    };
                    reference.forward(mapped, event, origin);
                },
            );
            reference.raise_added("paramadd", Rc::clone(param) as Rc<dyn Artifact>, param.proxy().base().snapshot());
        });
        let r = weak.clone();
        reference.params.set_removed_callback(move |param| {
            if let Some(reference) = r.upgrade() {
                param.detach();
                reference.raise_removed("paramremove", Rc::clone(param) as Rc<dyn Artifact>);
            }
        });

        let r = weak.clone();
        reference.actions.set_added_callback(move |action| {
            let Some(reference) = r.upgrade() else {
                return;
            };
            action.set_reference(Rc::downgrade(&reference));
            action.event_container().register_bubble_callback(
                ACTION_PROXY_EVENTS,
                &Rc::downgrade(&reference),
                |reference: &WidgetReference, event_type, event, origin| {
                    let mapped = match event_type {
                        "invoke" => "actioninvoke",
                        "paramchange" => "actionparamchange",
                        "paramadd" => "actionparamadd",
                        "paramremove" => "actionparamremove",
                        _ => "actionchange",
                    };
                    reference.forward(mapped, event, origin);
                },
            );
            reference.raise_added("actionadd", Rc::clone(action) as Rc<dyn Artifact>, action.proxy().base().snapshot());
        });
        let r = weak.clone();
        reference.actions.set_removed_callback(move |action| {
            if let Some(reference) = r.upgrade() {
                action.detach();
                reference.raise_removed("actionremove", Rc::clone(action) as Rc<dyn Artifact>);
            }
        });

        let r = weak.clone();
        reference.events.set_added_callback(move |desc| {
            let Some(reference) = r.upgrade() else {
                return;
            };
            desc.set_reference(Rc::downgrade(&reference));
            desc.event_container().register_bubble_callback(
                EVENT_DESC_PROXY_EVENTS,
                &Rc::downgrade(&reference),
                |reference: &WidgetReference, event_type, event, origin| {
                    let mapped = match event_type {
                        "trigger" => "eventtrigger",
                        _ => "eventchange",
                    };
                    reference.forward(mapped, event, origin);
                },
            );
            reference.raise_added("eventadd", Rc::clone(desc) as Rc<dyn Artifact>, desc.proxy().base().snapshot());
        });
        reference.events.set_removed_callback(move |desc| {
            if let Some(reference) = weak.upgrade() {
                desc.detach();
                reference.raise_removed("eventremove", Rc::clone(desc) as Rc<dyn Artifact>);
            }
        });
    }

    pub fn id(&self) -> &str {
        self.base.name()
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn root(&self) -> Option<Rc<PageRoot>> {
        self.root.upgrade()
    }

    pub fn connected(&self) -> bool {
        self.connected.get()
    }

    pub fn started(&self) -> bool {
        self.started.get()
    }

    /// Param values the page supplies on every start.
    pub fn declared_params(&self) -> Map<String, Value> {
        self.declared_params.borrow().clone()
    }

    pub fn requested_connected(&self) -> bool {
        self.requested_connected
    }

    pub fn params(&self) -> &ObjectCollection<ParamProxy> {
        &self.params
    }

    pub fn actions(&self) -> &ObjectCollection<ActionProxy> {
        &self.actions
    }

    pub fn events(&self) -> &ObjectCollection<EventDescProxy> {
        &self.events
    }

    pub fn param(&self, name: &str) -> Option<Rc<ParamProxy>> {
        self.params.get_by_name(name)
    }

    pub fn action(&self, name: &str) -> Option<Rc<ActionProxy>> {
        self.actions.get_by_name(name)
    }

    pub fn event_desc(&self, name: &str) -> Option<Rc<EventDescProxy>> {
        self.events.get_by_name(name)
    }

    pub(crate) fn remember_param(&self, name: &str, value: Value) {
        self.declared_params
            .borrow_mut()
            .insert(name.to_string(), value);
    }

    /// Replace every proxy with the ones described by `manifest`.
    ///
    /// The rebuild raises no `*add`/`*remove` events; those are kept for
    /// live changes reported by the widget.
    pub(crate) fn start(&self, manifest: &Manifest) {
        self.resyncing.set(true);
        self.clear_proxies();
        self.connected.set(manifest.connected);
        for snapshot in &manifest.params {
            self.add_param_proxy(snapshot);
        }
        for snapshot in &manifest.actions {
            self.add_action_proxy(snapshot);
        }
        for snapshot in &manifest.events {
            self.add_event_proxy(snapshot);
        }
        self.resyncing.set(false);
        self.started.set(true);
    }

    /// The widget went away: drop every proxy and stop forwarding requests.
    pub(crate) fn disconnect(&self) {
        self.connected.set(false);
        self.started.set(false);
        self.resyncing.set(true);
        self.clear_proxies();
        self.resyncing.set(false);
    }

    fn clear_proxies(&self) {
        self.params.clear();
        self.actions.clear();
        self.events.clear();
    }

    pub(crate) fn add_param_proxy(&self, snapshot: &Value) -> Option<Rc<ParamProxy>> {
        let (name, snapshot) = self.proxy_snapshot(snapshot)?;
        self.params.add(&name, &snapshot)
    }

    pub(crate) fn add_action_proxy(&self, snapshot: &Value) -> Option<Rc<ActionProxy>> {
        let (name, snapshot) = self.proxy_snapshot(snapshot)?;
        self.actions.add(&name, &snapshot)
    }

    pub(crate) fn add_event_proxy(&self, snapshot: &Value) -> Option<Rc<EventDescProxy>> {
        let (name, snapshot) = self.proxy_snapshot(snapshot)?;
        self.events.add(&name, &snapshot)
    }

    pub(crate) fn remove_param_proxy(&self, name: &str) -> bool {
        self.params.remove(name)
    }

    pub(crate) fn remove_action_proxy(&self, name: &str) -> bool {
        self.actions.remove(name)
    }

    pub(crate) fn remove_event_proxy(&self, name: &str) -> bool {
        self.events.remove(name)
    }

    /// Tag a transport snapshot with this reference's connection state.
    fn proxy_snapshot(&self, snapshot: &Value) -> Option<(String, Value)> {
        let mut object = snapshot.as_object()?.clone();
        let name = object.get("name")?.as_str()?.to_string();
        object.insert("connected".to_string(), Value::Bool(self.connected()));
        Some((name, Value::Object(object)))
    }

    pub(crate) fn signal_property_change(
        &self,
        object_type: ObjectType,
        name: &str,
        action: Option<&str>,
        property: &str,
        value: &Value,
    ) -> bool {
        match self.root() {
            Some(root) => root.signal_property_change(self, object_type, name, action, property, value),
            None => false,
        }
    }

    pub(crate) fn signal_action_invoke(&self, action: &str, args: Vec<Value>) -> bool {
        match self.root() {
            Some(root) => root.signal_action_invoke(self, action, args),
            None => false,
        }
    }

    pub(crate) fn signal_event_trigger(&self, event: &str, value: Value) -> bool {
        match self.root() {
            Some(root) => root.signal_event_trigger(self, event, value),
            None => false,
        }
    }

    fn forward(&self, event_type: &str, event: Event, origin: Rc<dyn Artifact>) {
        let target = event.target.or(Some(origin));
        self.base.events().trigger(event_type, event.value, target);
    }

    fn raise_added(&self, event_type: &str, item: Rc<dyn Artifact>, snapshot: Value) {
        if self.resyncing.get() {
            return;
        }
        self.base.events().trigger(event_type, snapshot, Some(item));
    }

    fn raise_removed(&self, event_type: &str, item: Rc<dyn Artifact>) {
        if self.resyncing.get() {
            return;
        }
        let name = item.name();
        self.base
            .events()
            .trigger(event_type, json!({"name": name}), Some(item));
    }
}

impl Eventer for WidgetReference {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for WidgetReference {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::WidgetReference
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
