use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use serde_json::{json, Map, Value};

use super::action::{Action, ActionFn, ACTION_EVENTS};
use super::event_desc::{EventDesc, EVENT_DESC_EVENTS};
use super::param::{Param, PARAM_EVENTS};
use crate::convert::{Converter, DefaultConverter};
use crate::dom::DomQuery;
use crate::event::{Event, EventContainer};
use crate::object::{Artifact, Eventer, ObjectBase, ObjectCollection, ObjectType, PropertyDescriptor};
use crate::transport::protocol::Manifest;

pub const WIDGET_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("id"),
    PropertyDescriptor::readonly("enabled"),
    PropertyDescriptor::readonly("connected"),
    PropertyDescriptor::readonly("started"),
];

/// Every event type a widget raises, own or bubbled up from its artifacts.
pub const WIDGET_EVENTS: &[&str] = &[
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

/// Outbound half of the sync protocol. The widget root implements it; the
/// widget calls it directly instead of going through user-visible events.
pub trait WidgetSignals {
    fn property_changed(
        &self,
        object_type: ObjectType,
        name: &str,
        action: Option<&str>,
        property: &str,
        value: &Value,
    );

    fn action_invoked(&self, action: &str, return_value: &Value);

    fn event_triggered(&self, event: &str, value: &Value);

    fn artifact_added(&self, object_type: ObjectType, transport: Value, action: Option<&str>);

    fn artifact_removed(&self, object_type: ObjectType, name: &str, action: Option<&str>);
}

/// The widget document's own model: its params, actions and events.
pub struct Widget {
    base: ObjectBase,
    params: ObjectCollection<Param>,
    actions: ObjectCollection<Action>,
    events: ObjectCollection<EventDesc>,
    signals: RefCell<Option<Weak<dyn WidgetSignals>>>,
    functions: RefCell<HashMap<String, ActionFn>>,
    converter: RefCell<Rc<dyn Converter>>,
    dom: RefCell<Option<Rc<dyn DomQuery>>>,
}

impl Widget {
    pub fn new(id: &str) -> Rc<Widget> {
        let widget = Rc::new(Widget {
            base: ObjectBase::new(
                id,
                ObjectType::Widget,
                WIDGET_PROPERTIES,
                &json!({"id": id, "enabled": true, "connected": false, "started": false}),
            ),
            params: ObjectCollection::with_factory(
                ObjectType::Param,
                Rc::new(|name: &str, options: &Value| Param::new(name, options)),
            ),
            actions: ObjectCollection::with_factory(
                ObjectType::Action,
                Rc::new(|name: &str, options: &Value| Action::new(name, options)),
            ),
            events: ObjectCollection::with_factory(
                ObjectType::EventDesc,
                Rc::new(|name: &str, options: &Value| EventDesc::new(name, options)),
            ),
            signals: RefCell::new(None),
            functions: RefCell::new(HashMap::new()),
            converter: RefCell::new(Rc::new(DefaultConverter)),
            dom: RefCell::new(None),
        });
        widget
            .base
            .attach(Rc::downgrade(&widget) as Weak<dyn Artifact>);
        Widget::wire_collections(&widget);
        widget
    }

    fn wire_collections(widget: &Rc<Widget>) {
        let weak = Rc::downgrade(widget);

        let w = weak.clone();
        widget.params.set_added_callback(move |param| {
            if let Some(widget) = w.upgrade() {
                widget.param_added(param);
            }
        });
        let w = weak.clone();
        widget.params.set_removed_callback(move |param| {
            if let Some(widget) = w.upgrade() {
                param.detach();
                widget.artifact_removed(ObjectType::Param, "paramremove", Rc::clone(param) as Rc<dyn Artifact>, param.is_external());
            }
        });

        let w = weak.clone();
        widget.actions.set_added_callback(move |action| {
            if let Some(widget) = w.upgrade() {
                widget.action_added(action);
            }
        });
        let w = weak.clone();
        widget.actions.set_removed_callback(move |action| {
            if let Some(widget) = w.upgrade() {
                action.detach();
                widget.artifact_removed(ObjectType::Action, "actionremove", Rc::clone(action) as Rc<dyn Artifact>, action.is_external());
            }
        });

        let w = weak.clone();
        widget.events.set_added_callback(move |desc| {
            if let Some(widget) = w.upgrade() {
                widget.event_desc_added(desc);
            }
        });
        widget.events.set_removed_callback(move |desc| {
            if let Some(widget) = weak.upgrade() {
                desc.detach();
                widget.artifact_removed(ObjectType::EventDesc, "eventremove", Rc::clone(desc) as Rc<dyn Artifact>, desc.is_external());
            }
        });
    }

    pub fn id(&self) -> &str {
        self.base.name()
    }

    pub fn enabled(&self) -> bool {
        self.base.get_bool("enabled", true)
    }

    pub fn connected(&self) -> bool {
        self.base.get_bool("connected", false)
    }

    pub fn started(&self) -> bool {
        self.base.get_bool("started", false)
    }

    pub fn params(&self) -> &ObjectCollection<Param> {
        &self.params
    }

    pub fn actions(&self) -> &ObjectCollection<Action> {
        &self.actions
    }

    pub fn events(&self) -> &ObjectCollection<EventDesc> {
        &self.events
    }

    pub fn param(&self, name: &str) -> Option<Rc<Param>> {
        self.params.get_by_name(name)
    }

    pub fn action(&self, name: &str) -> Option<Rc<Action>> {
        self.actions.get_by_name(name)
    }

    pub fn event_desc(&self, name: &str) -> Option<Rc<EventDesc>> {
        self.events.get_by_name(name)
    }

    pub fn add_param(&self, name: &str, options: &Value) -> Option<Rc<Param>> {
        self.params.add(name, options)
    }

    pub fn add_action(&self, name: &str, options: &Value) -> Option<Rc<Action>> {
        self.actions.add(name, options)
    }

    pub fn add_event(&self, name: &str, options: &Value) -> Option<Rc<EventDesc>> {
        self.events.add(name, options)
    }

    pub fn remove_param(&self, name: &str) -> bool {
        self.params.remove(name)
    }

    pub fn remove_action(&self, name: &str) -> bool {
        self.actions.remove(name)
    }

    pub fn remove_event(&self, name: &str) -> bool {
        self.events.remove(name)
    }

    /// Make `function` available to actions whose `binding` names it.
    pub fn register_function(&self, name: &str, function: impl Fn(&[Value]) -> Value + 'static) {
        self.functions
            .borrow_mut()
            .insert(name.to_string(), Rc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<ActionFn> {
        self.functions.borrow().get(name).cloned()
    }

    /// Attach the document params write their bindings into. Current values
    /// are pushed immediately.
    pub fn set_dom(&self, dom: Rc<dyn DomQuery>) {
        *self.dom.borrow_mut() = Some(dom);
        for param in self.params.to_vec() {
            param.apply_binding();
        }
    }

    pub fn dom(&self) -> Option<Rc<dyn DomQuery>> {
        self.dom.borrow().clone()
    }

    pub fn set_converter(&self, converter: Rc<dyn Converter>) {
        *self.converter.borrow_mut() = converter;
    }

    pub fn converter(&self) -> Rc<dyn Converter> {
        Rc::clone(&self.converter.borrow())
    }

    pub fn set_signals(&self, signals: Weak<dyn WidgetSignals>) {
        *self.signals.borrow_mut() = Some(signals);
    }

    /// Apply the page's param values, then mark the widget started.
    ///
    /// Values are applied before `started` flips so they travel back in the
    /// manifest rather than as individual change signals.
    pub fn start(&self, params: &Map<String, Value>, connected: bool) {
        // a restart resyncs through the manifest, not through change signals
        self.base.force("started", Value::Bool(false));
        for (name, value) in params {
            match self.param(name) {
                Some(param) if param.is_external() => {
                    param.set_from_parent("value", value.clone());
                }
                _ => {
                    tracing::debug!(target: "svidget::widget", widget = self.id(), param = %name, "start value for unknown param ignored");
                }
            }
        }
        self.base.force("connected", Value::Bool(connected));
        self.base.force("started", Value::Bool(true));
    }

    pub fn set_connected(&self, connected: bool) {
        self.base.force("connected", Value::Bool(connected));
    }

    pub(crate) fn stop(&self) {
        self.base.force("started", Value::Bool(false));
    }

    /// What the page gets to see: external artifacts only.
    pub fn manifest(&self) -> Manifest {
        Manifest {
            id: self.id().to_string(),
            enabled: self.enabled(),
            connected: self.connected(),
            params: self
                .params
                .matching(|param| param.is_external())
                .iter()
                .map(|param| param.to_transport())
                .collect(),
            actions: self
                .actions
                .matching(|action| action.is_external())
                .iter()
                .map(|action| action.to_transport())
                .collect(),
            events: self
                .events
                .matching(|desc| desc.is_external())
                .iter()
                .map(|desc| desc.to_transport())
                .collect(),
        }
    }

    fn signals(&self) -> Option<Rc<dyn WidgetSignals>> {
        if !(self.started() && self.connected()) {
            return None;
        }
        self.signals.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn signal_property_change(
        &self,
        object_type: ObjectType,
        name: &str,
        action: Option<&str>,
        property: &str,
        value: &Value,
    ) {
        if let Some(signals) = self.signals() {
            signals.property_changed(object_type, name, action, property, value);
        }
    }

    pub(crate) fn signal_action_invoked(&self, action: &str, return_value: &Value) {
        if let Some(signals) = self.signals() {
            signals.action_invoked(action, return_value);
        }
    }

    pub(crate) fn signal_event_triggered(&self, event: &str, value: &Value) {
        if let Some(signals) = self.signals() {
            signals.event_triggered(event, value);
        }
    }

    pub(crate) fn signal_added(&self, object_type: ObjectType, transport: Value, action: Option<&str>) {
        if let Some(signals) = self.signals() {
            signals.artifact_added(object_type, transport, action);
        }
    }

    pub(crate) fn signal_removed(&self, object_type: ObjectType, name: &str, action: Option<&str>) {
        if let Some(signals) = self.signals() {
            signals.artifact_removed(object_type, name, action);
        }
    }

    fn param_added(self: &Rc<Self>, param: &Rc<Param>) {
        param.set_widget(Rc::downgrade(self));
        param.event_container().register_bubble_callback(
            PARAM_EVENTS,
            &Rc::downgrade(self),
            |widget: &Widget, event_type, event, origin| {
                let mapped = match event_type {
                    "set" => "paramset",
                    _ => "paramchange",
                };
                widget.forward(mapped, event, origin);
            },
        );
        param.apply_binding();
        self.artifact_added(
            ObjectType::Param,
            "paramadd",
            param.to_transport(),
            Rc::clone(param) as Rc<dyn Artifact>,
            param.is_external(),
        );
    }

    fn action_added(self: &Rc<Self>, action: &Rc<Action>) {
        action.set_widget(Rc::downgrade(self));
        action.event_container().register_bubble_callback(
            ACTION_EVENTS,
            &Rc::downgrade(self),
            |widget: &Widget, event_type, event, origin| {
                let mapped = match event_type {
                    "invoke" => "actioninvoke",
                    "paramchange" => "actionparamchange",
                    "paramadd" => "actionparamadd",
                    "paramremove" => "actionparamremove",
                    _ => "actionchange",
                };
                widget.forward(mapped, event, origin);
            },
        );
        self.artifact_added(
            ObjectType::Action,
            "actionadd",
            action.to_transport(),
            Rc::clone(action) as Rc<dyn Artifact>,
            action.is_external(),
        );
    }

    fn event_desc_added(self: &Rc<Self>, desc: &Rc<EventDesc>) {
        desc.set_widget(Rc::downgrade(self));
        desc.event_container().register_bubble_callback(
            EVENT_DESC_EVENTS,
            &Rc::downgrade(self),
            |widget: &Widget, event_type, event, origin| {
                let mapped = match event_type {
                    "trigger" => "eventtrigger",
                    _ => "eventchange",
                };
                widget.forward(mapped, event, origin);
            },
        );
        self.artifact_added(
            ObjectType::EventDesc,
            "eventadd",
            desc.to_transport(),
            Rc::clone(desc) as Rc<dyn Artifact>,
            desc.is_external(),
        );
    }

    fn forward(&self, event_type: &str, event: Event, origin: Rc<dyn Artifact>) {
        let target = event.target.or(Some(origin));
        self.base.events().trigger(event_type, event.value, target);
    }

    fn artifact_added(
        &self,
        object_type: ObjectType,
        event_type: &str,
        transport: Value,
        item: Rc<dyn Artifact>,
        external: bool,
    ) {
        self.base
            .events()
            .trigger(event_type, transport.clone(), Some(item));
        if external {
            self.signal_added(object_type, transport, None);
        }
    }

    fn artifact_removed(
        &self,
        object_type: ObjectType,
        event_type: &str,
        item: Rc<dyn Artifact>,
        external: bool,
    ) {
        let name = item.name();
        self.base
            .events()
            .trigger(event_type, json!({"name": name}), Some(item));
        if external {
            self.signal_removed(object_type, &name, None);
        }
    }
}

impl Eventer for Widget {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for Widget {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Widget
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
