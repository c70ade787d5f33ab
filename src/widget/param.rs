use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};

use super::widget::Widget;
use crate::convert::{Converter, DefaultConverter, TypeSpec};
use crate::event::EventContainer;
use crate::object::{
    Artifact, Coercion, Eventer, GetSetter, ObjectBase, ObjectType, PropertyDescriptor, SetOutcome,
};

pub const PARAM_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::readonly("shortname"),
    PropertyDescriptor::writable("type"),
    PropertyDescriptor::writable("subtype"),
    PropertyDescriptor::writable("typedata"),
    PropertyDescriptor::writable("coerce"),
    PropertyDescriptor::writable("defvalue"),
    PropertyDescriptor::writable("description"),
    PropertyDescriptor::writable("group"),
    PropertyDescriptor::writable("binding"),
    PropertyDescriptor::writable("enabled"),
    PropertyDescriptor::writable("value"),
    PropertyDescriptor::readonly("external"),
];

/// Properties the page is allowed to change.
pub const PARAM_REMOTE_WRITABLE: &[&str] = &["value", "enabled"];

pub const PARAM_EVENTS: &[&str] = &["change", "set"];

/// A typed, externally settable widget parameter.
pub struct Param {
    base: ObjectBase,
    widget: RefCell<Weak<Widget>>,
}

impl Param {
    /// Build a param from an options object. Missing `value` falls back to
    /// `defvalue`. Empty names are refused.
    pub fn new(name: &str, options: &Value) -> Option<Rc<Param>> {
        if name.trim().is_empty() {
            return None;
        }
        let mut snapshot = options.as_object().cloned().unwrap_or_default();
        snapshot.entry("type").or_insert_with(|| json!("string"));
        snapshot.entry("enabled").or_insert(Value::Bool(true));
        snapshot.entry("external").or_insert(Value::Bool(true));
        snapshot.entry("coerce").or_insert(Value::Bool(false));
        if !snapshot.contains_key("value") {
            if let Some(defvalue) = snapshot.get("defvalue").cloned() {
                snapshot.insert("value".to_string(), defvalue);
            }
        }
        if snapshot.get("coerce").and_then(Value::as_bool) == Some(true) {
            let spec = type_spec_from(&Value::Object(snapshot.clone()));
            if let Some(value) = snapshot.get("value").cloned() {
                let coerced = DefaultConverter.to(
                    &value,
                    &spec.kind,
                    spec.subtype.as_deref(),
                    spec.typedata.as_deref(),
                );
                snapshot.insert("value".to_string(), coerced);
            }
        }

        let param = Rc::new(Param {
            base: ObjectBase::new(name, ObjectType::Param, PARAM_PROPERTIES, &Value::Object(snapshot)),
            widget: RefCell::new(Weak::new()),
        });
        param.base.attach(Rc::downgrade(&param) as Weak<dyn Artifact>);
        Some(param)
    }

    pub fn value(&self) -> Value {
        self.base.get("value").unwrap_or(Value::Null)
    }

    pub fn set_value(&self, value: Value) -> SetOutcome {
        self.set_property("value", value)
    }

    pub fn enabled(&self) -> bool {
        self.base.get_bool("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> SetOutcome {
        self.set_property("enabled", Value::Bool(enabled))
    }

    pub fn coerce(&self) -> bool {
        self.base.get_bool("coerce", false)
    }

    pub fn binding(&self) -> Option<String> {
        self.base.get_str("binding")
    }

    pub fn description(&self) -> Option<String> {
        self.base.get_str("description")
    }

    pub fn type_spec(&self) -> TypeSpec {
        type_spec_from(&self.base.snapshot())
    }

    pub fn widget(&self) -> Option<Rc<Widget>> {
        self.widget.borrow().upgrade()
    }

    pub(crate) fn set_widget(&self, widget: Weak<Widget>) {
        self.base
            .set_parent(Some(widget.clone() as Weak<dyn Artifact>));
        *self.widget.borrow_mut() = widget;
    }

    pub(crate) fn detach(&self) {
        self.base.set_parent(None);
        self.base.events().clear_bubble_callbacks();
        *self.widget.borrow_mut() = Weak::new();
    }

    /// Apply a change requested by the page. Only a few properties are
    /// open to it.
    pub(crate) fn set_from_parent(&self, name: &str, value: Value) -> SetOutcome {
        if !PARAM_REMOTE_WRITABLE.contains(&name) {
            return SetOutcome::Rejected;
        }
        self.set_property(name, value)
    }

    /// Push the current value into the nodes selected by `binding`.
    pub fn apply_binding(&self) -> bool {
        let (Some(widget), Some(binding)) = (self.widget(), self.binding()) else {
            return false;
        };
        let Some(dom) = widget.dom() else {
            return false;
        };
        match dom.select(&binding) {
            Some(selection) => {
                selection.set_value(&self.value());
                true
            }
            None => {
                tracing::debug!(target: "svidget::widget", param = self.base.name(), binding = %binding, "binding selected nothing");
                false
            }
        }
    }

    pub fn to_transport(&self) -> Value {
        self.base.snapshot()
    }

    fn property_changed(&self, name: &str, value: &Value, widget: Option<&Rc<Widget>>) {
        if name == "value" || name == "binding" {
            self.apply_binding();
        }
        self.base
            .events()
            .trigger("change", json!({"property": name, "value": value}), None);
        if name == "value" {
            self.base
                .events()
                .trigger("set", json!({"value": value}), None);
        }
        if let Some(widget) = widget {
            if self.is_external() {
                widget.signal_property_change(ObjectType::Param, self.base.name(), None, name, value);
            }
        }
    }
}

fn type_spec_from(snapshot: &Value) -> TypeSpec {
    let text = |key: &str| snapshot.get(key).and_then(Value::as_str).map(str::to_string);
    TypeSpec {
        kind: text("type").unwrap_or_else(|| "string".to_string()),
        subtype: text("subtype"),
        typedata: text("typedata"),
    }
}

impl GetSetter for Param {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.base.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        let widget = self.widget();
        let outcome = if name == "value" && self.coerce() {
            let spec = self.type_spec();
            let converter: Rc<dyn Converter> = widget
                .as_ref()
                .map(|widget| widget.converter())
                .unwrap_or_else(|| Rc::new(DefaultConverter));
            self.base.set(
                name,
                value,
                Some(Coercion {
                    converter: converter.as_ref(),
                    spec: &spec,
                }),
            )
        } else {
            self.base.set(name, value, None)
        };
        if let SetOutcome::Changed(committed) = &outcome {
            self.property_changed(name, committed, widget.as_ref());
        }
        outcome
    }
}

impl Eventer for Param {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for Param {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Param
    }

    fn is_external(&self) -> bool {
        self.base.get_bool("external", true)
    }

    fn parent(&self) -> Option<Rc<dyn Artifact>> {
        self.base.parent()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
