use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};

use super::widget::Widget;
use crate::event::EventContainer;
use crate::object::{
    Artifact, Eventer, GetSetter, ObjectBase, ObjectType, PropertyDescriptor, SetOutcome,
};

pub const EVENT_DESC_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::writable("description"),
    PropertyDescriptor::writable("enabled"),
    PropertyDescriptor::readonly("external"),
];

pub const EVENT_DESC_REMOTE_WRITABLE: &[&str] = &["enabled"];

pub const EVENT_DESC_EVENTS: &[&str] = &["change", "trigger"];

/// An event the widget publishes to the page.
pub struct EventDesc {
    base: ObjectBase,
    widget: RefCell<Weak<Widget>>,
}

impl EventDesc {
    pub fn new(name: &str, options: &Value) -> Option<Rc<EventDesc>> {
        if name.trim().is_empty() {
            return None;
        }
        let mut snapshot = options.as_object().cloned().unwrap_or_default();
        snapshot.entry("enabled").or_insert(Value::Bool(true));
        snapshot.entry("external").or_insert(Value::Bool(true));
        let desc = Rc::new(EventDesc {
            base: ObjectBase::new(
                name,
                ObjectType::EventDesc,
                EVENT_DESC_PROPERTIES,
                &Value::Object(snapshot),
            ),
            widget: RefCell::new(Weak::new()),
        });
        desc.base.attach(Rc::downgrade(&desc) as Weak<dyn Artifact>);
        Some(desc)
    }

    pub fn enabled(&self) -> bool {
        self.base.get_bool("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> SetOutcome {
        self.set_property("enabled", Value::Bool(enabled))
    }

    pub fn description(&self) -> Option<String> {
        self.base.get_str("description")
    }

    pub fn widget(&self) -> Option<Rc<Widget>> {
        self.widget.borrow().upgrade()
    }

    /// Publish the event. Disabled descriptors publish nothing.
    pub fn trigger_event(&self, value: Value) -> bool {
        if !self.enabled() {
            return false;
        }
        self.base.events().trigger("trigger", value.clone(), None);
        if let Some(widget) = self.widget() {
            if self.is_external() {
                widget.signal_event_triggered(self.base.name(), &value);
            }
        }
        true
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

    pub(crate) fn set_from_parent(&self, name: &str, value: Value) -> SetOutcome {
        if !EVENT_DESC_REMOTE_WRITABLE.contains(&name) {
            return SetOutcome::Rejected;
        }
        self.set_property(name, value)
    }

    pub fn to_transport(&self) -> Value {
        self.base.snapshot()
    }
}

impl GetSetter for EventDesc {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.base.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        let outcome = self.base.set(name, value, None);
        if let SetOutcome::Changed(committed) = &outcome {
            self.base
                .events()
                .trigger("change", json!({"property": name, "value": committed}), None);
            if let Some(widget) = self.widget() {
                if self.is_external() {
                    widget.signal_property_change(
                        ObjectType::EventDesc,
                        self.base.name(),
                        None,
                        name,
                        committed,
                    );
                }
            }
        }
        outcome
    }
}

impl Eventer for EventDesc {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for EventDesc {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::EventDesc
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

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::event::handler;

    #[test]
    fn disabled_descriptor_does_not_trigger() {
        let desc = EventDesc::new("clicked", &json!({})).unwrap();
        let fired = Rc::new(Cell::new(0));
        {
            let fired = Rc::clone(&fired);
            desc.on("trigger", handler(move |_| fired.set(fired.get() + 1)));
        }
        assert!(desc.trigger_event(json!({"x": 1})));
        desc.set_enabled(false);
        assert!(!desc.trigger_event(json!({"x": 2})));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn external_is_fixed_at_creation() {
        let desc = EventDesc::new("internal", &json!({"external": false})).unwrap();
        assert!(!desc.is_external());
        assert_eq!(desc.set_property("external", json!(true)), SetOutcome::Rejected);
        assert_eq!(
            desc.set_from_parent("description", json!("x")),
            SetOutcome::Rejected
        );
    }
}
