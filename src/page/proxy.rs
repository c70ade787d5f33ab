use std::cell::Cell;

use serde_json::{json, Value};

use crate::event::EventContainer;
use crate::object::{Artifact, Eventer, ObjectBase, ObjectType, PropertyDescriptor, SetOutcome};

/// Page-side cache of a remote artifact.
///
/// The descriptor table lists what can be read; entries marked writable are
/// the ones the page may ask the widget to change. Local writes update the
/// cache right away, the widget's confirmation arrives later through
/// [`Proxy::notify_property_change`].
pub struct Proxy {
    base: ObjectBase,
    connected: Cell<bool>,
}

impl Proxy {
    /// `snapshot.connected` seeds the connected flag (default `true`).
    pub fn new(
        name: &str,
        object_type: ObjectType,
        descriptors: &'static [PropertyDescriptor],
        snapshot: &Value,
    ) -> Self {
        let connected = snapshot
            .get("connected")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        Self {
            base: ObjectBase::new(name, object_type, descriptors, snapshot),
            connected: Cell::new(connected),
        }
    }

    pub fn base(&self) -> &ObjectBase {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.base.get(name)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.base.get_bool(name, default)
    }

    pub fn connected(&self) -> bool {
        self.connected.get()
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(connected);
    }

    /// Speculative local write. Disconnected proxies refuse everything.
    pub fn write(&self, name: &str, value: Value) -> SetOutcome {
        if !self.connected() {
            return SetOutcome::Rejected;
        }
        self.base.set(name, value, None)
    }

    /// The widget confirmed a change: store it and raise one `change`.
    pub fn notify_property_change(&self, name: &str, value: Value) -> bool {
        if !self.base.replace(name, value.clone()) {
            return false;
        }
        self.base
            .events()
            .trigger("change", json!({"property": name, "value": value}), None);
        true
    }

    /// Overwrite the cache from a fresh snapshot. Raises nothing.
    pub fn refresh_properties(&self, snapshot: &Value) {
        let Some(object) = snapshot.as_object() else {
            return;
        };
        for descriptor in self.base.descriptors() {
            if descriptor.name == "name" {
                continue;
            }
            if let Some(value) = object.get(descriptor.name) {
                self.base.replace(descriptor.name, value.clone());
            }
        }
    }
}

/// Common behavior of every page-side mirror.
pub trait ProxyObject: Artifact + Eventer {
    fn proxy(&self) -> &Proxy;

    /// Forward a locally accepted write to the widget.
    fn handle_property_change(&self, _name: &str, _value: &Value) {}

    /// Gate a write from page code and forward it when it changed anything.
    fn request_property_change(&self, name: &str, value: Value) -> SetOutcome {
        let outcome = self.proxy().write(name, value);
        if let SetOutcome::Changed(committed) = &outcome {
            self.handle_property_change(name, committed);
        }
        outcome
    }

    fn notify_property_change(&self, name: &str, value: Value) -> bool {
        self.proxy().notify_property_change(name, value)
    }

    fn refresh_properties(&self, snapshot: &Value) {
        self.proxy().refresh_properties(snapshot)
    }

    fn connected(&self) -> bool {
        self.proxy().connected()
    }
}

impl Eventer for Proxy {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}
