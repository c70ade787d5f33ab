mod object_collection;
mod property_set;

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{Event, EventContainer, Handler, HandlerKey};

pub use object_collection::{ObjectCollection, Selector};
pub use property_set::{Coercion, PropertySet, SetOutcome};

/// Runtime tag for every object that can own events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Param,
    Action,
    ActionParam,
    EventDesc,
    Widget,
    ParamProxy,
    ActionProxy,
    ActionParamProxy,
    EventDescProxy,
    WidgetReference,
    Root,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Param => "param",
            ObjectType::Action => "action",
            ObjectType::ActionParam => "actionparam",
            ObjectType::EventDesc => "eventdesc",
            ObjectType::Widget => "widget",
            ObjectType::ParamProxy => "paramproxy",
            ObjectType::ActionProxy => "actionproxy",
            ObjectType::ActionParamProxy => "actionparamproxy",
            ObjectType::EventDescProxy => "eventdescproxy",
            ObjectType::WidgetReference => "widgetreference",
            ObjectType::Root => "root",
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(
            self,
            ObjectType::ParamProxy
                | ObjectType::ActionProxy
                | ObjectType::ActionParamProxy
                | ObjectType::EventDescProxy
                | ObjectType::WidgetReference
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity shared by every domain object and its mirror.
pub trait Artifact: Any {
    /// Stable name, unique within the owning collection.
    fn name(&self) -> String;

    fn object_type(&self) -> ObjectType;

    /// Whether the page may see this object.
    fn is_external(&self) -> bool {
        true
    }

    fn parent(&self) -> Option<Rc<dyn Artifact>> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

impl dyn Artifact {
    pub fn downcast_ref<T: Artifact>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.object_type(), self.name())
    }
}

/// Objects that own an [`EventContainer`].
pub trait Eventer {
    fn event_container(&self) -> &EventContainer;

    fn on(&self, event_type: &str, handler: Handler) -> bool {
        self.event_container().on(event_type, handler, None, None)
    }

    fn on_named(&self, event_type: &str, name: &str, data: Option<Value>, handler: Handler) -> bool {
        self.event_container()
            .on(event_type, handler, data, Some(name))
    }

    fn off<'a>(&self, event_type: &str, key: impl Into<HandlerKey<'a>>) -> bool
    where
        Self: Sized,
    {
        self.event_container().off(event_type, key)
    }

    fn trigger(&self, event_type: &str, value: Value) -> Event {
        self.event_container().trigger(event_type, value, None)
    }
}

/// Property access through the gate.
pub trait GetSetter {
    fn get_property(&self, name: &str) -> Option<Value>;

    fn set_property(&self, name: &str, value: Value) -> SetOutcome;
}

/// One entry in an object's static property table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyDescriptor {
    pub name: &'static str,
    pub writable: bool,
}

impl PropertyDescriptor {
    pub const fn readonly(name: &'static str) -> Self {
        Self {
            name,
            writable: false,
        }
    }

    pub const fn writable(name: &'static str) -> Self {
        Self {
            name,
            writable: true,
        }
    }
}

pub fn find_descriptor(
    table: &'static [PropertyDescriptor],
    name: &str,
) -> Option<&'static PropertyDescriptor> {
    table.iter().find(|descriptor| descriptor.name == name)
}

/// State shared by every concrete artifact: name, type tag, parent link,
/// properties and events.
pub struct ObjectBase {
    name: String,
    object_type: ObjectType,
    descriptors: &'static [PropertyDescriptor],
    parent: RefCell<Option<Weak<dyn Artifact>>>,
    properties: RefCell<PropertySet>,
    events: EventContainer,
}

impl ObjectBase {
    /// `snapshot` seeds the declared properties; `name` always wins over any
    /// `name` entry in it.
    pub fn new(
        name: &str,
        object_type: ObjectType,
        descriptors: &'static [PropertyDescriptor],
        snapshot: &Value,
    ) -> Self {
        let mut properties =
            PropertySet::from_snapshot(snapshot, descriptors.iter().map(|d| d.name));
        properties.replace("name", Value::String(name.to_string()));
        Self {
            name: name.to_string(),
            object_type,
            descriptors,
            parent: RefCell::new(None),
            properties: RefCell::new(properties),
            events: EventContainer::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn descriptors(&self) -> &'static [PropertyDescriptor] {
        self.descriptors
    }

    pub fn events(&self) -> &EventContainer {
        &self.events
    }

    /// Point the event container at the object that embeds this base.
    pub fn attach(&self, owner: Weak<dyn Artifact>) {
        self.events.set_owner(owner);
    }

    pub fn set_parent(&self, parent: Option<Weak<dyn Artifact>>) {
        *self.parent.borrow_mut() = parent;
    }

    pub fn parent(&self) -> Option<Rc<dyn Artifact>> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        find_descriptor(self.descriptors, name)?;
        self.properties.borrow().get(name).cloned()
    }

    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|value| value.as_str().map(str::to_string))
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name)
            .and_then(|value| value.as_bool())
            .unwrap_or(default)
    }

    /// Gate for writable properties. Undeclared and read-only names are
    /// rejected.
    pub fn set(&self, name: &str, value: Value, coercion: Option<Coercion<'_>>) -> SetOutcome {
        match find_descriptor(self.descriptors, name) {
            Some(descriptor) if descriptor.writable => {
                self.properties.borrow_mut().set(name, value, coercion)
            }
            _ => SetOutcome::Rejected,
        }
    }

    /// Update a declared property the owner manages itself, read-only or
    /// not. Returns whether the value changed.
    pub(crate) fn force(&self, name: &str, value: Value) -> bool {
        if find_descriptor(self.descriptors, name).is_none() {
            return false;
        }
        self.properties.borrow_mut().set(name, value, None).is_changed()
    }

    /// Overwrite a declared property without the equality gate.
    pub(crate) fn replace(&self, name: &str, value: Value) -> bool {
        if find_descriptor(self.descriptors, name).is_none() {
            return false;
        }
        self.properties.borrow_mut().replace(name, value);
        true
    }

    /// Declared properties as a JSON object, used for manifests.
    pub fn snapshot(&self) -> Value {
        self.properties.borrow().to_value()
    }
}
