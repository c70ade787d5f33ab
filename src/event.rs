use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};
use std::time::SystemTime;

use serde_json::Value;

use crate::collection::Collection;
use crate::object::Artifact;

pub type Handler = Rc<dyn Fn(&mut Event)>;

type BubbleCallback = Rc<dyn Fn(&str, Event, Rc<dyn Artifact>)>;

/// Wrap a closure into a [`Handler`]. Keep the returned `Rc` around if the
/// handler should later be removed by identity.
pub fn handler(f: impl Fn(&mut Event) + 'static) -> Handler {
    Rc::new(f)
}

/// Event record handed to handlers.
#[derive(Clone)]
pub struct Event {
    /// Name the current handler was bound with.
    pub name: Option<String>,
    pub event_type: String,
    /// Data the current handler was bound with.
    pub data: Option<Value>,
    pub target: Option<Rc<dyn Artifact>>,
    pub current_target: Option<Rc<dyn Artifact>>,
    pub value: Value,
    pub timestamp: SystemTime,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    pub fn new(
        event_type: &str,
        value: Value,
        target: Option<Rc<dyn Artifact>>,
        current_target: Option<Rc<dyn Artifact>>,
    ) -> Self {
        Self {
            name: None,
            event_type: event_type.to_string(),
            data: None,
            target,
            current_target,
            value,
            timestamp: SystemTime::now(),
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    /// Keep the remaining handlers on this object but do not bubble.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Skip the remaining handlers on this object and do not bubble.
    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped = true;
        self.propagation_stopped = true;
    }

    pub fn target_name(&self) -> Option<String> {
        self.target.as_ref().map(|target| target.name())
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("name", &self.name)
            .field("type", &self.event_type)
            .field("data", &self.data)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("value", &self.value)
            .field("propagation_stopped", &self.propagation_stopped)
            .field(
                "immediate_propagation_stopped",
                &self.immediate_propagation_stopped,
            )
            .finish()
    }
}

#[derive(Clone)]
struct Registration {
    handler: Handler,
    name: Option<String>,
    data: Option<Value>,
}

/// Handler identity used when unbinding.
pub enum HandlerKey<'a> {
    Handler(&'a Handler),
    Name(&'a str),
}

impl<'a> From<&'a Handler> for HandlerKey<'a> {
    fn from(handler: &'a Handler) -> Self {
        HandlerKey::Handler(handler)
    }
}

impl<'a> From<&'a str> for HandlerKey<'a> {
    fn from(name: &'a str) -> Self {
        HandlerKey::Name(name)
    }
}

impl Registration {
    fn matches(&self, key: &HandlerKey<'_>) -> bool {
        match key {
            HandlerKey::Handler(handler) => Rc::ptr_eq(&self.handler, handler),
            HandlerKey::Name(name) => self.name.as_deref() == Some(*name),
        }
    }
}

/// Per-object registry of event handlers plus the single bubble parent for
/// each event type.
///
/// Bubbling is a walk up a tree: each type has at most one parent callback.
/// Whoever wires the callbacks is responsible for keeping the links acyclic.
#[derive(Default)]
pub struct EventContainer {
    owner: RefCell<Option<Weak<dyn Artifact>>>,
    handlers: RefCell<HashMap<String, Collection<Registration>>>,
    bubble_parents: RefCell<HashMap<String, BubbleCallback>>,
}

impl EventContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the object reported as `current_target` for events raised here.
    pub fn set_owner(&self, owner: Weak<dyn Artifact>) {
        *self.owner.borrow_mut() = Some(owner);
    }

    pub fn owner(&self) -> Option<Rc<dyn Artifact>> {
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Bind `handler` to `event_type`. Returns `false` without touching the
    /// registry when the same handler or the same name is already bound.
    pub fn on(
        &self,
        event_type: &str,
        handler: Handler,
        data: Option<Value>,
        name: Option<&str>,
    ) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let registrations = handlers.entry(event_type.to_string()).or_default();
        let duplicate = registrations.any(|existing| {
            Rc::ptr_eq(&existing.handler, &handler)
                || (name.is_some() && existing.name.as_deref() == name)
        });
        if duplicate {
            return false;
        }
        registrations.add(Registration {
            handler,
            name: name.map(str::to_string),
            data,
        });
        true
    }

    pub fn off<'a>(&self, event_type: &str, key: impl Into<HandlerKey<'a>>) -> bool {
        let key = key.into();
        let mut handlers = self.handlers.borrow_mut();
        let Some(registrations) = handlers.get_mut(event_type) else {
            return false;
        };
        let removed = registrations.remove_where(|registration| registration.matches(&key));
        if registrations.is_empty() {
            handlers.remove(event_type);
        }
        removed > 0
    }

    /// Drop every handler for `event_type`, or for all types when `None`.
    pub fn off_all(&self, event_type: Option<&str>) {
        let mut handlers = self.handlers.borrow_mut();
        match event_type {
            Some(event_type) => {
                handlers.remove(event_type);
            }
            None => handlers.clear(),
        }
    }

    pub fn has_handlers(&self, event_type: &str) -> bool {
        self.handlers
            .borrow()
            .get(event_type)
            .is_some_and(|registrations| !registrations.is_empty())
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers
            .borrow()
            .get(event_type)
            .map_or(0, Collection::len)
    }

    /// Raise `event_type` on this container's owner and then bubble it.
    ///
    /// Handlers run in registration order against a snapshot taken before
    /// dispatch, so handlers may bind or unbind freely.
    pub fn trigger(
        &self,
        event_type: &str,
        value: Value,
        original_target: Option<Rc<dyn Artifact>>,
    ) -> Event {
        let owner = self.owner();
        let target = original_target.or_else(|| owner.clone());
        let mut event = Event::new(event_type, value, target, owner);

        let snapshot = self
            .handlers
            .borrow()
            .get(event_type)
            .cloned()
            .unwrap_or_default();

        snapshot.each(|registration| {
            if event.is_immediate_propagation_stopped() {
                return ControlFlow::Break(());
            }
            event.name = registration.name.clone();
            event.data = registration.data.clone();
            (registration.handler)(&mut event);
            ControlFlow::Continue(())
        });

        if !event.is_propagation_stopped() {
            self.bubble(event_type, &event);
        }
        event
    }

    fn bubble(&self, event_type: &str, source: &Event) {
        let callback = self.bubble_parents.borrow().get(event_type).cloned();
        let (Some(callback), Some(origin)) = (callback, self.owner()) else {
            return;
        };
        let mut forwarded = source.clone();
        forwarded.name = None;
        forwarded.data = None;
        callback(event_type, forwarded, origin);
    }

    /// Route bubbling `types` to `callback`, run with `bubble_target` as the
    /// receiver. Registering a type again replaces its previous parent.
    pub fn register_bubble_callback<P, F>(&self, types: &[&str], bubble_target: &Weak<P>, callback: F)
    where
        P: 'static,
        F: Fn(&P, &str, Event, Rc<dyn Artifact>) + 'static,
    {
        let callback = Rc::new(callback);
        let mut parents = self.bubble_parents.borrow_mut();
        for event_type in types {
            let target = bubble_target.clone();
            let callback = Rc::clone(&callback);
            let bound: BubbleCallback = Rc::new(move |event_type, event, origin| {
                if let Some(target) = target.upgrade() {
                    callback(&target, event_type, event, origin);
                }
            });
            parents.insert(event_type.to_string(), bound);
        }
    }

    pub fn clear_bubble_callbacks(&self) {
        self.bubble_parents.borrow_mut().clear();
    }
}
