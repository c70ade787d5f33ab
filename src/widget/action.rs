use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde_json::{json, Value};

use super::widget::Widget;
use crate::event::{Event, EventContainer};
use crate::object::{
    Artifact, Eventer, GetSetter, ObjectBase, ObjectCollection, ObjectType, PropertyDescriptor,
    SetOutcome,
};

pub type ActionFn = Rc<dyn Fn(&[Value]) -> Value>;

pub const ACTION_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::writable("binding"),
    PropertyDescriptor::writable("description"),
    PropertyDescriptor::writable("enabled"),
    PropertyDescriptor::readonly("external"),
];

pub const ACTION_REMOTE_WRITABLE: &[&str] = &["enabled"];

pub const ACTION_EVENTS: &[&str] = &["change", "invoke", "paramchange", "paramadd", "paramremove"];

pub const ACTION_PARAM_PROPERTIES: &[PropertyDescriptor] = &[
    PropertyDescriptor::readonly("name"),
    PropertyDescriptor::writable("type"),
    PropertyDescriptor::writable("subtype"),
    PropertyDescriptor::writable("description"),
    PropertyDescriptor::writable("defvalue"),
];

pub const ACTION_PARAM_EVENTS: &[&str] = &["change"];

/// Something the page can ask the widget to do.
pub struct Action {
    base: ObjectBase,
    widget: RefCell<Weak<Widget>>,
    function: RefCell<Option<ActionFn>>,
    params: ObjectCollection<ActionParam>,
}

impl Action {
    /// `options.params` may list the action's params in call order.
    pub fn new(name: &str, options: &Value) -> Option<Rc<Action>> {
        if name.trim().is_empty() {
            return None;
        }
        let mut snapshot = options.as_object().cloned().unwrap_or_default();
        snapshot.entry("enabled").or_insert(Value::Bool(true));
        snapshot.entry("external").or_insert(Value::Bool(true));

        let action = Rc::new(Action {
            base: ObjectBase::new(name, ObjectType::Action, ACTION_PROPERTIES, &Value::Object(snapshot)),
            widget: RefCell::new(Weak::new()),
            function: RefCell::new(None),
            params: ObjectCollection::with_factory(
                ObjectType::ActionParam,
                Rc::new(|name: &str, options: &Value| ActionParam::new(name, options)),
            ),
        });
        action
            .base
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
                action.param_removed(param);
            }
        });

        if let Some(params) = options.get("params").and_then(Value::as_array) {
            for entry in params {
                if let Some(param_name) = entry.get("name").and_then(Value::as_str) {
                    action.params.add(param_name, entry);
                }
            }
        }
        Some(action)
    }

    pub fn params(&self) -> &ObjectCollection<ActionParam> {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<Rc<ActionParam>> {
        self.params.get_by_name(name)
    }

    pub fn add_param(&self, name: &str, options: &Value) -> Option<Rc<ActionParam>> {
        self.params.add(name, options)
    }

    pub fn remove_param(&self, name: &str) -> bool {
        self.params.remove(name)
    }

    pub fn enabled(&self) -> bool {
        self.base.get_bool("enabled", true)
    }

    pub fn set_enabled(&self, enabled: bool) -> SetOutcome {
        self.set_property("enabled", Value::Bool(enabled))
    }

    pub fn binding(&self) -> Option<String> {
        self.base.get_str("binding")
    }

    /// Attach the function run on invoke. Takes precedence over `binding`.
    pub fn bind(&self, function: impl Fn(&[Value]) -> Value + 'static) {
        *self.function.borrow_mut() = Some(Rc::new(function));
    }

    pub fn widget(&self) -> Option<Rc<Widget>> {
        self.widget.borrow().upgrade()
    }

    /// Run the action. Disabled or unbound actions return `None`.
    ///
    /// Arguments are matched to params by position; missing or null ones
    /// take the param's `defvalue`.
    pub fn invoke(&self, args: &[Value]) -> Option<Value> {
        if !self.enabled() {
            return None;
        }
        let Some(function) = self.resolve_function() else {
            tracing::debug!(target: "svidget::widget", action = self.base.name(), "action has no function bound");
            return None;
        };
        let args = self.build_args(args);
        let result = function(&args);
        self.base
            .events()
            .trigger("invoke", json!({"returnValue": result}), None);
        if let Some(widget) = self.widget() {
            if self.is_external() {
                widget.signal_action_invoked(self.base.name(), &result);
            }
        }
        Some(result)
    }

    fn resolve_function(&self) -> Option<ActionFn> {
        if let Some(function) = self.function.borrow().clone() {
            return Some(function);
        }
        let binding = self.binding()?;
        self.widget()?.function(&binding)
    }

    fn build_args(&self, args: &[Value]) -> Vec<Value> {
        let params = self.params.to_vec();
        let mut built: Vec<Value> = params
            .iter()
            .enumerate()
            .map(|(index, param)| {
                args.get(index)
                    .filter(|value| !value.is_null())
                    .cloned()
                    .unwrap_or_else(|| param.defvalue())
            })
            .collect();
        if args.len() > params.len() {
            built.extend_from_slice(&args[params.len()..]);
        }
        built
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
        if !ACTION_REMOTE_WRITABLE.contains(&name) {
            return SetOutcome::Rejected;
        }
        self.set_property(name, value)
    }

    pub fn to_transport(&self) -> Value {
        let mut transport = self.base.snapshot();
        let params: Vec<Value> = self
            .params
            .to_vec()
            .iter()
            .map(|param| param.to_transport())
            .collect();
        if let Some(object) = transport.as_object_mut() {
            object.insert("params".to_string(), Value::Array(params));
        }
        transport
    }

    fn param_added(self: &Rc<Self>, param: &Rc<ActionParam>) {
        param.set_action(Rc::downgrade(self));
        param.event_container().register_bubble_callback(
            ACTION_PARAM_EVENTS,
            &Rc::downgrade(self),
            Action::param_bubble,
        );
        let transport = param.to_transport();
        self.base.events().trigger(
            "paramadd",
            transport.clone(),
            Some(Rc::clone(param) as Rc<dyn Artifact>),
        );
        if let Some(widget) = self.widget() {
            if self.is_external() {
                widget.signal_added(ObjectType::ActionParam, transport, Some(self.base.name()));
            }
        }
    }

    fn param_removed(&self, param: &Rc<ActionParam>) {
        param.detach();
        let name = param.name();
        self.base.events().trigger(
            "paramremove",
            json!({"name": name}),
            Some(Rc::clone(param) as Rc<dyn Artifact>),
        );
        if let Some(widget) = self.widget() {
            if self.is_external() {
                widget.signal_removed(ObjectType::ActionParam, &name, Some(self.base.name()));
            }
        }
    }

    fn param_bubble(&self, event_type: &str, event: Event, origin: Rc<dyn Artifact>) {
        if event_type == "change" {
            let target = event.target.or(Some(origin));
            self.base.events().trigger("paramchange", event.value, target);
        }
    }

    fn property_changed(&self, name: &str, value: &Value) {
        self.base
            .events()
            .trigger("change", json!({"property": name, "value": value}), None);
        if let Some(widget) = self.widget() {
            if self.is_external() {
                widget.signal_property_change(ObjectType::Action, self.base.name(), None, name, value);
            }
        }
    }
}

impl GetSetter for Action {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.base.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        let outcome = self.base.set(name, value, None);
        if let SetOutcome::Changed(committed) = &outcome {
            self.property_changed(name, committed);
        }
        outcome
    }
}

impl Eventer for Action {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for Action {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::Action
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

/// Describes one argument of an [`Action`].
pub struct ActionParam {
    base: ObjectBase,
    action: RefCell<Weak<Action>>,
}

impl ActionParam {
    pub fn new(name: &str, options: &Value) -> Option<Rc<ActionParam>> {
        if name.trim().is_empty() {
            return None;
        }
        let mut snapshot = options.as_object().cloned().unwrap_or_default();
        snapshot.entry("type").or_insert_with(|| json!("string"));
        let param = Rc::new(ActionParam {
            base: ObjectBase::new(
                name,
                ObjectType::ActionParam,
                ACTION_PARAM_PROPERTIES,
                &Value::Object(snapshot),
            ),
            action: RefCell::new(Weak::new()),
        });
        param
            .base
            .attach(Rc::downgrade(&param) as Weak<dyn Artifact>);
        Some(param)
    }

    pub fn defvalue(&self) -> Value {
        self.base.get("defvalue").unwrap_or(Value::Null)
    }

    pub fn action(&self) -> Option<Rc<Action>> {
        self.action.borrow().upgrade()
    }

    pub fn to_transport(&self) -> Value {
        self.base.snapshot()
    }

    fn set_action(&self, action: Weak<Action>) {
        self.base
            .set_parent(Some(action.clone() as Weak<dyn Artifact>));
        *self.action.borrow_mut() = action;
    }

    fn detach(&self) {
        self.base.set_parent(None);
        self.base.events().clear_bubble_callbacks();
        *self.action.borrow_mut() = Weak::new();
    }
}

impl GetSetter for ActionParam {
    fn get_property(&self, name: &str) -> Option<Value> {
        self.base.get(name)
    }

    fn set_property(&self, name: &str, value: Value) -> SetOutcome {
        let outcome = self.base.set(name, value, None);
        if let SetOutcome::Changed(committed) = &outcome {
            self.base
                .events()
                .trigger("change", json!({"property": name, "value": committed}), None);
            if let Some(action) = self.action() {
                if let (Some(widget), true) = (action.widget(), action.is_external()) {
                    widget.signal_property_change(
                        ObjectType::ActionParam,
                        self.base.name(),
                        Some(&action.name()),
                        name,
                        committed,
                    );
                }
            }
        }
        outcome
    }
}

impl Eventer for ActionParam {
    fn event_container(&self) -> &EventContainer {
        self.base.events()
    }
}

impl Artifact for ActionParam {
    fn name(&self) -> String {
        self.base.name().to_string()
    }

    fn object_type(&self) -> ObjectType {
        ObjectType::ActionParam
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

    fn scale() -> Rc<Action> {
        let action = Action::new(
            "scale",
            &json!({"params": [
                {"name": "factor", "type": "number", "defvalue": 2},
                {"name": "label"}
            ]}),
        )
        .unwrap();
        action.bind(|args| json!(args));
        action
    }

    #[test]
    fn params_come_from_options_in_order() {
        let action = scale();
        assert_eq!(action.params().names(), vec!["factor", "label"]);
        assert_eq!(
            action.param("factor").map(|p| p.defvalue()),
            Some(json!(2))
        );
    }

    #[test]
    fn invoke_fills_defaults_and_raises_event() {
        let action = scale();
        let invoked = Rc::new(Cell::new(0));
        {
            let invoked = Rc::clone(&invoked);
            action.on("invoke", handler(move |_| invoked.set(invoked.get() + 1)));
        }
        let result = action.invoke(&[Value::Null, json!("x"), json!(true)]);
        assert_eq!(result, Some(json!([2, "x", true])));
        assert_eq!(invoked.get(), 1);
    }

    #[test]
    fn disabled_or_unbound_actions_do_nothing() {
        let action = scale();
        action.set_enabled(false);
        assert_eq!(action.invoke(&[]), None);

        let unbound = Action::new("noop", &json!({})).unwrap();
        assert_eq!(unbound.invoke(&[]), None);
    }

    #[test]
    fn action_param_change_bubbles_to_action() {
        let action = scale();
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = Rc::clone(&seen);
            action.on(
                "paramchange",
                handler(move |event| *seen.borrow_mut() = event.target_name()),
            );
        }
        let factor = action.param("factor").unwrap();
        assert!(factor.set_property("description", json!("multiplier")).is_changed());
        assert_eq!(seen.borrow().as_deref(), Some("factor"));
    }

    #[test]
    fn removing_param_raises_paramremove() {
        let action = scale();
        let removed = Rc::new(Cell::new(false));
        {
            let removed = Rc::clone(&removed);
            action.on("paramremove", handler(move |_| removed.set(true)));
        }
        assert!(action.remove_param("label"));
        assert!(removed.get());
        assert_eq!(action.params().len(), 1);
    }
}
