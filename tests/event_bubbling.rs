mod support;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::json;
use support::{record, started, SAME_ORIGIN_WIDGET};
use svidget::{handler, Eventer, GetSetter, SvidgetConfig};

#[test]
fn action_param_change_climbs_the_widget_tree() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let double = h.widget.widget().action("double").expect("double");
    let x = double.param("x").expect("x");

    let on_action = record(&*double, &["paramchange"]);
    let on_widget = record(&**h.widget.widget(), &["actionparamchange"]);
    let on_root = record(&*h.widget, &["actionparamchange"]);

    x.set_property("defvalue", json!(5));

    let expected = vec![(
        "actionparamchange".to_string(),
        Some("x".to_string()),
        json!({"property": "defvalue", "value": 5}),
    )];
    assert_eq!(on_action.borrow().len(), 1);
    assert_eq!(on_action.borrow()[0].0, "paramchange");
    assert_eq!(on_action.borrow()[0].1.as_deref(), Some("x"));
    assert_eq!(*on_widget.borrow(), expected);
    assert_eq!(*on_root.borrow(), expected);
}

#[test]
fn current_target_follows_the_walk() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let owners = Rc::new(RefCell::new(Vec::new()));
    for source in [
        &**h.widget.widget() as &dyn Eventer,
        &*h.widget as &dyn Eventer,
    ] {
        let owners = Rc::clone(&owners);
        source.on(
            "paramchange",
            handler(move |event| {
                let current = event
                    .current_target
                    .as_ref()
                    .map(|artifact| artifact.object_type().as_str());
                owners.borrow_mut().push(current);
            }),
        );
    }

    h.widget
        .widget()
        .param("color")
        .expect("color")
        .set_value(json!("black"));

    assert_eq!(*owners.borrow(), vec![Some("widget"), Some("root")]);
}

#[test]
fn stopping_propagation_does_not_stop_sync() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    h.widget.widget().on(
        "paramchange",
        handler(|event| event.stop_propagation()),
    );
    let on_root = record(&*h.widget, &["paramchange"]);
    let on_page = record(&*h.page, &["paramchange"]);

    h.widget
        .widget()
        .param("color")
        .expect("color")
        .set_value(json!("white"));
    h.host.pump();

    assert!(on_root.borrow().is_empty());
    assert_eq!(on_page.borrow().len(), 1);
    assert_eq!(h.reference.param("color").map(|p| p.value()), Some(json!("white")));
}

#[test]
fn proxy_events_climb_the_page_tree() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let action = h.reference.action("double").expect("double proxy");
    let x = action.param("x").expect("x proxy");

    let on_param = record(&*x, &["change"]);
    let on_action = record(&*action, &["paramchange"]);
    let on_reference = record(&*h.reference, &["actionparamchange"]);
    let on_page = record(&*h.page, &["actionparamchange"]);

    h.widget
        .widget()
        .action("double")
        .and_then(|a| a.param("x"))
        .expect("x")
        .set_property("type", json!("number"));
    h.host.pump();

    for log in [&on_param, &on_action, &on_reference, &on_page] {
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1.as_deref(), Some("x"));
        assert_eq!(log[0].2, json!({"property": "type", "value": "number"}));
    }
    assert_eq!(on_page.borrow()[0].0, "actionparamchange");
}

#[test]
fn duplicate_handlers_are_refused() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let hits = Rc::new(Cell::new(0));
    let counting = {
        let hits = Rc::clone(&hits);
        handler(move |_| hits.set(hits.get() + 1))
    };

    assert!(h.page.on("widgetloaded", Rc::clone(&counting)));
    assert!(!h.page.on("widgetloaded", Rc::clone(&counting)));
    assert!(h.page.on_named("widgetloaded", "watch", None, handler(|_| {})));
    assert!(!h.page.on_named("widgetloaded", "watch", None, handler(|_| {})));

    h.page.trigger("widgetloaded", json!(null));
    assert_eq!(hits.get(), 1);

    assert!(h.page.off("widgetloaded", &counting));
    assert!(h.page.off("widgetloaded", "watch"));
    assert!(!h.page.off("widgetloaded", "watch"));
}

#[test]
fn immediate_stop_skips_later_handlers_and_parents() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let color = h.widget.widget().param("color").expect("color");
    let later = Rc::new(Cell::new(false));

    color.on("change", handler(|event| event.stop_immediate_propagation()));
    {
        let later = Rc::clone(&later);
        color.on("change", handler(move |_| later.set(true)));
    }
    let on_widget = record(&**h.widget.widget(), &["paramchange"]);

    color.set_value(json!("grey"));

    assert!(!later.get());
    assert!(on_widget.borrow().is_empty());
}

#[test]
fn handler_data_and_name_are_visible_to_the_handler() {
    let h = started(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let seen = Rc::new(RefCell::new(None));
    {
        let seen = Rc::clone(&seen);
        h.page.on_named(
            "paramchange",
            "audit",
            Some(json!({"level": 2})),
            handler(move |event| {
                *seen.borrow_mut() = Some((event.name.clone(), event.data.clone()));
            }),
        );
    }

    h.reference
        .param("color")
        .expect("color proxy")
        .set_value(json!("navy"));
    h.host.pump();

    assert_eq!(
        *seen.borrow(),
        Some((Some("audit".to_string()), Some(json!({"level": 2}))))
    );
}
