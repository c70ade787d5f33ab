mod support;

use std::rc::Rc;

use serde_json::{json, Value};
use support::{count_posts, record, started, Harness, CROSS_ORIGIN_WIDGET, SAME_ORIGIN_WIDGET};
use svidget::page::PageRoot;
use svidget::widget::WidgetRoot;
use svidget::{HostEnvironment, SvidgetConfig};

const OBSERVED: &[&str] = &[
    "widgetloaded",
    "paramchange",
    "paramset",
    "actioninvoke",
    "eventtrigger",
    "paramadd",
    "widgetunloaded",
];

type Observations = Vec<(String, Option<String>, Value)>;

/// Run one full session and return what the page saw.
fn session(config: &SvidgetConfig, widget_url: &str) -> (Observations, usize) {
    let Harness {
        host,
        page,
        reference,
        widget,
    } = support::embed(config, widget_url, |options| options.with_param("color", json!("blue")));
    let seen = record(&*page, OBSERVED);
    let posts = count_posts(&host, reference.window());

    widget.load();
    host.pump();

    if let Some(color) = reference.param("color") {
        color.set_value(json!("green"));
    }
    if let Some(size) = reference.param("size") {
        size.set_value(json!("12.5"));
    }
    if let Some(double) = reference.action("double") {
        double.invoke(vec![json!(8)]);
    }
    if let Some(clicked) = reference.event_desc("clicked") {
        clicked.trigger_event(json!({"x": 3, "y": 4}));
    }
    host.pump();

    widget
        .widget()
        .add_param("opacity", &json!({"type": "number", "value": 1}));
    widget.unload();
    host.pump();

    let observations = seen.borrow().clone();
    let posts = *posts.borrow();
    (observations, posts)
}

#[test]
fn both_transports_produce_the_same_session() {
    let (direct, direct_posts) = session(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let (forced, forced_posts) = session(
        &SvidgetConfig::default().with_force_xsm(true),
        SAME_ORIGIN_WIDGET,
    );

    assert_eq!(direct_posts, 0);
    assert!(forced_posts > 0);
    assert_eq!(direct, forced);
    assert!(!direct.is_empty());
    assert_eq!(direct.first().map(|o| o.0.as_str()), Some("widgetloaded"));
    assert_eq!(direct.last().map(|o| o.0.as_str()), Some("widgetunloaded"));
}

#[test]
fn cross_origin_widget_uses_messages_with_same_outcome() {
    let (direct, _) = session(&SvidgetConfig::default(), SAME_ORIGIN_WIDGET);
    let (cross, cross_posts) = session(&SvidgetConfig::default(), CROSS_ORIGIN_WIDGET);
    assert!(cross_posts > 0);
    assert_eq!(direct, cross);
}

#[test]
fn domain_probe_is_cached_until_cleared() {
    let h = started(&SvidgetConfig::default(), CROSS_ORIGIN_WIDGET);
    let communicator = h.page.communicator();
    assert_eq!(communicator.is_same_domain(h.reference.window()), Some(false));

    h.host
        .navigate(h.reference.window(), "https://page.example/widgets/w.svg?svidget=w1")
        .expect("navigate");
    assert_eq!(communicator.is_same_domain(h.reference.window()), Some(false));
    h.page.clear_domain_cache();
    assert_eq!(communicator.is_same_domain(h.reference.window()), Some(true));
}

#[test]
fn deliveries_to_one_widget_keep_their_order() {
    let h = started(&SvidgetConfig::default(), CROSS_ORIGIN_WIDGET);
    let applied = record(&**h.widget.widget(), &["paramchange"]);
    let color = h.reference.param("color").expect("color proxy");

    for value in ["a", "b", "c", "d"] {
        color.set_value(json!(value));
    }
    h.host.pump();

    let values: Vec<Value> = applied
        .borrow()
        .iter()
        .map(|(_, _, value)| value["value"].clone())
        .collect();
    assert_eq!(values, vec![json!("a"), json!("b"), json!("c"), json!("d")]);
    assert_eq!(color.value(), json!("d"));
}

#[test]
fn malformed_and_spoofed_messages_are_ignored() {
    let h = started(&SvidgetConfig::default(), CROSS_ORIGIN_WIDGET);
    let page_window = h.page.window();
    let widget_window = h.reference.window();

    assert!(h
        .host
        .post_message(widget_window, page_window, "not json".to_string(), "*"));

    let intruder = h
        .host
        .open_window("https://evil.example/", Some(page_window))
        .expect("intruder");
    let spoofed = json!({
        "name": "propertyChanged",
        "payload": {"type": "param", "name": "color", "propertyName": "value", "value": "pwned"},
        "widget": "w1"
    });
    assert!(h
        .host
        .post_message(intruder, page_window, spoofed.to_string(), "*"));
    h.host.pump();

    assert_eq!(h.reference.param("color").map(|p| p.value()), Some(json!("blue")));
}

#[test]
fn widget_ignores_requests_from_other_windows() {
    let h = started(&SvidgetConfig::default(), CROSS_ORIGIN_WIDGET);
    let widget_window = h.reference.window();
    let intruder = h
        .host
        .open_window("https://evil.example/", Some(h.page.window()))
        .expect("intruder");
    let forged_write = json!({
        "name": "propertyChange",
        "payload": {"type": "param", "name": "color", "propertyName": "value", "value": "pwned"}
    });
    let forged_invoke = json!({"name": "actionInvoke", "payload": {"action": "double", "args": [5]}});
    let invoked = record(&**h.widget.widget(), &["actioninvoke"]);

    for forged in [forged_write, forged_invoke] {
        assert!(h
            .host
            .post_message(intruder, widget_window, forged.to_string(), "*"));
    }
    h.host.pump();

    assert_eq!(h.widget.widget().param("color").map(|p| p.value()), Some(json!("blue")));
    assert!(invoked.borrow().is_empty());

    // the real parent still gets through
    h.reference
        .param("color")
        .expect("color proxy")
        .set_value(json!("green"));
    h.host.pump();
    assert_eq!(h.widget.widget().param("color").map(|p| p.value()), Some(json!("green")));
}

#[test]
fn target_origin_restricts_delivery() {
    let config = SvidgetConfig {
        target_origin: "https://page.example".to_string(),
        ..SvidgetConfig::default()
    };
    let h = started(&config, CROSS_ORIGIN_WIDGET);

    // widget -> page posts match the page origin; page -> widget posts do not
    // match the widget's origin, so the widget never starts.
    assert!(!h.widget.widget().started());
    assert!(!h.reference.started());
}

#[test]
fn window_without_document_stays_silent() {
    let host = HostEnvironment::new();
    let config = SvidgetConfig::default();
    let page_window = host.open_window(support::PAGE_URL, None).expect("page");
    let page = PageRoot::new(Rc::clone(&host), page_window, &config);
    let widget_window = host
        .open_window_without_document("https://cdn.example/w.svg?svidget=w2", Some(page_window))
        .expect("widget window");
    let widget = WidgetRoot::new(Rc::clone(&host), widget_window, &config);

    assert!(!widget.load());
    assert_eq!(host.pump(), 0);
    assert!(page.widget("w2").is_none());
    assert!(!widget.widget().started());
}
