#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use svidget::host::MessageEvent;
use svidget::page::{PageRoot, WidgetOptions, WidgetReference};
use svidget::widget::WidgetRoot;
use svidget::{handler, Eventer, HostEnvironment, SvidgetConfig};

pub const PAGE_URL: &str = "https://page.example/index.html";
pub const SAME_ORIGIN_WIDGET: &str = "https://page.example/widgets/w.svg";
pub const CROSS_ORIGIN_WIDGET: &str = "https://cdn.example/widgets/w.svg";

pub struct Harness {
    pub host: Rc<HostEnvironment>,
    pub page: Rc<PageRoot>,
    pub reference: Rc<WidgetReference>,
    pub widget: Rc<WidgetRoot>,
}

/// A page embedding one widget with a `color` param, a coercing `size`
/// param, a `double` action and a `clicked` event. Nothing is pumped yet.
pub fn embed(config: &SvidgetConfig, widget_url: &str, options: impl FnOnce(WidgetOptions) -> WidgetOptions) -> Harness {
    let host = HostEnvironment::new();
    let page_window = host.open_window(PAGE_URL, None).expect("page window");
    let page = PageRoot::new(Rc::clone(&host), page_window, config);
    let reference = page
        .add_widget(options(WidgetOptions::new(widget_url).with_id("w1")))
        .expect("embed widget");

    let widget = WidgetRoot::new(Rc::clone(&host), reference.window(), config);
    let model = widget.widget();
    model.add_param("color", &json!({"value": "red"}));
    model.add_param(
        "size",
        &json!({"type": "number", "subtype": "integer", "coerce": true, "value": 1}),
    );
    let double = model
        .add_action("double", &json!({"params": [{"name": "x", "defvalue": 1}]}))
        .expect("action");
    double.bind(|args| json!(args[0].as_i64().unwrap_or_default() * 2));
    model.add_event("clicked", &json!({}));

    Harness {
        host,
        page,
        reference,
        widget,
    }
}

/// Embed, load and pump until the handshake settles.
pub fn started(config: &SvidgetConfig, widget_url: &str) -> Harness {
    let harness = embed(config, widget_url, |options| options.with_param("color", json!("blue")));
    harness.widget.load();
    harness.host.pump();
    harness
}

/// Record `(type, target, value)` for every listed event raised on `source`.
pub fn record(source: &impl Eventer, types: &[&str]) -> Rc<RefCell<Vec<(String, Option<String>, Value)>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for event_type in types {
        let log = Rc::clone(&log);
        source.on(
            event_type,
            handler(move |event| {
                log.borrow_mut().push((
                    event.event_type.clone(),
                    event.target_name(),
                    event.value.clone(),
                ))
            }),
        );
    }
    log
}

/// Count cross-site messages that reach `window`.
pub fn count_posts(host: &HostEnvironment, window: svidget::WindowId) -> Rc<RefCell<usize>> {
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    host.add_message_listener(
        window,
        Rc::new(move |_: &MessageEvent| *sink.borrow_mut() += 1),
    );
    count
}
