use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use serde_json::{json, Value};
use svidget::page::{PageRoot, WidgetOptions};
use svidget::widget::WidgetRoot;
use svidget::{handler, Artifact, Eventer, HostEnvironment, SvidgetConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init()
    {
        eprintln!("svidget-demo: logging disabled: {err}");
    }

    let config = SvidgetConfig::load(std::env::args().nth(1).map(PathBuf::from))
        .context("loading svidget config")?;

    let host = HostEnvironment::new();
    let page_window = host
        .open_window("https://page.example/index.html", None)
        .context("opening page window")?;
    let page = PageRoot::new(Rc::clone(&host), page_window, &config);

    for event_type in ["widgetloaded", "paramchange", "actioninvoke", "eventtrigger"] {
        page.on(
            event_type,
            handler(|event| {
                tracing::info!(
                    "page saw {} from {} {}",
                    event.event_type,
                    event.target_name().unwrap_or_default(),
                    event.value
                );
            }),
        );
    }

    let local = page
        .add_widget(
            WidgetOptions::new("https://page.example/widgets/star.svg")
                .with_id("star")
                .with_param("color", json!("gold")),
        )
        .context("embedding same-origin widget")?;
    let remote = page
        .add_widget(
            WidgetOptions::new("https://cdn.example/widgets/gauge.svg")
                .with_param("level", json!(40)),
        )
        .context("embedding cross-origin widget")?;

    let star = WidgetRoot::new(Rc::clone(&host), local.window(), &config);
    star.widget()
        .add_param("color", &json!({"type": "string", "value": "black"}));
    star.widget()
        .add_event("twinkled", &json!({"description": "raised on every twinkle"}));
    let twinkle = star.widget().add_action("twinkle", &json!({"params": [{"name": "times", "defvalue": 1}]}));
    if let Some(twinkle) = twinkle {
        let star = Rc::downgrade(&star);
        twinkle.bind(move |args| {
            let event = star
                .upgrade()
                .and_then(|star| star.widget().event_desc("twinkled"));
            if let Some(event) = event {
                event.trigger_event(args.first().cloned().unwrap_or(Value::Null));
            }
            json!("twinkling")
        });
    }

    let gauge = WidgetRoot::new(Rc::clone(&host), remote.window(), &config);
    gauge.widget().add_param(
        "level",
        &json!({"type": "number", "subtype": "integer", "coerce": true, "value": 0}),
    );

    star.load();
    gauge.load();
    let delivered = host.pump();
    tracing::info!(delivered, "widgets started");

    if let Some(color) = local.param("color") {
        color.set_value(json!("silver"));
    }
    if let Some(twinkle) = local.action("twinkle") {
        twinkle.invoke(vec![json!(3)]);
    }
    if let Some(level) = remote.param("level") {
        level.set_value(json!("75.6"));
    }
    let delivered = host.pump();
    tracing::info!(delivered, "requests answered");

    for reference in page.widgets().to_vec() {
        let params: Vec<String> = reference
            .params()
            .to_vec()
            .iter()
            .map(|param| format!("{}={}", param.name(), param.value()))
            .collect();
        tracing::info!(
            widget = reference.id(),
            same_domain = ?page.communicator().is_same_domain(reference.window()),
            "params: {}",
            params.join(", ")
        );
    }

    gauge.unload();
    host.pump();
    Ok(())
}
