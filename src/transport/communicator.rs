use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use super::message::{Inbound, Message};
use crate::config::SvidgetConfig;
use crate::host::{HostEnvironment, HostError, MessageEvent, WindowId};

/// How a message left this window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Direct,
    CrossSite,
}

/// Picks a transport per target window and queues messages on it.
///
/// Same-domain peers get a deferred direct call into their exposed root;
/// everything else goes through `post_message` as serialized JSON. Both
/// paths are delivered on a later pump, so callers see identical timing.
pub struct Communicator {
    host: Rc<HostEnvironment>,
    window: WindowId,
    target_origin: String,
    force_xsm: bool,
    same_domain: RefCell<HashMap<WindowId, bool>>,
}

impl Communicator {
    pub fn new(host: Rc<HostEnvironment>, window: WindowId, config: &SvidgetConfig) -> Self {
        Self {
            host,
            window,
            target_origin: config.target_origin.clone(),
            force_xsm: config.force_xsm,
            same_domain: RefCell::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> WindowId {
        self.window
    }

    pub fn host(&self) -> &Rc<HostEnvironment> {
        &self.host
    }

    /// Probe `target` by touching its document. The answer is cached per
    /// target; `None` means the target window does not exist right now.
    /// A target without a document yet counts as cross-domain but is not
    /// cached, so it is probed again once it has one.
    pub fn is_same_domain(&self, target: WindowId) -> Option<bool> {
        if let Some(cached) = self.same_domain.borrow().get(&target) {
            return Some(*cached);
        }
        let same = match self.host.document(self.window, target) {
            Ok(_) => true,
            Err(HostError::SecurityError { requester, target: other }) => {
                tracing::debug!(
                    target: "svidget::communicator",
                    requester = %requester,
                    other = %other,
                    "cross-origin peer, using cross-site messaging"
                );
                false
            }
            Err(HostError::NoDocument(_)) => return Some(false),
            Err(err) => {
                tracing::debug!(target: "svidget::communicator", error = %err, "domain probe failed");
                return None;
            }
        };
        self.same_domain.borrow_mut().insert(target, same);
        Some(same)
    }

    /// Forget every cached probe result, e.g. after a frame navigated.
    pub fn clear_domain_cache(&self) {
        self.same_domain.borrow_mut().clear();
    }

    /// Send a page -> widget message.
    pub fn signal_widget(&self, target: WindowId, name: &str, payload: Value) -> Option<Delivery> {
        self.send(target, Message::to_widget(name, payload))
    }

    /// Send a widget -> page message tagged with this widget's id.
    pub fn signal_parent(&self, name: &str, payload: Value, widget: &str) -> Option<Delivery> {
        let parent = self.host.parent(self.window)?;
        self.send(parent, Message::to_parent(name, payload, widget))
    }

    fn send(&self, target: WindowId, message: Message) -> Option<Delivery> {
        if !self.host.has_document(self.window) {
            tracing::debug!(target: "svidget::communicator", window = %self.window, "no document, message dropped");
            return None;
        }
        let same_domain = self.is_same_domain(target)?;
        if same_domain && !self.force_xsm {
            return self
                .host
                .schedule_direct(target, message)
                .then_some(Delivery::Direct);
        }
        let data = match serde_json::to_string(&message) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(target: "svidget::communicator", error = %err, "failed to serialize message");
                return None;
            }
        };
        self.host
            .post_message(self.window, target, data, &self.target_origin)
            .then_some(Delivery::CrossSite)
    }

    /// Decode a cross-site message and decide which side it is for.
    /// Anything that does not parse is ignored.
    pub fn receive_xsm(event: &MessageEvent) -> Option<Inbound> {
        match serde_json::from_str::<Message>(&event.data) {
            Ok(message) => Some(Inbound::from(message)),
            Err(err) => {
                tracing::debug!(
                    target: "svidget::communicator",
                    origin = %event.origin,
                    error = %err,
                    "ignoring malformed cross-site message"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;

    fn capture(host: &HostEnvironment, window: WindowId) -> Rc<RefCell<Vec<Inbound>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        host.add_message_listener(
            window,
            Rc::new(move |event: &MessageEvent| {
                if let Some(inbound) = Communicator::receive_xsm(event) {
                    sink.borrow_mut().push(inbound);
                }
            }),
        );
        log
    }

    #[test]
    fn cross_origin_uses_post_message() {
        let host = HostEnvironment::new();
        let page = host.open_window("https://page.example/", None).unwrap();
        let widget = host
            .open_window("https://cdn.example/w.svg", Some(page))
            .unwrap();
        let communicator = Communicator::new(Rc::clone(&host), page, &SvidgetConfig::default());
        let received = capture(&host, widget);

        assert_eq!(
            communicator.signal_widget(widget, "start", json!({"id": "w"})),
            Some(Delivery::CrossSite)
        );
        assert_eq!(communicator.is_same_domain(widget), Some(false));
        assert!(received.borrow().is_empty());
        host.pump();
        assert_eq!(
            *received.borrow(),
            vec![Inbound::FromParent {
                name: "start".into(),
                payload: json!({"id": "w"})
            }]
        );
    }

    #[test]
    fn widget_messages_carry_widget_id() {
        let host = HostEnvironment::new();
        let page = host.open_window("https://page.example/", None).unwrap();
        let widget = host
            .open_window("https://cdn.example/w.svg", Some(page))
            .unwrap();
        let communicator = Communicator::new(Rc::clone(&host), widget, &SvidgetConfig::default());
        let received = capture(&host, page);

        communicator.signal_parent("initialized", Value::Null, "w1");
        host.pump();
        assert_eq!(
            *received.borrow(),
            vec![Inbound::FromWidget {
                widget: "w1".into(),
                name: "initialized".into(),
                payload: Value::Null
            }]
        );
    }

    #[test]
    fn same_origin_is_direct_unless_forced() {
        let host = HostEnvironment::new();
        let page = host.open_window("https://page.example/", None).unwrap();
        let widget = host
            .open_window("https://page.example/w.svg", Some(page))
            .unwrap();

        let direct = Communicator::new(Rc::clone(&host), page, &SvidgetConfig::default());
        assert_eq!(
            direct.signal_widget(widget, "x", Value::Null),
            Some(Delivery::Direct)
        );

        let forced = Communicator::new(
            Rc::clone(&host),
            page,
            &SvidgetConfig::default().with_force_xsm(true),
        );
        assert_eq!(
            forced.signal_widget(widget, "x", Value::Null),
            Some(Delivery::CrossSite)
        );
    }

    #[test]
    fn missing_targets_and_documents_are_no_ops() {
        let host = HostEnvironment::new();
        let page = host.open_window("https://page.example/", None).unwrap();
        let orphan = host.open_window_without_document("https://page.example/o", None).unwrap();
        let communicator = Communicator::new(Rc::clone(&host), page, &SvidgetConfig::default());
        let ghost = host.open_window("https://page.example/g", Some(page)).unwrap();
        host.close_window(ghost);

        assert_eq!(communicator.signal_widget(ghost, "x", Value::Null), None);
        assert_eq!(communicator.signal_parent("x", Value::Null, "w"), None);

        let silent = Communicator::new(Rc::clone(&host), orphan, &SvidgetConfig::default());
        assert_eq!(silent.signal_widget(page, "x", Value::Null), None);
    }

    #[test]
    fn documentless_probe_is_retried() {
        let host = HostEnvironment::new();
        let page = host.open_window("https://page.example/", None).unwrap();
        let frame = host
            .open_window_without_document("https://page.example/w.svg", Some(page))
            .unwrap();
        let communicator = Communicator::new(Rc::clone(&host), page, &SvidgetConfig::default());

        assert_eq!(communicator.is_same_domain(frame), Some(false));
        host.navigate(frame, "https://page.example/w.svg?svidget=w1").unwrap();
        assert_eq!(communicator.is_same_domain(frame), Some(true));
        assert_eq!(
            communicator.signal_widget(frame, "x", Value::Null),
            Some(Delivery::Direct)
        );
    }

    #[test]
    fn malformed_messages_are_ignored() {
        let event = MessageEvent {
            data: "{not json".into(),
            origin: "https://x.example".into(),
            source: WindowId::from_raw(1),
        };
        assert_eq!(Communicator::receive_xsm(&event), None);
    }
}
