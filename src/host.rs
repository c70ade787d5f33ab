//! In-process model of the browser windows a page and its widgets live in.
//!
//! Each window has a URL (and therefore an origin), an optional parent, an
//! optional document and a FIFO task queue. Nothing is delivered inside a
//! send call; deliveries happen when the host is pumped.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use url::Url;

use crate::transport::Message;

const MAX_PUMP_ROUNDS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u32);

impl WindowId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("invalid window url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no such window: {0}")]
    NoSuchWindow(WindowId),
    #[error("{0} has no document")]
    NoDocument(WindowId),
    #[error("blocked a frame with origin {requester} from accessing a cross-origin frame {target}")]
    SecurityError { requester: String, target: String },
}

/// Message event as seen by a window's `message` listeners.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub data: String,
    pub origin: String,
    pub source: WindowId,
}

pub type MessageListener = Rc<dyn Fn(&MessageEvent)>;

/// Entry points a root exposes on its window for same-domain callers.
pub trait MessageReceiver {
    fn receive_from_parent(&self, name: &str, payload: Value);

    fn receive_from_widget(&self, widget: &str, name: &str, payload: Value);
}

/// Proof of a successful same-origin document access.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    pub window: WindowId,
    pub url: Url,
}

enum Task {
    Direct(Message),
    Post {
        event: MessageEvent,
        target_origin: String,
    },
}

struct WindowState {
    url: Url,
    parent: Option<WindowId>,
    has_document: bool,
    listeners: Vec<MessageListener>,
    receiver: Option<Weak<dyn MessageReceiver>>,
    sender: UnboundedSender<Task>,
    queue: UnboundedReceiver<Task>,
}

#[derive(Default)]
pub struct HostEnvironment {
    windows: RefCell<BTreeMap<WindowId, WindowState>>,
    next_id: Cell<u32>,
}

impl HostEnvironment {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn open_window(&self, url: &str, parent: Option<WindowId>) -> Result<WindowId, HostError> {
        self.open(url, parent, true)
    }

    /// Open a window whose document is not reachable, such as a frame that
    /// never finished loading.
    pub fn open_window_without_document(
        &self,
        url: &str,
        parent: Option<WindowId>,
    ) -> Result<WindowId, HostError> {
        self.open(url, parent, false)
    }

    fn open(&self, url: &str, parent: Option<WindowId>, has_document: bool) -> Result<WindowId, HostError> {
        let url = Url::parse(url)?;
        if let Some(parent) = parent {
            if !self.windows.borrow().contains_key(&parent) {
                return Err(HostError::NoSuchWindow(parent));
            }
        }
        let id = WindowId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        let (sender, queue) = unbounded_channel();
        self.windows.borrow_mut().insert(
            id,
            WindowState {
                url,
                parent,
                has_document,
                listeners: Vec::new(),
                receiver: None,
                sender,
                queue,
            },
        );
        tracing::debug!(target: "svidget::host", window = %id, "window opened");
        Ok(id)
    }

    /// Drop a window along with anything still queued for it.
    pub fn close_window(&self, id: WindowId) -> bool {
        self.windows.borrow_mut().remove(&id).is_some()
    }

    /// Point an existing window at a new URL and load a fresh document.
    /// Listeners and exposed receivers belong to the old document and are
    /// dropped.
    pub fn navigate(&self, id: WindowId, url: &str) -> Result<(), HostError> {
        let url = Url::parse(url)?;
        let mut windows = self.windows.borrow_mut();
        let state = windows.get_mut(&id).ok_or(HostError::NoSuchWindow(id))?;
        state.url = url;
        state.has_document = true;
        state.listeners.clear();
        state.receiver = None;
        Ok(())
    }

    pub fn url(&self, id: WindowId) -> Option<Url> {
        self.windows.borrow().get(&id).map(|state| state.url.clone())
    }

    pub fn parent(&self, id: WindowId) -> Option<WindowId> {
        self.windows.borrow().get(&id).and_then(|state| state.parent)
    }

    pub fn origin(&self, id: WindowId) -> Option<String> {
        self.url(id).map(|url| url.origin().ascii_serialization())
    }

    pub fn has_document(&self, id: WindowId) -> bool {
        self.windows
            .borrow()
            .get(&id)
            .is_some_and(|state| state.has_document)
    }

    /// Access `target`'s document from `requester`. Fails with
    /// [`HostError::SecurityError`] across origins, as a browser would.
    pub fn document(&self, requester: WindowId, target: WindowId) -> Result<DocumentHandle, HostError> {
        let windows = self.windows.borrow();
        let from = windows
            .get(&requester)
            .ok_or(HostError::NoSuchWindow(requester))?;
        let to = windows.get(&target).ok_or(HostError::NoSuchWindow(target))?;
        let (from_origin, to_origin) = (from.url.origin(), to.url.origin());
        if from_origin != to_origin {
            return Err(HostError::SecurityError {
                requester: from_origin.ascii_serialization(),
                target: to_origin.ascii_serialization(),
            });
        }
        if !to.has_document {
            return Err(HostError::NoDocument(target));
        }
        Ok(DocumentHandle {
            window: target,
            url: to.url.clone(),
        })
    }

    pub fn add_message_listener(&self, id: WindowId, listener: MessageListener) -> bool {
        match self.windows.borrow_mut().get_mut(&id) {
            Some(state) => {
                state.listeners.push(listener);
                true
            }
            None => false,
        }
    }

    /// Publish a root on its window so same-domain peers can call it.
    pub fn expose(&self, id: WindowId, receiver: Weak<dyn MessageReceiver>) -> bool {
        match self.windows.borrow_mut().get_mut(&id) {
            Some(state) => {
                state.receiver = Some(receiver);
                true
            }
            None => false,
        }
    }

    /// Queue a `message` event for `target`. Returns `false` when the
    /// target window is gone.
    pub fn post_message(&self, source: WindowId, target: WindowId, data: String, target_origin: &str) -> bool {
        let origin = self.origin(source).unwrap_or_else(|| "null".to_string());
        self.enqueue(
            target,
            Task::Post {
                event: MessageEvent {
                    data,
                    origin,
                    source,
                },
                target_origin: target_origin.to_string(),
            },
        )
    }

    /// Queue a direct call into `target`'s exposed receiver.
    pub(crate) fn schedule_direct(&self, target: WindowId, message: Message) -> bool {
        self.enqueue(target, Task::Direct(message))
    }

    fn enqueue(&self, target: WindowId, task: Task) -> bool {
        match self.windows.borrow().get(&target) {
            Some(state) => state.sender.send(task).is_ok(),
            None => false,
        }
    }

    /// Deliver queued tasks until every queue is empty, returning how many
    /// were delivered. Each round drains every window's queue in turn,
    /// including tasks a delivery queues for the window being drained.
    /// Tasks queued for a window already visited wait for the next round.
    pub fn pump(&self) -> usize {
        let mut delivered = 0;
        for _ in 0..MAX_PUMP_ROUNDS {
            let mut round = 0;
            let ids: Vec<WindowId> = self.windows.borrow().keys().copied().collect();
            for id in ids {
                while let Some(task) = self.next_task(id) {
                    self.deliver(id, task);
                    round += 1;
                }
            }
            if round == 0 {
                return delivered;
            }
            delivered += round;
        }
        tracing::warn!(
            target: "svidget::host",
            "stopped pumping after {} rounds (possible message loop)",
            MAX_PUMP_ROUNDS
        );
        delivered
    }

    fn next_task(&self, id: WindowId) -> Option<Task> {
        self.windows
            .borrow_mut()
            .get_mut(&id)
            .and_then(|state| state.queue.try_recv().ok())
    }

    fn deliver(&self, id: WindowId, task: Task) {
        match task {
            Task::Direct(message) => {
                let receiver = self
                    .windows
                    .borrow()
                    .get(&id)
                    .and_then(|state| state.receiver.as_ref().and_then(Weak::upgrade));
                let Some(receiver) = receiver else {
                    tracing::debug!(target: "svidget::host", window = %id, "no receiver exposed, dropping direct call");
                    return;
                };
                match message.widget {
                    Some(widget) => receiver.receive_from_widget(&widget, &message.name, message.payload),
                    None => receiver.receive_from_parent(&message.name, message.payload),
                }
            }
            Task::Post {
                event,
                target_origin,
            } => {
                let (origin, listeners) = {
                    let windows = self.windows.borrow();
                    let Some(state) = windows.get(&id) else {
                        return;
                    };
                    (
                        state.url.origin().ascii_serialization(),
                        state.listeners.clone(),
                    )
                };
                if target_origin != "*" && target_origin != origin {
                    tracing::debug!(
                        target: "svidget::host",
                        window = %id,
                        expected = %target_origin,
                        actual = %origin,
                        "target origin mismatch, dropping message"
                    );
                    return;
                }
                for listener in listeners {
                    listener(&event);
                }
            }
        }
    }
}
