//! Page side: widget references, the proxies mirroring each widget's
//! artifacts, and the root that routes messages between them.

mod action_proxy;
mod event_desc_proxy;
mod param_proxy;
mod proxy;
mod root;
mod widget_reference;

pub use action_proxy::{ActionParamProxy, ActionProxy, ACTION_PARAM_PROXY_PROPERTIES, ACTION_PROXY_PROPERTIES};
pub use event_desc_proxy::{EventDescProxy, EVENT_DESC_PROXY_PROPERTIES};
pub use param_proxy::{ParamProxy, PARAM_PROXY_PROPERTIES};
pub use proxy::{Proxy, ProxyObject};
pub use root::{EmbedError, PageRoot, WidgetOptions};
pub use widget_reference::{WidgetReference, WIDGET_REFERENCE_EVENTS};
