// Widget embedding core: widget-side artifacts, page-side proxies and the
// transport between them.

pub mod collection;
pub mod config;
pub mod convert;
pub mod dom;
pub mod event;
pub mod host;
pub mod object;
pub mod page;
pub mod transport;
pub mod widget;

// Re-export commonly used types
pub use collection::Collection;
pub use config::{ConfigError, SvidgetConfig};
pub use convert::{Converter, DefaultConverter, TypeSpec};
pub use event::{handler, Event, EventContainer, Handler};
pub use host::{HostEnvironment, HostError, WindowId};
pub use object::{Artifact, Eventer, GetSetter, ObjectType, SetOutcome};
pub use page::{PageRoot, ProxyObject, WidgetOptions, WidgetReference};
pub use transport::{Communicator, Delivery};
pub use widget::{Widget, WidgetRoot};
