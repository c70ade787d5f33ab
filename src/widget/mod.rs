//! Widget side: the real params, actions and events, and the root that
//! keeps the page informed about them.

mod action;
mod event_desc;
mod param;
mod root;
#[allow(clippy::module_inception)]
mod widget;

pub use action::{Action, ActionFn, ActionParam, ACTION_PARAM_PROPERTIES, ACTION_PROPERTIES};
pub use event_desc::{EventDesc, EVENT_DESC_PROPERTIES};
pub use param::{Param, PARAM_PROPERTIES};
pub use root::WidgetRoot;
pub use widget::{Widget, WidgetSignals, WIDGET_EVENTS, WIDGET_PROPERTIES};
