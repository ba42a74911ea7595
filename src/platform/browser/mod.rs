//! DOM helpers shared by the browser bindings.

pub mod events;

pub use events::{format_js_error, listen, EventListenerHandle};
