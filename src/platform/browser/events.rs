use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, EventTarget};

/// Keeps a DOM event listener attached until dropped.
pub struct EventListenerHandle {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl EventListenerHandle {
    pub fn attach(
        target: &EventTarget,
        event: &'static str,
        callback: Closure<dyn FnMut(Event)>,
    ) -> Result<Self, JsValue> {
        target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event,
            callback,
        })
    }
}

impl Drop for EventListenerHandle {
    fn drop(&mut self) {
        if let Err(err) = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref())
        {
            web_sys::console::warn_1(&JsValue::from_str(&format_js_error(
                "removeEventListener",
                err,
            )));
        }
    }
}

// The wasm32 target this is compiled for is single threaded.
unsafe impl Send for EventListenerHandle {}
unsafe impl Sync for EventListenerHandle {}

/// Attaches `handler` to `event` on `target`.
pub fn listen<F>(target: &EventTarget, event: &'static str, handler: F) -> Result<EventListenerHandle, JsValue>
where
    F: FnMut(Event) + 'static,
{
    let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
    EventListenerHandle::attach(target, event, callback)
}

pub fn format_js_error(operation: &str, err: JsValue) -> String {
    let detail = err.as_string().unwrap_or_else(|| format!("{:?}", err));
    format!("{operation} failed: {detail}")
}
