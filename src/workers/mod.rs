pub mod session_gc;
pub mod toast_events;

pub use session_gc::SessionGcWorker;
pub use toast_events::ToastEventWorker;
