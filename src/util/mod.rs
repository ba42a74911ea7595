pub mod subscribe;

pub use subscribe::{PartialObserver, Unsubscribe};
