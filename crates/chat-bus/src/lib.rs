//! Normalized chat events and the shared queue that merges them.
//!
//! Source adapters publish [`ChatEvent`]s through a [`BusPublisher`];
//! the presentation layer drains the [`EventBus`] once per frame and
//! keeps the most recent lines in a bounded [`DisplayLog`].

pub mod bus;
pub mod display_log;
pub mod event;

pub use bus::{BusPublisher, EventBus};
pub use display_log::DisplayLog;
pub use event::{ChatEvent, Platform};
