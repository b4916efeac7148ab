//! View event system for re-rendering
//!
//! This module provides:
//! - `ViewEvent`: typed events emitted after every view-model transition
//! - `EventBus`: broadcast channel distributing events to whatever renders the view

mod bus;
mod types;

pub use bus::EventBus;
pub use types::ViewEvent;
