// (C) 2025 - Enzo Lombardi
//! A cross-platform terminal I/O core: cell-accurate screen model,
//! damage-tracked flushing, and normalized keyboard/mouse/resize events.
//!
//! This crate owns everything between a TUI application's draw calls and
//! the raw bytes a terminal reads, and nothing above that line: no widgets,
//! no layout, no application loop. [`DisplayBuffer`](buffer::DisplayBuffer)
//! is the cell grid an application draws into; [`Terminal`](terminal::Terminal)
//! drives a [`PlatformFactory`](backend::factory::PlatformFactory)-selected
//! backend pair against it.

pub mod ansi_dump;
pub mod attr;
pub mod backend;
pub mod buffer;
pub mod capability;
pub mod cell;
pub mod cleanup;
pub mod coalesce;
pub mod cursor;
pub mod damage;
pub mod error;
pub mod event;
pub mod fps;
pub mod geometry;
pub mod parser;
pub mod recovery;
pub mod terminal;

#[cfg(feature = "test-util")]
pub mod test_util;

/// Commonly used types, for `use termio_core::prelude::*;`.
pub mod prelude {
    pub use crate::attr::{Attr, Color, ColorDepth, Style};
    pub use crate::buffer::DisplayBuffer;
    pub use crate::capability::{BackendKind, Capabilities, CapabilityProbe};
    pub use crate::cell::ScreenCell;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::event::{Event, KeyCode, Modifiers, MouseButton, MouseKind};
    pub use crate::geometry::{Point, Rect};
    pub use crate::terminal::Terminal;
}
