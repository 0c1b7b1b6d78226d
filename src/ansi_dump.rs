// (C) 2025 - Enzo Lombardi

//! ANSI dump utilities for debugging a [`crate::buffer::DisplayBuffer`].
//!
//! Direct generalization of this crate's prior cell-buffer dumper: same
//! change-only SGR emission and `cat`-viewable output, now built on
//! [`ScreenCell`]/[`Attr`] instead of a fixed 16-color cell type, so the
//! dump always renders at full truecolor fidelity regardless of what the
//! live backend negotiated.

use std::fs::File;
use std::io::{self, Write};

use crate::attr::{Attr, ColorDepth};
use crate::cell::ScreenCell;

/// Dumps a buffer to a file at `path`, viewable with `cat` or `less -R`.
pub fn dump_buffer_to_file(buffer: &[Vec<ScreenCell>], width: usize, height: usize, path: &str) -> io::Result<()> {
    let mut file = File::create(path)?;
    dump_buffer(&mut file, buffer, width, height)
}

/// Dumps a buffer to any writer, emitting an SGR change only when a cell's
/// `Attr` differs from the previous cell's.
pub fn dump_buffer<W: Write>(writer: &mut W, buffer: &[Vec<ScreenCell>], width: usize, height: usize) -> io::Result<()> {
    dump_region(writer, buffer, 0, 0, width, height)
}

/// Dumps a rectangular region of a buffer, useful for isolating one widget's
/// output rather than the whole screen.
pub fn dump_buffer_region<W: Write>(
    writer: &mut W,
    buffer: &[Vec<ScreenCell>],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> io::Result<()> {
    dump_region(writer, buffer, x, y, width, height)
}

fn dump_region<W: Write>(
    writer: &mut W,
    buffer: &[Vec<ScreenCell>],
    x: usize,
    y: usize,
    width: usize,
    height: usize,
) -> io::Result<()> {
    for row in buffer.iter().take((y + height).min(buffer.len())).skip(y) {
        let mut last_attr: Option<Attr> = None;
        for col in x..(x + width).min(row.len()) {
            let cell = row[col];
            if cell.is_trailing_marker() {
                continue;
            }
            if last_attr != Some(cell.attr) {
                write!(writer, "\x1b[{}m", cell.attr.to_sgr(ColorDepth::Rgb24))?;
                last_attr = Some(cell.attr);
            }
            write!(writer, "{}", cell.text())?;
        }
        writeln!(writer, "\x1b[0m")?;
    }
    Ok(())
}
