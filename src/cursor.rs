// (C) 2025 - Enzo Lombardi

//! `CursorPathfinder`: shortest byte sequence for a cursor move.

use crate::attr::Attr;
use crate::cell::ScreenCell;

/// Chooses among the available cursor-move strategies and returns
/// the shortest applicable one. `can_overwrite` lets the caller offer the
/// "walk forward with spaces" shortcut only where it's actually safe: both
/// `front` and `back` already hold a space with the current attribute at
/// every intervening cell, so overwriting changes nothing.
pub struct CursorPathfinder;

impl CursorPathfinder {
    /// `row_between` supplies, for the same-row forward case, whether every
    /// cell strictly between `from` and `to` on that row is a clean space at
    /// `last_attr` in both grids — the only condition under which walking
    /// there with literal spaces is equivalent to (and often shorter than) a
    /// cursor-forward escape.
    pub fn path(
        from: (u16, u16),
        to: (u16, u16),
        last_attr: Attr,
        row_between: impl Fn(u16, u16, u16) -> bool,
    ) -> CursorMove {
        let (fx, fy) = from;
        let (tx, ty) = to;

        if from == to {
            return CursorMove::NoOp;
        }

        if fy == ty {
            if tx > fx {
                let n = tx - fx;
                let walk_len = n as usize;
                let csi_len = format!("\x1b[{n}C").len();
                if walk_len <= csi_len && row_between(fy, fx, tx) {
                    return CursorMove::WalkForward { count: n };
                }
                if tx == 0 {
                    return CursorMove::CarriageReturnThenForward { count: n };
                }
                return CursorMove::RelativeForward { count: n };
            }
            let n = fx - tx;
            return CursorMove::RelativeBackward { count: n };
        }

        if fx == tx {
            if ty > fy {
                return CursorMove::RelativeDown { count: ty - fy };
            }
            return CursorMove::RelativeUp { count: fy - ty };
        }

        if tx == 0 && ty > fy && (ty - fy) <= 3 {
            return CursorMove::NewlineWalk { count: ty - fy };
        }

        CursorMove::Absolute { x: tx, y: ty }
    }

    /// Render a chosen move to its wire bytes (1-indexed for the absolute
    /// and `CSI H` forms).
    pub fn render(mv: CursorMove, fill_attr: Attr) -> Vec<u8> {
        match mv {
            CursorMove::NoOp => Vec::new(),
            CursorMove::RelativeForward { count } => format!("\x1b[{count}C").into_bytes(),
            CursorMove::RelativeBackward { count } => format!("\x1b[{count}D").into_bytes(),
            CursorMove::RelativeDown { count } => format!("\x1b[{count}B").into_bytes(),
            CursorMove::RelativeUp { count } => format!("\x1b[{count}A").into_bytes(),
            CursorMove::CarriageReturnThenForward { count } => {
                let mut v = vec![b'\r'];
                if count > 0 {
                    v.extend(format!("\x1b[{count}C").into_bytes());
                }
                v
            }
            CursorMove::NewlineWalk { count } => {
                let _ = fill_attr;
                vec![b'\r', b'\n'].repeat(count as usize).into_iter().collect()
            }
            CursorMove::WalkForward { count } => {
                vec![b' '; count as usize]
            }
            CursorMove::Absolute { x, y } => format!("\x1b[{};{}H", y + 1, x + 1).into_bytes(),
        }
    }

    /// Helper for callers that only need byte length, used by the
    /// optimality-bound property test.
    pub fn cost(mv: CursorMove) -> usize {
        Self::render(mv, Attr::default()).len()
    }

    /// Builds a `row_between` predicate from a buffer row slice: true when
    /// every cell in `(from,to)` is currently a space at `attr` in both
    /// front and back.
    pub fn clean_span<'a>(front: &'a [ScreenCell], back: &'a [ScreenCell], attr: Attr) -> impl Fn(u16, u16, u16) -> bool + 'a {
        move |_row, from, to| {
            (from..to).all(|x| {
                let f = front.get(x as usize);
                let b = back.get(x as usize);
                matches!((f, b), (Some(f), Some(b)) if f.text() == " " && b.text() == " " && f.attr == attr && b.attr == attr)
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    NoOp,
    RelativeForward { count: u16 },
    RelativeBackward { count: u16 },
    RelativeDown { count: u16 },
    RelativeUp { count: u16 },
    CarriageReturnThenForward { count: u16 },
    NewlineWalk { count: u16 },
    WalkForward { count: u16 },
    Absolute { x: u16, y: u16 },
}
