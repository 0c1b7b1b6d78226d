//! A burst of resize events arriving within a few milliseconds of each
//! other — the common case when a user drags a terminal window's edge and
//! the OS reports every intermediate size — collapses to the final size
//! only, with nothing delivered for the discarded intermediates.

use std::time::{Duration, Instant};
use termio_core::coalesce::EventCoalescer;
use termio_core::event::Event;

#[test]
fn rapid_resize_burst_collapses_to_the_settled_size() {
    let mut c = EventCoalescer::new(Duration::from_millis(16));
    let t0 = Instant::now();
    c.push(Event::Resize { cols: 81, rows: 25 }, t0);
    c.push(Event::Resize { cols: 95, rows: 28 }, t0 + Duration::from_millis(2));
    c.push(Event::Resize { cols: 100, rows: 30 }, t0 + Duration::from_millis(5));

    assert_eq!(c.len(), 1);
    assert_eq!(c.pop(), Some(Event::Resize { cols: 100, rows: 30 }));
    assert!(c.is_empty());
}

#[test]
fn resizes_far_enough_apart_are_each_delivered() {
    let mut c = EventCoalescer::new(Duration::from_millis(16));
    let t0 = Instant::now();
    c.push(Event::Resize { cols: 80, rows: 24 }, t0);
    c.push(Event::Resize { cols: 100, rows: 30 }, t0 + Duration::from_millis(40));

    assert_eq!(c.pop(), Some(Event::Resize { cols: 80, rows: 24 }));
    assert_eq!(c.pop(), Some(Event::Resize { cols: 100, rows: 30 }));
}
