#![cfg(feature = "test-util")]

//! Damage coverage and flush idempotence, exercised through the public
//! `DisplayBuffer`/`MockBackend` surface rather than a real terminal.

use proptest::prelude::*;
use termio_core::attr::Attr;
use termio_core::backend::DisplayBackend;
use termio_core::buffer::DisplayBuffer;
use termio_core::capability::Capabilities;
use termio_core::test_util::MockBackend;

proptest! {
    /// Every cell where `front` and `back` disagree lies within the row's
    /// reported damage range: damage never under-reports a write.
    #[test]
    fn damage_covers_every_write(
        writes in prop::collection::vec((0u16..20, 0u16..6, any::<u8>()), 1..40)
    ) {
        let mut buf = DisplayBuffer::new(20, 6);
        for (x, y, byte) in writes {
            let ch = char::from(b'!' + (byte % 90));
            buf.put_char(x as i32, y as i32, &ch.to_string(), Attr::default());
        }
        let ranges = buf.damage_peek();
        for y in 0..buf.height() {
            let (s, e) = ranges[y as usize];
            for x in 0..buf.width() {
                if buf.front_cell(x, y) != buf.back_cell(x, y) {
                    prop_assert!(x >= s && x < e);
                }
            }
        }
    }

    /// Flushing twice with no writes between them commits nothing the
    /// second time: a backend's `flush` is idempotent on a clean buffer.
    #[test]
    fn flush_is_idempotent_on_a_clean_buffer(
        writes in prop::collection::vec((0u16..20, 0u16..6), 1..20)
    ) {
        let mut buf = DisplayBuffer::new(20, 6);
        for (x, y) in writes {
            buf.put_char(x as i32, y as i32, "x", Attr::default());
        }
        let mut backend = MockBackend::new(20, 6);
        backend.init(&Capabilities::default()).unwrap();

        backend.flush(&mut buf).unwrap();
        let calls_after_first = backend.flush_calls;
        prop_assert!(buf.damage_peek().iter().all(|&(s, e)| s >= e));

        backend.flush(&mut buf).unwrap();
        prop_assert_eq!(backend.flush_calls, calls_after_first + 1);
        prop_assert!(buf.damage_peek().iter().all(|&(s, e)| s >= e));
    }
}
