//! `Debug` helpers for large buffers.
//!
//! Joint pose buffers and keyframe tables easily run into hundreds of
//! entries. Fields annotated with
//! `#[debug(with = skel_utils::debug::trimmed_collection_fmt)]` only print
//! the leading entries followed by the number of elided ones. Enable the
//! `debug-print-all` feature to get the full dump back.

use std::{fmt, sync::Arc};

/// Number of leading entries kept when a collection is trimmed.
pub const LEADING_ENTRIES: usize = 3;

/// A collection whose leading entries can be borrowed for printing.
pub trait Trimmable {
    type Item: fmt::Debug;

    fn entry_count(&self) -> usize;
    fn leading(&self, count: usize) -> &[Self::Item];
}

impl<T: fmt::Debug> Trimmable for [T] {
    type Item = T;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn leading(&self, count: usize) -> &[T] {
        &self[..count.min(self.len())]
    }
}

impl<T: fmt::Debug> Trimmable for Vec<T> {
    type Item = T;

    fn entry_count(&self) -> usize {
        self.len()
    }

    fn leading(&self, count: usize) -> &[T] {
        self.as_slice().leading(count)
    }
}

impl<T: fmt::Debug, const N: usize> Trimmable for [T; N] {
    type Item = T;

    fn entry_count(&self) -> usize {
        N
    }

    fn leading(&self, count: usize) -> &[T] {
        self.as_slice().leading(count)
    }
}

impl<C: ?Sized + Trimmable> Trimmable for Arc<C> {
    type Item = C::Item;

    fn entry_count(&self) -> usize {
        self.as_ref().entry_count()
    }

    fn leading(&self, count: usize) -> &[Self::Item] {
        self.as_ref().leading(count)
    }
}

#[cfg(not(feature = "debug-print-all"))]
pub fn trimmed_collection_fmt<C: ?Sized + Trimmable>(
    collection: &C,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    let shown = collection.leading(LEADING_ENTRIES);
    let elided = collection.entry_count() - shown.len();

    if elided == 0 {
        write!(f, "{:?}", shown)
    } else {
        write!(f, "{:?} + {} more", shown, elided)
    }
}

#[cfg(feature = "debug-print-all")]
pub fn trimmed_collection_fmt<C: ?Sized + Trimmable>(
    collection: &C,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    write!(f, "{:?}", collection.leading(collection.entry_count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use custom_debug::Debug;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Buffer {
        #[debug(with = trimmed_collection_fmt)]
        values: Vec<u32>,
    }

    #[test]
    #[cfg(not(feature = "debug-print-all"))]
    fn test_long_collection_is_trimmed() {
        let buffer = Buffer {
            values: (0..10).collect(),
        };
        assert_eq!(format!("{:?}", buffer), "Buffer { values: [0, 1, 2] + 7 more }");
    }

    #[test]
    fn test_short_collection_is_printed_whole() {
        let buffer = Buffer { values: vec![4, 5] };
        assert_eq!(format!("{:?}", buffer), "Buffer { values: [4, 5] }");
    }
}
