//! Payload segmentation
//!
//! A payload of `total` bytes is cut into consecutive segments of at most
//! `max_chunk` bytes. When a register address is given, only the first
//! segment carries it.

/// One bounded piece of a logical transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Data only
    Plain {
        /// Offset into the payload
        offset: usize,
        /// Number of payload bytes
        len: usize,
    },
    /// Register address byte followed by data, in one native call
    WithAddress {
        /// Register address sent ahead of the data
        addr: u8,
        /// Offset into the payload (always 0)
        offset: usize,
        /// Number of payload bytes
        len: usize,
    },
}

impl Segment {
    /// Offset of this segment's data within the payload
    pub fn offset(&self) -> usize {
        match *self {
            Segment::Plain { offset, .. } | Segment::WithAddress { offset, .. } => offset,
        }
    }

    /// Number of payload bytes in this segment (excluding any address)
    pub fn len(&self) -> usize {
        match *self {
            Segment::Plain { len, .. } | Segment::WithAddress { len, .. } => len,
        }
    }

    /// Always false; segments are never empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload range covered by this segment
    pub fn range(&self) -> core::ops::Range<usize> {
        self.offset()..self.offset() + self.len()
    }
}

/// Iterator over the segments of a payload
#[derive(Debug, Clone)]
pub struct Segments {
    total: usize,
    max_chunk: usize,
    remaining: usize,
    address: Option<u8>,
}

impl Segments {
    /// Plan segments for `total` payload bytes
    ///
    /// `max_chunk` must be non-zero.
    pub fn new(total: usize, max_chunk: usize, address: Option<u8>) -> Self {
        assert!(max_chunk > 0, "chunk size must be non-zero");
        Self {
            total,
            max_chunk,
            remaining: total,
            address,
        }
    }

    /// Payload bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl Iterator for Segments {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        if self.remaining == 0 {
            return None;
        }

        let len = self.remaining.min(self.max_chunk);
        let offset = self.total - self.remaining;
        self.remaining -= len;

        // The address goes out with the first chunk only
        Some(match self.address.take() {
            Some(addr) => Segment::WithAddress { addr, offset, len },
            None => Segment::Plain { offset, len },
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.div_ceil(self.max_chunk);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Segments {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_ten_bytes_in_fours() {
        let segs: Vec<_> = Segments::new(10, 4, None).collect();
        assert_eq!(
            segs,
            [
                Segment::Plain { offset: 0, len: 4 },
                Segment::Plain { offset: 4, len: 4 },
                Segment::Plain { offset: 8, len: 2 },
            ]
        );
    }

    #[test]
    fn test_address_only_on_first_segment() {
        let segs: Vec<_> = Segments::new(5, 3, Some(0x20)).collect();
        assert_eq!(
            segs,
            [
                Segment::WithAddress {
                    addr: 0x20,
                    offset: 0,
                    len: 3
                },
                Segment::Plain { offset: 3, len: 2 },
            ]
        );
    }

    #[test]
    fn test_single_segment_when_payload_fits() {
        let segs: Vec<_> = Segments::new(4096, 4096, Some(0x01)).collect();
        assert_eq!(segs.len(), 1);
        assert!(matches!(segs[0], Segment::WithAddress { len: 4096, .. }));
    }

    #[test]
    fn test_segments_cover_payload_exactly() {
        for total in 1..=67 {
            for chunk in 1..=17 {
                let mut segs = Segments::new(total, chunk, Some(0xAA));
                assert_eq!(segs.len(), total.div_ceil(chunk));

                let mut next = 0;
                let mut addressed = 0;
                for seg in segs.by_ref() {
                    assert_eq!(seg.offset(), next, "gap or overlap at {}", next);
                    assert!(!seg.is_empty() && seg.len() <= chunk);
                    if matches!(seg, Segment::WithAddress { .. }) {
                        assert_eq!(seg.offset(), 0);
                        addressed += 1;
                    }
                    next = seg.range().end;
                }
                assert_eq!(next, total);
                assert_eq!(addressed, 1);
                assert_eq!(segs.remaining(), 0);
            }
        }
    }

    #[test]
    fn test_empty_payload_yields_nothing() {
        assert_eq!(Segments::new(0, 8, Some(1)).count(), 0);
    }
}
