use crate::error::{Error, Resource, Result};

/// Append-only byte allocator over a fixed-capacity CPU mirror.
///
/// Offsets handed out by [`allocate`](Self::allocate) never move. The mirror is
/// uploaded as a whole by the frame scheduler, so writes here are coalesced into
/// one GPU transfer per frame.
#[derive(Debug, Clone)]
pub struct UniformArena {
    kind: Resource,
    bytes: Vec<u8>,
    cursor: usize,
}

/// Alignment for a uniform of `size` bytes: scalars 4, pairs 8, everything else 16.
pub fn align_for(size: usize) -> usize {
    if size <= 4 {
        4
    } else if size <= 8 {
        8
    } else {
        16
    }
}

impl UniformArena {
    /// Creates a zero-filled arena of `capacity` bytes.
    pub fn new(kind: Resource, capacity: usize) -> Self {
        Self {
            kind,
            bytes: vec![0; capacity],
            cursor: 0,
        }
    }

    /// Reserves `size` bytes at the next aligned offset.
    pub fn allocate(&mut self, size: usize) -> Result<usize> {
        if size == 0 {
            return Err(Error::invalid_data("zero-size uniform"));
        }

        let align = align_for(size);
        let full = Error::CapacityExceeded { resource: self.kind };
        let padded = self.cursor.checked_add(align - 1).ok_or_else(|| full.clone())?;
        let offset = padded & !(align - 1);
        let end = offset.checked_add(size).ok_or_else(|| full.clone())?;

        if end > self.capacity() {
            return Err(full);
        }

        self.cursor = end;
        Ok(offset)
    }

    /// Allocates room for `data` and copies it in.
    pub fn push(&mut self, data: &[u8]) -> Result<usize> {
        let offset = self.allocate(data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(offset)
    }

    /// Overwrites an allocated range in place.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len())?;
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Returns an allocated range.
    pub fn read(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.check_range(offset, len)?;
        Ok(&self.bytes[offset..offset + len])
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.cursor => Ok(()),
            _ => Err(Error::OutOfBoundsWrite {
                offset,
                len,
                cursor: self.cursor,
            }),
        }
    }

    /// The whole mirror, including unallocated tail bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::GLOBAL_UNIFORM_CAPACITY;

    fn global() -> UniformArena {
        UniformArena::new(Resource::GlobalUniforms, GLOBAL_UNIFORM_CAPACITY)
    }

    // ── alignment ─────────────────────────────────────────────────────────

    #[test]
    fn alignment_classes() {
        assert_eq!(align_for(1), 4);
        assert_eq!(align_for(4), 4);
        assert_eq!(align_for(5), 8);
        assert_eq!(align_for(8), 8);
        assert_eq!(align_for(12), 16);
        assert_eq!(align_for(64), 16);
    }

    #[test]
    fn offsets_are_aligned_and_increasing() {
        let mut a = global();
        let mut last = None;
        for size in [4, 12, 4, 8, 16, 1, 64, 3, 8] {
            let off = a.allocate(size).unwrap();
            assert_eq!(off % align_for(size), 0, "size {size} at {off}");
            if let Some(prev) = last {
                assert!(off > prev);
            }
            assert!(off + size <= a.capacity());
            last = Some(off);
        }
    }

    #[test]
    fn mixed_sizes_pack_as_expected() {
        let mut a = global();
        assert_eq!(a.allocate(4).unwrap(), 0);
        assert_eq!(a.allocate(8).unwrap(), 8);
        assert_eq!(a.allocate(4).unwrap(), 16);
        assert_eq!(a.allocate(16).unwrap(), 32);
        assert_eq!(a.cursor(), 48);
    }

    // ── capacity ──────────────────────────────────────────────────────────

    #[test]
    fn overflow_leaves_cursor_unchanged() {
        let mut a = global();
        a.push(&[1u8; 1000]).unwrap();
        assert_eq!(a.cursor(), 1000);

        let err = a.push(&[2u8; 100]).unwrap_err();
        assert_eq!(err, Error::CapacityExceeded { resource: Resource::GlobalUniforms });
        assert_eq!(a.cursor(), 1000);
    }

    #[test]
    fn huge_allocation_is_capacity_error() {
        let mut a = global();
        a.allocate(4).unwrap();

        let err = a.allocate(usize::MAX - 2).unwrap_err();
        assert_eq!(err, Error::CapacityExceeded { resource: Resource::GlobalUniforms });
        assert_eq!(a.cursor(), 4);
        assert_eq!(a.allocate(4).unwrap(), 4);
    }

    #[test]
    fn alignment_padding_counts_against_capacity() {
        let mut a = UniformArena::new(Resource::MaterialUniforms, 32);
        a.allocate(4).unwrap();
        // 16-aligned placement at 16 leaves exactly 16 bytes.
        assert_eq!(a.allocate(16).unwrap(), 16);
        assert!(a.allocate(4).is_err());
        assert_eq!(a.cursor(), 32);
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut a = global();
        assert!(matches!(a.allocate(0), Err(Error::InvalidData(_))));
        assert_eq!(a.cursor(), 0);
    }

    // ── read / write ──────────────────────────────────────────────────────

    #[test]
    fn write_then_read_round_trips() {
        let mut a = global();
        let off = a.push(&1.0f32.to_le_bytes()).unwrap();
        a.write(off, &2.5f32.to_le_bytes()).unwrap();
        assert_eq!(a.read(off, 4).unwrap(), &2.5f32.to_le_bytes());
    }

    #[test]
    fn write_past_cursor_is_rejected_without_partial_write() {
        let mut a = global();
        a.push(&[7u8; 4]).unwrap();

        let err = a.write(2, &[9u8; 4]).unwrap_err();
        assert_eq!(err, Error::OutOfBoundsWrite { offset: 2, len: 4, cursor: 4 });
        assert_eq!(a.read(0, 4).unwrap(), &[7u8; 4]);
        assert_eq!(a.bytes()[4..8], [0u8; 4]);
    }

    #[test]
    fn read_past_cursor_is_rejected() {
        let a = global();
        assert!(a.read(0, 1).is_err());
        assert!(a.read(usize::MAX, 2).is_err());
    }
}
