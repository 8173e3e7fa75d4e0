use crate::error::{Error, Resource, Result};

/// Fixed-capacity slot array with first-fit allocation.
///
/// The used flag lives in the `Option` itself, so a slot can never be marked used
/// without a record or hold a record while marked free.
#[derive(Debug)]
pub struct SlotPool<T> {
    kind: Resource,
    slots: Vec<Option<T>>,
}

impl<T> SlotPool<T> {
    pub fn new(kind: Resource, capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { kind, slots }
    }

    /// Lowest free index, without claiming it.
    pub fn next_free(&self) -> Option<u32> {
        self.slots.iter().position(Option::is_none).map(|i| i as u32)
    }

    /// Like [`next_free`](Self::next_free) but fails with `CapacityExceeded`.
    pub fn require_free(&self) -> Result<u32> {
        self.next_free()
            .ok_or(Error::CapacityExceeded { resource: self.kind })
    }

    /// Stores `value` in the lowest free slot.
    pub fn acquire(&mut self, value: T) -> Result<u32> {
        let index = self.require_free()?;
        self.slots[index as usize] = Some(value);
        Ok(index)
    }

    /// Frees slot `index`, returning its record.
    pub fn release(&mut self, index: u32) -> Result<T> {
        let kind = self.kind;
        self.slots
            .get_mut(index as usize)
            .and_then(Option::take)
            .ok_or(Error::InvalidHandle { kind, index })
    }

    pub fn get(&self, index: u32) -> Result<&T> {
        self.slots
            .get(index as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle { kind: self.kind, index })
    }

    pub fn get_mut(&mut self, index: u32) -> Result<&mut T> {
        let kind = self.kind;
        self.slots
            .get_mut(index as usize)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle { kind, index })
    }

    /// Used slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (i as u32, v)))
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn free_count(&self) -> usize {
        self.capacity() - self.used_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(cap: usize) -> SlotPool<&'static str> {
        SlotPool::new(Resource::Mesh, cap)
    }

    #[test]
    fn acquire_is_first_fit() {
        let mut p = pool(3);
        assert_eq!(p.acquire("a").unwrap(), 0);
        assert_eq!(p.acquire("b").unwrap(), 1);
        assert_eq!(p.acquire("c").unwrap(), 2);
        assert_eq!(
            p.acquire("d").unwrap_err(),
            Error::CapacityExceeded { resource: Resource::Mesh }
        );
    }

    #[test]
    fn released_index_is_reused() {
        let mut p = pool(3);
        p.acquire("a").unwrap();
        p.acquire("b").unwrap();
        p.acquire("c").unwrap();

        assert_eq!(p.release(1).unwrap(), "b");
        assert_eq!(p.next_free(), Some(1));
        assert_eq!(p.acquire("e").unwrap(), 1);
        assert_eq!(*p.get(1).unwrap(), "e");
    }

    #[test]
    fn never_hands_out_a_used_index() {
        let mut p = pool(8);
        let mut seen = Vec::new();
        for i in 0..8 {
            let idx = p.acquire("x").unwrap();
            assert!(!seen.contains(&idx), "iteration {i} reused {idx}");
            seen.push(idx);
        }
        assert_eq!(p.free_count(), 0);
    }

    #[test]
    fn invalid_handles() {
        let mut p = pool(2);
        p.acquire("a").unwrap();

        let unused = Error::InvalidHandle { kind: Resource::Mesh, index: 1 };
        let out_of_range = Error::InvalidHandle { kind: Resource::Mesh, index: 9 };

        assert_eq!(p.get(1).unwrap_err(), unused);
        assert_eq!(p.get(9).unwrap_err(), out_of_range);
        assert_eq!(p.release(1).unwrap_err(), unused);
        assert!(p.get_mut(9).is_err());
        assert_eq!(p.used_count(), 1);
    }

    #[test]
    fn iter_skips_free_slots() {
        let mut p = pool(4);
        for v in ["a", "b", "c"] {
            p.acquire(v).unwrap();
        }
        p.release(0).unwrap();
        let live: Vec<_> = p.iter().collect();
        assert_eq!(live, vec![(1, &"b"), (2, &"c")]);
    }
}
