use std::fmt;

/// Weak handle to an object in an [`ObjectDb`](super::ObjectDb).
///
/// Bits 0-31 hold the slot index, bits 32-63 the slot generation. Generations
/// start at 1, so the all-zero id never names a live object.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId {
    id: u64,
}

impl ObjectId {
    const INDEX_MASK: u64 = 0xFFFF_FFFF;
    const GENERATION_SHIFT: u64 = 32;

    /// The null handle
    pub const NULL: ObjectId = ObjectId { id: 0 };

    pub(crate) fn new(index: u32, generation: u32) -> Self {
        let id = (index as u64) | ((generation as u64) << Self::GENERATION_SHIFT);
        Self { id }
    }

    /// Slot index
    pub fn index(&self) -> usize {
        (self.id & Self::INDEX_MASK) as usize
    }

    /// Slot generation
    pub fn generation(&self) -> u32 {
        (self.id >> Self::GENERATION_SHIFT) as u32
    }

    /// Check for the null handle
    pub fn is_null(&self) -> bool {
        self.id == 0
    }

    /// Raw numeric instance id
    pub fn as_u64(&self) -> u64 {
        self.id
    }

    /// Rebuild a handle from [`ObjectId::as_u64`]
    pub fn from_u64(id: u64) -> Self {
        Self { id }
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({}:{})", self.index(), self.generation())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let id = ObjectId::new(7, 3);
        assert_eq!(id.index(), 7);
        assert_eq!(id.generation(), 3);
        assert_eq!(ObjectId::from_u64(id.as_u64()), id);
        assert!(!id.is_null());
        assert!(ObjectId::default().is_null());
    }
}
