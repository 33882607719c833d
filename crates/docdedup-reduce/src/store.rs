//! Object table: the store that owns every top-level object of a document.

use crate::error::DedupError;
use crate::object::{Object, Reference};
use std::collections::BTreeMap;
use tracing::debug;

/// Trait for the graph store consumed by the deduplication engine.
///
/// Object-safe so the engine can run against any table implementation,
/// including fakes in tests.
pub trait ObjectStore {
    /// Enumerate every slot in stable order. `None` marks a reserved or free
    /// slot with no object behind it.
    fn enumerate(&self) -> Box<dyn Iterator<Item = (Reference, Option<&Object>)> + '_>;

    /// Look up an object.
    fn get(&self, reference: Reference) -> Option<&Object>;

    /// Look up an object for in-place mutation.
    fn get_mut(&mut self, reference: Reference) -> Option<&mut Object>;

    /// Remove an object. Removing an absent reference is a no-op.
    fn remove(&mut self, reference: Reference) -> Result<Option<Object>, DedupError>;

    /// Number of present objects.
    fn len(&self) -> usize;

    /// True if no objects are present.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory object table ordered by reference.
#[derive(Debug, Clone, Default)]
pub struct ObjectTable {
    slots: BTreeMap<Reference, Option<Object>>,
}

impl ObjectTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// One past the highest object number in use. When that would overflow,
    /// the lowest unused number instead.
    fn next_object_number(&self) -> Result<u32, DedupError> {
        let Some(last) = self.slots.keys().next_back() else {
            return Ok(1);
        };
        if let Some(next) = last.object.checked_add(1) {
            return Ok(next);
        }
        let mut candidate: u32 = 1;
        for reference in self.slots.keys() {
            if reference.object > candidate {
                return Ok(candidate);
            }
            if reference.object == candidate {
                candidate = candidate
                    .checked_add(1)
                    .ok_or_else(|| DedupError::Store("object numbers exhausted".to_string()))?;
            }
        }
        Ok(candidate)
    }

    /// Add an object under the next free object number, generation 0.
    pub fn create_object(&mut self, object: impl Into<Object>) -> Result<Reference, DedupError> {
        let reference = Reference::new(self.next_object_number()?, 0);
        self.slots.insert(reference, Some(object.into()));
        Ok(reference)
    }

    /// Reserve an object number without an object behind it.
    pub fn reserve(&mut self) -> Result<Reference, DedupError> {
        let reference = Reference::new(self.next_object_number()?, 0);
        self.slots.insert(reference, None);
        Ok(reference)
    }

    /// Place an object under an explicit reference. Fails if the slot is
    /// already occupied; fills a reserved slot.
    pub fn insert(&mut self, reference: Reference, object: impl Into<Object>) -> Result<(), DedupError> {
        match self.slots.get_mut(&reference) {
            Some(Some(_)) => Err(DedupError::DuplicateReference(reference)),
            Some(slot) => {
                *slot = Some(object.into());
                Ok(())
            }
            None => {
                self.slots.insert(reference, Some(object.into()));
                Ok(())
            }
        }
    }

    /// References of all present objects, in order
    pub fn references(&self) -> Vec<Reference> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.is_some())
            .map(|(r, _)| *r)
            .collect()
    }

    /// Iterate present objects in order
    pub fn iter(&self) -> impl Iterator<Item = (Reference, &Object)> {
        self.slots
            .iter()
            .filter_map(|(r, slot)| slot.as_ref().map(|o| (*r, o)))
    }
}

impl ObjectStore for ObjectTable {
    fn enumerate(&self) -> Box<dyn Iterator<Item = (Reference, Option<&Object>)> + '_> {
        Box::new(self.slots.iter().map(|(r, slot)| (*r, slot.as_ref())))
    }

    fn get(&self, reference: Reference) -> Option<&Object> {
        self.slots.get(&reference).and_then(|slot| slot.as_ref())
    }

    fn get_mut(&mut self, reference: Reference) -> Option<&mut Object> {
        self.slots.get_mut(&reference).and_then(|slot| slot.as_mut())
    }

    fn remove(&mut self, reference: Reference) -> Result<Option<Object>, DedupError> {
        let removed = self.slots.remove(&reference).flatten();
        if removed.is_some() {
            debug!(%reference, "Removed object");
        }
        Ok(removed)
    }

    fn len(&self) -> usize {
        self.slots.values().filter(|slot| slot.is_some()).count()
    }
}
