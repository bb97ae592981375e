use crate::error::{KaizenError, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use uuid::Uuid;

/// An element of an embedded collection, addressable by its own id.
pub trait Entry: Clone {
    /// Collection name used in not-found errors.
    const COLLECTION: &'static str;

    fn id(&self) -> Uuid;
    fn set_id(&mut self, id: Uuid);

    /// Checked after every append or patch; a failure discards the change.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Partial update for an entry. Fields left unset keep their stored value.
pub trait Patch<T> {
    fn apply_to(self, target: &mut T);
}

/// Ordered, id-addressed list embedded inside an opportunity.
///
/// Serializes as a plain array. The id-to-position index is rebuilt whenever
/// the list is loaded and kept in step with every mutation.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    items: Vec<T>,
    index: HashMap<Uuid, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: PartialEq> PartialEq for Collection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Entry> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<T>) -> Self {
        let mut collection = Self {
            items,
            index: HashMap::new(),
        };
        collection.reindex();
        collection
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(pos, e)| (e.id(), pos))
            .collect();
    }

    fn position(&self, id: Uuid) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or_else(|| KaizenError::entry_not_found(T::COLLECTION, id))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.index.get(&id).map(|&pos| &self.items[pos])
    }

    pub fn find(&self, id: Uuid) -> Result<&T> {
        let pos = self.position(id)?;
        Ok(&self.items[pos])
    }

    pub fn find_mut(&mut self, id: Uuid) -> Result<&mut T> {
        let pos = self.position(id)?;
        Ok(&mut self.items[pos])
    }

    /// Append `item` under a freshly generated id and return that id.
    pub fn append(&mut self, mut item: T) -> Result<Uuid> {
        let mut id = Uuid::new_v4();
        while self.contains(id) {
            id = Uuid::new_v4();
        }
        item.set_id(id);
        item.validate()?;
        self.index.insert(id, self.items.len());
        self.items.push(item);
        Ok(id)
    }

    /// Apply `patch` to the entry with `id`. The stored entry is only replaced
    /// when the patched copy validates.
    pub fn update<P: Patch<T>>(&mut self, id: Uuid, patch: P) -> Result<&T> {
        let pos = self.position(id)?;
        let mut next = self.items[pos].clone();
        patch.apply_to(&mut next);
        next.set_id(id);
        next.validate()?;
        self.items[pos] = next;
        Ok(&self.items[pos])
    }

    pub fn remove(&mut self, id: Uuid) -> Result<T> {
        let pos = self.position(id)?;
        let removed = self.items.remove(pos);
        self.reindex();
        Ok(removed)
    }
}

impl<T: Serialize> Serialize for Collection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Entry + Deserialize<'de>> Deserialize<'de> for Collection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_items)
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Parse an element or opportunity id received at the boundary.
pub fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| KaizenError::Validation(format!("invalid identifier '{raw}'")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
