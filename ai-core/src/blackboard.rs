use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::NameHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlackboardError {
    #[error("blackboard type mismatch for key id={0} (stored type differs from requested)")]
    TypeMismatch(u64),
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    id: u64,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(id: u64) -> Self {
        Self {
            id,
            _phantom: PhantomData,
        }
    }

    /// Key derived from the case-insensitive hash of `name`.
    pub const fn named(name: &str) -> Self {
        Self::new(NameHash::of(name).value() as u64)
    }

    pub fn id(self) -> u64 {
        self.id
    }
}

/// Typed, per-agent scratch storage.
///
/// Iteration order is by key id, so anything derived from walking the board is deterministic.
#[derive(Default)]
pub struct Blackboard {
    values: BTreeMap<u64, Box<dyn Any>>,
}

impl std::fmt::Debug for Blackboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blackboard")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.values.contains_key(&key.id)
    }

    pub fn set<T: 'static>(&mut self, key: BbKey<T>, value: T) {
        self.values.insert(key.id, Box::new(value));
    }

    /// Panics when the stored value has a different type than `T`.
    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        match self.try_get(key) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }

    pub fn try_get<T: 'static>(&self, key: BbKey<T>) -> Result<Option<&T>, BlackboardError> {
        match self.values.get(&key.id) {
            None => Ok(None),
            Some(value) => value
                .downcast_ref::<T>()
                .map(Some)
                .ok_or(BlackboardError::TypeMismatch(key.id)),
        }
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.values.get_mut(&key.id)?;
        value.downcast_mut::<T>().or_else(|| {
            panic!("{}", BlackboardError::TypeMismatch(key.id))
        })
    }

    /// Returns the stored value, inserting `T::default()` first if the key is empty.
    pub fn get_or_default_mut<T: Default + 'static>(&mut self, key: BbKey<T>) -> &mut T {
        if !self.contains(key) {
            self.set(key, T::default());
        }
        match self.get_mut(key) {
            Some(value) => value,
            None => unreachable!("value inserted above"),
        }
    }

    pub fn remove<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        let value = self.values.remove(&key.id)?;
        value
            .downcast::<T>()
            .map(|b| *b)
            .ok()
            .or_else(|| panic!("{}", BlackboardError::TypeMismatch(key.id)))
    }
}
