use std::{borrow::Borrow, collections::HashMap, hash::Hash, mem};

/// An approximate LRU made of two generations. Inserts go to the young
/// generation, and when it fills up the old generation is dropped and the
/// young one takes its place. Hits in the old generation are promoted, so
/// anything used since the last rotation survives the next one.
pub(crate) struct SimpleLru<K, V> {
  capacity: usize,
  young: HashMap<K, V>,
  old: HashMap<K, V>,
}

impl<K, V> SimpleLru<K, V>
where
  K: Eq + Hash,
{
  pub(crate) fn new(capacity: usize) -> Self {
    Self {
      capacity: capacity.max(1),
      young: HashMap::new(),
      old: HashMap::new(),
    }
  }

  pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    if !self.young.contains_key(key) {
      let (key, value) = self.old.remove_entry(key)?;
      self.insert(key, value);
    }

    self.young.get(key)
  }

  pub(crate) fn contains<Q>(&self, key: &Q) -> bool
  where
    K: Borrow<Q>,
    Q: Hash + Eq + ?Sized,
  {
    self.young.contains_key(key) || self.old.contains_key(key)
  }

  pub(crate) fn insert(&mut self, key: K, value: V) {
    if self.young.len() >= self.capacity && !self.young.contains_key(&key) {
      self.old = mem::take(&mut self.young);
    }

    self.old.remove(&key);
    self.young.insert(key, value);
  }

  pub(crate) fn len(&self) -> usize {
    self.young.len() + self.old.len()
  }
}
