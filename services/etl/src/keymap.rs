//! Natural key <-> surrogate id mapping.
//!
//! Ids are allocated from a counter owned by the map: the n-th distinct key
//! inserted gets id n. Dependent stages borrow a finished map read-only to
//! resolve their foreign keys.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use schema::Id;

use crate::error::{EtlError, Result};

#[derive(Debug, Clone)]
pub struct KeyMap<K> {
    table: &'static str,
    ids: HashMap<K, Id>,
    /// Reverse index: `keys[id - 1]` is the key of `id`.
    keys: Vec<K>,
}

impl<K> KeyMap<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            ids: HashMap::new(),
            keys: Vec::new(),
        }
    }

    /// Return the id of `key`, allocating the next one if it is new.
    /// The flag is true when the key was inserted by this call.
    pub fn get_or_insert(&mut self, key: K) -> Result<(Id, bool)> {
        if let Some(&id) = self.ids.get(&key) {
            return Ok((id, false));
        }

        let id = Id::try_from(self.keys.len() + 1)
            .map_err(|_| EtlError::IdOverflow { table: self.table })?;
        self.ids.insert(key.clone(), id);
        self.keys.push(key);
        Ok((id, true))
    }

    pub fn id_of<Q>(&self, key: &Q) -> Option<Id>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.ids.get(key).copied()
    }

    pub fn key_of(&self, id: Id) -> Option<&K> {
        let idx = usize::try_from(id).ok()?.checked_sub(1)?;
        self.keys.get(idx)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(id, key)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (Id, &K)> {
        (1..).zip(self.keys.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_dense_in_insertion_order() {
        let mut map = KeyMap::new("maps");
        assert_eq!(map.get_or_insert("de_dust2".to_string()).unwrap(), (1, true));
        assert_eq!(map.get_or_insert("de_mirage".to_string()).unwrap(), (2, true));
        assert_eq!(map.get_or_insert("de_dust2".to_string()).unwrap(), (1, false));
        assert_eq!(map.get_or_insert("de_inferno".to_string()).unwrap(), (3, true));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_lookup_both_directions() {
        let mut map = KeyMap::new("maps");
        map.get_or_insert("de_nuke".to_string()).unwrap();
        map.get_or_insert("de_train".to_string()).unwrap();

        assert_eq!(map.id_of("de_train"), Some(2));
        assert_eq!(map.id_of("de_cache"), None);
        assert_eq!(map.key_of(1).map(String::as_str), Some("de_nuke"));
        assert_eq!(map.key_of(0), None);
        assert_eq!(map.key_of(-4), None);
        assert_eq!(map.key_of(3), None);
    }

    #[test]
    fn test_composite_keys() {
        let mut rounds: KeyMap<(Id, i32)> = KeyMap::new("rounds");
        rounds.get_or_insert((1, 1)).unwrap();
        rounds.get_or_insert((1, 2)).unwrap();
        rounds.get_or_insert((2, 1)).unwrap();

        assert_eq!(rounds.id_of(&(2, 1)), Some(3));
        assert_eq!(rounds.id_of(&(2, 2)), None);
    }

    #[test]
    fn test_iter_in_id_order() {
        let mut map = KeyMap::new("weapons");
        for name in ["AK47", "M4A4", "AK47", "AWP"] {
            map.get_or_insert(name.to_string()).unwrap();
        }
        let pairs: Vec<(Id, &str)> = map.iter().map(|(id, k)| (id, k.as_str())).collect();
        assert_eq!(pairs, vec![(1, "AK47"), (2, "M4A4"), (3, "AWP")]);
    }

    #[test]
    fn test_empty() {
        let map: KeyMap<i64> = KeyMap::new("players");
        assert!(map.is_empty());
        assert_eq!(map.id_of(&76561198000000001), None);
    }
}
