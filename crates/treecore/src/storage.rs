use crate::names::StorageName;
use crate::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Flat, named map of values shared across the whole flow scope.
///
/// Outlives individual tokens; cleared on flow teardown. Writes are
/// serialized behind the lock, which is all the ordering parallel
/// branches may rely on.
#[derive(Debug, Default)]
pub struct Storage {
    slots: RwLock<HashMap<StorageName, Value>>,
}

impl Storage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &StorageName) -> Option<Value> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.get(name).cloned()
    }

    pub fn put(&self, name: StorageName, value: Value) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.insert(name, value);
    }

    /// Applies `f` to the slot under the lock; false if the slot is absent.
    pub fn modify<F>(&self, name: &StorageName, f: F) -> bool
    where
        F: FnOnce(&mut Value),
    {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        match slots.get_mut(name) {
            Some(value) => {
                f(value);
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, name: &StorageName) -> Option<Value> {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.remove(name)
    }

    pub fn has(&self, name: &StorageName) -> bool {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.contains_key(name)
    }

    pub fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.clear();
    }

    pub fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<StorageName> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        slots.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(name: &str) -> StorageName {
        StorageName::new(name).expect("valid name")
    }

    #[test]
    fn put_get_remove() {
        let storage = Storage::new();
        storage.put(slot("a"), Value::from("one"));
        assert_eq!(storage.get(&slot("a")), Some(Value::from("one")));
        assert!(storage.has(&slot("a")));
        assert_eq!(storage.remove(&slot("a")), Some(Value::from("one")));
        assert!(storage.is_empty());
    }

    #[test]
    fn modify_in_place() {
        let storage = Storage::new();
        storage.put(slot("n"), Value::from(1i64));
        let touched = storage.modify(&slot("n"), |v| *v = Value::from(2i64));
        assert!(touched);
        assert_eq!(storage.get(&slot("n")), Some(Value::from(2i64)));
        assert!(!storage.modify(&slot("missing"), |_| {}));
    }

    #[test]
    fn clear_empties_all_slots() {
        let storage = Storage::new();
        storage.put(slot("a"), Value::Null);
        storage.put(slot("b"), Value::Null);
        storage.clear();
        assert!(storage.is_empty());
    }
}
