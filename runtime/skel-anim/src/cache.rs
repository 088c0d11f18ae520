//! Name keyed cache of shared resources
//!
//! Keyframe data and controllers are immutable once built and shared by
//! every clip or animator that uses them. The cache holds one handle per
//! entry; an entry stays alive as long as anyone holds a clone of it.

use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct Entry<T: ?Sized> {
    name: String,
    resource: Arc<T>,
}

/// Shared resources looked up by case-insensitive name
#[derive(Debug)]
pub struct ResourceCache<T: ?Sized> {
    entries: HashMap<String, Entry<T>>,
}

impl<T: ?Sized> ResourceCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    fn key(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    /// Store `resource` under `name`, returning the entry it replaced
    pub fn insert(&mut self, name: impl Into<String>, resource: Arc<T>) -> Option<Arc<T>> {
        let name = name.into();
        self.entries
            .insert(Self::key(&name), Entry { name, resource })
            .map(|old| old.resource)
    }

    /// A new handle to the named resource
    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.entries
            .get(&Self::key(name))
            .map(|entry| Arc::clone(&entry.resource))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&Self::key(name))
    }

    /// Drop the cache's handle. Other holders keep the resource alive.
    pub fn release(&mut self, name: &str) -> Option<Arc<T>> {
        self.entries.remove(&Self::key(name)).map(|entry| entry.resource)
    }

    /// Drop every entry nobody outside the cache holds. Returns how many went.
    pub fn destroy_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| Arc::strong_count(&entry.resource) > 1);
        let removed = before - self.entries.len();
        if removed > 0 {
            log::debug!("Destroyed {} unused resources", removed);
        }
        removed
    }

    pub fn rename(&mut self, from: &str, to: impl Into<String>) -> bool {
        let to = to.into();
        if self.contains(&to) {
            log::warn!("Cannot rename '{}' to '{}': name already in use", from, to);
            return false;
        }
        match self.entries.remove(&Self::key(from)) {
            Some(entry) => {
                self.entries.insert(
                    Self::key(&to),
                    Entry {
                        name: to,
                        resource: entry.resource,
                    },
                );
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(|entry| entry.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl<T: ?Sized> Default for ResourceCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mut cache = ResourceCache::new();
        cache.insert("Walk", Arc::new(1));
        assert_eq!(cache.get("walk").as_deref(), Some(&1));
        assert!(cache.contains("WALK"));
        assert_eq!(cache.names(), vec!["Walk"]);
    }

    #[test]
    fn test_destroy_unused_keeps_held_entries() {
        let mut cache = ResourceCache::new();
        cache.insert("a", Arc::new(1));
        cache.insert("b", Arc::new(2));
        let held = cache.get("a");

        assert_eq!(cache.destroy_unused(), 1);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        drop(held);
        assert_eq!(cache.destroy_unused(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_release_leaves_other_holders_alive() {
        let mut cache = ResourceCache::new();
        cache.insert("a", Arc::new(String::from("data")));
        let held = cache.get("a").unwrap();
        let released = cache.release("a").unwrap();
        assert!(Arc::ptr_eq(&held, &released));
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_rename() {
        let mut cache = ResourceCache::new();
        cache.insert("a", Arc::new(1));
        cache.insert("b", Arc::new(2));
        assert!(!cache.rename("a", "B"));
        assert!(cache.rename("a", "c"));
        assert_eq!(cache.get("c").as_deref(), Some(&1));
        assert!(!cache.rename("missing", "d"));
    }
}
