//! Cache types shared by the encoders
use crate::amf3::length::Length;
use crate::types::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::rc::Rc;

/// Abstraction over a value-keyed reference cache
///
/// Used where the wire format dedupes by equality (strings, trait class
/// names). Entries are appended in first-occurrence order and addressed by
/// position.
#[derive(Clone, Debug)]
pub struct ElementCache<T> {
    cache: RefCell<Vec<T>>,
}

impl<T> Default for ElementCache<T> {
    fn default() -> Self {
        ElementCache {
            cache: RefCell::new(Vec::new()),
        }
    }
}

impl<T: PartialEq + Clone + Debug> ElementCache<T> {
    /// Check if the cache contains a given element
    #[inline]
    pub(crate) fn has(&self, val: &T) -> bool {
        self.cache.borrow().contains(val)
    }

    /// Add the given item to the cache, if the item already exists will do nothing
    #[inline]
    pub(crate) fn store(&self, val: T) {
        if !self.has(&val) {
            self.cache.borrow_mut().push(val);
        }
    }

    /// Retrieve the index for the given value
    #[inline]
    pub(crate) fn get_index(&self, val: &T) -> Option<usize> {
        self.cache.borrow().iter().position(|i| i == val)
    }

    /// Get a Length header for an item: a `Length::Reference` when the item
    /// is already cached, otherwise the given size as `Length::Size`
    pub(crate) fn to_length(&self, val: &T, length: u32) -> Length {
        if let Some(i) = self.get_index(val) {
            Length::Reference(i)
        } else {
            Length::Size(length)
        }
    }

    /// See [`Self::to_length`], additionally storing the value when it was
    /// not already cached
    pub(crate) fn to_length_store(&self, val: T, length: u32) -> Length {
        let len = self.to_length(&val, length);
        self.store(val);
        len
    }

    /// Drop all entries
    pub(crate) fn clear(&self) {
        self.cache.borrow_mut().clear();
    }

    /// The number of cached entries
    #[allow(unused)]
    pub(crate) fn len(&self) -> usize {
        self.cache.borrow().len()
    }
}

/// An identifier for a cacheable element
///
/// Identity, not equality: two structurally equal values at different
/// addresses get distinct keys, which is what keeps cycle and reuse
/// detection sound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct CacheKey(usize);

impl CacheKey {
    /// Create a `CacheKey` from the shared allocation backing a value
    pub(crate) fn from_rc(value: &Rc<Value>) -> Self {
        Self(Rc::as_ptr(value) as usize)
    }
}

/// The writer-side object reference cache: identity keyed, append ordered
#[derive(Debug, Default)]
pub(crate) struct ObjectCache {
    entries: RefCell<BTreeMap<CacheKey, u32>>,
}

impl ObjectCache {
    /// Returns the existing index for `key`, or appends it and returns
    /// `None` so the caller emits the value inline
    pub(crate) fn to_reference_or_store(&self, key: CacheKey) -> Option<u32> {
        let mut entries = self.entries.borrow_mut();
        if let Some(index) = entries.get(&key) {
            return Some(*index);
        }
        let index = entries.len() as u32;
        entries.insert(key, index);
        None
    }

    /// Drop all entries
    pub(crate) fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

#[cfg(test)]
mod element_cache_tests {
    use super::{CacheKey, ElementCache, ObjectCache};
    use crate::amf3::length::Length;
    use crate::types::Value;
    use std::rc::Rc;

    #[test]
    fn test_store_dedupes_by_value() {
        let cache: ElementCache<Vec<u8>> = ElementCache::default();
        cache.store(b"foo".to_vec());
        cache.store(b"foo".to_vec());
        cache.store(b"bar".to_vec());
        assert_eq!(cache.get_index(&b"foo".to_vec()), Some(0));
        assert_eq!(cache.get_index(&b"bar".to_vec()), Some(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_to_length_store() {
        let cache: ElementCache<Vec<u8>> = ElementCache::default();
        assert_eq!(cache.to_length_store(b"foo".to_vec(), 3), Length::Size(3));
        assert_eq!(
            cache.to_length_store(b"foo".to_vec(), 3),
            Length::Reference(0)
        );
    }

    #[test]
    fn test_object_cache_is_identity_keyed() {
        let cache = ObjectCache::default();
        let a = Rc::new(Value::Array(vec![]));
        let b = Rc::new(Value::Array(vec![]));

        assert_eq!(cache.to_reference_or_store(CacheKey::from_rc(&a)), None);
        // Equal by value but a distinct allocation
        assert_eq!(cache.to_reference_or_store(CacheKey::from_rc(&b)), None);
        assert_eq!(cache.to_reference_or_store(CacheKey::from_rc(&a)), Some(0));
        assert_eq!(
            cache.to_reference_or_store(CacheKey::from_rc(&Rc::clone(&b))),
            Some(1)
        );
    }
}
