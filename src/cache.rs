// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Seam caching
//!
//! Carving the same frame to the same size twice produces the same
//! seams, so the carver can consult a store of seams it has already
//! found.  The store is advisory: a missing entry, or one that no
//! longer fits the image, just means the seam is computed again.

use crate::carver::Axis;
use crate::seam::Seam;
use std::collections::HashMap;

/// Identifies one ordered list of seams: which frame, which axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub frame: String,
    pub axis: Axis,
}

impl CacheKey {
    pub fn new(frame: impl Into<String>, axis: Axis) -> Self {
        CacheKey {
            frame: frame.into(),
            axis,
        }
    }
}

/// A key-value store of previously computed seams.
pub trait SeamCache {
    /// The `index`th seam removed along this key, if known.
    fn get(&self, key: &CacheKey, index: usize) -> Option<&Seam>;

    /// Record the `index`th seam.  Anything previously stored at or
    /// after `index` is stale and is discarded.
    fn put(&mut self, key: &CacheKey, index: usize, seam: Seam);
}

/// An in-memory [`SeamCache`].
#[derive(Debug, Default, Clone)]
pub struct MemorySeamCache {
    seams: HashMap<CacheKey, Vec<Seam>>,
}

impl MemorySeamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every seam stored under a key, in removal order.
    pub fn seams(&self, key: &CacheKey) -> &[Seam] {
        self.seams.get(key).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl SeamCache for MemorySeamCache {
    fn get(&self, key: &CacheKey, index: usize) -> Option<&Seam> {
        self.seams.get(key).and_then(|list| list.get(index))
    }

    fn put(&mut self, key: &CacheKey, index: usize, seam: Seam) {
        let list = self.seams.entry(key.clone()).or_default();
        list.truncate(index);
        if list.len() == index {
            list.push(seam);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_replaces_the_tail() {
        let key = CacheKey::new("frame-1", Axis::Width);
        let mut cache = MemorySeamCache::new();
        (0..3).for_each(|i| cache.put(&key, i, Seam::new(vec![i as u32])));
        cache.put(&key, 1, Seam::new(vec![9]));
        assert_eq!(cache.seams(&key), &[Seam::new(vec![0]), Seam::new(vec![9])]);
        assert!(cache.get(&key, 2).is_none());
    }

    #[test]
    fn gaps_are_not_stored() {
        let key = CacheKey::new("frame-1", Axis::Height);
        let mut cache = MemorySeamCache::new();
        cache.put(&key, 4, Seam::new(vec![1]));
        assert!(cache.seams(&key).is_empty());
    }

    #[test]
    fn axes_are_kept_apart() {
        let mut cache = MemorySeamCache::new();
        cache.put(&CacheKey::new("f", Axis::Width), 0, Seam::new(vec![1]));
        assert!(cache.get(&CacheKey::new("f", Axis::Height), 0).is_none());
    }
}
