//! A pool of reusable bitmap buffers keyed by size and tag.
//!
//! Buffers are handed out as [`PooledBitmap`] values that return their
//! storage to the pool when dropped. A buffer is therefore either checked out
//! or idle, never both, and a bitmap still referenced by a pending draw
//! cannot be recycled underneath it.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use super::Bitmap;
use crate::error::CacheError;

/// What a pooled buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitmapTag {
    Geometry,
    Filters,
    Partial,
    HighRes,
    Scratch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PoolKey {
    width: u32,
    height: u32,
    tag: BitmapTag,
}

#[derive(Debug, Default)]
struct PoolState {
    idle: HashMap<PoolKey, Vec<Vec<u8>>>,
    idle_bytes: usize,
    in_use_bytes: usize,
}

#[derive(Debug)]
struct PoolInner {
    state: Mutex<PoolState>,
    budget: usize,
    max_per_key: usize,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn give_back(&self, key: PoolKey, buffer: Vec<u8>) {
        let bytes = buffer.len();
        let mut state = self.lock();
        state.in_use_bytes = state.in_use_bytes.saturating_sub(bytes);
        let max_per_key = self.max_per_key;
        let slot = state.idle.entry(key).or_default();
        if slot.len() < max_per_key {
            slot.push(buffer);
            state.idle_bytes += bytes;
        }
    }
}

/// Shared handle to a bitmap pool.
#[derive(Debug, Clone)]
pub struct BitmapCache {
    inner: Arc<PoolInner>,
}

impl BitmapCache {
    /// # Arguments
    ///
    /// * `budget` - Total bytes held by the pool, checked out or idle
    /// * `max_per_key` - Idle buffers kept for each size and tag
    pub fn new(budget: usize, max_per_key: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                state: Mutex::new(PoolState::default()),
                budget,
                max_per_key,
            }),
        }
    }

    /// Take a buffer for a `width` x `height` bitmap.
    ///
    /// An idle buffer with the same key is reused as is; its previous
    /// contents are not cleared. Otherwise idle buffers are evicted until the
    /// new one fits the budget.
    ///
    /// # Errors
    ///
    /// `CacheError::Exhausted` when the budget cannot fit the request, and
    /// `CacheError::AllocationFailed` when the allocator refuses.
    pub fn checkout(&self, width: u32, height: u32, tag: BitmapTag) -> Result<PooledBitmap, CacheError> {
        let key = PoolKey { width, height, tag };
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or(CacheError::AllocationFailed { bytes: usize::MAX })?;

        let mut state = self.inner.lock();
        if let Some(buffer) = state.idle.get_mut(&key).and_then(Vec::pop) {
            state.idle_bytes -= bytes;
            state.in_use_bytes += bytes;
            drop(state);
            return Ok(self.wrap(key, buffer));
        }

        while state.idle_bytes + state.in_use_bytes + bytes > self.inner.budget {
            if !evict_one(&mut state) {
                tracing::error!(
                    requested = bytes,
                    budget = self.inner.budget,
                    in_use = state.in_use_bytes,
                    "bitmap cache exhausted"
                );
                return Err(CacheError::Exhausted {
                    requested: bytes,
                    budget: self.inner.budget,
                });
            }
        }

        let mut buffer = Vec::new();
        if buffer.try_reserve_exact(bytes).is_err() {
            tracing::error!(bytes, "bitmap allocation failed");
            return Err(CacheError::AllocationFailed { bytes });
        }
        buffer.resize(bytes, 0);
        state.in_use_bytes += bytes;
        drop(state);

        tracing::trace!(width, height, ?tag, "allocated bitmap buffer");
        Ok(self.wrap(key, buffer))
    }

    fn wrap(&self, key: PoolKey, buffer: Vec<u8>) -> PooledBitmap {
        PooledBitmap {
            bitmap: Bitmap {
                width: key.width,
                height: key.height,
                pixels: buffer,
            },
            key,
            pool: Arc::downgrade(&self.inner),
        }
    }

    /// Drop every idle buffer.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.idle.clear();
        state.idle_bytes = 0;
    }

    pub fn idle_count(&self) -> usize {
        self.inner.lock().idle.values().map(Vec::len).sum()
    }

    pub fn idle_bytes(&self) -> usize {
        self.inner.lock().idle_bytes
    }

    pub fn in_use_bytes(&self) -> usize {
        self.inner.lock().in_use_bytes
    }

    pub fn budget(&self) -> usize {
        self.inner.budget
    }
}

fn evict_one(state: &mut PoolState) -> bool {
    let Some(buffer) = state.idle.values_mut().find_map(Vec::pop) else {
        return false;
    };
    state.idle_bytes -= buffer.len();
    state.idle.retain(|_, buffers| !buffers.is_empty());
    true
}

/// A bitmap whose buffer goes back to its pool on drop.
#[derive(Debug)]
pub struct PooledBitmap {
    bitmap: Bitmap,
    key: PoolKey,
    pool: Weak<PoolInner>,
}

impl PooledBitmap {
    pub fn tag(&self) -> BitmapTag {
        self.key.tag
    }

    /// Copy the pixels into a standalone bitmap.
    pub fn to_bitmap(&self) -> Bitmap {
        self.bitmap.clone()
    }
}

impl Deref for PooledBitmap {
    type Target = Bitmap;

    fn deref(&self) -> &Bitmap {
        &self.bitmap
    }
}

impl DerefMut for PooledBitmap {
    fn deref_mut(&mut self) -> &mut Bitmap {
        &mut self.bitmap
    }
}

impl Drop for PooledBitmap {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.bitmap.pixels);
        if let Some(pool) = self.pool.upgrade() {
            pool.give_back(self.key, buffer);
        }
    }
}
