// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! A fixed-capacity pool of reusable heap allocations.
//!
//! Message payloads are allocated and released once per publish, so the pool
//! keeps up to `capacity` boxed objects on a free list and hands them back out
//! instead of round-tripping the allocator. Exhaustion falls back to a fresh
//! heap allocation rather than failing: the pool bounds reuse, not the number
//! of live objects.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

/// An object that can be returned to an [`ObjectPool`] after use.
pub trait Recyclable: Default + Send {
    /// Clears all state carried from the previous use.
    fn recycle(&mut self);
}

/// A thread-safe fixed-capacity pool of boxed `T`.
#[derive(Debug)]
pub struct ObjectPool<T: Recyclable> {
    free: Mutex<Vec<Box<T>>>,
    capacity: usize,
    active: AtomicBool,
}

impl<T: Recyclable> ObjectPool<T> {
    /// Creates a new [`ObjectPool`] instance holding at most `capacity` free objects.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            active: AtomicBool::new(true),
        }
    }

    /// Returns the maximum number of objects retained on the free list.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of objects currently on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.lock().expect("pool lock poisoned").len()
    }

    /// Returns whether the pool is recycling objects.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Enables or disables recycling. While inactive, [`Self::acquire`]
    /// allocates fresh objects and [`Self::release`] drops them.
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
        if !active {
            self.free.lock().expect("pool lock poisoned").clear();
        }
    }

    /// Takes an object from the free list, or allocates one when the pool is
    /// empty or inactive. Never fails.
    pub fn acquire(&self) -> Box<T> {
        if self.is_active()
            && let Some(obj) = self.free.lock().expect("pool lock poisoned").pop()
        {
            return obj;
        }
        Box::default()
    }

    /// Recycles `obj` back onto the free list, dropping it instead when the
    /// pool is inactive or already holds `capacity` objects.
    pub fn release(&self, mut obj: Box<T>) {
        obj.recycle();

        if !self.is_active() {
            return;
        }

        let mut free = self.free.lock().expect("pool lock poisoned");
        if free.len() < self.capacity {
            free.push(obj);
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[derive(Default)]
    struct Scratch {
        data: Vec<u8>,
    }

    impl Recyclable for Scratch {
        fn recycle(&mut self) {
            self.data.clear();
        }
    }

    #[rstest]
    fn test_acquire_release_reuses_allocation() {
        let pool: ObjectPool<Scratch> = ObjectPool::new(4);

        let mut obj = pool.acquire();
        obj.data.extend_from_slice(b"payload");
        pool.release(obj);
        assert_eq!(pool.free_count(), 1);

        let obj = pool.acquire();
        assert!(obj.data.is_empty(), "recycled object must be cleared");
        assert_eq!(pool.free_count(), 0);
    }

    #[rstest]
    fn test_overflow_is_dropped() {
        let pool: ObjectPool<Scratch> = ObjectPool::new(2);

        let objs: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        for obj in objs {
            pool.release(obj);
        }

        assert_eq!(pool.free_count(), 2);
    }

    #[rstest]
    fn test_exhausted_pool_falls_back_to_heap() {
        let pool: ObjectPool<Scratch> = ObjectPool::new(1);

        // More live objects than capacity is fine
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop((a, b, c));
    }

    #[rstest]
    fn test_inactive_pool_drops_releases() {
        let pool: ObjectPool<Scratch> = ObjectPool::new(4);
        pool.release(pool.acquire());
        assert_eq!(pool.free_count(), 1);

        pool.set_active(false);
        assert_eq!(pool.free_count(), 0);

        pool.release(pool.acquire());
        assert_eq!(pool.free_count(), 0);

        pool.set_active(true);
        pool.release(pool.acquire());
        assert_eq!(pool.free_count(), 1);
    }

    #[rstest]
    fn test_concurrent_acquire_release() {
        use std::sync::Arc;

        let pool: Arc<ObjectPool<Scratch>> = Arc::new(ObjectPool::new(8));
        let mut join_handles = Vec::new();

        for _ in 0..4 {
            let pool = pool.clone();
            join_handles.push(std::thread::spawn(move || {
                for i in 0..1000u32 {
                    let mut obj = pool.acquire();
                    obj.data.extend_from_slice(&i.to_le_bytes());
                    pool.release(obj);
                }
            }));
        }

        for handle in join_handles {
            handle.join().expect("worker panicked");
        }

        assert!(pool.free_count() <= pool.capacity());
    }
}
