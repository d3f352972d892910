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

//! A bounded blocking ring queue with hybrid spin/wait operations.
//!
//! The queue is the hand-off point between producer threads and the single
//! dispatcher: a fixed ring of slots guarded by a mutex with `not_empty` and
//! `not_full` condition variables. Three access modes are provided per
//! direction:
//!
//! - `try_*`: non-blocking; fails immediately when full/empty.
//! - `*_wait`: blocks until space/an item is available or the queue closes.
//! - `*_hybrid`: spins up to `max_spin` non-blocking attempts, then falls
//!   back to a (possibly timed) wait. A timeout of `0.0` waits indefinitely;
//!   a negative timeout degrades to a single non-blocking attempt.
//!
//! Items are delivered FIFO across all producers. [`RingQueue::close`] wakes
//! every waiter; pops drain residual items before reporting exhaustion, so no
//! enqueued item is lost on shutdown.

use std::{
    hint,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};

#[derive(Debug)]
struct Ring<T> {
    buf: Vec<Option<T>>,
    head: usize,
    count: usize,
    closed: bool,
}

impl<T> Ring<T> {
    fn push(&mut self, item: T) -> Result<(), T> {
        if self.count == self.buf.len() {
            return Err(item);
        }
        let tail = (self.head + self.count) % self.buf.len();
        self.buf[tail] = Some(item);
        self.count += 1;
        Ok(())
    }

    fn pop(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let item = self.buf[self.head].take();
        self.head = (self.head + 1) % self.buf.len();
        self.count -= 1;
        item
    }
}

/// A bounded FIFO queue shared between producer threads and a consumer.
#[derive(Debug)]
pub struct RingQueue<T> {
    state: Mutex<Ring<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> RingQueue<T> {
    /// Creates a new [`RingQueue`] instance with `capacity` usable slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "`capacity` must be positive");

        let mut buf = Vec::with_capacity(capacity);
        buf.resize_with(capacity, || None);

        Self {
            state: Mutex::new(Ring {
                buf,
                head: 0,
                count: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Returns the number of usable slots.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of items currently enqueued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect("queue lock poisoned").count
    }

    /// Returns whether the queue holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether the queue has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("queue lock poisoned").closed
    }

    /// Closes the queue and wakes every blocked producer and consumer.
    ///
    /// Residual items remain poppable; further pushes fail.
    pub fn close(&self) {
        self.state.lock().expect("queue lock poisoned").closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Reopens a closed queue (for reuse across engine restarts).
    pub fn reopen(&self) {
        self.state.lock().expect("queue lock poisoned").closed = false;
    }

    /// Attempts to enqueue without blocking.
    ///
    /// # Errors
    ///
    /// Returns the rejected item when the queue is full or closed.
    pub fn try_push(&self, item: T) -> Result<(), T> {
        let mut ring = self.state.lock().expect("queue lock poisoned");
        if ring.closed {
            return Err(item);
        }
        ring.push(item)?;
        drop(ring);
        self.not_empty.notify_one();
        Ok(())
    }

    /// Enqueues, blocking until a slot is available.
    ///
    /// # Errors
    ///
    /// Returns the rejected item when the queue is closed before space opens.
    pub fn push_wait(&self, item: T) -> Result<(), T> {
        let mut ring = self.state.lock().expect("queue lock poisoned");
        let mut item = item;
        loop {
            if ring.closed {
                return Err(item);
            }
            match ring.push(item) {
                Ok(()) => {
                    drop(ring);
                    self.not_empty.notify_one();
                    return Ok(());
                }
                Err(rejected) => item = rejected,
            }
            ring = self.not_full.wait(ring).expect("queue lock poisoned");
        }
    }

    /// Enqueues with the hybrid spin-then-wait strategy.
    ///
    /// Spins up to `max_spin` non-blocking attempts, then waits up to
    /// `timeout_s` seconds (`0.0` waits indefinitely; negative means a final
    /// non-blocking attempt only).
    ///
    /// # Errors
    ///
    /// Returns the rejected item on timeout or close.
    pub fn push_hybrid(&self, item: T, max_spin: u32, timeout_s: f64) -> Result<(), T> {
        let mut item = item;
        for _ in 0..max_spin {
            match self.try_push(item) {
                Ok(()) => return Ok(()),
                Err(rejected) => item = rejected,
            }
            if self.is_closed() {
                return Err(item);
            }
            hint::spin_loop();
        }

        if timeout_s < 0.0 {
            return self.try_push(item);
        }
        if timeout_s == 0.0 {
            return self.push_wait(item);
        }

        let deadline = Instant::now() + Duration::from_secs_f64(timeout_s);
        let mut ring = self.state.lock().expect("queue lock poisoned");
        loop {
            if ring.closed {
                return Err(item);
            }
            match ring.push(item) {
                Ok(()) => {
                    drop(ring);
                    self.not_empty.notify_one();
                    return Ok(());
                }
                Err(rejected) => item = rejected,
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(item);
            }
            let (guard, _) = self
                .not_full
                .wait_timeout(ring, deadline - now)
                .expect("queue lock poisoned");
            ring = guard;
        }
    }

    /// Attempts to dequeue without blocking.
    pub fn try_pop(&self) -> Option<T> {
        let mut ring = self.state.lock().expect("queue lock poisoned");
        let item = ring.pop()?;
        drop(ring);
        self.not_full.notify_one();
        Some(item)
    }

    /// Dequeues, blocking until an item arrives.
    ///
    /// Returns `None` only once the queue is closed and drained.
    pub fn pop_wait(&self) -> Option<T> {
        let mut ring = self.state.lock().expect("queue lock poisoned");
        loop {
            if let Some(item) = ring.pop() {
                drop(ring);
                self.not_full.notify_one();
                return Some(item);
            }
            if ring.closed {
                return None;
            }
            ring = self.not_empty.wait(ring).expect("queue lock poisoned");
        }
    }

    /// Dequeues with the hybrid spin-then-wait strategy (see
    /// [`Self::push_hybrid`] for the timeout convention).
    pub fn pop_hybrid(&self, max_spin: u32, timeout_s: f64) -> Option<T> {
        for _ in 0..max_spin {
            if let Some(item) = self.try_pop() {
                return Some(item);
            }
            if self.is_closed() {
                return self.try_pop();
            }
            hint::spin_loop();
        }

        if timeout_s < 0.0 {
            return self.try_pop();
        }
        if timeout_s == 0.0 {
            return self.pop_wait();
        }

        let deadline = Instant::now() + Duration::from_secs_f64(timeout_s);
        let mut ring = self.state.lock().expect("queue lock poisoned");
        loop {
            if let Some(item) = ring.pop() {
                drop(ring);
                self.not_full.notify_one();
                return Some(item);
            }
            if ring.closed {
                return None;
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _) = self
                .not_empty
                .wait_timeout(ring, deadline - now)
                .expect("queue lock poisoned");
            ring = guard;
        }
    }

}
