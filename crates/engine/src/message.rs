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

//! Message payloads carried through the engine.
//!
//! The engine never inspects the values it routes: positional and named
//! arguments are opaque [`Value`]s (`Arc<dyn Any + Send + Sync>`), so
//! transferring ownership into a payload is an `Arc` clone and releasing it
//! after the last hook has run is an `Arc` drop.

use std::{any::Any, fmt::Debug, sync::Arc};

use bytes::Bytes;
use eventengine_core::{KeyMap, ObjectPool, Recyclable};
use smallvec::SmallVec;

use crate::topic::Topic;

/// An opaque reference-counted argument value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Wraps `v` into a [`Value`].
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

/// Positional arguments for a published message.
#[derive(Clone, Default)]
pub struct Args(SmallVec<[Value; 4]>);

impl Args {
    /// Creates a new empty [`Args`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value.
    pub fn push(&mut self, value: Value) {
        self.0.push(value);
    }

    /// Returns the value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Returns the value at `index` downcast to `T`.
    #[must_use]
    pub fn get_as<T: Any>(&self, index: usize) -> Option<&T> {
        self.0.get(index)?.downcast_ref::<T>()
    }

    /// Returns the number of positional arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no positional arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the values.
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    /// Drops all values.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Args(len={})", self.0.len())
    }
}

/// Named arguments for a published message, iterated in insertion order.
#[derive(Clone, Default)]
pub struct Kwargs(KeyMap<Value>);

impl Kwargs {
    /// Creates a new empty [`Kwargs`] instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `name`, returning any previous value.
    pub fn insert(&mut self, name: &str, value: Value) -> Option<Value> {
        self.0.insert(Bytes::copy_from_slice(name.as_bytes()), value)
    }

    /// Returns the value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name.as_bytes())
    }

    /// Returns the value for `name` downcast to `T`.
    #[must_use]
    pub fn get_as<T: Any>(&self, name: &str) -> Option<&T> {
        self.0.get(name.as_bytes())?.downcast_ref::<T>()
    }

    /// Returns whether `name` is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name.as_bytes())
    }

    /// Removes `name`, returning its value if present.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name.as_bytes())
    }

    /// Returns the number of named arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no named arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over `(name, value)` pairs in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if a key is not valid UTF-8, which cannot happen through the
    /// public API.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0
            .iter()
            .map(|(k, v)| (std::str::from_utf8(k).expect("UTF-8 key"), v))
    }

    /// Drops all values.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Debug for Kwargs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Kwargs(len={})", self.0.len())
    }
}

/// The on-queue message record.
///
/// A payload is owned by exactly one party at a time: the producer while
/// filling, the queue while enqueued, the dispatcher while routing, then the
/// pool. [`Recyclable::recycle`] drops the argument references and detaches
/// the topic before the slot is reused.
#[derive(Debug, Default)]
pub struct Payload {
    topic: Option<Topic>,
    /// Positional arguments transferred into this payload.
    pub args: Args,
    /// Named arguments transferred into this payload.
    pub kwargs: Kwargs,
    /// Monotonic sequence number assigned at publish.
    pub seq_id: u64,
}

impl Payload {
    /// Fills the payload for publication.
    pub fn fill(&mut self, topic: Topic, args: Args, kwargs: Kwargs, seq_id: u64) {
        self.topic = Some(topic);
        self.args = args;
        self.kwargs = kwargs;
        self.seq_id = seq_id;
    }

    /// Returns the payload's topic.
    ///
    /// # Panics
    ///
    /// Panics if the payload has not been filled.
    #[must_use]
    pub fn topic(&self) -> &Topic {
        self.topic.as_ref().expect("payload has no topic")
    }
}

impl Recyclable for Payload {
    fn recycle(&mut self) {
        self.topic = None;
        self.args.clear();
        self.kwargs.clear();
        self.seq_id = 0;
    }
}

/// Pool of reusable [`Payload`] allocations.
pub type PayloadPool = ObjectPool<Payload>;
