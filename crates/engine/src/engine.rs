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

//! The event engine: bounded message queue, background dispatcher, and the
//! exact/generic hook registries.
//!
//! # Dispatch
//!
//! Producers publish exact-topic messages into the bounded queue; the
//! dispatcher thread pops each payload and routes it:
//!
//! 1. O(1) lookup of the payload's topic key in the exact registry.
//! 2. When the generic registry is non-empty, a walk over it in insertion
//!    order testing each hook's pattern against the payload topic.
//! 3. Every matching hook fires; there is no tie-break between generic hooks.
//!
//! Handlers execute on the dispatcher thread; a slow handler stalls dispatch
//! for its duration. The registries are guarded by a single mutex, but hooks
//! are cloned out before triggering, so handlers may themselves register and
//! unregister hooks.
//!
//! # Lifecycle
//!
//! `Constructed → Active → Stopping → Inactive → Cleared`, driven by
//! [`EventEngine::start`], [`EventEngine::stop`], and [`EventEngine::clear`].
//! `clear` requires a non-active engine and is terminal: a cleared engine
//! cannot be restarted. Stopping closes the queue, joins the dispatcher and
//! all timer threads, and returns undispatched payloads to the pool.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    thread,
};

use chrono::{DateTime, Utc};
use eventengine_core::{KeyMap, RingQueue, correctness::check_positive_usize};
use smallvec::SmallVec;
use ustr::Ustr;

use crate::{
    errors::EngineError,
    hook::{EventHook, Hook, SharedHandler},
    message::{Args, Kwargs, Payload, PayloadPool},
    timer::EngineTimers,
    topic::Topic,
};

/// Configuration options for an [`EventEngine`].
#[derive(Clone, Copy, Debug)]
pub struct EngineConfig {
    /// Usable queue slots (also the payload pool size).
    pub capacity: usize,
    /// Spin iterations before hybrid operations fall back to waiting.
    pub max_spin: u32,
    /// Default wait timeout in seconds for blocking operations
    /// (`0.0` waits indefinitely, negative degrades to non-blocking).
    pub timeout_s: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            capacity: 4095,
            max_spin: 65_535,
            timeout_s: 0.0,
        }
    }
}

/// Lifecycle state of an [`EventEngine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineState {
    /// Created, never started.
    Constructed,
    /// Dispatcher running.
    Active,
    /// Shutdown in progress.
    Stopping,
    /// Stopped; may be restarted or cleared.
    Inactive,
    /// Hooks dropped; terminal, the engine cannot be restarted.
    Cleared,
}

pub(crate) struct Registry {
    pub(crate) exact: KeyMap<Arc<dyn EventHook>>,
    pub(crate) generic: KeyMap<Arc<dyn EventHook>>,
}

/// State shared between producers, the dispatcher thread, and timer threads.
pub(crate) struct EngineCore {
    pub(crate) queue: RingQueue<Box<Payload>>,
    pub(crate) pool: PayloadPool,
    pub(crate) registry: Mutex<Registry>,
    pub(crate) seq: AtomicU64,
    pub(crate) dispatched: AtomicU64,
    pub(crate) active: AtomicBool,
    pub(crate) config: EngineConfig,
}

impl EngineCore {
    pub(crate) fn publish(
        &self,
        topic: &Topic,
        args: Args,
        kwargs: Kwargs,
        block: bool,
        timeout_s: f64,
    ) -> Result<u64, EngineError> {
        topic.require_exact()?;

        let seq_id = self.seq.fetch_add(1, Ordering::AcqRel) + 1;
        let mut payload = self.pool.acquire();
        payload.fill(topic.clone(), args, kwargs, seq_id);

        let outcome = if block {
            self.queue
                .push_hybrid(payload, self.config.max_spin, timeout_s)
        } else {
            self.queue.try_push(payload)
        };

        match outcome {
            Ok(()) => Ok(seq_id),
            Err(payload) => {
                self.pool.release(payload);
                Err(EngineError::QueueFull)
            }
        }
    }

    fn dispatch(&self, payload: Box<Payload>) {
        let topic = payload.topic();
        let mut matched: SmallVec<[Arc<dyn EventHook>; 8]> = SmallVec::new();

        {
            let registry = self.registry.lock().expect("registry lock poisoned");
            if let Some(hook) = registry.exact.get(topic.key()) {
                matched.push(hook.clone());
            }
            if !registry.generic.is_empty() {
                for (_, hook) in registry.generic.iter() {
                    if hook.topic().match_target(topic).matched() {
                        matched.push(hook.clone());
                    }
                }
            }
        }

        for hook in &matched {
            hook.trigger(&payload);
        }

        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.pool.release(payload);
    }

    pub(crate) fn dispatch_loop(&self) {
        while self.active.load(Ordering::Acquire) {
            if let Some(payload) = self
                .queue
                .pop_hybrid(self.config.max_spin, self.config.timeout_s)
            {
                self.dispatch(payload);
            }
        }
    }
}

/// An in-process, topic-routed publish/subscribe event engine.
pub struct EventEngine {
    core: Arc<EngineCore>,
    timers: EngineTimers,
    dispatcher: Mutex<Option<thread::JoinHandle<()>>>,
    state: Mutex<EngineState>,
}

impl EventEngine {
    /// Creates a new [`EventEngine`] instance with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Creates a new [`EventEngine`] instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_config(config: EngineConfig) -> anyhow::Result<Self> {
        check_positive_usize(config.capacity, stringify!(config.capacity))?;

        let core = Arc::new(EngineCore {
            queue: RingQueue::new(config.capacity),
            pool: PayloadPool::new(config.capacity),
            registry: Mutex::new(Registry {
                exact: KeyMap::new(),
                generic: KeyMap::new(),
            }),
            seq: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            active: AtomicBool::new(false),
            config,
        });

        Ok(Self {
            timers: EngineTimers::new(core.clone()),
            core,
            dispatcher: Mutex::new(None),
            state: Mutex::new(EngineState::Constructed),
        })
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state.lock().expect("state lock poisoned")
    }

    /// Returns whether the dispatcher is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.core.active.load(Ordering::Acquire)
    }

    /// Spawns the background dispatcher thread.
    ///
    /// Starting an already-active engine is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the engine has been cleared, or if the
    /// dispatcher thread cannot be spawned.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().expect("state lock poisoned");
        match *state {
            EngineState::Active | EngineState::Stopping => {
                log::warn!("Engine already active, start ignored");
                return Ok(());
            }
            EngineState::Cleared => {
                return Err(EngineError::Lifecycle(
                    "start requires a constructed or inactive engine, state was Cleared"
                        .to_string(),
                ));
            }
            EngineState::Constructed | EngineState::Inactive => {}
        }

        self.core.queue.reopen();
        self.core.active.store(true, Ordering::Release);

        let core = self.core.clone();
        let handle = thread::Builder::new()
            .name("event-dispatcher".to_string())
            .spawn(move || core.dispatch_loop())
            .map_err(|e| {
                self.core.active.store(false, Ordering::Release);
                EngineError::Lifecycle(format!("failed to spawn dispatcher: {e}"))
            })?;

        *self.dispatcher.lock().expect("dispatcher lock poisoned") = Some(handle);
        *state = EngineState::Active;
        log::info!("Engine started");
        Ok(())
    }

    /// Signals shutdown, joins the dispatcher and all timer threads, and
    /// returns undispatched payloads to the pool.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the engine is not active.
    pub fn stop(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            if *state != EngineState::Active {
                return Err(EngineError::Lifecycle(format!(
                    "stop requires an active engine, state was {:?}",
                    *state
                )));
            }
            *state = EngineState::Stopping;
        }

        self.core.active.store(false, Ordering::Release);
        self.core.queue.close();

        if let Some(handle) = self
            .dispatcher
            .lock()
            .expect("dispatcher lock poisoned")
            .take()
            && handle.join().is_err()
        {
            log::error!("Dispatcher thread panicked");
        }

        self.timers.stop();

        while let Some(payload) = self.core.queue.try_pop() {
            self.core.pool.release(payload);
        }

        *self.state.lock().expect("state lock poisoned") = EngineState::Inactive;
        log::info!("Engine stopped");
        Ok(())
    }

    /// Runs the dispatch loop on the calling thread until [`Self::stop`] is
    /// invoked from another thread.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the engine is already active.
    pub fn run(&self) -> Result<(), EngineError> {
        {
            let mut state = self.state.lock().expect("state lock poisoned");
            match *state {
                EngineState::Constructed | EngineState::Inactive => {}
                _ => {
                    return Err(EngineError::Lifecycle(format!(
                        "run requires a stopped engine, state was {:?}",
                        *state
                    )));
                }
            }
            self.core.queue.reopen();
            self.core.active.store(true, Ordering::Release);
            *state = EngineState::Active;
            log::info!("Engine running on caller thread");
        }

        self.core.dispatch_loop();
        Ok(())
    }

    /// Publishes a message with an exact `topic`.
    ///
    /// Ownership of `args` and `kwargs` transfers to the payload; the
    /// references are dropped after the last matching hook has run.
    ///
    /// Returns the assigned sequence ID.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Topic`] when `topic` is not exact.
    /// - [`EngineError::QueueFull`] when the queue rejects the payload.
    pub fn publish(
        &self,
        topic: &Topic,
        args: Args,
        kwargs: Kwargs,
        block: bool,
        timeout_s: f64,
    ) -> Result<u64, EngineError> {
        self.core.publish(topic, args, kwargs, block, timeout_s)
    }

    /// Convenience publish: interns `topic` and enqueues with the engine's
    /// default blocking mode.
    ///
    /// # Errors
    ///
    /// As [`Self::publish`], plus [`EngineError::Topic`] on a malformed
    /// topic string.
    pub fn put(&self, topic: &str, args: Args, kwargs: Kwargs) -> Result<u64, EngineError> {
        let topic = Topic::intern(topic)?;
        self.core
            .publish(&topic, args, kwargs, true, self.core.config.timeout_s)
    }

    /// Pops a payload from the queue, primarily for pull consumers and tests.
    ///
    /// The payload should be handed back via [`Self::release`] once consumed.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::QueueEmpty`] when nothing is available.
    pub fn get(&self, block: bool, timeout_s: f64) -> Result<Box<Payload>, EngineError> {
        let popped = if block {
            self.core
                .queue
                .pop_hybrid(self.core.config.max_spin, timeout_s)
        } else {
            self.core.queue.try_pop()
        };
        popped.ok_or(EngineError::QueueEmpty)
    }

    /// Returns a consumed payload to the pool.
    pub fn release(&self, payload: Box<Payload>) {
        self.core.pool.release(payload);
    }

    /// Registers `hook` under its topic key.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRegistered`] when another hook occupies
    /// the key.
    pub fn register_hook<H: EventHook>(&self, hook: H) -> Result<(), EngineError> {
        self.register_hook_arc(Arc::new(hook))
    }

    /// Registers a shared `hook` under its topic key.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyRegistered`] when another hook occupies
    /// the key.
    pub fn register_hook_arc(&self, hook: Arc<dyn EventHook>) -> Result<(), EngineError> {
        let topic = hook.topic().clone();
        let mut registry = self.core.registry.lock().expect("registry lock poisoned");
        let map = if topic.is_exact() {
            &mut registry.exact
        } else {
            &mut registry.generic
        };

        if map.contains_key(topic.key()) {
            return Err(EngineError::AlreadyRegistered(Ustr::from(topic.literal())));
        }
        map.insert(topic.key().clone(), hook);
        log::debug!("Registered hook for topic '{topic}'");
        Ok(())
    }

    /// Removes and returns the hook bound to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when no hook is bound.
    pub fn unregister_hook(&self, topic: &Topic) -> Result<Arc<dyn EventHook>, EngineError> {
        let mut registry = self.core.registry.lock().expect("registry lock poisoned");
        let map = if topic.is_exact() {
            &mut registry.exact
        } else {
            &mut registry.generic
        };

        let hook = map
            .remove(topic.key())
            .ok_or_else(|| EngineError::NotFound(Ustr::from(topic.literal())))?;
        log::debug!("Unregistered hook for topic '{topic}'");
        Ok(hook)
    }

    /// Registers a plain handler, creating the hook on demand.
    ///
    /// Returns `false` when skipped as a duplicate.
    pub fn register_handler(
        &self,
        topic: &Topic,
        handler: SharedHandler,
        deduplicate: bool,
    ) -> bool {
        self.hook_on_demand(topic).add_handler(handler, deduplicate)
    }

    /// Registers a topic-aware handler, creating the hook on demand.
    ///
    /// Returns `false` when skipped as a duplicate.
    pub fn register_topic_handler(
        &self,
        topic: &Topic,
        handler: SharedHandler,
        deduplicate: bool,
    ) -> bool {
        self.hook_on_demand(topic)
            .add_topic_handler(handler, deduplicate)
    }

    /// Removes a handler from the hook bound to `topic`, dropping the hook
    /// once it has no handlers left. Removing an absent handler is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] when no hook is bound to `topic`.
    pub fn unregister_handler(&self, topic: &Topic, id: Ustr) -> Result<(), EngineError> {
        let hook = self
            .hook(topic)
            .ok_or_else(|| EngineError::NotFound(Ustr::from(topic.literal())))?;

        hook.remove_handler(id);

        if hook.is_empty() {
            let mut registry = self.core.registry.lock().expect("registry lock poisoned");
            let map = if topic.is_exact() {
                &mut registry.exact
            } else {
                &mut registry.generic
            };
            map.remove(topic.key());
            log::debug!("Dropped empty hook for topic '{topic}'");
        }
        Ok(())
    }

    /// Returns the hook bound to `topic`, if any.
    #[must_use]
    pub fn hook(&self, topic: &Topic) -> Option<Arc<dyn EventHook>> {
        let registry = self.core.registry.lock().expect("registry lock poisoned");
        let map = if topic.is_exact() {
            &registry.exact
        } else {
            &registry.generic
        };
        map.get(topic.key()).cloned()
    }

    fn hook_on_demand(&self, topic: &Topic) -> Arc<dyn EventHook> {
        let mut registry = self.core.registry.lock().expect("registry lock poisoned");
        let map = if topic.is_exact() {
            &mut registry.exact
        } else {
            &mut registry.generic
        };

        if let Some(hook) = map.get(topic.key()) {
            return hook.clone();
        }
        let hook: Arc<dyn EventHook> = Arc::new(Hook::new(topic.clone()));
        map.insert(topic.key().clone(), hook.clone());
        log::debug!("Created hook for topic '{topic}'");
        hook
    }

    /// Drops all hooks and stops all timers.
    ///
    /// Clearing is terminal: the engine transitions to
    /// [`EngineState::Cleared`] and can no longer be started.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error when the engine is active.
    pub fn clear(&self) -> Result<(), EngineError> {
        {
            let state = self.state.lock().expect("state lock poisoned");
            if matches!(*state, EngineState::Active | EngineState::Stopping) {
                return Err(EngineError::Lifecycle(
                    "clear requires a stopped engine".to_string(),
                ));
            }
        }

        self.timers.stop();

        {
            let mut registry = self.core.registry.lock().expect("registry lock poisoned");
            registry.exact.clear();
            registry.generic.clear();
        }

        *self.state.lock().expect("state lock poisoned") = EngineState::Cleared;
        log::debug!("Engine cleared");
        Ok(())
    }

    /// Returns all registered topics: exact first, then generic, each in
    /// insertion order.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        let registry = self.core.registry.lock().expect("registry lock poisoned");
        registry
            .exact
            .values()
            .chain(registry.generic.values())
            .map(|hook| hook.topic().clone())
            .collect()
    }

    /// Returns all registered hooks: exact first, then generic, each in
    /// insertion order.
    #[must_use]
    pub fn hooks(&self) -> Vec<Arc<dyn EventHook>> {
        let registry = self.core.registry.lock().expect("registry lock poisoned");
        registry
            .exact
            .values()
            .chain(registry.generic.values())
            .cloned()
            .collect()
    }

    /// Returns `(topic, hook)` pairs: exact first, then generic, each in
    /// insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<(Topic, Arc<dyn EventHook>)> {
        let registry = self.core.registry.lock().expect("registry lock poisoned");
        registry
            .exact
            .values()
            .chain(registry.generic.values())
            .map(|hook| (hook.topic().clone(), hook.clone()))
            .collect()
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn hook_count(&self) -> usize {
        let registry = self.core.registry.lock().expect("registry lock poisoned");
        registry.exact.len() + registry.generic.len()
    }

    /// Returns the last assigned sequence ID.
    #[must_use]
    pub fn seq_id(&self) -> u64 {
        self.core.seq.load(Ordering::Acquire)
    }

    /// Returns the number of payloads dispatched so far.
    #[must_use]
    pub fn dispatched_count(&self) -> u64 {
        self.core.dispatched.load(Ordering::Relaxed)
    }

    /// Returns the number of messages waiting in the queue.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.core.queue.len()
    }

    /// Returns the queue capacity.
    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.core.queue.capacity()
    }

    /// Starts (or returns) the periodic timer for `interval_s` and returns
    /// its topic.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval_s` is not a positive, finite number of
    /// seconds.
    pub fn get_timer(
        &self,
        interval_s: f64,
        activate_time: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Topic> {
        self.timers.get_timer(interval_s, activate_time)
    }
}

impl Drop for EventEngine {
    fn drop(&mut self) {
        if self.state() == EngineState::Active {
            let _ = self.stop();
        } else {
            self.timers.stop();
        }
    }
}

impl std::fmt::Debug for EventEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(EventEngine))
            .field("state", &self.state())
            .field("hooks", &self.hook_count())
            .field("queue_len", &self.queue_len())
            .finish()
    }
}
