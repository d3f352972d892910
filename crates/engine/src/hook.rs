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

//! Hooks bind one registered topic to its ordered handlers.
//!
//! Handlers are classified at registration time into two invocation
//! conventions: plain handlers receive only the message arguments, while
//! topic-aware handlers additionally receive the published topic. A trigger
//! runs every plain handler in insertion order, then every topic-aware
//! handler in insertion order.
//!
//! Every invocation is fault-isolated: panics are caught and logged together
//! with `Err` results, and dispatch continues with the next handler. A
//! topic-aware handler that rejects the topic binding with
//! [`HandlerError::UnexpectedTopic`] is retried once without it when the hook
//! is configured with `retry_on_unexpected_topic`. The policy is off by
//! default: if the handler's own inner logic is what produced the error, the
//! retry executes that logic a second time.

use std::{
    fmt::Debug,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex},
    time::Instant,
};

use ahash::AHashMap;
use ustr::Ustr;

use crate::{
    errors::{HandlerError, HandlerResult},
    message::{Args, Kwargs, Payload},
    topic::Topic,
};

/// A callable invoked when a matching message is dispatched.
///
/// Identity is the `id`: equality, deduplication, and removal all compare
/// handler IDs, never function pointers.
pub trait EventHandler: Send + Sync + 'static {
    /// Returns the unique identifier for this handler.
    fn id(&self) -> Ustr;

    /// Handles a message.
    ///
    /// `topic` is `Some` only for the topic-aware invocation convention.
    ///
    /// # Errors
    ///
    /// Returns an error to report a recoverable fault; the hook logs it and
    /// continues with the next handler.
    fn handle(&self, topic: Option<&Topic>, args: &Args, kwargs: &Kwargs) -> HandlerResult;
}

/// A shareable, reference-counted handler.
pub struct SharedHandler(pub Arc<dyn EventHandler>);

impl SharedHandler {
    /// Creates a new shared handler from any [`EventHandler`].
    pub fn new<H: EventHandler>(handler: H) -> Self {
        Self(Arc::new(handler))
    }

    /// Creates a handler from a closure that ignores the topic binding.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(&Args, &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        let id = generate_handler_id(&callback);
        Self::new(CallbackHandler { id, callback })
    }

    /// Creates a handler from a closure with a caller-chosen ID.
    pub fn from_fn_with_id<S, F>(id: S, callback: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(&Args, &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(CallbackHandler {
            id: Ustr::from(id.as_ref()),
            callback,
        })
    }

    /// Creates a topic-aware handler from a closure.
    pub fn from_topic_fn<F>(callback: F) -> Self
    where
        F: Fn(Option<&Topic>, &Args, &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        let id = generate_handler_id(&callback);
        Self::new(TopicCallbackHandler { id, callback })
    }

    /// Creates a topic-aware handler from a closure with a caller-chosen ID.
    pub fn from_topic_fn_with_id<S, F>(id: S, callback: F) -> Self
    where
        S: AsRef<str>,
        F: Fn(Option<&Topic>, &Args, &Kwargs) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(TopicCallbackHandler {
            id: Ustr::from(id.as_ref()),
            callback,
        })
    }

    /// Returns the handler ID.
    #[must_use]
    pub fn id(&self) -> Ustr {
        self.0.id()
    }

    /// Invokes the handler.
    ///
    /// # Errors
    ///
    /// Propagates the handler's own error; fault isolation happens in the
    /// hook, not here.
    pub fn handle(&self, topic: Option<&Topic>, args: &Args, kwargs: &Kwargs) -> HandlerResult {
        self.0.handle(topic, args, kwargs)
    }
}

impl Clone for SharedHandler {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl Debug for SharedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(SharedHandler))
            .field("id", &self.0.id())
            .finish()
    }
}

impl PartialEq for SharedHandler {
    fn eq(&self, other: &Self) -> bool {
        self.0.id() == other.0.id()
    }
}

impl Eq for SharedHandler {}

impl std::hash::Hash for SharedHandler {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id().hash(state);
    }
}

struct CallbackHandler<F> {
    id: Ustr,
    callback: F,
}

impl<F> EventHandler for CallbackHandler<F>
where
    F: Fn(&Args, &Kwargs) -> HandlerResult + Send + Sync + 'static,
{
    fn id(&self) -> Ustr {
        self.id
    }

    fn handle(&self, _topic: Option<&Topic>, args: &Args, kwargs: &Kwargs) -> HandlerResult {
        (self.callback)(args, kwargs)
    }
}

struct TopicCallbackHandler<F> {
    id: Ustr,
    callback: F,
}

impl<F> EventHandler for TopicCallbackHandler<F>
where
    F: Fn(Option<&Topic>, &Args, &Kwargs) -> HandlerResult + Send + Sync + 'static,
{
    fn id(&self) -> Ustr {
        self.id
    }

    fn handle(&self, topic: Option<&Topic>, args: &Args, kwargs: &Kwargs) -> HandlerResult {
        (self.callback)(topic, args, kwargs)
    }
}

fn generate_handler_id<F>(callback: &F) -> Ustr {
    let callback_ptr = std::ptr::from_ref(callback);
    let uuid = uuid::Uuid::new_v4();
    Ustr::from(&format!("<{callback_ptr:?}>-{uuid}"))
}

/// Per-handler invocation statistics maintained by [`HookEx`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HookStats {
    /// Number of completed invocations.
    pub calls: u64,
    /// Accumulated wall time across invocations, in seconds.
    pub total_time_s: f64,
}

/// Configuration options for a [`Hook`].
#[derive(Clone, Copy, Debug, Default)]
pub struct HookConfig {
    /// Retry a topic-aware invocation without the topic binding when the
    /// handler reports [`HandlerError::UnexpectedTopic`].
    pub retry_on_unexpected_topic: bool,
}

/// The binding from one registered topic to its ordered handlers.
pub trait EventHook: Send + Sync + std::fmt::Debug + 'static {
    /// Returns the registered topic.
    fn topic(&self) -> &Topic;

    /// Appends a plain handler; returns `false` when skipped as a duplicate.
    fn add_handler(&self, handler: SharedHandler, deduplicate: bool) -> bool;

    /// Appends a topic-aware handler; returns `false` when skipped as a duplicate.
    fn add_topic_handler(&self, handler: SharedHandler, deduplicate: bool) -> bool;

    /// Removes the first occurrence of the handler from either list;
    /// returns `false` (without error) when absent.
    fn remove_handler(&self, id: Ustr) -> bool;

    /// Drops all handlers.
    fn clear(&self);

    /// Returns whether the hook has no handlers.
    fn is_empty(&self) -> bool;

    /// Returns the total number of registered handlers.
    fn handler_count(&self) -> usize;

    /// Invokes all handlers for `payload` with fault isolation.
    fn trigger(&self, payload: &Payload);

    /// Returns the stats for a handler, when the hook tracks them.
    fn stats(&self, id: Ustr) -> Option<HookStats> {
        let _ = id;
        None
    }
}

#[derive(Default)]
struct HandlerLists {
    no_topic: Vec<SharedHandler>,
    with_topic: Vec<SharedHandler>,
}

impl HandlerLists {
    fn contains(&self, id: Ustr) -> bool {
        self.no_topic.iter().chain(&self.with_topic).any(|h| h.id() == id)
    }
}

/// An ordered list of handlers for one topic.
pub struct Hook {
    topic: Topic,
    config: HookConfig,
    lists: Mutex<HandlerLists>,
}

impl Hook {
    /// Creates a new [`Hook`] instance with default configuration.
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self::with_config(topic, HookConfig::default())
    }

    /// Creates a new [`Hook`] instance.
    #[must_use]
    pub fn with_config(topic: Topic, config: HookConfig) -> Self {
        Self {
            topic,
            config,
            lists: Mutex::new(HandlerLists::default()),
        }
    }

    fn add_to_list(&self, handler: SharedHandler, deduplicate: bool, with_topic: bool) -> bool {
        let mut lists = self.lists.lock().expect("hook lock poisoned");

        if lists.contains(handler.id()) {
            if deduplicate {
                log::debug!(
                    "Handler '{}' already registered for topic '{}', skipping",
                    handler.id(),
                    self.topic
                );
                return false;
            }
            log::warn!(
                "Handler '{}' registered again for topic '{}', it will fire once per registration",
                handler.id(),
                self.topic
            );
        }

        if with_topic {
            lists.with_topic.push(handler);
        } else {
            lists.no_topic.push(handler);
        }
        true
    }

    /// Invokes all handlers, reporting per-invocation wall time to `observer`.
    fn trigger_observed(&self, payload: &Payload, observer: Option<&dyn Fn(Ustr, f64)>) {
        // Snapshot so a handler may mutate this hook's lists mid-dispatch
        let (no_topic, with_topic) = {
            let lists = self.lists.lock().expect("hook lock poisoned");
            (lists.no_topic.clone(), lists.with_topic.clone())
        };

        for handler in &no_topic {
            self.invoke(handler, None, payload, observer);
        }
        for handler in &with_topic {
            self.invoke(handler, Some(payload.topic()), payload, observer);
        }
    }

    fn invoke(
        &self,
        handler: &SharedHandler,
        topic: Option<&Topic>,
        payload: &Payload,
        observer: Option<&dyn Fn(Ustr, f64)>,
    ) {
        let started = Instant::now();

        let result = catch_unwind(AssertUnwindSafe(|| {
            handler.handle(topic, &payload.args, &payload.kwargs)
        }));

        match result {
            Ok(Ok(())) => {}
            Ok(Err(HandlerError::UnexpectedTopic))
                if topic.is_some() && self.config.retry_on_unexpected_topic =>
            {
                log::debug!(
                    "Handler '{}' rejected the `topic` binding, retrying without it",
                    handler.id()
                );
                let retry = catch_unwind(AssertUnwindSafe(|| {
                    handler.handle(None, &payload.args, &payload.kwargs)
                }));
                match retry {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => self.log_fault(handler, &e.to_string()),
                    Err(panic) => self.log_fault(handler, &panic_message(panic.as_ref())),
                }
            }
            Ok(Err(e)) => self.log_fault(handler, &e.to_string()),
            Err(panic) => self.log_fault(handler, &panic_message(panic.as_ref())),
        }

        if let Some(observer) = observer {
            observer(handler.id(), started.elapsed().as_secs_f64());
        }
    }

    fn log_fault(&self, handler: &SharedHandler, fault: &str) {
        log::error!(
            "Handler '{}' failed for topic '{}': {fault}",
            handler.id(),
            self.topic
        );
    }
}

impl EventHook for Hook {
    fn topic(&self) -> &Topic {
        &self.topic
    }

    fn add_handler(&self, handler: SharedHandler, deduplicate: bool) -> bool {
        self.add_to_list(handler, deduplicate, false)
    }

    fn add_topic_handler(&self, handler: SharedHandler, deduplicate: bool) -> bool {
        self.add_to_list(handler, deduplicate, true)
    }

    fn remove_handler(&self, id: Ustr) -> bool {
        let mut lists = self.lists.lock().expect("hook lock poisoned");
        if let Some(idx) = lists.no_topic.iter().position(|h| h.id() == id) {
            lists.no_topic.remove(idx);
            return true;
        }
        if let Some(idx) = lists.with_topic.iter().position(|h| h.id() == id) {
            lists.with_topic.remove(idx);
            return true;
        }
        false
    }

    fn clear(&self) {
        let mut lists = self.lists.lock().expect("hook lock poisoned");
        lists.no_topic.clear();
        lists.with_topic.clear();
    }

    fn is_empty(&self) -> bool {
        self.handler_count() == 0
    }

    fn handler_count(&self) -> usize {
        let lists = self.lists.lock().expect("hook lock poisoned");
        lists.no_topic.len() + lists.with_topic.len()
    }

    fn trigger(&self, payload: &Payload) {
        self.trigger_observed(payload, None);
    }
}

impl Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(Hook))
            .field("topic", &self.topic.literal())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// A [`Hook`] that additionally tracks per-handler invocation statistics.
///
/// Registration and removal maintain the stats map in parallel with the
/// handler lists; triggering times each invocation with a monotonic clock.
pub struct HookEx {
    inner: Hook,
    stats: Mutex<AHashMap<Ustr, HookStats>>,
}

impl HookEx {
    /// Creates a new [`HookEx`] instance with default configuration.
    #[must_use]
    pub fn new(topic: Topic) -> Self {
        Self::with_config(topic, HookConfig::default())
    }

    /// Creates a new [`HookEx`] instance.
    #[must_use]
    pub fn with_config(topic: Topic, config: HookConfig) -> Self {
        Self {
            inner: Hook::with_config(topic, config),
            stats: Mutex::new(AHashMap::new()),
        }
    }

    /// Returns a snapshot of all per-handler stats.
    #[must_use]
    pub fn all_stats(&self) -> Vec<(Ustr, HookStats)> {
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .iter()
            .map(|(id, stats)| (*id, *stats))
            .collect()
    }
}

impl EventHook for HookEx {
    fn topic(&self) -> &Topic {
        self.inner.topic()
    }

    fn add_handler(&self, handler: SharedHandler, deduplicate: bool) -> bool {
        let id = handler.id();
        if self.inner.add_handler(handler, deduplicate) {
            self.stats
                .lock()
                .expect("stats lock poisoned")
                .entry(id)
                .or_default();
            return true;
        }
        false
    }

    fn add_topic_handler(&self, handler: SharedHandler, deduplicate: bool) -> bool {
        let id = handler.id();
        if self.inner.add_topic_handler(handler, deduplicate) {
            self.stats
                .lock()
                .expect("stats lock poisoned")
                .entry(id)
                .or_default();
            return true;
        }
        false
    }

    fn remove_handler(&self, id: Ustr) -> bool {
        let removed = self.inner.remove_handler(id);
        if removed && !self.inner.lists.lock().expect("hook lock poisoned").contains(id) {
            self.stats.lock().expect("stats lock poisoned").remove(&id);
        }
        removed
    }

    fn clear(&self) {
        self.inner.clear();
        self.stats.lock().expect("stats lock poisoned").clear();
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn handler_count(&self) -> usize {
        self.inner.handler_count()
    }

    fn trigger(&self, payload: &Payload) {
        self.inner.trigger_observed(
            payload,
            Some(&|id, elapsed_s| {
                let mut stats = self.stats.lock().expect("stats lock poisoned");
                let entry = stats.entry(id).or_default();
                entry.calls += 1;
                entry.total_time_s += elapsed_s;
            }),
        );
    }

    fn stats(&self, id: Ustr) -> Option<HookStats> {
        self.stats
            .lock()
            .expect("stats lock poisoned")
            .get(&id)
            .copied()
    }
}

impl Debug for HookEx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(HookEx))
            .field("topic", &self.inner.topic.literal())
            .field("handlers", &self.inner.handler_count())
            .finish()
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use rstest::rstest;

    use super::*;

    fn payload_for(topic: &str) -> Payload {
        let mut payload = Payload::default();
        payload.fill(
            Topic::parse(topic).unwrap(),
            Args::new(),
            Kwargs::new(),
            1,
        );
        payload
    }

    fn recording_handler(id: &str, record: Arc<Mutex<Vec<String>>>) -> SharedHandler {
        let tag = id.to_string();
        SharedHandler::from_fn_with_id(id, move |_args, _kwargs| {
            record.lock().unwrap().push(tag.clone());
            Ok(())
        })
    }

    #[rstest]
    fn test_trigger_order_no_topic_then_with_topic() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        // Interleave registrations across the two conventions
        hook.add_topic_handler(
            {
                let record = record.clone();
                SharedHandler::from_topic_fn_with_id("t1", move |topic, _args, _kwargs| {
                    assert_eq!(topic.unwrap().literal(), "A.B");
                    record.lock().unwrap().push("t1".to_string());
                    Ok(())
                })
            },
            false,
        );
        hook.add_handler(recording_handler("n1", record.clone()), false);
        hook.add_handler(recording_handler("n2", record.clone()), false);
        hook.add_topic_handler(
            {
                let record = record.clone();
                SharedHandler::from_topic_fn_with_id("t2", move |_topic, _args, _kwargs| {
                    record.lock().unwrap().push("t2".to_string());
                    Ok(())
                })
            },
            false,
        );

        hook.trigger(&payload_for("A.B"));
        assert_eq!(*record.lock().unwrap(), vec!["n1", "n2", "t1", "t2"]);
    }

    #[rstest]
    fn test_deduplicate_skips_existing() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        assert!(hook.add_handler(recording_handler("h", record.clone()), true));
        assert!(!hook.add_handler(recording_handler("h", record.clone()), true));
        assert_eq!(hook.handler_count(), 1);

        hook.trigger(&payload_for("A.B"));
        assert_eq!(record.lock().unwrap().len(), 1);
    }

    #[rstest]
    fn test_duplicate_without_dedup_fires_twice() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        assert!(hook.add_handler(recording_handler("h", record.clone()), false));
        assert!(hook.add_handler(recording_handler("h", record.clone()), false));
        assert_eq!(hook.handler_count(), 2);

        hook.trigger(&payload_for("A.B"));
        assert_eq!(record.lock().unwrap().len(), 2);
    }

    #[rstest]
    fn test_remove_handler_first_occurrence() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        hook.add_handler(recording_handler("h", record.clone()), false);
        hook.add_handler(recording_handler("h", record.clone()), false);

        assert!(hook.remove_handler(Ustr::from("h")));
        assert_eq!(hook.handler_count(), 1);

        // Absent handler removal is a no-op
        assert!(!hook.remove_handler(Ustr::from("missing")));
    }

    #[rstest]
    fn test_panicking_handler_does_not_stop_dispatch() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        hook.add_handler(
            SharedHandler::from_fn_with_id("boom", |_args, _kwargs| panic!("handler exploded")),
            false,
        );
        hook.add_handler(recording_handler("after", record.clone()), false);

        hook.trigger(&payload_for("A.B"));
        assert_eq!(*record.lock().unwrap(), vec!["after"]);
    }

    #[rstest]
    fn test_failing_handler_does_not_stop_dispatch() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        hook.add_handler(
            SharedHandler::from_fn_with_id("bad", |_args, _kwargs| {
                Err(HandlerError::failure("downstream unavailable"))
            }),
            false,
        );
        hook.add_handler(recording_handler("after", record.clone()), false);

        hook.trigger(&payload_for("A.B"));
        assert_eq!(*record.lock().unwrap(), vec!["after"]);
    }

    #[rstest]
    fn test_retry_without_topic_when_enabled() {
        let calls = Arc::new(AtomicU32::new(0));
        let hook = Hook::with_config(
            Topic::parse("A.B").unwrap(),
            HookConfig {
                retry_on_unexpected_topic: true,
            },
        );

        let counter = calls.clone();
        hook.add_topic_handler(
            SharedHandler::from_topic_fn_with_id("picky", move |topic, _args, _kwargs| {
                counter.fetch_add(1, Ordering::SeqCst);
                if topic.is_some() {
                    Err(HandlerError::UnexpectedTopic)
                } else {
                    Ok(())
                }
            }),
            false,
        );

        hook.trigger(&payload_for("A.B"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn test_no_retry_by_default() {
        let calls = Arc::new(AtomicU32::new(0));
        let hook = Hook::new(Topic::parse("A.B").unwrap());

        let counter = calls.clone();
        hook.add_topic_handler(
            SharedHandler::from_topic_fn_with_id("picky", move |_topic, _args, _kwargs| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(HandlerError::UnexpectedTopic)
            }),
            false,
        );

        hook.trigger(&payload_for("A.B"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn test_retry_runs_inner_logic_twice() {
        // The documented footgun: a handler whose inner logic raises the
        // unexpected-topic error executes twice under the retry policy.
        let calls = Arc::new(AtomicU32::new(0));
        let hook = Hook::with_config(
            Topic::parse("A.B").unwrap(),
            HookConfig {
                retry_on_unexpected_topic: true,
            },
        );

        let counter = calls.clone();
        hook.add_topic_handler(
            SharedHandler::from_topic_fn_with_id("inner-raiser", move |_topic, _args, _kwargs| {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(HandlerError::UnexpectedTopic)
            }),
            false,
        );

        hook.trigger(&payload_for("A.B"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    fn test_handler_may_remove_itself_mid_dispatch() {
        let hook = Arc::new(Hook::new(Topic::parse("A.B").unwrap()));

        let hook_ref = hook.clone();
        hook.add_handler(
            SharedHandler::from_fn_with_id("self-removing", move |_args, _kwargs| {
                hook_ref.remove_handler(Ustr::from("self-removing"));
                Ok(())
            }),
            false,
        );

        hook.trigger(&payload_for("A.B"));
        assert!(hook.is_empty());
    }

    #[rstest]
    fn test_hook_ex_tracks_stats() {
        let hook = HookEx::new(Topic::parse("A.B").unwrap());
        hook.add_handler(
            SharedHandler::from_fn_with_id("timed", |_args, _kwargs| {
                std::thread::sleep(std::time::Duration::from_millis(2));
                Ok(())
            }),
            false,
        );

        let payload = payload_for("A.B");
        hook.trigger(&payload);
        hook.trigger(&payload);

        let stats = hook.stats(Ustr::from("timed")).unwrap();
        assert_eq!(stats.calls, 2);
        assert!(stats.total_time_s >= 0.004);
    }

    #[rstest]
    fn test_hook_ex_removal_drops_stats() {
        let hook = HookEx::new(Topic::parse("A.B").unwrap());
        hook.add_handler(
            SharedHandler::from_fn_with_id("h", |_args, _kwargs| Ok(())),
            false,
        );
        assert!(hook.stats(Ustr::from("h")).is_some());

        hook.remove_handler(Ustr::from("h"));
        assert!(hook.stats(Ustr::from("h")).is_none());
    }

    #[rstest]
    fn test_generated_ids_are_unique() {
        let a = SharedHandler::from_fn(|_args, _kwargs| Ok(()));
        let b = SharedHandler::from_fn(|_args, _kwargs| Ok(()));
        assert_ne!(a.id(), b.id());
    }
}
