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

//! Periodic timers publishing to well-known engine topics.
//!
//! Each interval runs on its own OS thread. The one-second and one-minute
//! intervals are aligned to wall-clock boundaries and publish a `timestamp`
//! named argument; every other interval steps a monotonic clock from its
//! activation time and publishes `interval` and `trigger_time`.
//!
//! Timer ticks are enqueued non-blockingly: a full queue drops the tick with
//! a warning rather than stalling the timer thread.

use std::{
    sync::{Arc, Condvar, Mutex},
    thread,
    time::{Duration, Instant},
};

use chrono::{DateTime, Utc};
use eventengine_core::correctness::check_positive_secs;
use indexmap::IndexMap;

use crate::{
    engine::EngineCore,
    errors::EngineError,
    message::{Args, Kwargs, value},
    topic::Topic,
};

/// Topic published by the second-aligned timer.
pub const TIMER_SECOND_TOPIC: &str = "EventEngine.Internal.Timer.Second";
/// Topic published by the minute-aligned timer.
pub const TIMER_MINUTE_TOPIC: &str = "EventEngine.Internal.Timer.Minute";
/// Prefix for all other timer topics; the interval in seconds is appended.
pub const TIMER_TOPIC_PREFIX: &str = "EventEngine.Internal.Timer";

/// A wakeable shutdown flag shared with each timer thread.
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        Self {
            stopped: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn trigger(&self) {
        *self.stopped.lock().expect("signal lock poisoned") = true;
        self.condvar.notify_all();
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock().expect("signal lock poisoned")
    }

    /// Sleeps up to `timeout`, returning `true` when woken by shutdown.
    fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut stopped = self.stopped.lock().expect("signal lock poisoned");
        while !*stopped {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .condvar
                .wait_timeout(stopped, deadline - now)
                .expect("signal lock poisoned");
            stopped = guard;
        }
        true
    }
}

struct TimerEntry {
    topic: Topic,
    signal: Arc<StopSignal>,
    handle: Option<thread::JoinHandle<()>>,
}

/// Registry of running timer threads, keyed by interval.
pub struct EngineTimers {
    core: Arc<EngineCore>,
    entries: Mutex<IndexMap<u64, TimerEntry>>,
}

impl EngineTimers {
    pub(crate) fn new(core: Arc<EngineCore>) -> Self {
        Self {
            core,
            entries: Mutex::new(IndexMap::new()),
        }
    }

    /// Starts the periodic timer for `interval_s` and returns its topic.
    ///
    /// When the interval is already running, the existing topic is returned
    /// and `activate_time` is ignored with a debug log. `activate_time` only
    /// applies to non-aligned intervals; the 1-second and 1-minute timers
    /// always align to their wall-clock boundary.
    ///
    /// # Errors
    ///
    /// Returns an error if `interval_s` is not positive and finite, or if
    /// the timer thread cannot be spawned.
    pub fn get_timer(
        &self,
        interval_s: f64,
        activate_time: Option<DateTime<Utc>>,
    ) -> anyhow::Result<Topic> {
        check_positive_secs(interval_s, stringify!(interval_s))?;

        let key = interval_s.to_bits();
        let mut entries = self.entries.lock().expect("timers lock poisoned");

        if let Some(entry) = entries.get(&key) {
            if activate_time.is_some() {
                log::debug!(
                    "Timer for interval {interval_s}s already running, activate_time ignored"
                );
            }
            return Ok(entry.topic.clone());
        }

        let topic = timer_topic(interval_s)?;
        let signal = Arc::new(StopSignal::new());

        let core = self.core.clone();
        let thread_topic = topic.clone();
        let thread_signal = signal.clone();
        let handle = thread::Builder::new()
            .name(format!("event-timer-{interval_s}"))
            .spawn(move || timer_loop(&core, &thread_topic, interval_s, activate_time, &thread_signal))?;

        log::debug!("Started {interval_s}s timer publishing to '{topic}'");
        entries.insert(
            key,
            TimerEntry {
                topic: topic.clone(),
                signal,
                handle: Some(handle),
            },
        );
        Ok(topic)
    }

    /// Returns the number of running timers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.entries.lock().expect("timers lock poisoned").len()
    }

    /// Signals every timer thread to exit and joins them all.
    pub(crate) fn stop(&self) {
        let mut entries = self.entries.lock().expect("timers lock poisoned");
        for entry in entries.values() {
            entry.signal.trigger();
        }
        for entry in entries.values_mut() {
            if let Some(handle) = entry.handle.take()
                && handle.join().is_err()
            {
                log::error!("Timer thread for '{}' panicked", entry.topic);
            }
        }
        entries.clear();
    }
}

impl Drop for EngineTimers {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for EngineTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(EngineTimers))
            .field("active", &self.active_count())
            .finish()
    }
}

fn timer_topic(interval_s: f64) -> anyhow::Result<Topic> {
    let literal = if interval_s == 1.0 {
        TIMER_SECOND_TOPIC.to_string()
    } else if interval_s == 60.0 {
        TIMER_MINUTE_TOPIC.to_string()
    } else {
        format!("{TIMER_TOPIC_PREFIX}.{interval_s}")
    };
    Ok(Topic::intern(&literal)?)
}

fn timer_loop(
    core: &EngineCore,
    topic: &Topic,
    interval_s: f64,
    activate_time: Option<DateTime<Utc>>,
    signal: &StopSignal,
) {
    let aligned = interval_s == 1.0 || interval_s == 60.0;
    if aligned {
        aligned_loop(core, topic, interval_s, signal);
    } else {
        stepping_loop(core, topic, interval_s, activate_time, signal);
    }
}

/// Fires at every wall-clock multiple of `interval_s`.
fn aligned_loop(core: &EngineCore, topic: &Topic, interval_s: f64, signal: &StopSignal) {
    loop {
        if signal.wait_for(until_next_boundary(interval_s)) {
            return;
        }
        let mut kwargs = Kwargs::new();
        kwargs.insert("timestamp", value(Utc::now()));
        publish_tick(core, topic, kwargs);
    }
}

/// Fires at `activate_time` (or immediately), then every `interval_s`.
fn stepping_loop(
    core: &EngineCore,
    topic: &Topic,
    interval_s: f64,
    activate_time: Option<DateTime<Utc>>,
    signal: &StopSignal,
) {
    if let Some(at) = activate_time {
        let now = Utc::now();
        if at > now {
            let delay = (at - now).to_std().unwrap_or_default();
            if signal.wait_for(delay) {
                return;
            }
        }
    }

    let period = Duration::from_secs_f64(interval_s);
    let mut next_fire = Instant::now();

    loop {
        if signal.is_stopped() {
            return;
        }

        let mut kwargs = Kwargs::new();
        kwargs.insert("interval", value(interval_s));
        kwargs.insert("trigger_time", value(Utc::now()));
        publish_tick(core, topic, kwargs);

        next_fire += period;
        let now = Instant::now();
        if next_fire > now && signal.wait_for(next_fire - now) {
            return;
        }
    }
}

fn publish_tick(core: &EngineCore, topic: &Topic, kwargs: Kwargs) {
    match core.publish(topic, Args::new(), kwargs, false, -1.0) {
        Ok(_) => {}
        Err(EngineError::QueueFull) => {
            log::warn!("Queue full, dropped timer tick for '{topic}'");
        }
        Err(e) => log::error!("Timer publish failed for '{topic}': {e}"),
    }
}

/// Returns the time remaining until the next wall-clock multiple of `period_s`.
fn until_next_boundary(period_s: f64) -> Duration {
    let period_ms = (period_s * 1000.0) as i64;
    let now_ms = Utc::now().timestamp_millis();
    let next_ms = (now_ms.div_euclid(period_ms) + 1) * period_ms;
    Duration::from_millis((next_ms - now_ms).unsigned_abs())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Timelike;
    use rstest::rstest;

    use super::*;
    use crate::{
        engine::EventEngine,
        hook::SharedHandler,
        topic::Topic,
    };

    #[rstest]
    #[case(1.0, "EventEngine.Internal.Timer.Second")]
    #[case(60.0, "EventEngine.Internal.Timer.Minute")]
    #[case(2.5, "EventEngine.Internal.Timer.2.5")]
    #[case(0.25, "EventEngine.Internal.Timer.0.25")]
    fn test_timer_topics(#[case] interval_s: f64, #[case] expected: &str) {
        let engine = EventEngine::new().unwrap();
        let topic = engine.get_timer(interval_s, None).unwrap();
        assert_eq!(topic.literal(), expected);
        assert!(topic.is_exact());
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    fn test_invalid_interval_rejected(#[case] interval_s: f64) {
        let engine = EventEngine::new().unwrap();
        assert!(engine.get_timer(interval_s, None).is_err());
    }

    #[rstest]
    fn test_repeated_get_timer_returns_existing_topic() {
        let engine = EventEngine::new().unwrap();

        let first = engine.get_timer(0.5, None).unwrap();
        let second = engine
            .get_timer(0.5, Some(Utc::now() + chrono::Duration::seconds(30)))
            .unwrap();

        assert_eq!(first, second);
    }

    #[rstest]
    fn test_second_aligned_timer_delivery() {
        let engine = EventEngine::new().unwrap();
        engine.start().unwrap();

        let topic = engine.get_timer(1.0, None).unwrap();

        let ticks = Arc::new(AtomicU32::new(0));
        let timestamps = Arc::new(Mutex::new(Vec::new()));
        let counter = ticks.clone();
        let stamps = timestamps.clone();
        engine.register_handler(
            &topic,
            SharedHandler::from_fn_with_id("tick-counter", move |_args, kwargs| {
                let timestamp = kwargs
                    .get_as::<DateTime<Utc>>("timestamp")
                    .expect("timestamp kwarg");
                stamps.lock().unwrap().push(*timestamp);
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            false,
        );

        thread::sleep(Duration::from_millis(3500));
        engine.stop().unwrap();

        let count = ticks.load(Ordering::SeqCst);
        assert!(
            (3..=4).contains(&count),
            "expected 3 or 4 ticks in 3.5s, got {count}"
        );

        // Ticks land at whole-second boundaries
        for timestamp in timestamps.lock().unwrap().iter() {
            let offset_ms = timestamp.nanosecond() / 1_000_000;
            assert!(
                offset_ms < 250 || offset_ms > 750,
                "tick at {offset_ms}ms past the second"
            );
        }
    }

    #[rstest]
    fn test_custom_interval_delivery() {
        let engine = EventEngine::new().unwrap();
        engine.start().unwrap();

        let topic = engine.get_timer(0.1, None).unwrap();

        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        engine.register_handler(
            &topic,
            SharedHandler::from_fn_with_id("fast-counter", move |_args, kwargs| {
                assert_eq!(kwargs.get_as::<f64>("interval"), Some(&0.1));
                assert!(kwargs.get_as::<DateTime<Utc>>("trigger_time").is_some());
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            false,
        );

        thread::sleep(Duration::from_millis(1050));
        engine.stop().unwrap();

        let count = ticks.load(Ordering::SeqCst);
        assert!(
            (8..=12).contains(&count),
            "expected ~10 ticks in 1.05s, got {count}"
        );
    }

    #[rstest]
    fn test_activate_time_delays_first_tick() {
        let engine = EventEngine::new().unwrap();
        engine.start().unwrap();

        let activate = Utc::now() + chrono::Duration::milliseconds(300);
        let topic = engine.get_timer(0.05, Some(activate)).unwrap();

        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        engine.register_handler(
            &topic,
            SharedHandler::from_fn_with_id("delayed-counter", move |_args, _kwargs| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            false,
        );

        thread::sleep(Duration::from_millis(150));
        assert_eq!(ticks.load(Ordering::SeqCst), 0, "tick before activate_time");

        thread::sleep(Duration::from_millis(400));
        engine.stop().unwrap();
        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    #[rstest]
    fn test_stop_joins_timer_threads() {
        let engine = EventEngine::new().unwrap();
        engine.start().unwrap();

        let topic = engine.get_timer(0.05, None).unwrap();

        let ticks = Arc::new(AtomicU32::new(0));
        let counter = ticks.clone();
        engine.register_handler(
            &topic,
            SharedHandler::from_fn_with_id("stopped-counter", move |_args, _kwargs| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
            false,
        );

        thread::sleep(Duration::from_millis(200));
        engine.stop().unwrap();

        let after_stop = ticks.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(200));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[rstest]
    fn test_timer_without_running_engine_drops_ticks() {
        // A timer on a never-started engine fills the queue, then drops
        let engine = EventEngine::with_config(crate::engine::EngineConfig {
            capacity: 2,
            ..Default::default()
        })
        .unwrap();

        engine.get_timer(0.02, None).unwrap();
        thread::sleep(Duration::from_millis(200));

        assert_eq!(engine.queue_len(), 2);
        drop(engine);
    }

    #[rstest]
    fn test_until_next_boundary_within_period() {
        let wait = until_next_boundary(1.0);
        assert!(wait <= Duration::from_secs(1));

        let wait = until_next_boundary(60.0);
        assert!(wait <= Duration::from_secs(60));
    }

    #[rstest]
    fn test_timer_topic_matches_wildcard_subscription() {
        let pattern = Topic::parse("EventEngine.Internal.Timer.{unit}").unwrap();
        let second = Topic::parse(TIMER_SECOND_TOPIC).unwrap();
        let minute = Topic::parse(TIMER_MINUTE_TOPIC).unwrap();

        assert!(pattern.match_target(&second).matched());
        assert!(pattern.match_target(&minute).matched());
    }
}
