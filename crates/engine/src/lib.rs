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

//! An in-process, topic-routed publish/subscribe event engine.
//!
//! Producers publish messages tagged with a hierarchical topic; a background
//! dispatcher routes each message to every hook whose registered topic
//! matches. Topics are `.`-separated and may contain named wildcards
//! (`{symbol}`), alternations (`(Equity|Futures)`), and regular expressions
//! (`/^[A-Z]{4}$/`).
//!
//! # Example
//!
//! ```no_run
//! use eventengine::{Args, EventEngine, Kwargs, SharedHandler, Topic, value};
//!
//! let engine = EventEngine::new()?;
//!
//! let pattern = Topic::parse("Market.Trade.{symbol}")?;
//! engine.register_handler(
//!     &pattern,
//!     SharedHandler::from_fn_with_id("trade-logger", |args, _kwargs| {
//!         println!("trade: {:?}", args.get_as::<f64>(0));
//!         Ok(())
//!     }),
//!     false,
//! );
//!
//! engine.start()?;
//! let mut args = Args::new();
//! args.push(value(101.25f64));
//! engine.put("Market.Trade.AAPL", args, Kwargs::new())?;
//! engine.stop()?;
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Delivery guarantees
//!
//! - Messages on one queue are dispatched FIFO across all producers; a single
//!   producer's messages to one topic reach each handler in publish order.
//! - Within one dispatch, plain handlers run before topic-aware handlers;
//!   each group runs in insertion order.
//! - Handler faults (errors and panics) are logged and never stop dispatch.
//! - Queue pressure surfaces as explicit errors; nothing is dropped silently.

pub mod engine;
pub mod errors;
pub mod hook;
pub mod logging;
pub mod message;
pub mod timer;
pub mod topic;

pub use engine::{EngineConfig, EngineState, EventEngine};
pub use errors::{EngineError, HandlerError, HandlerResult, TopicError};
pub use hook::{EventHandler, EventHook, Hook, HookConfig, HookEx, HookStats, SharedHandler};
pub use message::{Args, Kwargs, Payload, PayloadPool, Value, value};
pub use timer::EngineTimers;
pub use topic::{MatchNode, MatchResult, Topic, TopicPart};
