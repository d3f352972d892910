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

//! Core primitives for the event engine.
//!
//! This crate holds the building blocks the engine is assembled from, with no
//! knowledge of topics or dispatch semantics:
//!
//! - [`hashing`]: stable 64-bit hashing over byte strings.
//! - [`keymap`]: an insertion-ordered, open-addressed map keyed by bytes.
//! - [`pool`]: a fixed-capacity object pool with heap fallback.
//! - [`queue`]: a bounded blocking ring queue with hybrid spin/wait modes.
//! - [`correctness`]: design-by-contract condition checks.

pub mod correctness;
pub mod hashing;
pub mod keymap;
pub mod pool;
pub mod queue;

pub use hashing::hash64;
pub use keymap::KeyMap;
pub use pool::{ObjectPool, Recyclable};
pub use queue::RingQueue;
