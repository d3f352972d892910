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

//! Error types for the event engine.

use thiserror::Error;
use ustr::Ustr;

/// Errors from topic construction and use.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    /// The topic string could not be parsed.
    #[error("invalid topic '{input}': {reason}")]
    Parse {
        /// The offending input string.
        input: String,
        /// Why parsing failed.
        reason: String,
    },
    /// A generic topic was used where an exact topic is required.
    #[error("topic '{0}' is not exact")]
    NotExact(Ustr),
}

impl TopicError {
    pub(crate) fn parse<S: Into<String>, R: Into<String>>(input: S, reason: R) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Non-blocking publish into a full (or closed) queue.
    #[error("message queue full")]
    QueueFull,
    /// Non-blocking get on an empty queue.
    #[error("message queue empty")]
    QueueEmpty,
    /// No hook is bound to the topic.
    #[error("no hook registered for topic '{0}'")]
    NotFound(Ustr),
    /// Another hook already occupies the topic key.
    #[error("hook already registered for topic '{0}'")]
    AlreadyRegistered(Ustr),
    /// An operation was attempted in the wrong engine state.
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
    /// A topic error raised through an engine operation.
    #[error(transparent)]
    Topic(#[from] TopicError),
}

/// Result of a single handler invocation.
pub type HandlerResult = Result<(), HandlerError>;

/// Failure reported by a handler.
///
/// Handlers may also panic; panics are caught and logged by the hook, so from
/// the engine's perspective both paths are recoverable faults.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler does not accept the injected `topic` binding.
    ///
    /// When the owning hook is configured with `retry_on_unexpected_topic`,
    /// the invocation is retried once without the binding.
    #[error("unexpected argument `topic`")]
    UnexpectedTopic,
    /// Any other handler failure; the message is logged verbatim.
    #[error("{0}")]
    Failure(String),
}

impl HandlerError {
    /// Creates a [`HandlerError::Failure`] from any displayable cause.
    pub fn failure<E: std::fmt::Display>(cause: E) -> Self {
        Self::Failure(cause.to_string())
    }
}
