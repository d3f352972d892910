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

//! Structured hierarchical topics with wildcard, range, and regex parts.
//!
//! A topic is a `.`-separated sequence of parts. Each part is either a
//! literal fragment or one of three generic forms:
//!
//! - `{name}`: named wildcard, matches any fragment and captures it.
//! - `(a|b|c)`: alternation, matches a fragment equal to any option.
//! - `/regex/`: regular expression, matches a whole fragment.
//!
//! Equality is structural: two topics are equal iff their canonical keys are
//! equal. The key is a tag-and-length encoding of the parts, so
//! `M.Data.{symbol}` and `M.Data.AAPL` have distinct keys even where their
//! display strings could coincide. Topics are immutable and cheap to clone.

mod matching;
mod parse;

use std::{
    fmt::Display,
    hash::{Hash, Hasher},
    sync::{Arc, Mutex, OnceLock},
};

use bytes::Bytes;
use eventengine_core::{KeyMap, hashing::hash64};
use regex::Regex;
use smallvec::SmallVec;
use ustr::Ustr;

pub use self::matching::{MatchNode, MatchResult};
use crate::errors::TopicError;

/// The part separator in topic display strings.
pub const SEPARATOR: char = '.';

const KEY_DELIMITER: u8 = 0x1F;

/// Capacity of the process-wide topic intern map.
const INTERN_CAPACITY: usize = 4096;

static INTERNED: OnceLock<Mutex<KeyMap<Topic>>> = OnceLock::new();

/// One part of a topic.
#[derive(Clone, Debug)]
pub enum TopicPart {
    /// A literal fragment.
    Exact(Ustr),
    /// A named wildcard capturing any fragment.
    Any(Ustr),
    /// An ordered set of accepted fragments.
    Range(Vec<Ustr>),
    /// An eagerly compiled regular expression over one fragment.
    Pattern {
        /// The regex source as written in the topic string.
        source: Ustr,
        /// The compiled, fragment-anchored regex.
        regex: Regex,
    },
}

impl TopicPart {
    /// Returns whether this part is a literal fragment.
    #[must_use]
    pub const fn is_exact(&self) -> bool {
        matches!(self, Self::Exact(_))
    }

    const fn tag(&self) -> u8 {
        match self {
            Self::Exact(_) => b'E',
            Self::Any(_) => b'A',
            Self::Range(_) => b'R',
            Self::Pattern { .. } => b'P',
        }
    }

    fn key_body(&self) -> Vec<u8> {
        match self {
            Self::Exact(s) | Self::Any(s) | Self::Pattern { source: s, .. } => {
                s.as_bytes().to_vec()
            }
            Self::Range(options) => {
                let mut body = Vec::new();
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        body.push(b'|');
                    }
                    body.extend_from_slice(option.as_bytes());
                }
                body
            }
        }
    }
}

impl Display for TopicPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s}"),
            Self::Any(name) => write!(f, "{{{name}}}"),
            Self::Range(options) => {
                write!(f, "(")?;
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        write!(f, "|")?;
                    }
                    write!(f, "{option}")?;
                }
                write!(f, ")")
            }
            Self::Pattern { source, .. } => write!(f, "/{source}/"),
        }
    }
}

impl PartialEq for TopicPart {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) | (Self::Any(a), Self::Any(b)) => a == b,
            (Self::Range(a), Self::Range(b)) => a == b,
            (Self::Pattern { source: a, .. }, Self::Pattern { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for TopicPart {}

#[derive(Debug)]
struct TopicInner {
    literal: Ustr,
    key: Bytes,
    hash: u64,
    is_exact: bool,
    parts: SmallVec<[TopicPart; 4]>,
}

/// An immutable, structured, hierarchical topic.
#[derive(Clone, Debug)]
pub struct Topic {
    inner: Arc<TopicInner>,
}

impl Topic {
    /// Parses a topic string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string violates the topic grammar or contains
    /// an invalid regular expression.
    pub fn parse(input: &str) -> Result<Self, TopicError> {
        let parts = parse::parse_parts(input)?;
        Ok(Self::from_validated(Ustr::from(input), parts))
    }

    /// Builds a topic from pre-built parts.
    ///
    /// # Errors
    ///
    /// Returns an error if `parts` is empty.
    pub fn from_parts<I: IntoIterator<Item = TopicPart>>(parts: I) -> Result<Self, TopicError> {
        let parts: SmallVec<[TopicPart; 4]> = parts.into_iter().collect();
        if parts.is_empty() {
            return Err(TopicError::parse("", "empty topic string"));
        }

        let literal = parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Ok(Self::from_validated(Ustr::from(&literal), parts))
    }

    /// Parses through the process-wide intern map, deduplicating repeated
    /// constructions of the same literal.
    ///
    /// The map holds up to a fixed number of topics; beyond that, parsing
    /// falls through without interning.
    ///
    /// # Errors
    ///
    /// Returns an error if the string violates the topic grammar.
    ///
    /// # Panics
    ///
    /// Panics if the intern mutex is poisoned.
    pub fn intern(input: &str) -> Result<Self, TopicError> {
        let map = INTERNED.get_or_init(|| Mutex::new(KeyMap::with_capacity(INTERN_CAPACITY)));
        let mut map = map.lock().expect("intern lock poisoned");

        if let Some(topic) = map.get(input.as_bytes()) {
            return Ok(topic.clone());
        }

        let topic = Self::parse(input)?;
        if map.len() < INTERN_CAPACITY {
            map.insert(Bytes::copy_from_slice(input.as_bytes()), topic.clone());
        }
        Ok(topic)
    }

    fn from_validated(literal: Ustr, parts: SmallVec<[TopicPart; 4]>) -> Self {
        let key = encode_key(&parts);
        let hash = hash64(&key);
        let is_exact = parts.iter().all(TopicPart::is_exact);

        Self {
            inner: Arc::new(TopicInner {
                literal,
                key,
                hash,
                is_exact,
                parts,
            }),
        }
    }

    /// Returns the display string.
    #[must_use]
    pub fn literal(&self) -> &str {
        self.inner.literal.as_str()
    }

    /// Returns the canonical key bytes.
    #[must_use]
    pub fn key(&self) -> &Bytes {
        &self.inner.key
    }

    /// Returns the stable 64-bit hash of the canonical key.
    #[must_use]
    pub fn hash64(&self) -> u64 {
        self.inner.hash
    }

    /// Returns whether every part is a literal fragment.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.inner.is_exact
    }

    /// Returns the parts in order.
    #[must_use]
    pub fn parts(&self) -> &[TopicPart] {
        &self.inner.parts
    }

    /// Returns the number of parts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.parts.len()
    }

    /// Returns whether the topic has no parts (never true for a constructed topic).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.parts.is_empty()
    }

    /// Matches this topic as a pattern against an exact `target` topic.
    #[must_use]
    pub fn match_target(&self, target: &Self) -> MatchResult {
        matching::match_parts(self.parts(), target.parts())
    }

    /// Returns a new topic with named wildcards substituted from
    /// `assignments`; wildcards without an assignment are kept as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if a substituted value is not a valid literal
    /// fragment.
    pub fn format(&self, assignments: &[(&str, &str)]) -> Result<Self, TopicError> {
        let mut parts: SmallVec<[TopicPart; 4]> = SmallVec::with_capacity(self.len());

        for part in self.parts() {
            let substituted = match part {
                TopicPart::Any(name) => assignments
                    .iter()
                    .find(|(n, _)| *n == name.as_str())
                    .map(|(_, v)| *v),
                _ => None,
            };

            match substituted {
                Some(fragment) => {
                    check_fragment(fragment)?;
                    parts.push(TopicPart::Exact(Ustr::from(fragment)));
                }
                None => parts.push(part.clone()),
            }
        }

        Self::from_parts(parts)
    }

    /// Checks the topic is exact, as required for publication.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::NotExact`] if any part is generic.
    pub fn require_exact(&self) -> Result<(), TopicError> {
        if self.is_exact() {
            Ok(())
        } else {
            Err(TopicError::NotExact(self.inner.literal))
        }
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.literal)
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.inner.hash == other.inner.hash && self.inner.key == other.inner.key
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl std::str::FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Encodes parts into the canonical key: per part a tag byte and a
/// length-prefixed body, parts separated by a delimiter byte. The encoding is
/// injective over structurally distinct part sequences.
fn encode_key(parts: &[TopicPart]) -> Bytes {
    let mut buf = Vec::with_capacity(parts.len() * 8);
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            buf.push(KEY_DELIMITER);
        }
        let body = part.key_body();
        buf.push(part.tag());
        buf.extend_from_slice(&u32::try_from(body.len()).unwrap_or(u32::MAX).to_le_bytes());
        buf.extend_from_slice(&body);
    }
    Bytes::from(buf)
}

fn check_fragment(fragment: &str) -> Result<(), TopicError> {
    if fragment.is_empty() {
        return Err(TopicError::parse(fragment, "empty segment"));
    }
    if fragment.bytes().any(|b| b".{}()/|".contains(&b)) {
        return Err(TopicError::parse(
            fragment,
            "fragment contains a structural character",
        ));
    }
    Ok(())
}
