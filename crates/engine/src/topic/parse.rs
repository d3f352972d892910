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

//! Parser for the topic string grammar.
//!
//! ```text
//! topic      := part ( "." part )*
//! part       := exact | any | range | pattern
//! exact      := [^.{}()/|]+
//! any        := "{" [^}]+ "}"
//! range      := "(" opt ( "|" opt )+ ")"
//! pattern    := "/" regex "/"
//! ```
//!
//! Segments are scanned byte-wise; all structural characters are ASCII, so
//! fragment boundaries always fall on UTF-8 character boundaries. Regex
//! sources are compiled eagerly and anchored so a `Pattern` part only matches
//! a whole fragment.

use regex::Regex;
use smallvec::SmallVec;
use ustr::Ustr;

use super::TopicPart;
use crate::errors::TopicError;

const EXACT_FORBIDDEN: &[u8] = b"{}()/|";

pub(super) fn parse_parts(input: &str) -> Result<SmallVec<[TopicPart; 4]>, TopicError> {
    if input.is_empty() {
        return Err(TopicError::parse(input, "empty topic string"));
    }

    let bytes = input.as_bytes();
    let mut parts = SmallVec::new();
    let mut pos = 0;

    loop {
        let (part, next) = parse_part(input, bytes, pos)?;
        parts.push(part);
        pos = next;

        if pos == bytes.len() {
            return Ok(parts);
        }
        match bytes[pos] {
            b'.' => {
                pos += 1;
                if pos == bytes.len() {
                    return Err(TopicError::parse(input, "empty trailing segment"));
                }
            }
            c => {
                return Err(TopicError::parse(
                    input,
                    format!("unexpected '{}' after segment", c as char),
                ));
            }
        }
    }
}

fn parse_part(input: &str, bytes: &[u8], pos: usize) -> Result<(TopicPart, usize), TopicError> {
    match bytes[pos] {
        b'{' => parse_any(input, bytes, pos),
        b'(' => parse_range(input, bytes, pos),
        b'/' => parse_pattern(input, bytes, pos),
        b'.' => Err(TopicError::parse(input, "empty segment")),
        _ => parse_exact(input, bytes, pos),
    }
}

fn parse_any(input: &str, bytes: &[u8], pos: usize) -> Result<(TopicPart, usize), TopicError> {
    let close = find_byte(bytes, pos + 1, b'}')
        .ok_or_else(|| TopicError::parse(input, "unterminated '{' wildcard"))?;
    let name = &input[pos + 1..close];
    if name.is_empty() {
        return Err(TopicError::parse(input, "empty wildcard name"));
    }
    Ok((TopicPart::Any(Ustr::from(name)), close + 1))
}

fn parse_range(input: &str, bytes: &[u8], pos: usize) -> Result<(TopicPart, usize), TopicError> {
    let close = find_byte(bytes, pos + 1, b')')
        .ok_or_else(|| TopicError::parse(input, "unterminated '(' range"))?;
    let body = &input[pos + 1..close];

    let mut options = Vec::new();
    for option in body.split('|') {
        if option.is_empty() {
            return Err(TopicError::parse(input, "empty range option"));
        }
        options.push(Ustr::from(option));
    }
    if options.len() < 2 {
        return Err(TopicError::parse(
            input,
            "range requires at least two alternatives",
        ));
    }
    Ok((TopicPart::Range(options), close + 1))
}

fn parse_pattern(input: &str, bytes: &[u8], pos: usize) -> Result<(TopicPart, usize), TopicError> {
    let close = find_byte(bytes, pos + 1, b'/')
        .ok_or_else(|| TopicError::parse(input, "unterminated '/' pattern"))?;
    let source = &input[pos + 1..close];
    if source.is_empty() {
        return Err(TopicError::parse(input, "empty pattern"));
    }

    // Anchored so the pattern must consume the whole fragment
    let regex = Regex::new(&format!("^(?:{source})$"))
        .map_err(|e| TopicError::parse(input, format!("invalid regex: {e}")))?;

    Ok((
        TopicPart::Pattern {
            source: Ustr::from(source),
            regex,
        },
        close + 1,
    ))
}

fn parse_exact(input: &str, bytes: &[u8], pos: usize) -> Result<(TopicPart, usize), TopicError> {
    let mut end = pos;
    while end < bytes.len() && bytes[end] != b'.' {
        if EXACT_FORBIDDEN.contains(&bytes[end]) {
            return Err(TopicError::parse(
                input,
                format!("unexpected '{}' in literal segment", bytes[end] as char),
            ));
        }
        end += 1;
    }
    Ok((TopicPart::Exact(Ustr::from(&input[pos..end])), end))
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes[from..].iter().position(|&b| b == needle).map(|i| from + i)
}
