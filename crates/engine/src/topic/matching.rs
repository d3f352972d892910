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

//! Part-wise matching of a pattern topic against a target topic.

use smallvec::SmallVec;
use ustr::Ustr;

use super::TopicPart;

/// Outcome of matching one part position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchNode {
    /// Whether this position matched.
    pub matched: bool,
    /// Capture name when the pattern part is a named wildcard.
    pub name: Option<Ustr>,
    /// The target fragment compared at this position.
    pub value: Option<Ustr>,
}

/// Outcome of matching a pattern topic against a target topic.
#[derive(Clone, Debug)]
pub struct MatchResult {
    matched: bool,
    nodes: SmallVec<[MatchNode; 4]>,
}

impl MatchResult {
    /// Returns whether every position matched.
    #[must_use]
    pub const fn matched(&self) -> bool {
        self.matched
    }

    /// Returns one node per compared part position.
    ///
    /// Empty when the topics had different lengths and no positions were
    /// compared.
    #[must_use]
    pub fn nodes(&self) -> &[MatchNode] {
        &self.nodes
    }

    /// Returns the named wildcard captures as `(name, fragment)` pairs.
    pub fn captures(&self) -> impl Iterator<Item = (Ustr, Ustr)> + '_ {
        self.nodes
            .iter()
            .filter(|node| node.matched)
            .filter_map(|node| Some((node.name?, node.value?)))
    }

    fn mismatch() -> Self {
        Self {
            matched: false,
            nodes: SmallVec::new(),
        }
    }
}

/// Matches `pattern` parts against `target` parts position by position.
///
/// Topics of different lengths never match. A generic part in the target
/// position never matches, regardless of the pattern part.
pub(super) fn match_parts(pattern: &[TopicPart], target: &[TopicPart]) -> MatchResult {
    if pattern.len() != target.len() {
        return MatchResult::mismatch();
    }

    let mut nodes = SmallVec::with_capacity(pattern.len());
    let mut matched = true;

    for (pat, tgt) in pattern.iter().zip(target) {
        let node = match tgt {
            TopicPart::Exact(fragment) => match_fragment(pat, *fragment),
            _ => MatchNode {
                matched: false,
                name: None,
                value: None,
            },
        };
        matched &= node.matched;
        nodes.push(node);
    }

    MatchResult { matched, nodes }
}

fn match_fragment(pattern: &TopicPart, fragment: Ustr) -> MatchNode {
    let (matched, name) = match pattern {
        TopicPart::Exact(literal) => (*literal == fragment, None),
        TopicPart::Any(name) => (true, Some(*name)),
        TopicPart::Range(options) => (options.contains(&fragment), None),
        TopicPart::Pattern { regex, .. } => (regex.is_match(fragment.as_str()), None),
    };

    MatchNode {
        matched,
        name,
        value: Some(fragment),
    }
}
