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

use criterion::{Criterion, criterion_group, criterion_main};
use eventengine::Topic;

fn bench_matching(c: &mut Criterion) {
    let target = Topic::parse("Market.Trade.NASDAQ.AAPL").unwrap();

    let exact = Topic::parse("Market.Trade.NASDAQ.AAPL").unwrap();
    c.bench_function("match_exact", |b| {
        b.iter(|| exact.match_target(std::hint::black_box(&target)).matched());
    });

    let wildcard = Topic::parse("Market.Trade.{venue}.{symbol}").unwrap();
    c.bench_function("match_wildcard", |b| {
        b.iter(|| wildcard.match_target(std::hint::black_box(&target)).matched());
    });

    let range = Topic::parse("Market.(Trade|Quote).NASDAQ.{symbol}").unwrap();
    c.bench_function("match_range", |b| {
        b.iter(|| range.match_target(std::hint::black_box(&target)).matched());
    });

    let pattern = Topic::parse("Market.Trade.NASDAQ./^[A-Z]{1,5}$/").unwrap();
    c.bench_function("match_regex", |b| {
        b.iter(|| pattern.match_target(std::hint::black_box(&target)).matched());
    });

    c.bench_function("parse_generic", |b| {
        b.iter(|| Topic::parse(std::hint::black_box("Market.(Trade|Quote).{venue}.{symbol}")));
    });
}

criterion_group!(benches, bench_matching);
criterion_main!(benches);
