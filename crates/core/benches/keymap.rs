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

use bytes::Bytes;
use criterion::{Criterion, criterion_group, criterion_main};
use eventengine_core::KeyMap;

fn bench_keymap(c: &mut Criterion) {
    let keys: Vec<Bytes> = (0..1024)
        .map(|i| Bytes::from(format!("market.data.venue-{i}.instrument-{i}")))
        .collect();

    c.bench_function("keymap_insert_1024", |b| {
        b.iter(|| {
            let mut map = KeyMap::new();
            for (i, key) in keys.iter().enumerate() {
                map.insert(key.clone(), i);
            }
            map
        });
    });

    let mut map = KeyMap::new();
    for (i, key) in keys.iter().enumerate() {
        map.insert(key.clone(), i);
    }

    c.bench_function("keymap_get_hit", |b| {
        b.iter(|| map.get(std::hint::black_box(&keys[512])));
    });

    c.bench_function("keymap_iter_1024", |b| {
        b.iter(|| map.iter().count());
    });
}

criterion_group!(benches, bench_keymap);
criterion_main!(benches);
