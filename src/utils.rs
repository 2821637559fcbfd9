// Copyright 2021 Dmitry Tantsur <dtantsur@protonmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Merging of layered configuration files.

use log::warn;
use serde_yaml::{Mapping, Value};

/// Merge two nested mappings.
///
/// The values from `src` are merged into `dest`. With `overwrite`, scalar values from `src`
/// replace the ones already in `dest`; otherwise only missing keys are filled in. Nested
/// mappings are always merged recursively.
pub fn merge_mappings(src: Mapping, dest: &mut Mapping, overwrite: bool) {
    for (key, value) in src {
        if !dest.contains_key(&key) {
            let _ = dest.insert(key, value);
            continue;
        }

        let existing = match dest.get_mut(&key) {
            Some(existing) => existing,
            None => continue,
        };

        match (value, existing) {
            (Value::Mapping(nested), Value::Mapping(existing)) => {
                merge_mappings(nested, existing, overwrite)
            }
            (Value::Mapping(nested), existing) => {
                warn!(
                    "Expected {:?} to be a mapping while merging configuration, got {:?}. Overriding.",
                    key, existing
                );
                *existing = Value::Mapping(nested);
            }
            (value, existing) => {
                if overwrite {
                    *existing = value;
                }
            }
        }
    }
}
