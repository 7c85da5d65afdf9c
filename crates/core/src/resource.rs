// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource records emitted by resource jobs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One flat string-keyed record describing a piece of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource(pub BTreeMap<String, String>);

impl Resource {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Resource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Parse resource job output into records.
///
/// `key: value` lines form a record; a blank line ends it. Indented lines
/// continue the previous value. Lines with no colon are ignored. Output with
/// no records at all still yields one empty record: the job ran and found
/// nothing.
pub fn parse_records(output: &[u8]) -> Vec<Resource> {
    let text = String::from_utf8_lossy(output);
    let mut records = Vec::new();
    let mut current = BTreeMap::new();
    let mut last_key: Option<String> = None;

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                records.push(Resource(std::mem::take(&mut current)));
            }
            last_key = None;
            continue;
        }
        if line.starts_with([' ', '\t']) {
            if let Some(value) = last_key.as_ref().and_then(|k| current.get_mut(k)) {
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line.trim());
            }
            continue;
        }
        match line.split_once(':') {
            Some((key, value)) => {
                let key = key.trim().to_string();
                current.insert(key.clone(), value.trim().to_string());
                last_key = Some(key);
            }
            None => {
                tracing::debug!(line, "ignoring resource line without a key");
                last_key = None;
            }
        }
    }
    if !current.is_empty() {
        records.push(Resource(current));
    }
    if records.is_empty() {
        records.push(Resource::default());
    }
    records
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
