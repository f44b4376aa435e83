// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use didl::arena::TypeId;
use std::collections::HashMap;
use std::string::String;
use std::vec::Vec;

/// Optional label resolver for profiling scopes.
///
/// Return `None` to fall back to the default index-based labels.
pub trait LabelResolver {
    /// Resolve a label for the scope around decoding argument `index`.
    fn arg_label(&mut self, _index: usize, _wire_type: TypeId) -> Option<String> {
        None
    }
}

/// Default resolver that keeps stable index-based labels.
#[derive(Default, Debug)]
pub struct DefaultLabelResolver;

impl LabelResolver for DefaultLabelResolver {}

/// Resolver that labels arguments with caller-provided parameter names.
///
/// Arguments past the end of the name list use the default labels.
#[derive(Default, Debug)]
pub struct ArgNameResolver {
    names: Vec<String>,
    cache: HashMap<usize, String>,
}

impl ArgNameResolver {
    /// Create a resolver for a method whose parameters are called `names`, in order.
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            cache: HashMap::new(),
        }
    }
}

impl LabelResolver for ArgNameResolver {
    fn arg_label(&mut self, index: usize, _wire_type: TypeId) -> Option<String> {
        if let Some(label) = self.cache.get(&index) {
            return Some(label.clone());
        }
        let name = self.names.get(index)?;
        let label = format!("arg:{name}");
        self.cache.insert(index, label.clone());
        Some(label)
    }
}

pub(crate) fn default_arg_label(index: usize) -> String {
    format!("arg:{index}")
}
