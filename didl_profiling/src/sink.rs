// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::resolver::{DefaultLabelResolver, LabelResolver, default_arg_label};
use didl::arena::TypeId;
use didl::error::IdlError;
use didl::trace::{TraceMask, TraceSink};
use std::string::String;
use std::vec::Vec;

type BackendGuard = tracy_client::Span;

struct ScopeEntry {
    index: usize,
    // Keep the label alive for backends that may borrow it.
    label: String,
    guard: Option<BackendGuard>,
}

/// A `TraceSink` that emits one Tracy scope per decoded argument via `tracy-client`.
///
/// Special-opt subtype decisions and failed arguments become Tracy messages.
pub struct ProfilingTraceSink<R = DefaultLabelResolver> {
    resolver: R,
    stack: Vec<ScopeEntry>,
}

impl ProfilingTraceSink<DefaultLabelResolver> {
    /// Create a new sink with index-based labels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: LabelResolver> ProfilingTraceSink<R> {
    /// Create a new sink with a custom label resolver.
    #[must_use]
    pub fn with_resolver(resolver: R) -> Self {
        Self {
            resolver,
            stack: Vec::new(),
        }
    }

    fn on_arg_start(&mut self, index: usize, wire_type: TypeId, offset: usize) {
        let label = self
            .resolver
            .arg_label(index, wire_type)
            .unwrap_or_else(|| default_arg_label(index));
        let guard = self.start_scope(&label, offset);
        self.stack.push(ScopeEntry {
            index,
            label,
            guard,
        });
    }

    fn on_arg_end(&mut self, index: usize, outcome: Result<(), IdlError>) {
        if let Err(err) = outcome {
            send_message(&format!("didl: argument {index} failed: {err}"));
        }
        if let Some(top) = self.stack.last()
            && top.index == index
        {
            if let Some(entry) = self.stack.pop() {
                let ScopeEntry {
                    label: _label,
                    guard: _guard,
                    ..
                } = entry;
                let _ = (_label, _guard);
            }
            return;
        }
        // If the stack got out of sync, drop any active scopes to avoid leaking.
        self.drop_active_scopes();
    }

    fn start_scope(&self, label: &str, offset: usize) -> Option<BackendGuard> {
        let client = tracy_client::Client::running()?;
        let line = u32::try_from(offset).unwrap_or(u32::MAX);
        Some(client.span_alloc(Some(label), "didl.decode_arg", "didl", line, 0))
    }

    // Drop in LIFO order so nested spans close inner-to-outer.
    fn drop_active_scopes(&mut self) {
        while let Some(entry) = self.stack.pop() {
            let ScopeEntry {
                label: _label,
                guard: _guard,
                ..
            } = entry;
            let _ = (_label, _guard);
        }
    }
}

fn send_message(text: &str) {
    if let Some(client) = tracy_client::Client::running() {
        client.message(text, 0);
    }
}

impl<R: LabelResolver> TraceSink for ProfilingTraceSink<R> {
    fn mask(&self) -> TraceMask {
        TraceMask::DECODE | TraceMask::SUBTYPE
    }

    fn arg_start(&mut self, index: usize, wire_type: TypeId, offset: usize) {
        self.on_arg_start(index, wire_type, offset);
    }

    fn arg_end(&mut self, index: usize, _offset: usize, outcome: Result<(), IdlError>) {
        self.on_arg_end(index, outcome);
    }

    fn opt_special(&mut self, wire: TypeId, expected: TypeId) {
        send_message(&format!(
            "didl: subtype coercion via special opt rule ({wire:?} <: {expected:?})"
        ));
    }
}

impl<R> Default for ProfilingTraceSink<R>
where
    R: LabelResolver + Default,
{
    fn default() -> Self {
        Self::with_resolver(R::default())
    }
}

impl<R> Drop for ProfilingTraceSink<R> {
    fn drop(&mut self) {
        while let Some(entry) = self.stack.pop() {
            drop(entry.guard);
        }
    }
}

impl<R> std::fmt::Debug for ProfilingTraceSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfilingTraceSink")
            .field("stack_depth", &self.stack.len())
            .finish_non_exhaustive()
    }
}
