//! Stateful filter manager with undo/redo history and named presets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, VecDeque};

use crate::core::error::ValidationError;
use crate::core::state::{FilterState, Pagination};
use crate::manager::operations::{clear_all_filters, diff_filter_states, merge_filter_states};

/// Default number of history entries kept
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// One recorded state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterHistoryEntry {
    pub state: FilterState,
    pub label: String,
    pub recorded_at: DateTime<Utc>,
}

/// A named, user-saved filter state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    pub filters: FilterState,
    pub created_at: DateTime<Utc>,
}

/// Current filter state of one view plus its history and presets
///
/// History is a bounded log with a cursor. Undo and redo move the cursor; any
/// new action after an undo drops the entries ahead of the cursor.
#[derive(Debug, Clone)]
pub struct FilterStateManager {
    history: VecDeque<FilterHistoryEntry>,
    cursor: usize,
    max_history: usize,
    presets: BTreeMap<String, FilterPreset>,
}

impl Default for FilterStateManager {
    fn default() -> Self {
        Self::new(clear_all_filters())
    }
}

impl FilterStateManager {
    pub fn new(initial: FilterState) -> Self {
        Self::with_max_history(initial, DEFAULT_MAX_HISTORY)
    }

    /// A manager keeping at most `max_history` entries (at least one)
    pub fn with_max_history(initial: FilterState, max_history: usize) -> Self {
        let mut history = VecDeque::new();
        history.push_back(FilterHistoryEntry {
            state: initial,
            label: "initial".to_string(),
            recorded_at: Utc::now(),
        });
        Self {
            history,
            cursor: 0,
            max_history: max_history.max(1),
            presets: BTreeMap::new(),
        }
    }

    pub fn current(&self) -> &FilterState {
        // The history is never empty and the cursor always points into it
        &self.history[self.cursor].state
    }

    /// Merge `patch` onto the current state
    ///
    /// When a filter changes and the patch does not choose a page itself, the
    /// page is reset to 1 so the user does not land on an empty page.
    pub fn apply(&mut self, patch: &FilterState) -> &FilterState {
        let mut next = merge_filter_states(self.current(), patch);

        let page_chosen = patch.pagination.is_some_and(|p| p.page.is_some());
        let filters_changed = diff_filter_states(self.current(), &next)
            .iter()
            .any(|change| change.key != "pagination" && change.key != "sorting");
        if filters_changed && !page_chosen {
            let limit = next.pagination.and_then(|p| p.limit);
            next.pagination = Some(Pagination {
                page: Some(1),
                limit,
            });
        }

        self.record(next, "apply")
    }

    /// Replace the current state wholesale
    pub fn replace(&mut self, state: FilterState) -> &FilterState {
        self.record(state, "replace")
    }

    /// Clear every filter
    pub fn clear(&mut self) -> &FilterState {
        self.record(clear_all_filters(), "clear")
    }

    /// Move to another page, keeping the filters
    pub fn go_to_page(&mut self, page: u32) -> &FilterState {
        let patch = FilterState {
            pagination: Some(Pagination::page_only(page)),
            ..Default::default()
        };
        let next = merge_filter_states(self.current(), &patch);
        self.record(next, "page")
    }

    fn record(&mut self, state: FilterState, label: &str) -> &FilterState {
        if state == *self.current() {
            return self.current();
        }

        self.history.truncate(self.cursor + 1);
        self.history.push_back(FilterHistoryEntry {
            state,
            label: label.to_string(),
            recorded_at: Utc::now(),
        });
        while self.history.len() > self.max_history {
            self.history.pop_front();
        }
        self.cursor = self.history.len() - 1;

        tracing::debug!(label = %label, position = self.cursor, "Recorded filter state");
        self.current()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.history.len()
    }

    /// Step back, returning the restored state
    pub fn undo(&mut self) -> Option<&FilterState> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward again after an undo
    pub fn redo(&mut self) -> Option<&FilterState> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Recorded entries, oldest first
    pub fn history(&self) -> impl Iterator<Item = &FilterHistoryEntry> {
        self.history.iter()
    }

    /// Save the current state under `name`, replacing any preset of that name
    pub fn save_preset(&mut self, name: impl Into<String>) -> &FilterPreset {
        let name = name.into();
        let preset = FilterPreset {
            name: name.clone(),
            filters: self.current().clone(),
            created_at: Utc::now(),
        };
        match self.presets.entry(name) {
            Entry::Occupied(mut slot) => {
                slot.insert(preset);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(preset),
        }
    }

    /// Make the preset's filters current; `None` if no such preset exists
    pub fn load_preset(&mut self, name: &str) -> Option<&FilterState> {
        let filters = self.presets.get(name)?.filters.clone();
        Some(self.record(filters, "preset"))
    }

    pub fn delete_preset(&mut self, name: &str) -> Option<FilterPreset> {
        self.presets.remove(name)
    }

    /// Presets ordered by name
    pub fn presets(&self) -> impl Iterator<Item = &FilterPreset> {
        self.presets.values()
    }

    /// Serialize every preset as a JSON array
    pub fn presets_to_json(&self) -> Result<String, ValidationError> {
        let presets: Vec<&FilterPreset> = self.presets.values().collect();
        serde_json::to_string(&presets).map_err(|e| ValidationError::InvalidJson {
            message: e.to_string(),
        })
    }

    /// Load presets from a JSON array, replacing presets of the same name
    ///
    /// Returns how many presets were loaded.
    pub fn load_presets_json(&mut self, json: &str) -> Result<usize, ValidationError> {
        let presets: Vec<FilterPreset> =
            serde_json::from_str(json).map_err(|e| ValidationError::InvalidJson {
                message: e.to_string(),
            })?;
        let count = presets.len();
        for preset in presets {
            self.presets.insert(preset.name.clone(), preset);
        }
        Ok(count)
    }
}
