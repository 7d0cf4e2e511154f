//! Filter state management: merging, counting, history and presets

pub mod history;
pub mod operations;

pub use history::{DEFAULT_MAX_HISTORY, FilterHistoryEntry, FilterPreset, FilterStateManager};
pub use operations::{
    ChangeKind, FilterChange, FilterChip, clear_all_filters, count_active_filters,
    diff_filter_states, has_active_filters, merge_filter_states, summarize_filters,
};
