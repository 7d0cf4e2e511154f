//! Per-field rule checks
//!
//! Each check returns `Err(message)` on the first rule the field violates.

use chrono::NaiveDate;

use super::FieldRule;
use crate::core::state::{DateRange, FieldRef, NumericRange};

/// Run every rule of `rule` against one field, stopping at the first failure
pub fn check_field(field: &str, value: Option<FieldRef<'_>>, rule: &FieldRule) -> Result<(), String> {
    let Some(value) = value else {
        return if rule.required {
            Err(format!("{} is required", field))
        } else {
            Ok(())
        };
    };

    if let Some(max) = rule.max_length {
        max_length(field, value, max)?;
    }
    if let Some(allowed) = &rule.allowed_values {
        allowed_values(field, value, allowed)?;
    }
    if let Some(format) = &rule.date_format {
        date_format(field, value, format)?;
    }
    if rule.ordered {
        ordered(field, value)?;
    }
    Ok(())
}

/// Validator: text must not exceed `max` characters
pub fn max_length(field: &str, value: FieldRef<'_>, max: usize) -> Result<(), String> {
    match value {
        FieldRef::Text(s) if s.chars().count() > max => {
            Err(format!("{} exceeds maximum length", field))
        }
        _ => Ok(()),
    }
}

/// Validator: every value must be in the allowed list
pub fn allowed_values(field: &str, value: FieldRef<'_>, allowed: &[String]) -> Result<(), String> {
    let is_allowed = |v: &str| allowed.iter().any(|a| a == v);
    let valid = match value {
        FieldRef::List(values) => values.iter().all(|v| is_allowed(v.as_str())),
        FieldRef::Text(s) => is_allowed(s),
        FieldRef::Sorting(sorting) => is_allowed(sorting.field.as_str()),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(format!("{} contains invalid values", field))
    }
}

/// Validator: every non-empty date bound must parse with `format`
pub fn date_format(field: &str, value: FieldRef<'_>, format: &str) -> Result<(), String> {
    let FieldRef::DateRange(range) = value else {
        return Ok(());
    };

    let parses = |bound: &Option<String>| match bound.as_deref() {
        Some(s) if !s.is_empty() => NaiveDate::parse_from_str(s, format).is_ok(),
        _ => true,
    };

    if parses(&range.start) && parses(&range.end) {
        Ok(())
    } else {
        Err(format!("{} contains an invalid date", field))
    }
}

/// Validator: range bounds must not be inverted
pub fn ordered(field: &str, value: FieldRef<'_>) -> Result<(), String> {
    let inverted = match value {
        FieldRef::DateRange(range) => date_range_inverted(range),
        FieldRef::NumericRange(range) => numeric_range_inverted(range),
        _ => false,
    };

    if inverted {
        Err(format!("{} has an inverted range", field))
    } else {
        Ok(())
    }
}

// ISO-8601 dates compare correctly as strings
fn date_range_inverted(range: &DateRange) -> bool {
    match (range.start.as_deref(), range.end.as_deref()) {
        (Some(start), Some(end)) if !start.is_empty() && !end.is_empty() => start > end,
        _ => false,
    }
}

fn numeric_range_inverted(range: &NumericRange) -> bool {
    match (range.min, range.max) {
        (Some(min), Some(max)) => min > max,
        _ => false,
    }
}
