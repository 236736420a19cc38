//! Generic algorithms over the nested dataset.
//!
//! Three operations the signal store leans on:
//!
//! - [`min_value`] - minimum numeric value across arbitrary nesting for a
//!   set of keys; seeds the loaded reference timestamp.
//! - [`merge`] - non-destructive recursive merge of two dataset values;
//!   used when folding script results into the custom-signals group.
//! - [`format_insight`] - renders a flat name/value mapping as aligned text
//!   for the data-insight display.
//!
//! The min-value walk uses an explicit work stack rather than recursion so
//! that pathological nesting depth cannot exhaust the call stack.

use crate::types::{Dataset, Value};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Minimum numeric value found under any of `keys`, across all nesting levels.
///
/// For a matched key the candidate is the first element of a series, or the
/// scalar itself. Struct-valued matches contribute nothing, as do empty or
/// non-finite candidates. Returns `None` when no candidate exists.
pub fn min_value(data: &Dataset, keys: &HashSet<&str>) -> Option<f64> {
    let mut minimum: Option<f64> = None;
    // Work stack of struct mappings still to be scanned
    let mut stack: Vec<&Dataset> = vec![data];

    while let Some(map) = stack.pop() {
        for (key, value) in map {
            if keys.contains(key.as_str()) {
                if let Some(candidate) = first_numeric(value) {
                    if candidate.is_finite()
                        && minimum.is_none_or(|current| candidate < current)
                    {
                        minimum = Some(candidate);
                    }
                }
            }
            match value {
                Value::Struct(inner) => stack.push(inner),
                Value::List(elements) => {
                    for element in elements {
                        if let Value::Struct(inner) = element {
                            stack.push(inner);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    minimum
}

/// First element of a series, or the scalar itself
fn first_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Series(values) => values.first().copied(),
        Value::Scalar(scalar) => Some(*scalar),
        _ => None,
    }
}

/// Merge `overlay` onto `base` without mutating either input.
///
/// Keys present in both sides merge recursively when both values are
/// structs; otherwise the overlay's value wins. Key order follows the base,
/// with overlay-only keys appended in overlay order.
pub fn merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Struct(base_map), Value::Struct(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match merged.get(key) {
                    Some(base_value) => merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Struct(merged)
        }
        _ => overlay.clone(),
    }
}

/// Render a flat name -> value mapping as aligned `name: value` lines.
///
/// Names are left-aligned to the longest name, values right-aligned with
/// fixed two-decimal precision. An empty mapping yields an empty string.
pub fn format_insight(data: &IndexMap<String, f64>) -> String {
    if data.is_empty() {
        return String::new();
    }

    let name_width = data.keys().map(|name| name.len()).max().unwrap_or(0);
    let rendered: Vec<String> = data.values().map(|v| format!("{:.2}", v)).collect();
    let value_width = rendered.iter().map(|r| r.len()).max().unwrap_or(0);

    data.keys()
        .zip(rendered.iter())
        .map(|(name, value)| {
            format!("{:<nw$}: {:>vw$}", name, value, nw = name_width, vw = value_width)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
