//! Converts a raw MAT field tree into the application dataset.
//!
//! The conversion is iterative, driven by an explicit work-list of pending
//! struct frames, so deeply nested recordings cannot exhaust the call stack.
//! Keys are ordered case-insensitively at every nesting level; the
//! ordering is stable and reproducible because the tree index derives its
//! display order from it.

use crate::loader::mat_source::{RawField, RawMat};
use crate::types::{Dataset, Value};

/// Format versions at or above this load fine but are flagged unverified
pub const UNVERIFIED_VERSION: f64 = 7.3;

/// Reserved top-level metadata fields, dropped if a source leaks them
const RESERVED_FIELDS: [&str; 3] = ["__header__", "__version__", "__globals__"];

/// Result of decoding a raw MAT tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMat {
    /// The decoded dataset
    pub data: Dataset,
    /// True when the source format version is untested territory;
    /// callers should warn and carry on
    pub unverified: bool,
}

/// Address of a struct inside the partially built dataset
#[derive(Debug, Clone)]
enum Slot {
    Key(String),
    Index(usize),
}

/// Decode a raw MAT tree into a [`DecodedMat`].
pub fn decode(raw: RawMat) -> DecodedMat {
    let unverified = raw.version.is_some_and(|v| v >= UNVERIFIED_VERSION);

    let mut data = Dataset::new();
    // Work-list of (address of target struct, its unprocessed fields)
    let mut stack: Vec<(Vec<Slot>, Vec<(String, RawField)>)> = vec![(Vec::new(), raw.fields)];

    while let Some((prefix, mut fields)) = stack.pop() {
        fields.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

        for (name, field) in fields {
            if prefix.is_empty() && RESERVED_FIELDS.contains(&name.as_str()) {
                continue;
            }
            let Some(target) = target_struct(&mut data, &prefix) else {
                // The frame's parent vanished; only possible if a source
                // produced colliding keys of different shapes
                tracing::warn!(field = %name, "decode target disappeared, dropping field");
                continue;
            };

            match field {
                RawField::Struct(inner) => {
                    insert_unique(target, name.clone(), Value::Struct(Dataset::new()));
                    let mut child = prefix.clone();
                    child.push(Slot::Key(name));
                    stack.push((child, inner));
                }
                RawField::StructArray(elements) => {
                    let mut list = Vec::with_capacity(elements.len());
                    let mut pending = Vec::new();
                    for (index, element) in elements.into_iter().enumerate() {
                        match element {
                            RawField::Struct(inner) => {
                                list.push(Value::Struct(Dataset::new()));
                                pending.push((index, inner));
                            }
                            RawField::Series(values) => list.push(Value::Series(values)),
                            RawField::Scalar(scalar) => list.push(Value::Scalar(scalar)),
                            RawField::StructArray(_) => {
                                tracing::warn!(
                                    field = %name,
                                    index,
                                    "nested struct arrays are not supported, dropping element"
                                );
                                list.push(Value::Struct(Dataset::new()));
                            }
                        }
                    }
                    insert_unique(target, name.clone(), Value::List(list));
                    for (index, inner) in pending {
                        let mut child = prefix.clone();
                        child.push(Slot::Key(name.clone()));
                        child.push(Slot::Index(index));
                        stack.push((child, inner));
                    }
                }
                RawField::Series(values) => {
                    insert_unique(target, name, Value::Series(values));
                }
                RawField::Scalar(scalar) => {
                    insert_unique(target, name, Value::Scalar(scalar));
                }
            }
        }
    }

    DecodedMat { data, unverified }
}

/// Navigate to the struct addressed by `prefix`
fn target_struct<'a>(data: &'a mut Dataset, prefix: &[Slot]) -> Option<&'a mut Dataset> {
    let mut slots = prefix.iter();
    let Some(first) = slots.next() else {
        return Some(data);
    };
    let Slot::Key(key) = first else {
        return None;
    };
    let mut value = data.get_mut(key)?;
    for slot in slots {
        value = match slot {
            Slot::Key(key) => match value {
                Value::Struct(map) => map.get_mut(key)?,
                _ => return None,
            },
            Slot::Index(index) => match value {
                Value::List(list) => list.get_mut(*index)?,
                _ => return None,
            },
        };
    }
    match value {
        Value::Struct(map) => Some(map),
        _ => None,
    }
}

/// Insert keeping keys case-insensitively unique.
///
/// A case-variant collision replaces the value under the first-seen key
/// name, so display casing stays deterministic.
fn insert_unique(map: &mut Dataset, name: String, value: Value) {
    let existing = map
        .keys()
        .find(|key| key.to_lowercase() == name.to_lowercase())
        .cloned();
    match existing {
        Some(key) => {
            if key != name {
                tracing::debug!(kept = %key, dropped = %name, "case-variant key collision");
            }
            map.insert(key, value);
        }
        None => {
            map.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sorts_keys_case_insensitively() {
        let raw = RawMat {
            version: Some(5.0),
            fields: vec![
                ("zeta".into(), RawField::Scalar(1.0)),
                ("Alpha".into(), RawField::Scalar(2.0)),
                ("beta".into(), RawField::Scalar(3.0)),
            ],
        };
        let decoded = decode(raw);
        let keys: Vec<&str> = decoded.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Alpha", "beta", "zeta"]);
        assert!(!decoded.unverified);
    }

    #[test]
    fn test_decode_nested_struct_ordering() {
        let raw = RawMat {
            version: None,
            fields: vec![(
                "Radar".into(),
                RawField::Struct(vec![
                    ("range".into(), RawField::Series(vec![1.0])),
                    ("Azimuth".into(), RawField::Series(vec![2.0])),
                ]),
            )],
        };
        let decoded = decode(raw);
        let radar = decoded.data.get("Radar").unwrap().as_struct().unwrap();
        let keys: Vec<&str> = radar.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Azimuth", "range"]);
    }

    #[test]
    fn test_decode_strips_reserved_fields() {
        let raw = RawMat {
            version: Some(5.0),
            fields: vec![
                ("__header__".into(), RawField::Scalar(0.0)),
                ("__globals__".into(), RawField::Scalar(0.0)),
                ("Radar".into(), RawField::Struct(vec![])),
            ],
        };
        let decoded = decode(raw);
        let keys: Vec<&str> = decoded.data.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Radar"]);
    }

    #[test]
    fn test_decode_case_variant_collision_keeps_first_key() {
        let raw = RawMat {
            version: None,
            fields: vec![
                ("Radar".into(), RawField::Scalar(1.0)),
                ("RADAR".into(), RawField::Scalar(2.0)),
            ],
        };
        let decoded = decode(raw);
        assert_eq!(decoded.data.len(), 1);
        // Stable sort keeps reader order among case-variants; the second
        // occurrence overwrites the value under the first-seen name
        assert_eq!(decoded.data.get("Radar"), Some(&Value::Scalar(2.0)));
    }

    #[test]
    fn test_decode_struct_array_elements() {
        let raw = RawMat {
            version: None,
            fields: vec![(
                "Tracks".into(),
                RawField::StructArray(vec![
                    RawField::Struct(vec![("id".into(), RawField::Scalar(1.0))]),
                    RawField::Struct(vec![("id".into(), RawField::Scalar(2.0))]),
                ]),
            )],
        };
        let decoded = decode(raw);
        let Value::List(tracks) = decoded.data.get("Tracks").unwrap() else {
            panic!("expected a list");
        };
        assert_eq!(tracks.len(), 2);
        let second = tracks[1].as_struct().unwrap();
        assert_eq!(second.get("id"), Some(&Value::Scalar(2.0)));
    }

    #[test]
    fn test_decode_flags_unverified_versions() {
        let raw = RawMat {
            version: Some(7.3),
            fields: vec![("A".into(), RawField::Scalar(1.0))],
        };
        let decoded = decode(raw);
        assert!(decoded.unverified);
        assert_eq!(decoded.data.len(), 1);
    }
}
