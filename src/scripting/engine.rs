//! Rhai engine for user-supplied signal functions.
//!
//! ## Script contract
//!
//! Every public function taking exactly one parameter is a candidate. It
//! receives the loaded dataset as a nested map and must return a
//! two-element array `[x, y]` of numeric arrays (scalars are accepted and
//! treated as one-element arrays). Anything else (wrong arity, private
//! functions, wrong return shape, empty series, a thrown error) skips
//! that one candidate and leaves the rest of the batch untouched.
//!
//! ```text
//! fn range_squared(data) {
//!     let radar = data.Radar;
//!     let y = radar.Range.map(|v| v * v);
//!     [radar.TimestampLogfile, y]
//! }
//! ```
//!
//! ## Isolation
//!
//! Each candidate is invoked against a freshly built map converted from
//! the dataset. The conversion is the deep copy, so scripts can mutate
//! their argument freely without ever touching application state.

use crate::error::{QuadViewError, Result};
use crate::types::{Dataset, Value, XySeries};
use indexmap::IndexMap;
use rhai::{Dynamic, Engine, FnAccess, Scope, AST};
use std::path::Path;

/// Engine for loading and running custom signal scripts
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    /// Create an engine with safety limits configured
    pub fn new() -> Self {
        let mut engine = Engine::new();
        // Generous limits: scripts legitimately loop over long recordings,
        // but unbounded execution must stay impossible
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(50_000_000);
        engine.set_max_string_size(100_000);
        engine.set_max_array_size(10_000_000);
        engine.set_max_map_size(100_000);
        Self { engine }
    }

    /// Compile `path` and run every candidate function against `data`.
    ///
    /// Returns the surviving results keyed by function name, in script
    /// declaration order. Compilation failure is an error; individual
    /// candidate failures are logged and skipped.
    pub fn load(&self, path: &Path, data: &Dataset) -> Result<IndexMap<String, XySeries>> {
        let ast = self
            .engine
            .compile_file(path.to_path_buf())
            .map_err(|e| QuadViewError::Script(format!("{}: {}", path.display(), e)))?;

        let candidates = Self::candidates(&ast);
        tracing::info!(
            script = %path.display(),
            candidates = candidates.len(),
            "running custom signal functions"
        );

        let mut results = IndexMap::new();
        for name in candidates {
            let argument = dataset_to_dynamic(data);
            let mut scope = Scope::new();
            match self
                .engine
                .call_fn::<Dynamic>(&mut scope, &ast, &name, (argument,))
            {
                Ok(returned) => match normalize_xy(returned) {
                    Some(series) => {
                        results.insert(name, series);
                    }
                    None => {
                        tracing::warn!(
                            function = %name,
                            script = %path.display(),
                            "custom function did not return a usable [x, y] pair, skipping"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        function = %name,
                        script = %path.display(),
                        error = %e,
                        "custom function failed, skipping"
                    );
                }
            }
        }

        Ok(results)
    }

    /// Names of public unary functions declared by the script
    fn candidates(ast: &AST) -> Vec<String> {
        ast.iter_functions()
            .filter(|f| f.access == FnAccess::Public && f.params.len() == 1)
            .map(|f| f.name.to_string())
            .collect()
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine").finish()
    }
}

/// Convert the dataset into a fresh Rhai map (this IS the deep copy)
fn dataset_to_dynamic(data: &Dataset) -> Dynamic {
    let mut map = rhai::Map::new();
    for (key, value) in data {
        map.insert(key.as_str().into(), value_to_dynamic(value));
    }
    Dynamic::from_map(map)
}

fn value_to_dynamic(value: &Value) -> Dynamic {
    match value {
        Value::Struct(inner) => dataset_to_dynamic(inner),
        Value::List(elements) => {
            let array: rhai::Array = elements.iter().map(value_to_dynamic).collect();
            Dynamic::from_array(array)
        }
        Value::Series(values) => {
            let array: rhai::Array = values.iter().map(|v| Dynamic::from_float(*v)).collect();
            Dynamic::from_array(array)
        }
        Value::Scalar(scalar) => Dynamic::from_float(*scalar),
    }
}

/// Validate and coerce a script return value into an [`XySeries`].
///
/// The value must be a two-element array; each element either a numeric
/// array or a bare number (coerced to a one-element series). Empty series
/// and non-numeric content are rejected.
fn normalize_xy(returned: Dynamic) -> Option<XySeries> {
    let pair = returned.try_cast::<rhai::Array>()?;
    if pair.len() != 2 {
        return None;
    }
    let x = coerce_series(&pair[0])?;
    let y = coerce_series(&pair[1])?;
    if x.is_empty() || y.is_empty() {
        return None;
    }
    Some(XySeries { x, y })
}

fn coerce_series(value: &Dynamic) -> Option<Vec<f64>> {
    if let Some(number) = coerce_number(value) {
        return Some(vec![number]);
    }
    let array = value.clone().try_cast::<rhai::Array>()?;
    array.iter().map(coerce_number).collect()
}

fn coerce_number(value: &Dynamic) -> Option<f64> {
    if let Ok(f) = value.as_float() {
        Some(f)
    } else if let Ok(i) = value.as_int() {
        Some(i as f64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_script(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("custom.rhai");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn radar_dataset() -> Dataset {
        let mut radar = Dataset::new();
        radar.insert(
            "TimestampLogfile".into(),
            Value::Series(vec![0.0, 1.0, 2.0]),
        );
        radar.insert("Range".into(), Value::Series(vec![10.0, 11.0, 12.0]));
        let mut data = Dataset::new();
        data.insert("Radar".into(), Value::Struct(radar));
        data
    }

    #[test]
    fn test_load_discovers_unary_public_functions_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            r#"
fn doubled_range(data) {
    let radar = data.Radar;
    let y = radar.Range.map(|v| v * 2.0);
    [radar.TimestampLogfile, y]
}

fn two_args(data, extra) {
    [data.Radar.TimestampLogfile, data.Radar.Range]
}

private fn hidden(data) {
    [data.Radar.TimestampLogfile, data.Radar.Range]
}
"#,
        );

        let engine = ScriptEngine::new();
        let results = engine.load(&path, &radar_dataset()).unwrap();
        assert_eq!(results.len(), 1);
        let series = results.get("doubled_range").unwrap();
        assert_eq!(series.x, vec![0.0, 1.0, 2.0]);
        assert_eq!(series.y, vec![20.0, 22.0, 24.0]);
    }

    #[test]
    fn test_load_isolates_failing_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            r#"
fn exploding(data) {
    throw "boom";
}

fn wrong_shape(data) {
    42.0
}

fn healthy(data) {
    [data.Radar.TimestampLogfile, data.Radar.Range]
}
"#,
        );

        let engine = ScriptEngine::new();
        let results = engine.load(&path, &radar_dataset()).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("healthy"));
    }

    #[test]
    fn test_load_coerces_scalars_and_discards_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            r#"
fn point(data) {
    [1.5, 40]
}

fn empty_x(data) {
    [[], data.Radar.Range]
}
"#,
        );

        let engine = ScriptEngine::new();
        let results = engine.load(&path, &radar_dataset()).unwrap();
        assert_eq!(results.len(), 1);
        let point = results.get("point").unwrap();
        assert_eq!(point.x, vec![1.5]);
        assert_eq!(point.y, vec![40.0]);
    }

    #[test]
    fn test_load_mutations_never_reach_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(
            &dir,
            r#"
fn vandal(data) {
    data.Radar.Range[0] = -999.0;
    [data.Radar.TimestampLogfile, data.Radar.Range]
}
"#,
        );

        let engine = ScriptEngine::new();
        let data = radar_dataset();
        let results = engine.load(&path, &data).unwrap();
        // The script saw (and returned) its own mutated copy...
        assert_eq!(results.get("vandal").unwrap().y[0], -999.0);
        // ...but the live dataset is untouched
        let radar = data.get("Radar").unwrap().as_struct().unwrap();
        assert_eq!(radar.get("Range"), Some(&Value::Series(vec![10.0, 11.0, 12.0])));
    }

    #[test]
    fn test_load_compile_error_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_script(&dir, "fn broken(data) { [1.0, ");

        let engine = ScriptEngine::new();
        let err = engine.load(&path, &radar_dataset()).unwrap_err();
        assert!(matches!(err, QuadViewError::Script(_)));
    }
}
