//! End-to-end tests for custom signal functions: script execution, the
//! merge into the dataset's custom group, and selection of the derived
//! signals with their independent time axes.

mod common;

use common::{path, radar_lidar_decoded, write_file};
use quadview_rs::store::{SelectionKind, SignalStore};
use quadview_rs::types::{Value, CUSTOM_GROUP};
use quadview_rs::ScriptEngine;

const DOUBLED_RANGE: &str = r#"
fn doubled_range(data) {
    let radar = data.Radar;
    let y = radar.Range.map(|v| v * 2.0);
    [radar.TimestampLogfile, y]
}
"#;

#[test]
fn test_custom_signals_merge_and_select() {
    let (mut store, _events) = SignalStore::new();
    store.load_decoded(radar_lidar_decoded());
    let engine = ScriptEngine::new();

    let dir = tempfile::tempdir().unwrap();
    let script = write_file(&dir, "custom.rhai", DOUBLED_RANGE);
    let names = store.add_custom_data_points(&engine, &script).unwrap();
    assert_eq!(names, vec!["doubled_range".to_string()]);

    // The derived signal is a {x, y} struct under the custom group
    let group = store
        .dataset()
        .unwrap()
        .get(CUSTOM_GROUP)
        .unwrap()
        .as_struct()
        .unwrap();
    assert!(group.contains_key("doubled_range"));

    // Selecting it needs no TimestampLogfile sibling
    let custom_path = path(&[CUSTOM_GROUP, "doubled_range"]);
    assert!(store.select(&custom_path, SelectionKind::Plot));
    let (ts, val, name) = store.get_signal_data(&custom_path);
    assert_eq!(ts, vec![0.0, 1.0, 2.0]);
    assert_eq!(val, vec![20.0, 22.0, 24.0]);
    assert_eq!(name, "CustomItems/doubled_range");
}

#[test]
fn test_custom_signals_follow_reference_updates() {
    let (mut store, _events) = SignalStore::new();
    store.load_decoded(radar_lidar_decoded());
    let engine = ScriptEngine::new();

    let dir = tempfile::tempdir().unwrap();
    let script = write_file(&dir, "custom.rhai", DOUBLED_RANGE);
    store.add_custom_data_points(&engine, &script).unwrap();

    let custom_path = path(&[CUSTOM_GROUP, "doubled_range"]);
    store.select(&custom_path, SelectionKind::Plot);
    // A plain signal alongside, to prove one walk covers both shapes
    store.select(&path(&["Radar", "Range"]), SelectionKind::Plot);

    assert!(store.update_global_ts_ref(1.0));

    let (custom_ts, _, _) = store.get_signal_data(&custom_path);
    assert_eq!(custom_ts, vec![-1.0, 0.0, 1.0]);
    let (plain_ts, _, _) = store.get_signal_data(&path(&["Radar", "Range"]));
    assert_eq!(plain_ts, vec![-1.0, 0.0, 1.0]);
}

#[test]
fn test_deselect_custom_child_leaves_siblings() {
    let (mut store, _events) = SignalStore::new();
    store.load_decoded(radar_lidar_decoded());
    let engine = ScriptEngine::new();

    let dir = tempfile::tempdir().unwrap();
    let script = write_file(
        &dir,
        "custom.rhai",
        r#"
fn first(data) {
    [data.Radar.TimestampLogfile, data.Radar.Range]
}

fn second(data) {
    [data.Lidar.TimestampLogfile, data.Lidar.Distance]
}
"#,
    );
    store.add_custom_data_points(&engine, &script).unwrap();

    store.select(&path(&[CUSTOM_GROUP, "first"]), SelectionKind::Plot);
    store.select(&path(&[CUSTOM_GROUP, "second"]), SelectionKind::Plot);

    let (removed, name) = store.deselect(&path(&[CUSTOM_GROUP, "first"]), SelectionKind::Plot);
    assert!(removed);
    assert_eq!(name, "CustomItems/first");
    assert!(store.is_selected(&path(&[CUSTOM_GROUP, "second"]), SelectionKind::Plot));

    // Removing the last custom child drops the bookkeeping entry too
    store.deselect(&path(&[CUSTOM_GROUP, "second"]), SelectionKind::Plot);
    assert!(!store.plot_selection().contains_key(CUSTOM_GROUP));
}

#[test]
fn test_second_script_updates_without_clobbering_the_group() {
    let (mut store, _events) = SignalStore::new();
    store.load_decoded(radar_lidar_decoded());
    let engine = ScriptEngine::new();
    let dir = tempfile::tempdir().unwrap();

    let first = write_file(&dir, "first.rhai", DOUBLED_RANGE);
    store.add_custom_data_points(&engine, &first).unwrap();

    // Same function name with new content, plus a brand new function
    let second = write_file(
        &dir,
        "second.rhai",
        r#"
fn doubled_range(data) {
    [data.Radar.TimestampLogfile, data.Radar.Range.map(|v| v * 4.0)]
}

fn lidar_offset(data) {
    [data.Lidar.TimestampLogfile, data.Lidar.Distance.map(|v| v + 100.0)]
}
"#,
    );
    store.add_custom_data_points(&engine, &second).unwrap();

    let group = store
        .dataset()
        .unwrap()
        .get(CUSTOM_GROUP)
        .unwrap()
        .as_struct()
        .unwrap();
    assert_eq!(group.len(), 2);

    let doubled = group.get("doubled_range").unwrap().as_struct().unwrap();
    assert_eq!(
        doubled.get("y"),
        Some(&Value::Series(vec![40.0, 44.0, 48.0]))
    );
    assert!(group.contains_key("lidar_offset"));
}

#[test]
fn test_failing_scripts_do_not_disturb_the_session() {
    let (mut store, _events) = SignalStore::new();
    store.load_decoded(radar_lidar_decoded());
    let engine = ScriptEngine::new();
    let dir = tempfile::tempdir().unwrap();

    // Compilation failure: error surfaces, dataset untouched
    let broken = write_file(&dir, "broken.rhai", "fn nope(data) { [1.0, ");
    assert!(store.add_custom_data_points(&engine, &broken).is_err());
    assert!(!store.dataset().unwrap().contains_key(CUSTOM_GROUP));

    // All candidates fail at runtime: empty result, no custom group
    let hostile = write_file(
        &dir,
        "hostile.rhai",
        r#"
fn exploding(data) {
    throw "boom";
}
"#,
    );
    let names = store.add_custom_data_points(&engine, &hostile).unwrap();
    assert!(names.is_empty());
    assert!(!store.dataset().unwrap().contains_key(CUSTOM_GROUP));
}
