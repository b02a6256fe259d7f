//! Integration tests for save snapshots, loading and document archives.
//!
//! Tests cover:
//! - `save` snapshots and their JSON shape
//! - `load_save` validation, plugin slot reconciliation and hooks
//! - Writing and reading tar.zst document archives

mod common;

use std::fs::{self, File};

use common::*;
use mapchron::core::archive::FORMAT_VERSION;
use mapchron::core::{build_region_dict, make_scenario_entry};
use serde_json::json;

fn painted_save() -> anyhow::Result<SaveData> {
    let Harness { mut core, .. } = harness();
    core.assign_regions(&[3, 5])?;
    core.update_event("Painted")?;
    core.add_entry(1)?;
    core.set_color_bar_color(BLUE);
    core.assign_regions(&[5, 6])?;
    Ok(core.save())
}

#[test]
fn test_save_uses_document_json_shape() -> anyhow::Result<()> {
    let save = painted_save()?;
    let value = serde_json::to_value(&save)?;

    assert_eq!(value["scenarioData"].as_array().map(Vec::len), Some(3));
    assert_eq!(value["scenarioData"][0]["event"], json!("Painted"));
    assert_eq!(value["scenarioData"][0]["regionDict"]["3"]["color"], json!("#ff0000"));
    assert_eq!(value["scenarioData"][0]["regionDict"]["4"]["color"], json!(null));
    assert_eq!(value["colorData"][1], json!({ "#ff0000": 1, "#0000ff": 2 }));
    assert_eq!(value["pluginData"], json!({}));

    let parsed: SaveData = serde_json::from_value(value)?;
    assert_eq!(parsed, save);

    Ok(())
}

#[test]
fn test_save_snapshot_is_isolated_from_later_edits() -> anyhow::Result<()> {
    let Harness { mut core, .. } = harness();
    core.assign_regions(&[1])?;

    let snapshot = core.save();
    assert!(snapshot.scenario_data[0].shares_regions_with(&core.entries()[0]));

    core.assign_regions(&[2])?;
    core.update_event("Later")?;

    assert_eq!(snapshot.scenario_data[0].region_color(2), None);
    assert_eq!(snapshot.scenario_data[0].event, "An Event");
    assert_eq!(snapshot.color_data[0].count(RED), 1);
    assert!(!snapshot.scenario_data[0].shares_regions_with(&core.entries()[0]));

    Ok(())
}

#[test]
fn test_load_save_replaces_document_and_resets_active() -> anyhow::Result<()> {
    let save = painted_save()?;
    let Harness { mut core, .. } = harness();
    core.update_active_entry(1)?;

    core.load_save(save.clone())?;

    assert_eq!(core.entries().len(), 3);
    assert_eq!(core.active_entry(), 0);
    assert_eq!(core.get_region_color_by_index(3), Some(RED));
    assert_eq!(core.entries()[1].region_color(6), Some(BLUE));
    assert_eq!(core.save(), save);
    assert_usage_consistent(&core);

    Ok(())
}

#[test]
fn test_load_save_hooks_after_repaint() -> anyhow::Result<()> {
    let save = painted_save()?;
    let trace = new_trace();
    let plugins = PluginRegistry::new().with(tracing_plugin("rec", &trace))?;
    let Harness { mut core, .. } = harness_with(plugins, trace.clone());

    core.load_save(save)?;

    assert_eq!(
        *trace.borrow(),
        vec!["resync:all", "rec:onLoadSave:3", "rec:onUpdateActiveEntry:0"]
    );

    Ok(())
}

#[test]
fn test_load_save_reconciles_plugin_slots() -> anyhow::Result<()> {
    let mut save = painted_save()?;
    save.plugin_data.insert("retired".to_string(), json!({ "old": true }));

    let trace = new_trace();
    let plugins = PluginRegistry::new().with(tracing_plugin("rec", &trace))?;
    let Harness { mut core, .. } = harness_with(plugins, trace);
    core.update_plugin_data("rec", json!("stale"))?;

    core.load_save(save)?;

    // Unregistered slots are kept as given, missing ones initialised from the loaded scenario
    assert_eq!(core.plugin_data_of("retired"), Some(&json!({ "old": true })));
    assert_eq!(core.plugin_data_of("rec"), Some(&json!({ "entries": 3 })));

    // Saving again still carries the unregistered slot
    assert_eq!(core.save().plugin_data["retired"], json!({ "old": true }));

    // A slot present in the save wins over initialisation
    let mut save = core.save();
    save.plugin_data.insert("rec".to_string(), json!({ "kept": 1 }));
    core.load_save(save)?;
    assert_eq!(core.plugin_data_of("rec"), Some(&json!({ "kept": 1 })));

    Ok(())
}

#[test]
fn test_load_save_keeps_plugin_data_of_unknown_plugins() -> anyhow::Result<()> {
    let mut save = painted_save()?;
    save.plugin_data.insert("other".to_string(), json!({ "k": 1 }));

    let Harness { mut core, .. } = harness();
    core.load_save(save.clone())?;

    assert_eq!(core.plugin_data(), &save.plugin_data);
    assert_eq!(core.save(), save);

    Ok(())
}

#[test]
fn test_invalid_saves_leave_state_untouched() -> anyhow::Result<()> {
    let Harness { mut core, map_calls, .. } = harness();
    core.assign_regions(&[0])?;
    let before = core.save();
    map_calls.borrow_mut().clear();

    // 1. Empty document
    let empty = SaveData {
        scenario_data: Vec::new(),
        color_data: Vec::new(),
        plugin_data: Default::default(),
    };

    // 2. One usage record short
    let mut misaligned = painted_save()?;
    misaligned.color_data.pop();

    // 3. Usage counts that do not match the regions
    let mut drifted = painted_save()?;
    drifted.color_data.swap(0, 2);

    // 4. Entries built for a different base map
    let small = build_region_dict(&sample_basemap(4));
    let foreign = SaveData {
        scenario_data: vec![make_scenario_entry(&small, "", "")],
        color_data: vec![ColorUsage::default()],
        plugin_data: Default::default(),
    };

    for save in [empty, misaligned, drifted, foreign] {
        let result = core.load_save(save);
        assert!(matches!(result, Err(CoreError::InvalidSave(_))), "{:?}", result);
        assert_eq!(core.save(), before);
    }
    assert!(map_calls.borrow().is_empty());

    Ok(())
}

#[test]
fn test_save_data_accepts_missing_plugin_data() -> anyhow::Result<()> {
    let mut value = serde_json::to_value(painted_save()?)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("pluginData");
    }

    let save: SaveData = serde_json::from_value(value)?;
    assert!(save.plugin_data.is_empty());

    let Harness { mut core, .. } = harness();
    core.load_save(save)?;
    assert_eq!(core.entries().len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_document_archive_round_trip() -> anyhow::Result<()> {
    // 1. Save into a nested directory that does not exist yet
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("maps").join("europe.mapchron");
    let save = painted_save()?;

    let written = save_document(&path, &save).await?;
    assert_eq!(written.format, FORMAT_VERSION);
    written.saved_at()?;

    // 2. Only the final file is left behind
    let names: Vec<_> = fs::read_dir(path.parent().expect("nested path"))?
        .map(|entry| entry.map(|e| e.file_name()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names, vec![std::ffi::OsString::from("europe.mapchron")]);

    // 3. Read it back and load it into a fresh core
    let document = load_document(&path).await?;
    assert_eq!(document.save, save);
    assert_eq!(document.meta, written);

    let Harness { mut core, .. } = harness();
    core.load_save(document.save)?;
    assert_eq!(core.entries()[0].event, "Painted");

    Ok(())
}

#[tokio::test]
async fn test_saving_again_replaces_document() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("doc.mapchron");

    save_document(&path, &painted_save()?).await?;
    let Harness { core, .. } = harness();
    save_document(&path, &core.save()).await?;

    let document = load_document(&path).await?;
    assert_eq!(document.save, core.save());

    Ok(())
}

#[tokio::test]
async fn test_load_rejects_missing_and_corrupt_files() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;

    // 1. Missing file
    assert!(load_document(dir.path().join("absent.mapchron")).await.is_err());

    // 2. A directory
    assert!(load_document(dir.path()).await.is_err());

    // 3. Not a zstd stream
    let garbage = dir.path().join("garbage.mapchron");
    fs::write(&garbage, b"definitely not an archive")?;
    assert!(load_document(&garbage).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_load_rejects_unknown_format() -> anyhow::Result<()> {
    // Hand-build an archive whose meta names another format
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("future.mapchron");
    let meta = serde_json::to_vec(&json!({
        "format": "mapchron/99",
        "savedAt": "2024-01-01T00:00:00Z"
    }))?;
    let scenario = serde_json::to_vec(&painted_save()?)?;

    let encoder = zstd::stream::write::Encoder::new(File::create(&path)?, 3)?;
    let mut tar = tar::Builder::new(encoder);
    for (name, bytes) in [("meta.json", &meta), ("scenario.json", &scenario)] {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, name, bytes.as_slice())?;
    }
    tar.into_inner()?.finish()?;

    let error = load_document(&path).await.expect_err("format must be rejected");
    assert!(error.to_string().contains("mapchron/99"), "{}", error);

    Ok(())
}
