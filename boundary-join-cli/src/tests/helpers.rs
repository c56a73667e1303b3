//! Test helpers for composing join datasets and layered overrides.

use super::*;
use crate::join::{JoinConfig, resolve_join_config};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

pub(super) const ID_FIELD: &str = "CounDist";

#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) boundaries: Option<String>,
    pub(super) records: Option<String>,
    pub(super) id_field: Option<String>,
}

#[derive(Debug)]
pub(super) struct DatasetFiles {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl DatasetFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        let districts = json!({
            "type": "FeatureCollection",
            "features": [district("1", 0.0, 10.0), district("2", 10.0, 20.0)]
        });
        let records = json!([point(1, 5.0), point(2, 15.0), point(3, 30.0)]);
        for name in ["boundaries.geojson", "config.boundaries.geojson"] {
            write_utf8(&root.join(name), districts.to_string().as_bytes());
        }
        for name in ["records.json", "config.records.json"] {
            write_utf8(&root.join(name), records.to_string().as_bytes());
        }
        let lines: Vec<String> = [point(4, 5.0), point(5, 50.0)]
            .iter()
            .map(Value::to_string)
            .collect();
        write_utf8(&root.join("env.records.jsonl"), lines.join("\n").as_bytes());
        Self { _dir: dir, root }
    }

    pub(super) fn boundaries(&self) -> Utf8PathBuf {
        self.root.join("boundaries.geojson")
    }

    pub(super) fn records(&self) -> Utf8PathBuf {
        self.root.join("records.json")
    }

    pub(super) fn config_boundaries(&self) -> Utf8PathBuf {
        self.root.join("config.boundaries.geojson")
    }

    pub(super) fn config_records(&self) -> Utf8PathBuf {
        self.root.join("config.records.json")
    }

    pub(super) fn env_records(&self) -> Utf8PathBuf {
        self.root.join("env.records.jsonl")
    }

    pub(super) fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("out")
    }
}

fn district(id: &str, min_x: f64, max_x: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": {ID_FIELD: id},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[min_x, 0.0], [max_x, 0.0], [max_x, 10.0], [min_x, 10.0], [min_x, 0.0]]]
        }
    })
}

fn point(id: u32, longitude: f64) -> Value {
    json!({"id": id, "longitude": longitude, "latitude": 5.0})
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    fs::write(path, contents).expect("write fixture");
}

pub(super) fn read_set(root: &Utf8Path, stem: &str) -> Vec<Value> {
    fs::read_to_string(root.join(format!("{stem}.jsonl")))
        .expect("read result set")
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is JSON"))
        .collect()
}

pub(super) fn merge_layers(
    mut cli_args: JoinArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<JoinConfig, CliError> {
    merge_field(
        &mut cli_args.boundaries,
        extract_field(&env_layer, |layer| &layer.boundaries),
        extract_field(&file_layer, |layer| &layer.boundaries),
    );
    merge_field(
        &mut cli_args.records,
        extract_field(&env_layer, |layer| &layer.records),
        extract_field(&file_layer, |layer| &layer.records),
    );
    merge_field(
        &mut cli_args.id_field,
        extract_field(&env_layer, |layer| &layer.id_field),
        extract_field(&file_layer, |layer| &layer.id_field),
    );
    resolve_join_config(cli_args)
}

fn merge_field<T: Clone>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: &Option<LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.as_ref().and_then(|entry| accessor(entry).clone())
}
