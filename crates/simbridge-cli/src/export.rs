//! `export-hdmap` – JSON map description to Apollo map files.
//!
//! The input mirrors the `apollo.hdmap.Map` field names; enums may be given
//! by number or by name and unknown members are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use simbridge_msgs::hdmap::{self, Map};
use simbridge_types::wire::json;
use simbridge_types::{Dialect, Message};

/// What was written, for the summary line.
#[derive(Debug)]
pub struct Exported {
    pub path: PathBuf,
    pub lanes: usize,
    pub bytes: usize,
}

/// File name Apollo looks for in a map directory.
pub fn default_file_name(binary: bool) -> &'static str {
    if binary { "base_map.bin" } else { "base_map.txt" }
}

/// Read the JSON map at `input` and write it to `output`.  When `output`
/// is an existing directory the Apollo file name is appended.
pub fn export_hdmap(input: &Path, output: &Path, binary: bool) -> Result<Exported, String> {
    let raw = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read map at {}: {}", input.display(), e))?;
    let map = parse_map(&raw)?;

    let path = if output.is_dir() {
        output.join(default_file_name(binary))
    } else {
        output.to_path_buf()
    };
    let contents: Vec<u8> = if binary {
        hdmap::to_bytes(&map).to_vec()
    } else {
        hdmap::to_text(&map).into_bytes()
    };
    fs::write(&path, &contents).map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

    Ok(Exported {
        path,
        lanes: map.lane.len(),
        bytes: contents.len(),
    })
}

pub(crate) fn parse_map(raw: &str) -> Result<Map, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| format!("Invalid JSON: {}", e))?;
    let record = json::from_json(&value, Dialect::Protobuf).map_err(|e| format!("Invalid map: {}", e))?;
    Map::decode(&record).map_err(|e| format!("Invalid map: {}", e))
}
