// src/manifest.rs
use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::checksum::compute_blake3;

/// One file on disk, with its size and hash.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FileInfo {
    pub path: String,
    pub size: u64,
    pub blake3: String,
}

/// Computes FileInfo for a file.
pub fn file_info(path: &Path) -> Result<FileInfo> {
    let meta = fs::metadata(path)
        .with_context(|| format!("cannot stat `{}`", path.display()))?;
    let hash = compute_blake3(path)?;
    Ok(FileInfo {
        path: path.to_string_lossy().to_string(),
        size: meta.len(),
        blake3: hash,
    })
}

/// One rendered label image.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LabelEntry {
    pub index: String, // e.g. "0001"
    pub hanzi: String,
    pub pinyin: String,
    pub png: FileInfo,
}

/// Manifest of a whole label batch.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LabelManifest {
    pub source_text: String,
    pub font: String,
    pub hanzi_size: u32,
    pub pinyin_size: u32,
    pub color: String,
    pub created_at: String,
    pub entry_count: usize,
    pub entries: Vec<LabelEntry>,
}

impl LabelManifest {
    pub fn new(
        source_text: &str,
        font: &str,
        hanzi_size: u32,
        pinyin_size: u32,
        color: &str,
        entries: Vec<LabelEntry>,
    ) -> Self {
        Self {
            source_text: source_text.to_string(),
            font: font.to_string(),
            hanzi_size,
            pinyin_size,
            color: color.to_string(),
            created_at: Local::now().to_rfc3339(),
            entry_count: entries.len(),
            entries,
        }
    }

    /// Writes manifest.json and checksums.txt into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create `{}`", dir.display()))?;

        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join("manifest.json"), json)?;

        let mut checksums = String::new();
        for entry in &self.entries {
            checksums.push_str(&format!("{}  {}\n", entry.png.blake3, entry.png.path));
        }
        fs::write(dir.join("checksums.txt"), checksums)?;
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join("manifest.json");
        let text = fs::read_to_string(&path)
            .with_context(|| format!("cannot read `{}`", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("bad manifest `{}`", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(name);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn manifest_round_trips_through_disk() {
        let dir = scratch_dir("poemstudio_manifest_test");
        let png = dir.join("0001_好.png");
        fs::write(&png, b"not really a png").unwrap();

        let entry = LabelEntry {
            index: "0001".to_string(),
            hanzi: "好".to_string(),
            pinyin: "hao3".to_string(),
            png: file_info(&png).unwrap(),
        };
        let manifest =
            LabelManifest::new("好雨知时节", "test.ttf", 60, 16, "#ff0000", vec![entry]);
        manifest.write(&dir).unwrap();

        let back = LabelManifest::read(&dir).unwrap();
        assert_eq!(back.entry_count, 1);
        assert_eq!(back.entries[0].pinyin, "hao3");
        assert_eq!(back.entries[0].png.blake3, manifest.entries[0].png.blake3);

        let checksums = fs::read_to_string(dir.join("checksums.txt")).unwrap();
        let line = format!(
            "{}  {}\n",
            manifest.entries[0].png.blake3, manifest.entries[0].png.path
        );
        assert!(checksums.contains(&line));

        fs::remove_dir_all(&dir).ok();
    }
}
