//! Replay file storage and slot management.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use super::replay_data::ReplayData;

/// Replay slot (0-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySlot(pub u8);

impl ReplaySlot {
    pub const SLOT_0: Self = Self(0);
    pub const SLOT_1: Self = Self(1);
    pub const SLOT_2: Self = Self(2);
    pub const SLOT_3: Self = Self(3);

    pub fn all() -> [Self; 4] {
        [Self::SLOT_0, Self::SLOT_1, Self::SLOT_2, Self::SLOT_3]
    }
}

/// Get the replay file path for a chart and slot inside `dir`.
pub fn replay_path(dir: &Path, chart_hash: &str, slot: ReplaySlot) -> PathBuf {
    let filename = match slot.0 {
        0 => format!("{chart_hash}.json.gz"),
        n => format!("{chart_hash}_{n}.json.gz"),
    };
    dir.join(filename)
}

/// Write replay data as gzip-compressed JSON. The input log is compressed
/// into `keyinput` first if it is still expanded.
pub fn save_replay_file(data: &ReplayData, path: &Path) -> Result<()> {
    let mut data = data.clone();
    data.shrink().context("Failed to compress input log")?;

    let json = serde_json::to_string(&data).context("Failed to serialize replay data")?;

    let file = File::create(path)
        .with_context(|| format!("Failed to create replay file: {}", path.display()))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(json.as_bytes())
        .context("Failed to write compressed data")?;
    encoder.finish().context("Failed to finish compression")?;

    Ok(())
}

/// Read a replay file written by [`save_replay_file`], with its input log
/// expanded.
pub fn load_replay_file(path: &Path) -> Result<ReplayData> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open replay file: {}", path.display()))?;
    let mut decoder = GzDecoder::new(file);
    let mut json = String::new();
    decoder
        .read_to_string(&mut json)
        .context("Failed to decompress replay data")?;

    let mut data: ReplayData =
        serde_json::from_str(&json).context("Failed to deserialize replay data")?;
    data.expand()
        .with_context(|| format!("Corrupt input log in {}", path.display()))?;

    Ok(data)
}

/// Save replay data to a slot, creating `dir` if needed.
pub fn save_replay(dir: &Path, data: &ReplayData, slot: ReplaySlot) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create replay directory: {}", dir.display()))?;
    }

    let path = replay_path(dir, &data.chart_hash, slot);
    save_replay_file(data, &path)?;
    log::debug!("Saved replay to {}", path.display());
    Ok(path)
}

/// Load replay data from a slot. `Ok(None)` if the slot is empty.
pub fn load_replay(dir: &Path, chart_hash: &str, slot: ReplaySlot) -> Result<Option<ReplayData>> {
    let path = replay_path(dir, chart_hash, slot);
    if !path.exists() {
        return Ok(None);
    }
    load_replay_file(&path).map(Some)
}

/// List readable replays for a chart. Unreadable slots are skipped.
pub fn list_replays(dir: &Path, chart_hash: &str) -> Vec<(ReplaySlot, ReplayData)> {
    let mut replays = Vec::new();

    for slot in ReplaySlot::all() {
        match load_replay(dir, chart_hash, slot) {
            Ok(Some(data)) => replays.push((slot, data)),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping replay slot {}: {e:#}", slot.0),
        }
    }

    replays
}

/// Find the next available slot for a chart.
pub fn find_empty_slot(dir: &Path, chart_hash: &str) -> Option<ReplaySlot> {
    ReplaySlot::all()
        .into_iter()
        .find(|&slot| !replay_path(dir, chart_hash, slot).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strumline_engine::{GameInput, GuitarAction};
    use tempfile::tempdir;

    fn sample_replay() -> ReplayData {
        ReplayData {
            player: "player".to_string(),
            chart_hash: "cafebabe".to_string(),
            inputs: vec![
                GameInput::press(1.0, GuitarAction::GreenFret),
                GameInput::press(1.0, GuitarAction::StrumUp),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_replay_path() {
        let dir = Path::new("replays");
        let path0 = replay_path(dir, "abc123", ReplaySlot::SLOT_0);
        assert!(path0.to_string_lossy().ends_with("abc123.json.gz"));

        let path1 = replay_path(dir, "abc123", ReplaySlot::SLOT_1);
        assert!(path1.to_string_lossy().ends_with("abc123_1.json.gz"));
    }

    #[test]
    fn test_file_io() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("play.json.gz");

        let data = sample_replay();
        save_replay_file(&data, &path).unwrap();
        let loaded = load_replay_file(&path).unwrap();

        assert_eq!(loaded.player, "player");
        assert_eq!(loaded.inputs, data.inputs);
        assert!(loaded.keyinput.is_none());
    }

    #[test]
    fn test_load_rejects_plain_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.json.gz");
        fs::write(&path, sample_replay().to_json().unwrap()).unwrap();

        assert!(load_replay_file(&path).is_err());
    }

    #[test]
    fn test_slots() {
        let dir = tempdir().unwrap();
        let replays = dir.path().join("nested").join("replays");
        let data = sample_replay();

        assert!(load_replay(&replays, "cafebabe", ReplaySlot::SLOT_0).unwrap().is_none());
        assert_eq!(find_empty_slot(&replays, "cafebabe"), Some(ReplaySlot::SLOT_0));

        save_replay(&replays, &data, ReplaySlot::SLOT_0).unwrap();
        save_replay(&replays, &data, ReplaySlot::SLOT_1).unwrap();
        assert_eq!(find_empty_slot(&replays, "cafebabe"), Some(ReplaySlot::SLOT_2));

        let listed = list_replays(&replays, "cafebabe");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].0, ReplaySlot::SLOT_1);
        assert_eq!(listed[1].1.inputs.len(), 2);

        for slot in [ReplaySlot::SLOT_2, ReplaySlot::SLOT_3] {
            save_replay(&replays, &data, slot).unwrap();
        }
        assert_eq!(find_empty_slot(&replays, "cafebabe"), None);
    }
}
