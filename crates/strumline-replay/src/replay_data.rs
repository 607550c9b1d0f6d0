use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use strumline_engine::{
    GameInput, GuitarAction, GuitarEngine, GuitarEngineParameters,
    SerializedGuitarEngineParameters,
};

/// Replay file format version written by this crate.
pub const REPLAY_VERSION: u32 = 1;

/// Bytes per key log record: i16 keycode + f64 time, both little-endian.
const RECORD_LEN: usize = 10;

/// Result summary stored with a replay so playback can be verified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayScore {
    pub score: u64,
    pub stars: usize,
    pub max_combo: u32,
    pub notes_hit: u32,
    pub notes_missed: u32,
    pub overstrums: u32,
    pub ghost_inputs: u32,
    pub sustains_completed: u32,
    pub sustains_dropped: u32,
}

impl ReplayScore {
    /// Snapshot the current results of an engine.
    pub fn from_engine<E: GuitarEngine + ?Sized>(engine: &E) -> Self {
        let stats = engine.stats();
        Self {
            score: stats.total_score(),
            stars: engine.state().stars(),
            max_combo: stats.max_combo,
            notes_hit: stats.notes_hit,
            notes_missed: stats.notes_missed,
            overstrums: stats.overstrums,
            ghost_inputs: stats.ghost_inputs,
            sustains_completed: stats.sustains_completed,
            sustains_dropped: stats.sustains_dropped,
        }
    }
}

/// A recorded five-fret play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayData {
    #[serde(default)]
    pub version: u32,
    /// Player name.
    #[serde(default)]
    pub player: String,
    /// SHA-256 of the chart file the replay was recorded against.
    #[serde(default)]
    pub chart_hash: String,
    /// Play date (unix timestamp).
    #[serde(default)]
    pub date: i64,
    /// Engine tuning the play was scored under.
    #[serde(default = "default_params")]
    pub params: SerializedGuitarEngineParameters,
    #[serde(default)]
    pub gamepad_mode: bool,
    /// Playback speed.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Compressed input log (base64 + gzip).
    #[serde(default)]
    pub keyinput: Option<String>,
    /// Result at the time of recording.
    #[serde(default)]
    pub score: Option<ReplayScore>,

    /// Decoded input log (not serialized directly).
    #[serde(skip)]
    pub inputs: Vec<GameInput>,
}

fn default_params() -> SerializedGuitarEngineParameters {
    (&GuitarEngineParameters::default()).into()
}

fn default_speed() -> f64 {
    1.0
}

impl Default for ReplayData {
    fn default() -> Self {
        Self {
            version: REPLAY_VERSION,
            player: String::new(),
            chart_hash: String::new(),
            date: 0,
            params: default_params(),
            gamepad_mode: false,
            speed: default_speed(),
            keyinput: None,
            score: None,
            inputs: Vec::new(),
        }
    }
}

impl ReplayData {
    /// Start a replay dated now.
    pub fn new(
        player: String,
        chart_hash: String,
        params: &GuitarEngineParameters,
        gamepad_mode: bool,
        speed: f64,
    ) -> Self {
        let date = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs() as i64);
        Self {
            player,
            chart_hash,
            date,
            params: params.into(),
            gamepad_mode,
            speed,
            ..Default::default()
        }
    }

    /// Engine parameters decoded from the persisted schema.
    pub fn engine_params(&self) -> Result<GuitarEngineParameters> {
        GuitarEngineParameters::try_from(self.params.clone())
            .context("Replay carries invalid engine parameters")
    }

    /// Number of recorded inputs, whether or not the log is compressed.
    pub fn input_count(&self) -> Result<usize> {
        if self.inputs.is_empty() && self.keyinput.is_some() {
            let mut expanded = self.clone();
            expanded.expand()?;
            return Ok(expanded.inputs.len());
        }
        Ok(self.inputs.len())
    }

    /// Compress `inputs` into the `keyinput` field (base64 + gzip).
    ///
    /// Each record is 10 bytes: keycode (i16 LE) then time in seconds (f64 LE),
    /// with keycode = (action code + 1) * (pressed ? 1 : -1).
    pub fn shrink(&mut self) -> Result<()> {
        if self.inputs.is_empty() {
            return Ok(());
        }

        let mut raw = Vec::with_capacity(self.inputs.len() * RECORD_LEN);
        for input in &self.inputs {
            let keycode = (i16::from(input.action.code()) + 1) * if input.button { 1 } else { -1 };
            raw.extend_from_slice(&keycode.to_le_bytes());
            raw.extend_from_slice(&input.time.to_le_bytes());
        }

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        let compressed = encoder.finish()?;

        self.keyinput = Some(URL_SAFE.encode(compressed));
        self.inputs.clear();
        Ok(())
    }

    /// Expand `keyinput` back into `inputs`.
    pub fn expand(&mut self) -> Result<()> {
        let keyinput = match &self.keyinput {
            Some(s) if !s.is_empty() => s.clone(),
            _ => return Ok(()),
        };

        let compressed = URL_SAFE
            .decode(keyinput.as_bytes())
            .map_err(|e| anyhow!("base64 decode error: {e}"))?;

        let mut decoder = GzDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;

        if raw.len() % RECORD_LEN != 0 {
            bail!("key input log is truncated ({} bytes)", raw.len());
        }

        let mut inputs = Vec::with_capacity(raw.len() / RECORD_LEN);
        for record in raw.chunks_exact(RECORD_LEN) {
            let keycode = i16::from_le_bytes([record[0], record[1]]);
            let time_bytes: [u8; 8] = record[2..]
                .try_into()
                .map_err(|_| anyhow!("invalid keyinput data"))?;
            let time = f64::from_le_bytes(time_bytes);

            let action = keycode
                .unsigned_abs()
                .checked_sub(1)
                .and_then(|code| u8::try_from(code).ok())
                .and_then(GuitarAction::from_code)
                .ok_or_else(|| anyhow!("unknown keycode {keycode} in key input log"))?;
            if !time.is_finite() {
                bail!("non-finite input time in key input log");
            }

            inputs.push(GameInput::new(time, action, keycode > 0));
        }

        self.inputs = inputs;
        self.keyinput = None;
        Ok(())
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| anyhow!("JSON serialization error: {e}"))
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| anyhow!("JSON deserialization error: {e}"))
    }
}

/// Stable identifier of a chart file: its SHA-256 as lowercase hex.
pub fn chart_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
