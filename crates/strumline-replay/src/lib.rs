//! Replay recording, storage and playback for the five-fret engine.
//!
//! A replay stores the persisted engine parameters next to a compressed log of
//! every [`GameInput`](strumline_engine::GameInput); feeding the log back
//! through a fresh engine reproduces the recorded result exactly.

mod recorder;
mod replay_data;
mod runner;
mod storage;

pub use recorder::ReplayRecorder;
pub use replay_data::{REPLAY_VERSION, ReplayData, ReplayScore, chart_hash};
pub use runner::{ReplayRunner, play_end_time};
pub use storage::{
    ReplaySlot, find_empty_slot, list_replays, load_replay, load_replay_file, replay_path,
    save_replay, save_replay_file,
};
