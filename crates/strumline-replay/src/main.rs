//! `strumline`: play charts with the bot, record scripted plays, and verify or
//! inspect replays.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};

use strumline_engine::{
    Chart, FiveFretEngine, GameInput, GuitarEngine, GuitarEngineParameters,
    SerializedGuitarEngineParameters,
};
use strumline_replay::{
    ReplayRecorder, ReplayRunner, ReplayScore, chart_hash, find_empty_slot,
    load_replay_file, play_end_time, save_replay, save_replay_file,
};

#[derive(Parser, Debug)]
#[command(name = "strumline", about = "Five-fret guitar hit detection and replays")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a replay against its chart and check it reproduces the recorded result.
    Run {
        /// Chart JSON file.
        chart: PathBuf,
        /// Replay file (.json.gz).
        replay: PathBuf,
    },
    /// Let the bot play a chart.
    Bot {
        /// Chart JSON file.
        chart: PathBuf,
        /// Engine parameters JSON file (persisted schema).
        #[arg(long)]
        params: Option<PathBuf>,
        /// Playback speed.
        #[arg(long, default_value = "1.0")]
        speed: f64,
    },
    /// Play a JSON list of inputs against a chart and save the replay.
    Play {
        /// Chart JSON file.
        chart: PathBuf,
        /// JSON array of inputs: {"time", "action", "button"}.
        inputs: PathBuf,
        /// Engine parameters JSON file (persisted schema).
        #[arg(long)]
        params: Option<PathBuf>,
        /// Treat fret presses as strums.
        #[arg(long)]
        gamepad: bool,
        /// Playback speed.
        #[arg(long, default_value = "1.0")]
        speed: f64,
        /// Player name stored in the replay.
        #[arg(long, env = "STRUMLINE_PLAYER", default_value = "player")]
        player: String,
        /// Write the replay to this file.
        #[arg(long, conflicts_with = "replay_dir")]
        out: Option<PathBuf>,
        /// Save the replay to the first free slot in this directory.
        #[arg(long, default_value = "replays")]
        replay_dir: PathBuf,
    },
    /// Print the contents of a replay.
    Inspect {
        /// Replay file (.json.gz).
        replay: PathBuf,
        /// Also list every recorded input.
        #[arg(long)]
        inputs: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run { chart, replay } => run_replay(&chart, &replay),
        Commands::Bot {
            chart,
            params,
            speed,
        } => run_bot(&chart, params.as_deref(), speed),
        Commands::Play {
            chart,
            inputs,
            params,
            gamepad,
            speed,
            player,
            out,
            replay_dir,
        } => {
            let setup = PlaySetup {
                params: load_params(params.as_deref())?,
                gamepad,
                speed,
                player,
            };
            let destination = match out {
                Some(path) => Destination::File(path),
                None => Destination::Slot(replay_dir),
            };
            play_inputs(&chart, &inputs, setup, destination)
        }
        Commands::Inspect { replay, inputs } => inspect_replay(&replay, inputs),
    }
}

/// Load a chart file and its hash.
fn load_chart(path: &Path) -> Result<(Chart, String)> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read chart: {}", path.display()))?;
    let chart: Chart = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse chart: {}", path.display()))?;
    info!("Loaded {} notes from {}", chart.len(), path.display());
    Ok((chart, chart_hash(&bytes)))
}

fn load_params(path: Option<&Path>) -> Result<GuitarEngineParameters> {
    let Some(path) = path else {
        return Ok(GuitarEngineParameters::default());
    };

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read parameters: {}", path.display()))?;
    let serialized: SerializedGuitarEngineParameters = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse parameters: {}", path.display()))?;
    GuitarEngineParameters::try_from(serialized)
        .with_context(|| format!("Invalid parameters in {}", path.display()))
}

fn check_speed(speed: f64) -> Result<()> {
    if !(speed > 0.0 && speed.is_finite()) {
        bail!("Speed must be a positive number, got {speed}");
    }
    Ok(())
}

fn print_score(score: &ReplayScore) {
    println!("Score:      {}", score.score);
    println!("Stars:      {}", score.stars);
    println!("Max combo:  {}", score.max_combo);
    println!("Hit/missed: {}/{}", score.notes_hit, score.notes_missed);
    println!("Overstrums: {}", score.overstrums);
    println!("Ghosts:     {}", score.ghost_inputs);
    println!(
        "Sustains:   {} completed, {} dropped",
        score.sustains_completed, score.sustains_dropped
    );
}

fn run_replay(chart_path: &Path, replay_path: &Path) -> Result<()> {
    let (chart, hash) = load_chart(chart_path)?;
    let replay = load_replay_file(replay_path)?;
    if !replay.chart_hash.is_empty() && replay.chart_hash != hash {
        warn!(
            "Replay was recorded on chart {}, playing against {hash}",
            replay.chart_hash
        );
    }

    let mut runner = ReplayRunner::new(chart, &replay)?;
    let score = runner.run_to_end();
    print_score(&score);

    match &replay.score {
        Some(recorded) if recorded != &score => {
            bail!("Replay does not reproduce its recorded result: recorded {recorded:?}")
        }
        Some(_) => println!("Result matches the recorded play."),
        None => println!("Replay has no recorded result to compare."),
    }
    Ok(())
}

fn run_bot(chart_path: &Path, params_path: Option<&Path>, speed: f64) -> Result<()> {
    check_speed(speed)?;
    let (chart, _) = load_chart(chart_path)?;
    let params = load_params(params_path)?;

    let end_time = play_end_time(&chart, &[]);
    let mut engine = FiveFretEngine::new(chart, params, true, false)?;
    engine.set_speed(speed);
    engine.update(end_time);

    print_score(&ReplayScore::from_engine(&engine));
    Ok(())
}

struct PlaySetup {
    params: GuitarEngineParameters,
    gamepad: bool,
    speed: f64,
    player: String,
}

enum Destination {
    File(PathBuf),
    Slot(PathBuf),
}

fn play_inputs(
    chart_path: &Path,
    inputs_path: &Path,
    setup: PlaySetup,
    destination: Destination,
) -> Result<()> {
    check_speed(setup.speed)?;
    let (chart, hash) = load_chart(chart_path)?;
    let json = fs::read_to_string(inputs_path)
        .with_context(|| format!("Failed to read inputs: {}", inputs_path.display()))?;
    let inputs: Vec<GameInput> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse inputs: {}", inputs_path.display()))?;

    let end_time = play_end_time(&chart, &inputs);
    let mut recorder = ReplayRecorder::new(
        setup.player,
        hash.clone(),
        &setup.params,
        setup.gamepad,
        setup.speed,
    );
    let mut engine = FiveFretEngine::new(chart, setup.params, false, setup.gamepad)?;
    engine.set_speed(setup.speed);

    for input in inputs {
        recorder.feed(&mut engine, input);
        let time = input.time.max(engine.current_time());
        engine.update(time);
    }
    engine.update(end_time);
    recorder.set_score(&engine);

    let replay = recorder.into_replay_data();
    if let Some(score) = &replay.score {
        print_score(score);
    }

    let path = match destination {
        Destination::File(path) => {
            save_replay_file(&replay, &path)?;
            path
        }
        Destination::Slot(dir) => {
            let Some(slot) = find_empty_slot(&dir, &hash) else {
                bail!("Every replay slot for chart {hash} in {} is taken", dir.display());
            };
            save_replay(&dir, &replay, slot)?
        }
    };
    println!("Saved replay to {}", path.display());
    Ok(())
}

fn inspect_replay(path: &Path, list_inputs: bool) -> Result<()> {
    let replay = load_replay_file(path)?;

    println!("Replay:   {}", path.display());
    println!("Version:  {}", replay.version);
    println!("Player:   {}", replay.player);
    println!("Chart:    {}", replay.chart_hash);
    println!("Date:     {}", replay.date);
    println!(
        "Engine:   parameters v{}, gamepad {}, speed {}",
        replay.params.version, replay.gamepad_mode, replay.speed
    );
    println!("Inputs:   {}", replay.inputs.len());

    if let Some(score) = &replay.score {
        println!();
        print_score(score);
    }

    if list_inputs {
        println!();
        for input in &replay.inputs {
            let state = if input.button { "press" } else { "release" };
            println!("{:>10.4}  {:<7}  {:?}", input.time, state, input.action);
        }
    }
    Ok(())
}
