mod app;
mod audio;
mod command;
mod config;
mod error;
mod logging;
mod sequencer;
mod ui;

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use app::App;
use audio::{AudioContext, CpalBackend, MicRecorder};
use config::Settings;
use sequencer::{
    default_preset, find_preset, LookaheadScheduler, Pattern, Tempo, TransportEvent, PRESETS,
    STEPS, STEPS_PER_BEAT,
};
use ui::Theme;

/// Metronoxide - Terminal step metronome with count-in and take recording
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tempo in beats per minute (30-240)
    #[arg(long)]
    bpm: Option<u32>,

    /// Built-in pattern to start with
    #[arg(long)]
    preset: Option<String>,

    /// Theme to use for the interface
    #[arg(long)]
    theme: Option<String>,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// List built-in patterns and exit
    #[arg(long)]
    list_presets: bool,

    /// Settings file (default: ~/.metronoxide/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Play without the TUI for a fixed number of bars
    #[arg(long)]
    headless: bool,

    /// Bars to play in headless mode
    #[arg(long, default_value_t = 4)]
    bars: u32,

    /// Skip the one-bar count-in
    #[arg(long)]
    no_count_in: bool,

    /// Directory for recorded takes; in headless mode, record a take
    #[arg(long, value_name = "DIR", num_args = 0..=1)]
    record: Option<Option<PathBuf>>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_themes {
        println!("Available themes:");
        for theme in Theme::available_themes() {
            println!("  {}", theme);
        }
        return Ok(());
    }

    if args.list_presets {
        println!("Available presets:");
        for preset in PRESETS {
            println!("  {}", preset.name);
        }
        return Ok(());
    }

    if args.headless {
        logging::init_stderr();
    } else {
        logging::init_file(&config::data_dir().join("metronoxide.log"))?;
    }

    let settings = Settings::resolve(args.config.as_deref())?;

    let bpm = args.bpm.unwrap_or(settings.bpm);
    let tempo = Tempo::new(bpm).unwrap_or_else(|e| {
        warn!("{}, using {}", e, Tempo::default());
        Tempo::default()
    });

    let preset_name = args.preset.as_deref().unwrap_or(&settings.preset);
    let preset = find_preset(preset_name).unwrap_or_else(|| {
        warn!(
            "Unknown preset '{}', using '{}'. Use --list-presets to see available presets.",
            preset_name,
            PRESETS[default_preset()].name
        );
        default_preset()
    });

    let custom_pattern = settings.custom_pattern().unwrap_or_else(|e| {
        warn!("Ignoring pattern from settings: {}", e);
        None
    });

    let count_in = settings.count_in && !args.no_count_in;
    let recordings_dir = match &args.record {
        Some(Some(dir)) => dir.clone(),
        _ => settings.recordings_dir.clone(),
    };

    let scheduler = LookaheadScheduler::new(
        AudioContext::new(CpalBackend::factory()),
        settings.scheduler,
    )
    .with_recorder(Box::new(MicRecorder::new(recordings_dir)));

    if args.headless {
        let record = args.record.is_some();
        let (name, pattern) = match custom_pattern {
            Some(pattern) => ("custom pattern", pattern),
            None => (PRESETS[preset].name, PRESETS[preset].pattern),
        };
        return run_headless(scheduler, name, pattern, tempo, count_in, record, args.bars);
    }

    let theme_name = args.theme.as_deref().unwrap_or(&settings.theme);
    let theme = Theme::from_name(theme_name).unwrap_or_else(|| {
        warn!(
            "Unknown theme '{}', using default. Use --list-themes to see available themes.",
            theme_name
        );
        Theme::default()
    });

    let mut app = App::new(theme, scheduler, tempo, preset, count_in);
    if let Some(pattern) = custom_pattern {
        app = app.with_pattern(pattern);
    }
    app.run()
}

/// Play `bars` bars (plus the count-in) and exit
fn run_headless(
    mut scheduler: LookaheadScheduler,
    name: &str,
    pattern: Pattern,
    tempo: Tempo,
    count_in: bool,
    record: bool,
    bars: u32,
) -> Result<()> {
    let slots = Rc::new(Cell::new(0u64));
    let step_slots = slots.clone();
    scheduler.on_step(move |step| {
        if let Some(step) = step {
            step_slots.set(step_slots.get() + 1);
            if step % STEPS_PER_BEAT == 0 {
                info!("beat {}", step / STEPS_PER_BEAT + 1);
            }
        }
    });
    scheduler.on_event(|event| match event {
        TransportEvent::CountInComplete { recording } => {
            info!("Count-in done{}", if recording { ", recording" } else { "" });
        }
        TransportEvent::RecordingFinished(take) => {
            info!(
                "Saved {} ({:.2}s, {} frames)",
                take.path.display(),
                take.duration_secs,
                take.frames
            );
        }
        TransportEvent::RecordingFailed(reason) => error!("Recording failed: {}", reason),
    });

    info!("Playing '{}' at {} for {} bars", name, tempo, bars);
    if !pattern.has_content() {
        warn!("Pattern is silent; only the count-in will click");
    }

    let count_in_slots = if count_in { STEPS as u64 } else { 0 };
    let target = count_in_slots + bars as u64 * STEPS as u64;

    scheduler.start(pattern, tempo, count_in, record)?;
    while slots.get() < target {
        match scheduler.time_until_poll(Instant::now()) {
            Some(wait) => std::thread::sleep(wait),
            None => break,
        }
        scheduler.poll(Instant::now());
    }

    if scheduler.is_recording() {
        info!("Finishing take");
    }

    // Let the final slot sound before stopping
    std::thread::sleep(Duration::from_secs_f64(tempo.seconds_per_slot() + 0.1));
    scheduler.stop();
    Ok(())
}
