use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFormat {
    None,
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "domreplay", about = "Replay recorded DOM sessions")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ~/.domreplay/config.toml then ./domreplay.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the player speed multiplier.
    #[arg(long, global = true)]
    pub speed: Option<f64>,

    /// Print replay diagnostics at debug level.
    #[arg(long, global = true, default_value_t = false)]
    pub show_debug: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlayArgs {
    /// Recording file: a JSON array of events or one event per line.
    pub recording: PathBuf,

    /// Start offset in ms from the first event.
    #[arg(long, default_value_t = 0.0)]
    pub offset: f64,

    /// Seek to the offset and stop there instead of playing to the end.
    #[arg(long, default_value_t = false)]
    pub seek_only: bool,

    #[arg(long, default_value_t = false)]
    pub skip_inactive: bool,

    /// Advance a simulated clock instead of waiting in real time.
    #[arg(long, default_value_t = false)]
    pub fast: bool,

    /// Stop after this many ms of playback time even if events remain.
    #[arg(long)]
    pub max_ms: Option<f64>,

    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    pub events: EventFormat,

    /// Write the final document here instead of stdout.
    #[arg(long)]
    pub html: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_html: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MetaArgs {
    pub recording: PathBuf,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct LiveArgs {
    /// Baseline wall time in ms; defaults to the current time.
    #[arg(long)]
    pub baseline: Option<f64>,

    /// Keep ticking this long after stdin closes so buffered events land.
    #[arg(long, default_value_t = 1000)]
    pub linger_ms: u64,

    #[arg(long, value_enum, default_value_t = EventFormat::Text)]
    pub events: EventFormat,

    #[arg(long)]
    pub html: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_html: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a recording against a virtual document.
    Play(PlayArgs),
    /// Print start, end and total time of a recording.
    Meta(MetaArgs),
    /// Replay events streamed on stdin, one JSON event per line.
    Live(LiveArgs),
}
