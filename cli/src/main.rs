use clap::Parser;
use domreplay_cli::commands::{cli, live, meta, play, recording};
use domreplay_cli::error::CliError;
use domreplay_cli::logging::init_tracing;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            e.exit_code()
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = recording::load_config(&args)?;
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    match args.command {
        cli::Commands::Play(play_args) => play::handle_play(play_args, cfg).await,
        cli::Commands::Meta(meta_args) => meta::handle_meta(meta_args, cfg),
        cli::Commands::Live(live_args) => live::handle_live(live_args, cfg).await,
    }
}
