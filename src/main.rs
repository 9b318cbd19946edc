use logreview::cli::Cli;
use logreview::config::Config;
use logreview::util::telemetry;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Cli::parse_args(); // parse CLI arguments with clap

    let cfg = match Config::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("logreview: {}", e);
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(&telemetry::effective_level(&cfg.logging.level, args.verbose));

    match args.handle_command(cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "logreview failed");
            ExitCode::FAILURE
        }
    }
}
