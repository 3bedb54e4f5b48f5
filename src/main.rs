use clap::Parser;
use frontdesk::config::DeskConfig;
use frontdesk::error::Error;
use frontdesk::{cli, log, Args, VERSION};
use tracing::{error, info};

fn main() {
    let args = Args::parse();

    let config = match DeskConfig::load(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration Error: {}", err);
            std::process::exit(exitcode::CONFIG);
        }
    };

    log::init(config.log.clone());

    info!(msg = "Front desk", version = VERSION);

    let code = match cli::run(args, &config) {
        Ok(true) => exitcode::OK,
        Ok(false) => exitcode::DATAERR,
        Err(err @ Error::Config(_)) => {
            error!(msg = "Configuration error", error = err.to_string());
            eprintln!("Configuration Error: {}", err);
            exitcode::CONFIG
        }
        Err(err) => {
            error!(msg = "Request failed", error = err.to_string());
            eprintln!("Error: {}", err);
            exitcode::SOFTWARE
        }
    };

    std::process::exit(code);
}
