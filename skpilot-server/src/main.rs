use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

use skpilot_server::{web::Web, Cli, PilotConfig, SharedPilots, VERSION};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.verbose.log_level_filter())
        .init();

    log::info!("skpilot-server {} starting", VERSION);

    let config = PilotConfig::from(&args);
    log::debug!("Configuration: {:?}", config);
    let pilots = SharedPilots::new(config);
    let port = args.port;

    Toplevel::new(move |s: SubsystemHandle| async move {
        let web = Web::new(pilots.clone(), port);
        s.start(SubsystemBuilder::new("Pilots", |a| pilots.run(a)));
        s.start(SubsystemBuilder::new("Webserver", |a| web.run(a)));
    })
    .catch_signals()
    .handle_shutdown_requests(Duration::from_millis(5000))
    .await
    .into_diagnostic()
}
