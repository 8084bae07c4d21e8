use log::info;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

use webmonitor::{Checker, Error, MonitorConfig, Scheduler, TargetRegistry, config, logging};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Error> {
    let path = config::default_path();
    let config = MonitorConfig::load(&path).map_err(|e| {
        Error::Config(format!(
            "Error occurred while loading the config from file \"{}\": {e}",
            path.display()
        ))
    })?;
    logging::init(&config)?;

    let registry = TargetRegistry::load(&path, &config);
    let checker = Checker::new(&config)?;
    let scheduler = Scheduler::new(config, registry, checker);

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, finishing the current iteration");
            shutdown.cancel();
        }
    });

    scheduler.run(&token).await;
    Ok(())
}
