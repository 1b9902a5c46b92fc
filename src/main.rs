use probewatch::app::build_scheduler;
use probewatch::settings::load_from_cli;
use probewatch::telemetry;
use tracing::info;

fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    let settings = load_from_cli()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    telemetry::init(settings.log_json).map_err(std::io::Error::other)?;

    let snapshot = serde_json::to_string(&settings).map_err(std::io::Error::other)?;
    info!(settings = %snapshot, "probewatch starting");

    let mut scheduler = build_scheduler(&settings).map_err(std::io::Error::other)?;

    if settings.run_once {
        scheduler.run_pass();
        return Ok(());
    }
    scheduler.run()
}
