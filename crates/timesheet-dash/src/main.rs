mod bootstrap;
mod commands;

use anyhow::Result;
use timesheet_core::settings::{Settings, View};
use timesheet_data::aggregator::TimesheetAggregator;
use timesheet_runtime::data_manager::DataManager;
use timesheet_ui::app::App;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    settings.validate()?;

    let app_dir = bootstrap::ensure_directories()?;
    let log_file = bootstrap::log_destination(&settings, &app_dir);
    bootstrap::setup_logging(&settings.log_level, log_file.as_ref())?;

    tracing::info!("Timesheet Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Source: {}, View: {}, Theme: {}",
        settings.source.display(),
        settings.view,
        settings.theme
    );

    let aggregator = TimesheetAggregator::new(settings.label_style());
    let mut manager = DataManager::new(&settings.source, aggregator);
    let filter = commands::entry_filter(&settings);

    match settings.view {
        View::Dashboard => {
            let app = App::new(&settings.theme, manager, filter);
            app.run_dashboard().await?;
        }

        View::Report | View::Summary => {
            let outcome = manager.get_data(false)?;
            if outcome.records_dropped > 0 {
                tracing::warn!(
                    "Dropped {} of {} records without a positive Hours value",
                    outcome.records_dropped,
                    outcome.records_read
                );
            }

            if settings.view == View::Report {
                commands::run_report(&settings, outcome)?;
            } else {
                let stdout = std::io::stdout();
                commands::write_summary(&mut stdout.lock(), outcome, &filter)?;
            }
        }
    }

    Ok(())
}
