use airgraph::handler::{AirspaceHandler, BatchOptions};
use airgraph::settings::{self, CliArgs};
use airgraph::{logging, output, HeightUnit};
use anyhow::Result;
use clap::Parser;
use tracing::info;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let settings = settings::load_config(&args)?;
    logging::init_logging(&settings.log_level, settings.log_json)?;
    info!("{}", settings);

    let mut handler = AirspaceHandler::new();
    handler.add_airspaces_file(&settings.airspaces)?;
    let unit = HeightUnit::from_feet_flag(settings.heights_in_feet);

    if let Some([x, y, height]) = args.point {
        let at = handler.query_point(x, y, height, unit);
        let near = handler.query_near(x, y, height, settings.near_count, unit);
        println!("airspaces at ({x}, {y}, {height}): {:?}", at);
        for (id, distance) in near {
            println!("  near {id}: {distance:.1} ft");
        }
        return Ok(());
    }

    let options = BatchOptions {
        parallel: settings.parallel,
        progress: settings.progress,
    };
    handler.process_flights_file(&settings.flights, unit, options)?;

    let path = output::write_result(&settings.output, settings.format, handler.get_result()?)?;
    info!("wrote transition matrix to {}", path.display());

    Ok(())
}
