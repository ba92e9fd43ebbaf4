#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line access to the statmap rendering pipeline.
//!
//! ```text
//! statmap_cli indicators
//! statmap_cli periods <indicator> [--data-dir data]
//! statmap_cli render <indicator> --boundaries <file|url> --output map.svg
//! ```
//!
//! `render` writes an SVG document when the output ends in `.svg` and the
//! layer as JSON otherwise.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use statmap_choropleth::state::MapViewState;
use statmap_choropleth::svg::to_svg;
use statmap_choropleth::{ChoroplethLayer, ColorScale, MapStatus};
use statmap_geography::loader::{BoundarySource, BoundaryStore};
use statmap_geography_models::{Granularity, LoadState, Viewport};
use statmap_indicator::dataset::load_dataset;
use statmap_indicator::normalize::available_periods;
use statmap_indicator::period::{parse_period, summarize_periods};
use statmap_indicator::registry::{all_indicators, find_indicator};

#[derive(Parser)]
#[command(name = "statmap_cli", about = "Render statistical indicators as choropleth maps")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered indicators
    Indicators,
    /// List the periods available for an indicator
    Periods {
        /// Indicator id
        indicator: String,
        /// Directory holding dataset files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Render one indicator onto a boundary file
    Render {
        /// Indicator id
        indicator: String,
        /// Boundary `GeoJSON` file path or URL
        #[arg(long)]
        boundaries: BoundarySource,
        /// Boundary set the file holds
        #[arg(long, default_value = "regions")]
        granularity: Granularity,
        /// Period code; defaults to the latest available
        #[arg(long)]
        period: Option<String>,
        /// Sub-variable to draw
        #[arg(long)]
        variable: Option<String>,
        /// Directory holding dataset files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
        /// Output file (`.svg` or `.json`)
        #[arg(long, short)]
        output: PathBuf,
        /// Drawing width
        #[arg(long)]
        width: Option<f64>,
        /// Drawing height
        #[arg(long)]
        height: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    match cli.command {
        Commands::Indicators => {
            println!("{:<20} {:<22} LABEL", "ID", "GRANULARITIES");
            println!("{}", "-".repeat(72));
            for indicator in all_indicators() {
                let granularities: Vec<&str> =
                    indicator.granularities.iter().map(AsRef::<str>::as_ref).collect();
                println!(
                    "{:<20} {:<22} {}",
                    indicator.id,
                    granularities.join(","),
                    indicator.label
                );
            }
        }
        Commands::Periods {
            indicator,
            data_dir,
        } => {
            let definition = find_indicator(&indicator)?;
            let dataset = load_dataset(&data_dir, &definition).await?;
            let summary = summarize_periods(available_periods(&dataset));

            if summary.periods.is_empty() {
                println!("No periods found for {indicator}.");
                return Ok(());
            }

            for code in &summary.periods {
                let label = parse_period(code).map(|p| p.month_label()).unwrap_or_default();
                let marker = if summary.latest.as_deref() == Some(code.as_str()) {
                    " (latest)"
                } else {
                    ""
                };
                println!("{code:<12} {label}{marker}");
            }
            println!("\n{} period(s)", summary.periods.len());
        }
        Commands::Render {
            indicator,
            boundaries,
            granularity,
            period,
            variable,
            data_dir,
            output,
            width,
            height,
        } => {
            let definition = find_indicator(&indicator)?;
            if !definition.granularities.contains(&granularity) {
                log::warn!("{} is not published for {granularity}", definition.label);
            }

            let defaults = Viewport::default();
            let viewport = Viewport {
                width: width.unwrap_or(defaults.width),
                height: height.unwrap_or(defaults.height),
                ..defaults
            };

            let client = reqwest::Client::new();
            let store = BoundaryStore::new();
            let (_, dataset) = tokio::join!(
                store.load(&client, granularity, &boundaries),
                load_dataset(&data_dir, &definition),
            );

            let mut view = MapViewState::new(granularity);
            view.switch_indicator(definition.id.as_str());
            if let Some(period) = period {
                view.select_period(period);
            }
            view.select_variable(variable.or_else(|| definition.variables.first().cloned()));
            view.set_dataset(&definition.id, LoadState::from_result(dataset.map(Arc::new)));

            let status = view.status(
                &store.state(granularity),
                store.revision(granularity),
                &ColorScale::default(),
                viewport,
            );
            let layer = match status {
                MapStatus::Ready(layer) => layer,
                MapStatus::Unavailable(message) => return Err(message.into()),
                MapStatus::Loading => return Err("map data did not finish loading".into()),
            };

            if let Some(message) = layer.banner.message() {
                log::warn!("{message}");
            }
            write_layer(&output, &layer)?;
            println!(
                "Wrote {} ({} shapes) to {}",
                definition.label,
                layer.shapes.len(),
                output.display()
            );
        }
    }

    Ok(())
}

fn write_layer(output: &Path, layer: &ChoroplethLayer) -> Result<(), Box<dyn std::error::Error>> {
    let is_svg = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        std::fs::write(output, to_svg(layer))?;
    } else {
        std::fs::write(output, serde_json::to_string_pretty(layer)?)?;
    }
    Ok(())
}
