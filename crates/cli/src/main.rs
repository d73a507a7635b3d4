use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use voyage_agents::{PipelineSettings, TripPipeline};
use voyage_core::present::DEFAULT_IMAGE_COUNT;
use voyage_core::{
    fetch_image_urls, map_view, render_itinerary_document, SessionState, TripParameters,
    VoyageConfig, EXPORT_FILE_NAME,
};
use voyage_geo::OsmGeoResolver;
use voyage_model::load_model;
use voyage_observability::{init_tracing, AppMetrics, LogSink};
use voyage_storage::{MemorySessionStore, SessionStore};

#[derive(Debug, Parser)]
#[command(name = "voyage")]
#[command(about = "Voyage Planner CLI")]
struct Cli {
    /// Overrides VOYAGE_GEMINI_MODEL.
    #[arg(long)]
    model: Option<String>,

    /// Overrides VOYAGE_POI_LIMIT.
    #[arg(long)]
    poi_limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Plan {
        #[arg(long)]
        destination: String,
        #[arg(long, default_value_t = 3)]
        days: u32,
        #[arg(long, default_value = "medium")]
        budget: String,
        #[arg(long = "style")]
        styles: Vec<String>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
    Interactive,
    Images {
        keyword: String,
        #[arg(long, default_value_t = DEFAULT_IMAGE_COUNT)]
        count: usize,
    },
}

struct Planner {
    pipeline: TripPipeline,
    session_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("voyage_cli", LogSink::Stderr);
    let cli = Cli::parse();

    let mut config = VoyageConfig::from_env();
    if let Some(model) = cli.model {
        config.gemini_model = model;
    }
    if let Some(poi_limit) = cli.poi_limit {
        config.poi_limit = poi_limit;
    }
    config.validate()?;

    match cli.command {
        Command::Plan {
            destination,
            days,
            budget,
            styles,
            export,
        } => {
            let params = TripParameters::from_raw(&destination, days, &budget, &styles)
                .context("invalid trip parameters")?;
            let planner = build_planner(&config)?;

            let report = planner
                .pipeline
                .run(&planner.session_id, params)
                .await
                .with_context(|| format!("planning a trip to {destination} failed"))?;

            println!("{}", serde_json::to_string_pretty(&report)?);

            if let Some(path) = export {
                write_export(&report.state, &path)?;
                eprintln!("itinerary written to {}", path.display());
            }
        }
        Command::Interactive => {
            let planner = build_planner(&config)?;
            run_interactive(planner, &config.export_dir).await?;
        }
        Command::Images { keyword, count } => {
            if keyword.trim().is_empty() {
                bail!("keyword must not be empty");
            }
            for url in fetch_image_urls(&keyword, count) {
                println!("{url}");
            }
        }
    }

    Ok(())
}

fn build_planner(config: &VoyageConfig) -> Result<Planner> {
    let model = load_model(config).context("failed to initialize model client")?;
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let session_id = store.create_session();

    let pipeline = TripPipeline::new(
        Arc::new(OsmGeoResolver::from_config(config)),
        model,
        store,
        AppMetrics::shared(),
        PipelineSettings::from_config(config),
    );

    Ok(Planner {
        pipeline,
        session_id,
    })
}

async fn run_interactive(planner: Planner, export_dir: &Path) -> Result<()> {
    println!("Voyage Planner interactive mode.");
    println!("Type 'export' to save the current plan, 'exit' to quit.\n");

    loop {
        let Some(destination) = prompt("Destination")? else {
            break;
        };
        if destination.eq_ignore_ascii_case("exit") || destination.eq_ignore_ascii_case("quit") {
            break;
        }
        if destination.is_empty() {
            continue;
        }
        if destination.eq_ignore_ascii_case("export") {
            let state = current_state(&planner);
            if state.plan.is_none() {
                println!("Nothing to export yet.\n");
                continue;
            }
            let path = export_dir.join(EXPORT_FILE_NAME);
            write_export(&state, &path)?;
            println!("Itinerary written to {}\n", path.display());
            continue;
        }

        let days = prompt("Days (1-14) [3]")?.unwrap_or_default();
        let days = if days.is_empty() {
            3
        } else {
            match days.parse::<u32>() {
                Ok(days) => days,
                Err(_) => {
                    println!("Days must be a number.\n");
                    continue;
                }
            }
        };
        let budget = prompt("Budget (low/medium/luxury) [medium]")?.unwrap_or_default();
        let budget = if budget.is_empty() {
            "medium".to_string()
        } else {
            budget
        };
        let styles = prompt("Styles, comma separated (adventure, relax, family, solo, couple)")?
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|style| !style.is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        let params = match TripParameters::from_raw(&destination, days, &budget, &styles) {
            Ok(params) => params,
            Err(error) => {
                println!("{error}\n");
                continue;
            }
        };

        println!("Planning...");
        match planner.pipeline.run(&planner.session_id, params).await {
            Ok(report) => print_state(&report.state),
            Err(error) => {
                println!("Error: {error}");
                if current_state(&planner).plan.is_some() {
                    println!("Your previous plan is unchanged.");
                }
                println!();
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<Option<String>> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn current_state(planner: &Planner) -> SessionState {
    planner
        .pipeline
        .store()
        .get(&planner.session_id)
        .unwrap_or_default()
}

fn print_state(state: &SessionState) {
    let destination = state.destination.as_deref().unwrap_or_default();
    println!("\n=== {destination} ===");

    if let Some(plan) = &state.plan {
        for (day, activities) in &plan.itinerary {
            println!("\n{day}");
            for activity in activities {
                println!("  - {activity}");
            }
        }
        print_section("Hotels", &plan.hotels);
        print_section("Food", &plan.food);
        print_section("Tips", &plan.tips);
    }

    if let Some(geo) = &state.geo {
        print_section("Famous places", &geo.places);
        println!("\nMap: {}", map_view(geo, destination).osm_url);
    }
    println!();
}

fn print_section(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("\n{title}");
    for item in items {
        println!("  - {item}");
    }
}

fn write_export(state: &SessionState, path: &Path) -> Result<()> {
    let Some(plan) = state.plan.as_ref() else {
        bail!("session has no plan to export");
    };
    let destination = state.destination.as_deref().unwrap_or_default();
    let document = render_itinerary_document(destination, plan);

    let bytes = document.to_pdf().context("failed rendering itinerary")?;

    std::fs::write(path, bytes)
        .with_context(|| format!("failed writing itinerary to {}", path.display()))
}
