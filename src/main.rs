use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agrocast_advisory::{
    encode_image, upcoming_advisories, ColonSplit, DiagnosisAdvisor, GrowerAdvisor, GrowerReport,
    QuestionAdvisor, Remedy, ResponseNormalizer, DIAGNOSIS_IMAGE_COUNT,
};
use agrocast_agent::{AgentClient, AgentSession};
use agrocast_core::{AppError, Config, ConfigError};
use agrocast_weather::{
    AggregatedResult, Aggregation, AggregationCache, ConfiguredLocation, Coordinate,
    CoordinateSource, ParallelFetchCoordinator, UpstreamEndpoints, WeatherAggregator,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

/// Days of the agent's weather advisory shown, starting today
const ADVISORY_DAYS: u64 = 3;

#[derive(Parser, Debug)]
#[command(name = "agrocast")]
#[command(version, about = "Weather, advisories and crop help for growers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current weather, upcoming advisories and the grower report (default)
    Weather,
    /// Ask the agent a free-form question
    Ask {
        /// The question; words are joined with spaces
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Identify a crop disease from photos, then look up remedies
    Diagnose {
        /// Crop shown in the photos
        #[arg(long, default_value = "Potato")]
        crop: String,
        /// Photos of the affected plant
        #[arg(
            long = "images",
            value_name = "PATH",
            num_args = DIAGNOSIS_IMAGE_COUNT,
            required = true
        )]
        images: Vec<PathBuf>,
        /// Remedy to look up: home-remedy, pesticide or fertilizer (repeatable)
        #[arg(long, value_name = "KIND")]
        remedy: Vec<Remedy>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    agrocast_core::init()?;

    let (config, _validation) = match Config::load_validated() {
        Ok(loaded) => loaded,
        Err(e) => {
            if let Some(config_err) = e.downcast_ref::<ConfigError>() {
                eprintln!("{}", config_err.user_message());
            }
            return Err(e);
        }
    };
    tracing::info!("Agrocast started (config in {})", config.config_dir.display());

    match cli.command.unwrap_or(Command::Weather) {
        Command::Weather => run_weather(&config).await,
        Command::Ask { question } => run_ask(&config, &question.join(" ")).await,
        Command::Diagnose {
            crop,
            images,
            remedy,
        } => run_diagnose(&config, &crop, &images, &remedy).await,
    }
}

fn request_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.weather.request_timeout_secs)
}

fn agent_session(config: &Config) -> AgentSession {
    AgentSession::new(
        config.agent.app_name.clone(),
        config.agent.user_id.clone(),
        config.agent.session_id.clone(),
    )
}

fn configured_location(config: &Config) -> ConfiguredLocation {
    ConfiguredLocation::new(
        config
            .location
            .coordinate()
            .map(|(lat, lon)| Coordinate::new(lat, lon)),
    )
}

async fn run_weather(config: &Config) -> Result<()> {
    let timeout = request_timeout(config);
    let session = agent_session(config);
    let location = configured_location(config);

    let cache = Arc::new(AggregationCache::at_path(
        config.cache_path(),
        Duration::from_secs(u64::from(config.weather.cache_ttl_minutes) * 60),
    ));
    let endpoints = UpstreamEndpoints {
        api_base_url: config.weather.api_base_url.clone(),
        api_key: config.weather.api_key.clone(),
        agent_url: config.agent.weather_url.clone(),
        agent_session: session.clone(),
    };
    let aggregator =
        WeatherAggregator::new(ParallelFetchCoordinator::new(timeout)?, endpoints, cache);

    match aggregator.load(&location).await {
        Aggregation::NoCoordinate(e) => {
            let err = AppError::NoCoordinate(e.to_string());
            tracing::warn!("{}", err);
            eprintln!("{}", err.user_message());
            return Ok(());
        }
        Aggregation::Unavailable | Aggregation::Superseded => {
            eprintln!("{}", AppError::AllSourcesFailed.user_message());
        }
        Aggregation::Cached(result) => {
            println!("(cached)");
            print_weather(&result);
        }
        Aggregation::Fetched(result) | Aggregation::Degraded(result) => print_weather(&result),
    }

    if let Ok(coordinate) = location.coordinate().await {
        let advisor = GrowerAdvisor::new(
            AgentClient::new(session, timeout)?,
            config.agent.grower_url.clone(),
        );
        let report = advisor
            .report(coordinate.latitude, coordinate.longitude)
            .await;
        print_grower_report(&report);
    }

    Ok(())
}

async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let coordinate = configured_location(config)
        .coordinate()
        .await
        .ok()
        .map(|c| (c.latitude, c.longitude));

    let advisor = QuestionAdvisor::new(
        AgentClient::new(agent_session(config), request_timeout(config))?,
        config.agent.ask_url.clone(),
    );
    match advisor.answer(question, coordinate).await {
        Some(answer) => println!("{}", answer),
        None => eprintln!("Type a question to ask."),
    }
    Ok(())
}

async fn run_diagnose(
    config: &Config,
    crop: &str,
    paths: &[PathBuf],
    remedies: &[Remedy],
) -> Result<()> {
    let mut images = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        images.push(encode_image(&bytes));
    }

    let advisor = DiagnosisAdvisor::new(
        AgentClient::new(agent_session(config), request_timeout(config))?,
        config.agent.diagnosis_url.clone(),
    );

    let Some(summary) = advisor.diagnose(crop, images).await else {
        eprintln!("Could not diagnose the {} photos. Try again in a few minutes.", crop);
        return Ok(());
    };
    println!("== Diagnosis ==\n{}", summary);

    for remedy in remedies {
        match advisor.remedy(*remedy).await {
            Some(text) => println!("\n{}", text),
            None => eprintln!("\nCould not load the {} advice.", remedy),
        }
    }
    Ok(())
}

fn print_weather(result: &AggregatedResult) {
    match &result.weather {
        Some(reading) => {
            println!("{}", result.location_name);
            println!(
                "  {} {}: {} (low {}, high {})",
                reading.display_temperature(),
                reading.category.description(),
                reading.condition,
                reading.display_temp_min(),
                reading.display_temp_max()
            );
            println!(
                "  Humidity {}  Pressure {}  Wind {} {}",
                reading.display_humidity(),
                reading.display_pressure(),
                reading.display_wind_speed(),
                reading.display_wind_direction()
            );
        }
        None => println!("Current conditions unavailable"),
    }

    let Some(all) = &result.all_agent_weather else {
        return;
    };

    let today = chrono::Local::now().date_naive();
    let upcoming = upcoming_advisories(all, today, ADVISORY_DAYS);
    if upcoming.is_empty() {
        println!("\nNo weather advisories for the next {} days", ADVISORY_DAYS);
        return;
    }

    let normalizer = ResponseNormalizer::new(ColonSplit);
    for (date, lines) in upcoming {
        println!("\nAdvisory for {}", date.format("%a %d %b"));
        for line in lines {
            print!("{}", normalizer.normalize_text(&line));
        }
    }
}

fn print_grower_report(report: &GrowerReport) {
    if report.is_empty() {
        eprintln!("\nCould not load grower services.");
        return;
    }

    for card in &report.cards {
        println!("\n== {} ==", card.title);
        print!("{}", card.content);
    }
}
