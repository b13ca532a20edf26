//! Command-line front end for accreditation scoring.
//!
//! Usage:
//!     quxat score "Apollo Hospitals Chennai" --city Chennai --claim "JCI"
//!     quxat batch --input organizations.json --format json
//!     quxat registry
//!     quxat suggest apollo --limit 5

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quxat_explain::{explain_breakdown, recommendations, summarize};
use quxat_model::{
    AccreditationType, CertificationClaim, Location, OrganizationQuery, QualitySignal,
    ScoreBreakdown,
};
use quxat_registry::{registry_path, RegistryStore};
use quxat_resolver::{RegistrySuggestions, SuggestionSource};
use quxat_scoring::{MandatoryRules, ScoringConfig, ScoringEngine};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quxat")]
#[command(about = "Score healthcare organizations against accreditation registries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding one JSON registry per accreditation type
    #[arg(long, env = "QUXAT_REGISTRY_DIR", default_value = "registries", global = true)]
    registry_dir: PathBuf,

    /// Scoring configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mandatory-standard rules (JSON array)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one organization
    Score {
        /// Organization name
        name: String,

        #[arg(long)]
        city: Option<String>,

        #[arg(long)]
        state: Option<String>,

        #[arg(long)]
        country: Option<String>,

        /// Certification the organization claims (repeatable)
        #[arg(long = "claim")]
        claims: Vec<String>,

        /// Quality signal as NAME=POINTS (repeatable)
        #[arg(long = "signal", value_parser = parse_signal)]
        signals: Vec<QualitySignal>,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Score a JSON array of organizations
    Batch {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show which registries loaded
    Registry,

    /// Suggest registry names for a partial name
    Suggest {
        partial: String,

        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// One batch entry in the JSON output.
#[derive(Serialize)]
struct BatchEntry {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<ScoreBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "quxat=debug" } else { "quxat=info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();

    let config = match &cli.config {
        Some(path) => ScoringConfig::load(path)?,
        None => ScoringConfig::default(),
    };
    let rules = match &cli.rules {
        Some(path) => MandatoryRules::load(path)?,
        None => MandatoryRules::default(),
    };

    let store = Arc::new(load_registries(&cli.registry_dir, &config, &rules));

    match cli.command {
        Commands::Score {
            name,
            city,
            state,
            country,
            claims,
            signals,
            format,
        } => {
            let location = Location {
                city,
                state,
                country,
            };
            let mut query = OrganizationQuery::new(name).with_location(location);
            query.known_certifications = claims.into_iter().map(CertificationClaim::new).collect();
            query.quality_signals = signals;

            let engine = ScoringEngine::new(store, config)?;
            let breakdown = engine.score(&query, &rules)?;
            match format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&breakdown)?),
                Format::Text => print_breakdown(&breakdown),
            }
        }
        Commands::Batch { input, format } => {
            let engine = ScoringEngine::new(store, config)?;
            run_batch(&engine, &rules, &input, format)?;
        }
        Commands::Registry => {
            run_registry(&store, &cli.registry_dir);
        }
        Commands::Suggest { partial, limit } => {
            let suggestions = RegistrySuggestions::new(&store).suggest(&partial, limit);
            if suggestions.is_empty() {
                println!("No suggestions for '{}'", partial);
            }
            for suggestion in suggestions {
                let types: Vec<String> = suggestion
                    .accreditation_types
                    .iter()
                    .map(|t| t.to_string())
                    .collect();
                let city = suggestion
                    .location
                    .as_ref()
                    .and_then(|l| l.city.as_deref())
                    .map(|c| format!(" ({})", c))
                    .unwrap_or_default();
                println!("{}{} [{}]", suggestion.name, city, types.join(", "));
            }
        }
    }

    Ok(())
}

/// Known registries are always loaded, so a missing file is reported.
/// Other referenced types are loaded only when their file exists.
fn load_registries(dir: &Path, config: &ScoringConfig, rules: &MandatoryRules) -> RegistryStore {
    let mut extra: Vec<AccreditationType> = config
        .weights
        .keys()
        .cloned()
        .chain(rules.referenced_types())
        .filter(|t| matches!(t, AccreditationType::Other(_)))
        .filter(|t| registry_path(dir, t).is_file())
        .collect();
    extra.sort();
    extra.dedup();

    RegistryStore::builder()
        .load_dir(dir, AccreditationType::KNOWN.iter().chain(&extra))
        .build()
}

fn parse_signal(text: &str) -> Result<QualitySignal, String> {
    let (name, points) = text
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=POINTS, got '{}'", text))?;
    let points: f64 = points
        .trim()
        .parse()
        .map_err(|_| format!("invalid points in '{}'", text))?;
    Ok(QualitySignal::new(name.trim(), points))
}

fn print_breakdown(breakdown: &ScoreBreakdown) {
    println!("{}", breakdown.organization);
    println!("{}", summarize(breakdown));
    println!(
        "   Certification: {:.1} (bonus {:.1}) | Initiatives: {:.1} | Penalty: {:.1}",
        breakdown.certification_score,
        breakdown.diversity_bonus,
        breakdown.quality_initiative_score,
        breakdown.mandatory_penalty
    );
    println!(
        "   Grade: {} ({}) | Compliant: {}",
        breakdown.grade.label(),
        breakdown.grade.description(),
        breakdown.compliant
    );

    for explanation in explain_breakdown(breakdown) {
        println!("   - {}: {}", explanation.summary, explanation.detail);
    }

    if !breakdown.unconfirmed_claims.is_empty() {
        let claims: Vec<&str> = breakdown
            .unconfirmed_claims
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        println!("   Unconfirmed claims: {}", claims.join(", "));
    }

    let steps = recommendations(breakdown);
    if !steps.is_empty() {
        println!("   Recommendations:");
        for step in steps {
            println!("   * [{}] {} ({})", step.priority.label(), step.action, step.impact);
        }
    }
}

fn run_batch(engine: &ScoringEngine, rules: &MandatoryRules, input: &Path, format: Format) -> Result<()> {
    let text = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let queries: Vec<OrganizationQuery> = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a JSON array of organizations", input.display()))?;

    tracing::info!(organizations = queries.len(), threads = rayon::current_num_threads(), "Scoring batch");
    let results = engine.score_batch(&queries, rules);

    match format {
        Format::Json => {
            let entries: Vec<BatchEntry> = results
                .into_iter()
                .enumerate()
                .map(|(index, result)| match result {
                    Ok(breakdown) => BatchEntry {
                        index,
                        breakdown: Some(breakdown),
                        error: None,
                    },
                    Err(e) => BatchEntry {
                        index,
                        breakdown: None,
                        error: Some(e.to_string()),
                    },
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        Format::Text => {
            for (index, result) in results.iter().enumerate() {
                match result {
                    Ok(breakdown) => {
                        println!("{}. {} | {}", index + 1, breakdown.organization, summarize(breakdown))
                    }
                    Err(e) => println!("{}. ERROR: {}", index + 1, e),
                }
            }
            println!("---");
            println!("Total: {} organizations", results.len());
        }
    }

    Ok(())
}

fn run_registry(store: &RegistryStore, dir: &Path) {
    println!("Registries in {}", dir.display());
    println!("---");
    for summary in store.summary() {
        match &summary.error {
            Some(error) => println!("{:<10} UNAVAILABLE: {}", summary.accreditation_type, error),
            None => println!(
                "{:<10} {} records ({} verified)",
                summary.accreditation_type, summary.records, summary.verified
            ),
        }
    }
}
