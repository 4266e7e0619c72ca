use anyhow::Context;
use bridge_core::{BridgeConfig, EnvValues, TransferReport, TransferService};
use bridge_transport::{SourceHttpClient, TargetHttpClient};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "bridge")]
#[command(about = "Move patient records between the person-attribute system and a FHIR server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the source system by name
    Search {
        /// Name or part of a name
        name: String,
    },
    /// Show the canonical record assembled from a source record
    Show {
        /// Source record id (last segment of the search link)
        record_id: String,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Json)]
        format: Format,
        /// Show the FHIR patient that a transfer would create instead
        #[arg(long)]
        fhir: bool,
    },
    /// Create a source record on the FHIR server
    Transfer {
        /// Source record id
        record_id: String,
    },
    /// Search the FHIR server by name
    SearchTarget {
        /// Name or part of a name
        name: String,
    },
    /// Ingest a FHIR patient into the source system
    Reverse {
        /// FHIR Patient id
        patient_id: String,
        /// Print the payload instead of submitting it
        #[arg(long)]
        dry_run: bool,
    },
}

type Service = TransferService<SourceHttpClient, TargetHttpClient>;

fn build_service() -> anyhow::Result<Service> {
    let config = BridgeConfig::from_env_values(EnvValues::from_process_env())?;
    let source = SourceHttpClient::new(config.source_base_url().clone(), config.fetch_timeout())
        .context("source client")?;
    let target = TargetHttpClient::new(config.target_base_url().clone(), config.fetch_timeout())
        .context("target client")?;
    Ok(TransferService::new(source, target, config.fetch_timeout()))
}

fn render<T: Serialize>(value: &T, format: Format) -> anyhow::Result<String> {
    Ok(match format {
        Format::Json => serde_json::to_string_pretty(value)?,
        Format::Yaml => serde_yaml::to_string(value)?,
    })
}

fn print_report(report: &TransferReport) {
    for message in report.messages() {
        eprintln!("warning: {message}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'bridge --help' for commands");
        return Ok(());
    };

    let service = build_service()?;

    match command {
        Commands::Search { name } => {
            let results = service.search_source(&name).await?;
            if results.is_empty() {
                println!("No patients found.");
            }
            for summary in results {
                println!(
                    "ID: {}, Name: {}",
                    summary.record_id().unwrap_or(&summary.uuid),
                    summary.display
                );
            }
        }
        Commands::Show {
            record_id,
            format,
            fhir,
        } => {
            let forward = service.load_canonical(&record_id).await?;
            print_report(&forward.report);
            let output = if fhir {
                let patient = bridge_core::render::to_fhir(&forward.record);
                match format {
                    Format::Json => patient.render_json()?,
                    Format::Yaml => patient.render_yaml()?,
                }
            } else {
                render(&forward.record, format)?
            };
            println!("{output}");
        }
        Commands::Transfer { record_id } => {
            let outcome = service.transfer_to_target(&record_id).await?;
            print_report(&outcome.transfer.report);
            println!(
                "Created on FHIR server (status {}), id: {}",
                outcome.ack.status,
                outcome.ack.id.as_deref().unwrap_or("-")
            );
        }
        Commands::SearchTarget { name } => {
            let patients = service.search_target(&name).await?;
            if patients.is_empty() {
                println!("No patients found.");
            }
            for patient in patients {
                let name = patient
                    .name
                    .first()
                    .map(|n| {
                        let mut parts = n.given.clone();
                        parts.extend(n.family.clone());
                        parts.join(" ")
                    })
                    .unwrap_or_default();
                println!(
                    "ID: {}, Name: {}",
                    patient.id.as_deref().unwrap_or("-"),
                    name
                );
            }
        }
        Commands::Reverse {
            patient_id,
            dry_run,
        } => {
            if dry_run {
                let projection = service.prepare_reverse(&patient_id).await?;
                for err in &projection.unmapped {
                    eprintln!("warning: {err}");
                }
                println!("{}", render(&projection.payload, Format::Json)?);
            } else {
                let outcome = service.transfer_to_source(&patient_id).await?;
                for err in &outcome.projection.unmapped {
                    eprintln!("warning: {err}");
                }
                println!(
                    "Ingested into source (status {}), id: {}",
                    outcome.ack.status,
                    outcome.ack.id.as_deref().unwrap_or("-")
                );
            }
        }
    }

    Ok(())
}
