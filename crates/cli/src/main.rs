//! polyclean CLI - vector polygon cleanup

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use polyclean_algorithms::eliminate::{eliminate, EliminateParams, MergePolicy, VictimSpec};
use polyclean_algorithms::explode::explode;
use polyclean_core::io::{read_vector, select_fids_where, write_vector};
use polyclean_core::Error;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "polyclean")]
#[command(author, version, about = "Vector polygon cleanup tools", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Absorb selected polygons into a touching neighbor
    Eliminate {
        /// Source dataset
        src: PathBuf,
        /// Destination dataset
        dst: PathBuf,
        /// Select victims with polygon area below this value
        #[arg(long, value_name = "AREA", conflicts_with = "where_clause")]
        min: Option<f64>,
        /// Select victims with an attribute filter expression
        #[arg(long = "where", value_name = "FILTER")]
        where_clause: Option<String>,
        /// Output driver; guessed from the destination extension if omitted
        #[arg(short = 'f', long)]
        format: Option<String>,
        /// Source layer name (required for multi-layer datasets)
        #[arg(long)]
        src_layer: Option<String>,
        /// Destination layer name (defaults to the source layer name)
        #[arg(long)]
        dst_layer: Option<String>,
        /// Merge policy: largest-area, smallest-area, longest-boundary
        #[arg(long, default_value = "largest-area")]
        policy: String,
    },
    /// Split multi-part geometries into single-part features
    Explode {
        /// Source dataset
        src: PathBuf,
        /// Destination dataset
        dst: PathBuf,
        /// Output driver; guessed from the destination extension if omitted
        #[arg(short = 'f', long)]
        format: Option<String>,
        /// Source layer name (required for multi-layer datasets)
        #[arg(long)]
        src_layer: Option<String>,
        /// Destination layer name (defaults to the source layer name)
        #[arg(long)]
        dst_layer: Option<String>,
    },
    /// Show information about a vector dataset
    Info {
        /// Input dataset
        src: PathBuf,
        /// Layer name (required for multi-layer datasets)
        #[arg(long)]
        layer: Option<String>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn parse_policy(s: &str) -> Result<MergePolicy> {
    match s.to_lowercase().as_str() {
        "largest-area" | "largest" => Ok(MergePolicy::LargestArea),
        "smallest-area" | "smallest" => Ok(MergePolicy::SmallestArea),
        "longest-boundary" | "longest" => Ok(MergePolicy::LongestBoundary),
        _ => anyhow::bail!(
            "Unknown policy: {}. Use largest-area, smallest-area, or longest-boundary.",
            s
        ),
    }
}

/// Resolve the victim filter: `--min A` is sugar for
/// `OGR_GEOM_AREA < A`, and exactly one of the two must be given.
fn victim_filter(min: Option<f64>, where_clause: Option<String>) -> Result<String> {
    match (min, where_clause) {
        (Some(_), Some(_)) => Err(Error::ConflictingVictimSpec.into()),
        (Some(area), None) => {
            if area <= 0.0 {
                return Err(Error::InvalidMinArea(area).into());
            }
            Ok(format!("OGR_GEOM_AREA < {}", area))
        }
        (None, Some(filter)) => Ok(filter),
        (None, None) => Err(Error::NoVictimsSpecified.into()),
    }
}

fn done(name: &str, path: &PathBuf, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Eliminate {
            src,
            dst,
            min,
            where_clause,
            format,
            src_layer,
            dst_layer,
            policy,
        } => {
            let policy = parse_policy(&policy)?;
            let filter = victim_filter(min, where_clause)?;

            let pb = spinner("Selecting victims...");
            let fids = select_fids_where(&src, src_layer.as_deref(), &filter)
                .context("Failed to select victims")?;
            pb.finish_and_clear();
            info!("{} victim(s) selected", fids.len());

            let pb = spinner("Reading features...");
            let mut layer =
                read_vector(&src, src_layer.as_deref()).context("Failed to read source layer")?;
            pb.finish_and_clear();
            info!("Input: {} features", layer.len());

            if fids.is_empty() {
                warn!("Filter selected no features; output is a copy of the input");
                write_vector(&layer, &dst, dst_layer.as_deref(), format.as_deref())
                    .context("Failed to write output")?;
                done("Eliminate", &dst, std::time::Duration::ZERO);
                return Ok(());
            }

            let start = Instant::now();
            let (out, summary) = eliminate(
                &mut layer,
                &EliminateParams {
                    victims: VictimSpec::Fids(fids),
                    policy,
                },
            )
            .context("Eliminate failed")?;
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            write_vector(&out, &dst, dst_layer.as_deref(), format.as_deref())
                .context("Failed to write output")?;
            pb.finish_and_clear();

            done("Eliminate", &dst, elapsed);
            println!(
                "  {} features in, {} out, {} absorbed",
                summary.source_features, summary.emitted, summary.victims_absorbed
            );
            let dropped = summary.victims_no_neighbors
                + summary.victims_no_touching
                + summary.victims_unresolved;
            if dropped > 0 {
                println!("  {} victim(s) dropped without a merge target", dropped);
            }
        }

        Commands::Explode {
            src,
            dst,
            format,
            src_layer,
            dst_layer,
        } => {
            let pb = spinner("Reading features...");
            let layer =
                read_vector(&src, src_layer.as_deref()).context("Failed to read source layer")?;
            pb.finish_and_clear();

            let start = Instant::now();
            let (out, summary) = explode(&layer).context("Explode failed")?;
            let elapsed = start.elapsed();

            let pb = spinner("Writing output...");
            write_vector(&out, &dst, dst_layer.as_deref(), format.as_deref())
                .context("Failed to write output")?;
            pb.finish_and_clear();

            done("Explode", &dst, elapsed);
            println!(
                "  {} features in, {} out ({} split)",
                summary.source_features, summary.emitted, summary.expanded
            );
        }

        Commands::Info { src, layer } => {
            let layer = read_vector(&src, layer.as_deref()).context("Failed to read layer")?;
            let schema = layer.schema();

            println!("Layer: {}", layer.name());
            println!("Driver: {}", layer.driver());
            println!("Features: {}", layer.len());
            println!("Geometry: {}", schema.geometry_type);
            if let Some(srs) = &schema.srs {
                println!("CRS: {}", srs);
            }
            println!("Fields:");
            for field in &schema.fields {
                println!("  {} ({:?})", field.name, field.field_type);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_is_sugar_for_area_filter() {
        assert_eq!(
            victim_filter(Some(0.005), None).unwrap(),
            "OGR_GEOM_AREA < 0.005"
        );
        assert_eq!(victim_filter(None, Some("a = 1".into())).unwrap(), "a = 1");
    }

    #[test]
    fn test_victim_filter_validation() {
        assert!(victim_filter(None, None).is_err());
        assert!(victim_filter(Some(0.0), None).is_err());
        assert!(victim_filter(Some(-1.0), None).is_err());
        assert!(victim_filter(Some(1.0), Some("a = 1".into())).is_err());
    }

    #[test]
    fn test_parse_policy() {
        assert_eq!(parse_policy("largest-area").unwrap(), MergePolicy::LargestArea);
        assert_eq!(parse_policy("SMALLEST").unwrap(), MergePolicy::SmallestArea);
        assert_eq!(
            parse_policy("longest-boundary").unwrap(),
            MergePolicy::LongestBoundary
        );
        assert!(parse_policy("biggest").is_err());
    }
}
