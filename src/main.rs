//! speclens — index living web specifications and validate spec-step
//! comments in source code.
//!
//! Entry point. Loads configuration, initialises structured logging,
//! opens the index, and dispatches to the query, maintenance, check,
//! LSP, and HTTP server commands.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use speclens::api;
use speclens::catalog::SpecCatalog;
use speclens::config::{AppConfig, DEFAULT_CONFIG_FILE};
use speclens::indexer::Indexer;
use speclens::lens;
use speclens::lens::coverage::{compute_coverage, GradedStep};
use speclens::lens::hover::step_label;
use speclens::lens::outline::parse_outline;
use speclens::lens::scan::{
    build_base_lookup, build_link_pattern, find_spec_links, find_step_notes, group_scopes,
};
use speclens::render;
use speclens::store::{db_path, SpecStore};
use speclens::types::{
    AnchorsReport, RefLink, RefsReport, RefreshOutcome, SearchReport, SpecRef, SpecUrlEntry,
};

#[derive(Parser)]
#[command(name = "speclens", version)]
#[command(about = "Index and query web specifications; validate spec-step comments")]
struct Cli {
    /// Output format for query commands.
    #[arg(long, global = true, default_value = "json")]
    format: OutputFormat,

    /// Config file path.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a section by reference (e.g. HTML#navigate)
    Query {
        reference: SpecRef,

        /// Pin the lookup to an already-indexed revision.
        #[arg(long)]
        sha: Option<String>,
    },

    /// Check whether an anchor exists (exit code reflects the answer)
    Exists { reference: SpecRef },

    /// Find anchors matching a glob pattern
    Anchors {
        pattern: String,

        #[arg(long)]
        spec: Option<String>,

        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Full-text search across indexed specs
    Search {
        query: String,

        #[arg(long)]
        spec: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// List the heading outline of a spec
    List {
        spec: String,

        #[arg(long)]
        sha: Option<String>,
    },

    /// Show references to and from a section
    Refs {
        reference: SpecRef,

        /// incoming, outgoing, or both.
        #[arg(long, default_value = "both")]
        direction: String,

        #[arg(long)]
        sha: Option<String>,
    },

    /// Re-index specs whose upstream moved
    Update {
        /// Restrict to one spec.
        #[arg(long)]
        spec: Option<String>,

        /// Ignore the revision cache.
        #[arg(long)]
        force: bool,
    },

    /// List all known specs
    Specs,

    /// Validate spec-step comments in source files
    Check { files: Vec<PathBuf> },

    /// Serve the read-only JSON API
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run the language server on stdio
    Lsp,

    /// Delete the index database
    ClearDb {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
}

fn print_json<T: serde::Serialize>(data: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Initialise the `tracing` subscriber.
///
/// Logs go to stderr: stdout carries command output (and, in LSP mode,
/// the protocol stream).
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("speclens=info"));

    if std::env::var("SPECLENS_LOG_JSON").is_ok() {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    }
}

async fn build_indexer(cfg: &AppConfig) -> Result<Arc<Indexer>> {
    let store = SpecStore::open(&db_path(cfg.index.db_path.as_deref())).await?;
    let catalog = Arc::new(SpecCatalog::new(cfg)?);
    Ok(Arc::new(Indexer::new(
        store,
        catalog,
        cfg.index.refresh_ttl_hours,
    )))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;
    init_logging();

    match cli.command {
        Commands::Query { reference, sha } => {
            let indexer = build_indexer(&cfg).await?;
            let report = indexer.section_report(&reference, sha.as_deref()).await?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Markdown => print!("{}", render::section(&report)),
            }
        }

        Commands::Exists { reference } => {
            let indexer = build_indexer(&cfg).await?;
            let report = indexer.exists_report(&reference).await?;
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Markdown => println!("{}", render::exists(&report)),
            }
            std::process::exit(if report.exists { 0 } else { 1 });
        }

        Commands::Anchors {
            pattern,
            spec,
            limit,
        } => {
            let indexer = build_indexer(&cfg).await?;
            let like = pattern.replace('*', "%");
            let results = indexer
                .store()
                .match_anchors(&like, spec.as_deref(), limit)
                .await?;
            let report = AnchorsReport { pattern, results };
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Markdown => print!("{}", render::anchors(&report)),
            }
        }

        Commands::Search { query, spec, limit } => {
            let indexer = build_indexer(&cfg).await?;
            let results = indexer
                .store()
                .search(&query, spec.as_deref(), limit)
                .await?;
            let report = SearchReport { query, results };
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Markdown => print!("{}", render::search(&report)),
            }
        }

        Commands::List { spec, sha } => {
            let indexer = build_indexer(&cfg).await?;
            let entries = indexer.heading_list(&spec, sha.as_deref()).await?;
            match cli.format {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Markdown => print!("{}", render::headings(&entries)),
            }
        }

        Commands::Refs {
            reference,
            direction,
            sha,
        } => {
            let indexer = build_indexer(&cfg).await?;
            let (spec_name, snapshot_id, _) = indexer
                .resolve_snapshot(&reference.spec, sha.as_deref())
                .await?;

            let outgoing = if direction == "outgoing" || direction == "both" {
                Some(
                    indexer
                        .store()
                        .outgoing_refs(snapshot_id, &reference.anchor)
                        .await?
                        .into_iter()
                        .map(|(spec, anchor)| RefLink { spec, anchor })
                        .collect(),
                )
            } else {
                None
            };
            let incoming = if direction == "incoming" || direction == "both" {
                Some(
                    indexer
                        .store()
                        .incoming_refs(&spec_name, &reference.anchor)
                        .await?
                        .into_iter()
                        .map(|(spec, anchor)| RefLink { spec, anchor })
                        .collect(),
                )
            } else {
                None
            };

            let report = RefsReport {
                anchor: reference.anchor,
                direction,
                outgoing,
                incoming,
            };
            match cli.format {
                OutputFormat::Json => print_json(&report)?,
                OutputFormat::Markdown => print!("{}", render::refs(&report)),
            }
        }

        Commands::Update { spec, force } => {
            let indexer = build_indexer(&cfg).await?;
            let outcomes = match spec {
                Some(spec_name) => {
                    let spec = indexer
                        .catalog()
                        .find_spec(&spec_name)
                        .with_context(|| format!("Unknown spec: {spec_name}"))?;
                    let source = indexer.catalog().source_for(spec)?;
                    let outcome = indexer.refresh(spec, source, force).await?;
                    vec![RefreshOutcome {
                        spec: spec.name.to_string(),
                        updated: outcome.is_some(),
                        sha: outcome.map(|(_, sha)| sha),
                    }]
                }
                None => indexer
                    .refresh_all(force)
                    .await
                    .into_iter()
                    .filter_map(|(spec, result)| match result {
                        Ok(outcome) => Some(RefreshOutcome {
                            spec,
                            updated: outcome.is_some(),
                            sha: outcome.map(|(_, sha)| sha),
                        }),
                        Err(e) => {
                            warn!(spec = %spec, error = %e, "Update failed");
                            None
                        }
                    })
                    .collect(),
            };

            match cli.format {
                OutputFormat::Json => print_json(&outcomes)?,
                OutputFormat::Markdown => {
                    for o in &outcomes {
                        if o.updated {
                            println!("Updated {} ({})", o.spec, o.sha.as_deref().unwrap_or("?"));
                        } else {
                            println!("{} is already up to date", o.spec);
                        }
                    }
                }
            }
        }

        Commands::Specs => {
            let catalog = SpecCatalog::new(&cfg)?;
            let entries: Vec<SpecUrlEntry> = catalog
                .all_specs()
                .into_iter()
                .map(|spec| SpecUrlEntry {
                    spec: spec.name.to_string(),
                    base_url: spec.base_url.to_string(),
                    publisher: spec.publisher.to_string(),
                })
                .collect();
            match cli.format {
                OutputFormat::Json => print_json(&entries)?,
                OutputFormat::Markdown => print!("{}", render::specs(&entries)),
            }
        }

        Commands::Check { files } => {
            if files.is_empty() {
                anyhow::bail!("No files to check");
            }
            let indexer = build_indexer(&cfg).await?;
            let clean = run_check(&indexer, &files, cfg.lens.fuzzy_threshold).await?;
            std::process::exit(if clean { 0 } else { 1 });
        }

        Commands::Serve { port } => {
            let indexer = build_indexer(&cfg).await?;
            api::serve(indexer, port.unwrap_or(cfg.server.port)).await?;
        }

        Commands::Lsp => {
            let indexer = build_indexer(&cfg).await?;
            lens::server::serve_stdio(indexer, &cfg.lens).await;
        }

        Commands::ClearDb { yes } => {
            let path = db_path(cfg.index.db_path.as_deref());
            if !path.exists() {
                println!("Database does not exist: {}", path.display());
                return Ok(());
            }

            if !yes {
                use std::io::{self, Write};
                println!("This will delete: {}", path.display());
                print!("Continue? [y/N] ");
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;
                if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                    println!("Aborted.");
                    return Ok(());
                }
            }

            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to delete {}", path.display()))?;
            println!("Database cleared: {}", path.display());
        }
    }

    Ok(())
}

/// Run the lens over source files, printing per-step warnings and
/// per-algorithm coverage. Returns false when any step is drifted or
/// missing.
async fn run_check(indexer: &Indexer, files: &[PathBuf], threshold: f64) -> Result<bool> {
    let spec_urls = indexer.catalog().spec_urls();
    let pattern = build_link_pattern(&spec_urls);
    let lookup = build_base_lookup(&spec_urls);

    let mut clean = true;

    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let display = file.display();

        let links = find_spec_links(&text, &pattern, &lookup);
        let notes = find_step_notes(&text);
        let scopes = group_scopes(&links, &notes);

        if scopes.is_empty() {
            info!(file = %file.display(), "No spec references found");
            continue;
        }

        for (link, notes_in_scope) in &scopes {
            let spec_ref = SpecRef {
                spec: link.spec.clone(),
                anchor: link.anchor.clone(),
            };
            let report = indexer.section_report(&spec_ref, None).await?;

            let Some(body) = report.body.as_deref().filter(|b| !b.is_empty()) else {
                warn!(reference = %spec_ref, "Section has no body to check against");
                continue;
            };
            let steps = parse_outline(body);
            if steps.is_empty() {
                warn!(reference = %spec_ref, "Section has no numbered steps");
                continue;
            }

            let findings = lens::grade_notes(notes_in_scope, &steps, &link.anchor, threshold);
            for finding in &findings {
                if !finding.grade.is_warning() {
                    continue;
                }
                clean = false;
                let label = step_label(&finding.note.number);
                let line = finding.note.line + 1;
                if finding.spec_text.is_empty() {
                    println!(
                        "{display}:{line}: Step {label}: not found in algorithm '{}'",
                        link.anchor
                    );
                } else {
                    println!(
                        "{display}:{line}: Step {label}: text differs from spec (expected: {})",
                        finding.spec_text
                    );
                }
            }

            let graded: Vec<GradedStep> = findings
                .iter()
                .map(|f| GradedStep {
                    note: f.note.clone(),
                    grade: f.grade,
                })
                .collect();
            let coverage = compute_coverage(&graded, &steps, &link.anchor);
            println!("{display}: {}", coverage.summary());
        }
    }

    Ok(clean)
}
