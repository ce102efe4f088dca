//! acervo: command-line client for the document catalog.
//!
//! Reads ACERVO_API_URL (or API_URL), ACERVO_API_TOKEN and ACERVO_TENANT_ID from the environment
//! or a `.env` file. Uses bearer auth.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use acervo_api_client::ApiClient;
use acervo_cli::{document_table, init_tracing, print_json, Session};
use acervo_core::models::{CatalogFilter, DateRange, ReferencePeriod};
use acervo_core::{AcervoConfig, Category};
use acervo_services::UploadOptions;
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "acervo", about = "Acervo document catalog CLI")]
struct Cli {
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload one or more files into a category
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Category slug: fiscal, accounting, labor, legal, operational, certificates, templates
        #[arg(long)]
        category: Category,
        #[arg(long)]
        subcategory: Option<String>,
        /// Title for every file (defaults to each file name)
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        share_with_accountant: bool,
    },
    /// List documents with optional filters
    List {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        subcategory: Option<String>,
        /// Text search on name, filename, description and tags
        #[arg(long)]
        search: Option<String>,
        /// Upload date lower bound (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Upload date upper bound (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Reference period (MM/YYYY)
        #[arg(long)]
        period: Option<String>,
        /// Repeatable; documents with any of the tags match
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// 1-based page number
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long)]
        per_page: Option<u32>,
    },
    /// Rename a document
    Rename { id: Uuid, name: String },
    /// Look for documents with the same file name
    Duplicates { filename: String },
    /// Delete documents; each is deleted independently
    Delete {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Download documents as a zip or tar archive
    Archive {
        #[arg(required = true)]
        ids: Vec<Uuid>,
        /// Output file or directory
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },
    /// Upload a file as the next version of a document
    Replace {
        id: Uuid,
        file: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Show the version history of a document, newest first
    History { id: Uuid },
    /// Document counts per category and subcategory
    Counts,
    /// Access log of a document
    Access { id: Uuid },
}

fn build_filter(
    category: Option<Category>,
    subcategory: Option<&str>,
    search: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    period: Option<&str>,
    tags: Vec<String>,
) -> anyhow::Result<CatalogFilter> {
    let mut filter = CatalogFilter::new().with_date_range(DateRange::new(from, to));
    if let Some(category) = category {
        filter = filter.with_category(category, subcategory);
    }
    if let Some(search) = search {
        filter = filter.with_text(search);
    }
    if let Some(period) = period {
        let period: ReferencePeriod = period.parse()?;
        filter = filter.with_reference_period(period);
    }
    for tag in tags {
        filter = filter.with_tag(tag);
    }
    Ok(filter)
}

async fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = AcervoConfig::from_env().context("Invalid configuration")?;
    config
        .require_token()
        .context("Set ACERVO_API_TOKEN to call the document API")?;
    let client = ApiClient::from_config(&config).context("Failed to create API client")?;
    let session = Session::new(Arc::new(client), config)
        .context("Set ACERVO_TENANT_ID to the tenant to work on")?;

    match cli.command {
        Commands::Upload {
            files,
            category,
            subcategory,
            title,
            description,
            tags,
            private,
            share_with_accountant,
        } => {
            let mut options = UploadOptions::new(category)
                .private(private)
                .shared_with_accountant(share_with_accountant);
            if let Some(sub) = subcategory {
                options = options.with_subcategory(sub);
            }
            if let Some(title) = title {
                options = options.with_title(title);
            }
            if let Some(description) = description {
                options = options.with_description(description);
            }
            for tag in tags {
                options = options.with_tag(tag);
            }

            let summary = session.upload(&files, options).await?;
            if cli.json {
                print_json(&summary)?;
            } else {
                print!("{}", document_table(&summary.uploaded));
                for (filename, reason) in &summary.failed {
                    eprintln!("failed: {}: {}", filename, reason);
                }
            }
            Ok(summary.is_complete())
        }
        Commands::List {
            category,
            subcategory,
            search,
            from,
            to,
            period,
            tags,
            page,
            per_page,
        } => {
            let filter = build_filter(
                category,
                subcategory.as_deref(),
                search,
                from,
                to,
                period.as_deref(),
                tags,
            )?;
            let result = session
                .list(filter, page.saturating_sub(1), per_page)
                .await?;
            if cli.json {
                print_json(&serde_json::json!({
                    "items": result.items,
                    "meta": result.meta,
                }))?;
            } else {
                print!("{}", document_table(&result.items));
                println!(
                    "page {} of {} ({} documents)",
                    result.meta.page,
                    result.meta.total_pages.max(1),
                    result.total
                );
            }
            Ok(true)
        }
        Commands::Rename { id, name } => {
            let document = session.rename(id, &name).await?;
            print_json(&document)?;
            Ok(true)
        }
        Commands::Duplicates { filename } => {
            let duplicates = session.duplicates(&filename).await?;
            if cli.json {
                print_json(&duplicates)?;
            } else {
                print!("{}", document_table(&duplicates));
            }
            Ok(true)
        }
        Commands::Delete { ids } => {
            let report = session.delete(&ids).await?;
            if cli.json {
                print_json(&report)?;
            } else {
                println!("{}", report.summary());
            }
            Ok(report.failed() == 0)
        }
        Commands::Archive { ids, output } => {
            let (path, report) = session.archive(&ids, &output).await?;
            if cli.json {
                print_json(&serde_json::json!({ "path": path, "report": report }))?;
            } else {
                println!("{}", report.summary());
                println!("written to {}", path.display());
            }
            Ok(report.failed() == 0)
        }
        Commands::Replace { id, file, title } => {
            let document = session.replace(id, &file, title).await?;
            print_json(&document)?;
            Ok(true)
        }
        Commands::History { id } => {
            let history = session.history(id).await?;
            if cli.json {
                print_json(&history)?;
            } else {
                print!("{}", document_table(&history));
            }
            Ok(true)
        }
        Commands::Counts => {
            let counts = session.counts().await?;
            if cli.json {
                print_json(&counts)?;
            } else {
                for (node, count) in &counts {
                    println!("{:<32} {}", node, count);
                }
            }
            Ok(true)
        }
        Commands::Access { id } => {
            let (entries, summary) = session.access(id).await?;
            print_json(&serde_json::json!({ "entries": entries, "summary": summary }))?;
            Ok(true)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
