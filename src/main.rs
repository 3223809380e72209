use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use lms_performance::logging::init_tracing;
use lms_performance::models::Warning;
use lms_performance::report;
use lms_performance::{
    compute_course_performance, compute_performance, ApiClient, ClientConfig, CollectionSource,
    Scope, SnapshotSource,
};

#[derive(Parser)]
#[command(name = "lms-performance")]
#[command(about = "Student and course performance summaries from an LMS REST API", long_about = None)]
struct Cli {
    /// Base URL of the LMS REST API
    #[arg(long, env = "LMS_API_URL")]
    api_url: Option<String>,
    /// Bearer token sent with every request
    #[arg(long, env = "LMS_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Read assignments.json, submissions.json and enrollments.json from
    /// this directory instead of calling the API
    #[arg(long, conflicts_with = "api_url")]
    snapshot: Option<PathBuf>,
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Graded, awaiting, pending and overdue work for one student
    Student {
        #[arg(long)]
        student_id: i64,
        #[arg(long)]
        course_id: Option<i64>,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Per-student averages and at-risk counts for a course
    Course {
        #[arg(long)]
        course_id: i64,
        #[arg(long, default_value_t = 70.0)]
        threshold: f64,
        #[arg(long, value_enum, default_value_t = Format::Markdown)]
        format: Format,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write the student roster with averages as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Markdown,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(dir) = cli.snapshot {
        debug!(dir = %dir.display(), "using snapshot source");
        return run(&SnapshotSource::new(dir), cli.command).await;
    }

    let api_url = cli
        .api_url
        .context("LMS_API_URL (or --api-url) must be set, or pass --snapshot")?;
    let mut config =
        ClientConfig::new(api_url).with_timeout(Duration::from_secs(cli.timeout_secs.max(1)));
    if let Some(token) = cli.token {
        config = config.with_token(token);
    }
    let client = ApiClient::new(config).context("failed to set up the API client")?;

    run(&client, cli.command).await
}

async fn run<S: CollectionSource>(source: &S, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Student {
            student_id,
            course_id,
            format,
            out,
        } => {
            let scope = Scope::new(course_id, Some(student_id))?;
            let record = compute_performance(source, &scope, Local::now().date_naive()).await?;
            surface_warnings(&record.warnings);

            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(&record)? + "\n",
                Format::Markdown => report::build_student_report(&record),
            };
            emit(&rendered, out.as_deref())?;
        }
        Commands::Course {
            course_id,
            threshold,
            format,
            out,
            csv,
        } => {
            let record = compute_course_performance(source, course_id, threshold).await?;
            surface_warnings(&record.warnings);

            if let Some(path) = csv {
                report::write_roster_csv(&record, &path)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                eprintln!("Roster written to {}.", path.display());
            }

            let rendered = match format {
                Format::Json => serde_json::to_string_pretty(&record)? + "\n",
                Format::Markdown => report::build_course_report(&record),
            };
            emit(&rendered, out.as_deref())?;
        }
    }

    Ok(())
}

fn surface_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn emit(rendered: &str, out: Option<&Path>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Report written to {}.", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
