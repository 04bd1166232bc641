//! sfpm CLI
//!
//! Command-line interface for Salesforce project-management reporting:
//! - List work items, log time, update status
//! - Project summaries
//! - Estimate accuracy, utilization, velocity, scope and budget analytics
//! - Ad hoc SOQL, aggregate queries and object describe

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use sfpm::config::{Config, LoggingConfig};
use sfpm::reports::{
    AggregateFunction, AggregateRequest, GroupDimension, Report, Reporter, TimeEntryRequest,
    WorkItemFilter, WorkItemStatus,
};
use sfpm::salesforce::SalesforceClient;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sfpm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Project-management reporting over Salesforce")]
#[command(long_about = "sfpm queries work items, projects and time entries in a Salesforce org\nand turns them into status, utilization and estimation reports.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List work items
    WorkItems {
        /// Status filter (To Do, In Progress, Done, Blocked)
        #[arg(short, long)]
        status: Option<String>,
        /// Project name
        #[arg(short, long)]
        project: Option<String>,
        /// Only items due today
        #[arg(long)]
        due_today: bool,
    },

    /// Log hours against a work item
    LogTime {
        /// Work item number, e.g. WI-0042
        work_item: String,
        /// Hours spent (0-24]
        hours: f64,
        /// Entry date, YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Change a work item's status
    UpdateStatus {
        /// Work item number
        work_item: String,
        /// New status (To Do, In Progress, Done, Blocked)
        status: WorkItemStatus,
    },

    /// Summarize a project
    Project {
        /// Project name
        name: String,
    },

    /// Actual vs estimated hours of completed work
    Accuracy {
        /// Grouping (type, project, priority)
        #[arg(short, long, default_value = "type")]
        group_by: GroupDimension,
    },

    /// Hours per project per day
    Utilization {
        /// Weeks to look back
        #[arg(short, long, default_value = "2")]
        weeks: u32,
    },

    /// Completed items per week
    Velocity {
        /// Weeks to look back
        #[arg(short, long, default_value = "6")]
        weeks: u32,
    },

    /// Adjust a gut estimate by history
    Scope {
        /// Work type, e.g. Bug or Feature
        work_type: String,
        /// Gut estimate in hours
        gut_estimate: f64,
    },

    /// Today's workload against a target
    Budget {
        /// Target hours (default: from config)
        #[arg(short, long)]
        target: Option<f64>,
    },

    /// Run an arbitrary SOQL query
    Query {
        /// SOQL text
        soql: String,
    },

    /// Run an aggregate query
    Aggregate {
        /// Object API name, e.g. Work_Item__c
        object: String,
        /// COUNT, SUM, AVG, MIN or MAX
        function: AggregateFunction,
        /// Field to aggregate (optional for COUNT)
        #[arg(long)]
        field: Option<String>,
        /// Field to group by
        #[arg(short, long)]
        group_by: Option<String>,
        /// WHERE text without the keyword
        #[arg(short = 'w', long = "where")]
        filter: Option<String>,
    },

    /// Describe an object's schema
    Describe {
        /// Object API name
        object: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        let config = sfpm::config::generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &config)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => {
            dotenvy::dotenv().ok();
            Config::load_with_env(path)
                .with_context(|| format!("loading config from {}", path.display()))?
        }
        None => Config::load_default(),
    };
    init_tracing(&config.logging);

    let client = SalesforceClient::new(config.salesforce.clone())?;
    let reporter = Reporter::new(client, config.reporting.clone());

    run(cli.command, &reporter, cli.format).await
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sfpm={}", logging.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(
    command: Commands,
    reporter: &Reporter<SalesforceClient>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match command {
        Commands::WorkItems {
            status,
            project,
            due_today,
        } => {
            let filter = WorkItemFilter {
                status,
                project,
                due_today,
            };
            emit(&reporter.work_items(&filter).await?, format)
        }

        Commands::LogTime {
            work_item,
            hours,
            date,
            notes,
        } => {
            let request = TimeEntryRequest {
                work_item,
                hours,
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                notes,
            };
            emit(&reporter.log_time(&request).await?, format)
        }

        Commands::UpdateStatus { work_item, status } => {
            emit(&reporter.update_status(&work_item, status).await?, format)
        }

        Commands::Project { name } => emit(&reporter.project_summary(&name).await?, format),

        Commands::Accuracy { group_by } => {
            emit(&reporter.estimate_accuracy(group_by).await?, format)
        }

        Commands::Utilization { weeks } => {
            emit(&reporter.weekly_utilization(weeks).await?, format)
        }

        Commands::Velocity { weeks } => emit(&reporter.velocity_trend(weeks).await?, format),

        Commands::Scope {
            work_type,
            gut_estimate,
        } => emit(
            &reporter.scope_estimate(&work_type, gut_estimate).await?,
            format,
        ),

        Commands::Budget { target } => emit(&reporter.daily_budget(target).await?, format),

        Commands::Query { soql } => emit(&reporter.query(&soql).await?, format),

        Commands::Aggregate {
            object,
            function,
            field,
            group_by,
            filter,
        } => {
            let request = AggregateRequest {
                object,
                function,
                field,
                group_by,
                filter,
            };
            emit(&reporter.aggregate(&request).await?, format)
        }

        Commands::Describe { object } => emit(&reporter.describe(&object).await?, format),

        Commands::Config { .. } => Ok(()),
    }
}

/// Print a report in the requested format
fn emit<R: Report>(report: &R, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => println!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => report.table().write_csv(std::io::stdout().lock())?,
    }
    Ok(())
}
