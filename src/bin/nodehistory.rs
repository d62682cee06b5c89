//! User agent analysis CLI for Bitcoin node history.
//!
//! Prints user agent leaderboards and before/after migration tables from a
//! node history database. The cutoff comes from the `BASE_TIME` environment
//! variable.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};

use nodehistory::analysis::{
    self,
    report::migration_report,
    types::{Category, LabelStyle, TopAgentsReport, WindowedAgentsReport},
    AxisPolicy,
};
use nodehistory::config::{self, AnalysisConfig};
use nodehistory::error::ConfigError;
use nodehistory::store::{SqliteSource, DEFAULT_TABLE};

#[derive(Parser)]
#[command(name = "nodehistory")]
#[command(about = "User agent prevalence and migration analysis for Bitcoin node history")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the node history SQLite database
    #[arg(short, long, default_value = config::DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Table holding peer observations
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    /// Output directory for JSON reports
    #[arg(short, long, default_value = "analysis_output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Most common user agents over all successful observations
    Top {
        /// Number of user agents to show
        #[arg(short, long, default_value_t = analysis::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Most common latest user agent per peer, before and after the cutoff
    Windows {
        /// Number of user agents to show per window
        #[arg(short, long, default_value_t = analysis::DEFAULT_LIMIT)]
        limit: usize,
    },

    /// Category transitions of peers across the cutoff
    Migrations {
        #[command(flatten)]
        matrix: MatrixArgs,
    },

    /// Run every report
    All {
        /// Number of user agents to show per leaderboard
        #[arg(short, long, default_value_t = analysis::DEFAULT_LIMIT)]
        limit: usize,

        #[command(flatten)]
        matrix: MatrixArgs,
    },
}

#[derive(clap::Args)]
struct MatrixArgs {
    /// Label set: "core" spells UASF-BIP110, "sankey" spells BIP-110 and
    /// hides its row
    #[arg(long, value_enum, default_value_t = LabelArg::Core)]
    labels: LabelArg,

    /// Hide a row (before label) from the matrix; repeatable
    #[arg(long = "hide-row", value_name = "LABEL")]
    hide_rows: Vec<Category>,

    /// Hide a column (after label) from the matrix; repeatable
    #[arg(long = "hide-col", value_name = "LABEL")]
    hide_cols: Vec<Category>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LabelArg {
    Core,
    Sankey,
}

impl MatrixArgs {
    fn apply(&self, config: &mut AnalysisConfig) {
        let (style, base) = match self.labels {
            LabelArg::Core => (LabelStyle::Core, AxisPolicy::default()),
            LabelArg::Sankey => (LabelStyle::Sankey, AxisPolicy::sankey()),
        };
        let policy = self.hide_rows.iter().fold(base, |p, c| p.hide_row(*c));
        config.axis_policy = self.hide_cols.iter().fold(policy, |p, c| p.hide_col(*c));
        config.label_style = style;
    }
}

impl Commands {
    fn needs_cutoff(&self) -> bool {
        !matches!(self, Commands::Top { .. })
    }
}

/// Build the run configuration from the command line, reading the cutoff
/// through `lookup` when the command needs one.
fn resolve_config<F>(cli: &Cli, lookup: F) -> Result<AnalysisConfig, ConfigError>
where
    F: FnOnce(&str) -> Option<String>,
{
    let mut config = AnalysisConfig {
        db_path: cli.db.clone(),
        table: cli.table.clone(),
        ..Default::default()
    };
    match &cli.command {
        Commands::Top { limit } | Commands::Windows { limit } => config.limit = *limit,
        Commands::Migrations { matrix } => matrix.apply(&mut config),
        Commands::All { limit, matrix } => {
            config.limit = *limit;
            matrix.apply(&mut config);
        }
    }

    if cli.command.needs_cutoff() {
        config.cutoff = Some(config::cutoff_from_lookup(config::CUTOFF_ENV_VAR, lookup)?);
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    // Resolve configuration before touching the database
    let config = resolve_config(&cli, |var| std::env::var(var).ok())?;

    let source = SqliteSource::open(&config.db_path, &config.table)?;

    fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output directory: {}", cli.output.display()))?;

    match cli.command {
        Commands::Top { .. } => run_top(&source, &config, &cli.output)?,
        Commands::Windows { .. } => run_windows(&source, &config, &cli.output)?,
        Commands::Migrations { .. } => run_migrations(&source, &config, &cli.output)?,
        Commands::All { .. } => {
            run_top(&source, &config, &cli.output)?;
            run_windows(&source, &config, &cli.output)?;
            run_migrations(&source, &config, &cli.output)?;
        }
    }

    source.close()?;
    log::info!("Analysis complete. Reports written to {}", cli.output.display());

    Ok(())
}

fn run_top(source: &SqliteSource, config: &AnalysisConfig, output_dir: &Path) -> Result<()> {
    log::info!("Counting user agents over all successful observations...");
    let leaderboard = analysis::top_user_agents(source, config.limit)?;
    print!("{}", analysis::format_leaderboard(&leaderboard));

    let report = TopAgentsReport {
        metadata: config.metadata(Some(config.limit)),
        leaderboard,
    };
    analysis::write_json_report(&report, &output_dir.join("top_user_agents.json"))
}

fn run_windows(source: &SqliteSource, config: &AnalysisConfig, output_dir: &Path) -> Result<()> {
    let cutoff = config.require_cutoff()?;
    log::info!("Counting latest user agents around cutoff {}...", cutoff);
    let boards = analysis::windowed_user_agents(source, cutoff, config.limit)?;
    print!("{}", analysis::format_leaderboard(&boards.before));
    print!("{}", analysis::format_leaderboard(&boards.after));

    let report = WindowedAgentsReport {
        metadata: config.metadata(Some(config.limit)),
        before: boards.before,
        after: boards.after,
    };
    analysis::write_json_report(&report, &output_dir.join("windowed_user_agents.json"))
}

fn run_migrations(source: &SqliteSource, config: &AnalysisConfig, output_dir: &Path) -> Result<()> {
    let cutoff = config.require_cutoff()?;
    log::info!("Building transition matrix around cutoff {}...", cutoff);
    let matrix = analysis::user_agent_migrations(source, cutoff)?;
    let view = matrix.view(&config.axis_policy);
    print!("{}", analysis::format_matrix(&view, config.label_style));

    let report = migration_report(&matrix, &view, config.metadata(None), config.label_style);
    analysis::write_json_report(&report, &output_dir.join("migrations.json"))
}
