//! Operator CLI over `panchayat_core`.
//!
//! # Responsibility
//! - Bootstrap the database and upload directory from one config file.
//! - Expose risk scoring, feedback intake, dashboards and overdue alerts.
//! - Print results as JSON on stdout; diagnostics go to the logger.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use log::{error, info};
use panchayat_core::db::open_db;
use panchayat_core::model::location::GeoPoint;
use panchayat_core::repo::contractor_repo::SqliteContractorRepository;
use panchayat_core::repo::feedback_repo::SqliteFeedbackRepository;
use panchayat_core::repo::location_repo::SqliteLocationRepository;
use panchayat_core::repo::project_repo::SqliteProjectRepository;
use panchayat_core::service::contractor_service::ContractorService;
use panchayat_core::service::dashboard_service::DashboardService;
use panchayat_core::service::feedback_service::{FeedbackService, FeedbackSubmission};
use panchayat_core::service::project_service::ProjectService;
use panchayat_core::service::Upload;
use panchayat_core::{
    evaluate, init_console_logging, init_logging, IntegrityChecker, LocalFileStore, LogNotifier,
    PanchayatConfig, RegionScope, RiskInput, RiskStrategy,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "panchayat", version, about = "Panchayat project transparency tools")]
struct Cli {
    /// TOML config file; built-in defaults apply when omitted.
    #[arg(long, env = "PANCHAYAT_CONFIG")]
    config: Option<PathBuf>,
    /// Overrides `database_path` from the config.
    #[arg(long, env = "PANCHAYAT_DB")]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Fractional,
    Percentage,
}

impl From<StrategyArg> for RiskStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Fractional => Self::FractionalRisk,
            StrategyArg::Percentage => Self::PercentageRisk,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Creates or migrates the database and upload directory.
    InitDb,
    /// Scores ad-hoc numbers without touching the database.
    Risk {
        #[arg(long, value_enum, default_value = "percentage")]
        strategy: StrategyArg,
        #[arg(long)]
        budget: f64,
        #[arg(long)]
        spent: f64,
        #[arg(long)]
        progress: f64,
        #[arg(long)]
        planned_end: Option<NaiveDate>,
        #[arg(long)]
        actual_end: Option<NaiveDate>,
        #[arg(long, default_value_t = 0)]
        negative_feedback: u32,
        /// Defaults to the local date.
        #[arg(long)]
        today: Option<NaiveDate>,
    },
    /// Scores a stored project and persists the result.
    RefreshRisk {
        #[arg(long)]
        project: i64,
        #[arg(long, value_enum, default_value = "fractional")]
        strategy: StrategyArg,
    },
    /// Records citizen feedback, optionally with a photo.
    SubmitFeedback {
        #[arg(long)]
        project: i64,
        #[arg(long)]
        rating: i64,
        #[arg(long, default_value = "")]
        comment: String,
        #[arg(long)]
        photo: Option<PathBuf>,
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },
    /// Village dashboard totals and project list.
    Dashboard {
        #[arg(long)]
        village: i64,
    },
    /// Region-scoped counts; the narrowest filter given wins.
    OfficerStats {
        #[arg(long)]
        state: Option<i64>,
        #[arg(long)]
        district: Option<i64>,
        #[arg(long)]
        block: Option<i64>,
        #[arg(long)]
        village: Option<i64>,
    },
    /// Lists stale ongoing projects and sends contractor SMS alerts.
    Alerts,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => PanchayatConfig::load(path)?,
        None => PanchayatConfig::default(),
    };
    if let Some(db) = cli.db {
        config.database_path = db;
    }

    match &config.log_dir {
        Some(dir) => init_logging(&config.log_level, &dir.to_string_lossy())?,
        None => init_console_logging(&config.log_level)?,
    }

    match cli.command {
        Command::Risk {
            strategy,
            budget,
            spent,
            progress,
            planned_end,
            actual_end,
            negative_feedback,
            today,
        } => {
            let input = RiskInput {
                planned_end_date: planned_end,
                actual_end_date: actual_end,
                negative_feedback_count: negative_feedback,
                ..RiskInput::new(progress, budget, spent, today.unwrap_or_else(local_today))
            };
            print_json(&evaluate(strategy.into(), &input)?)
        }
        command => run_with_db(&config, command),
    }
}

fn run_with_db(config: &PanchayatConfig, command: Command) -> Result<(), Box<dyn Error>> {
    let conn = open_db(&config.database_path)?;
    let projects = SqliteProjectRepository::new(&conn);
    let feedback = SqliteFeedbackRepository::new(&conn);

    match command {
        Command::InitDb => {
            LocalFileStore::open(&config.upload_dir)?;
            info!(
                "event=init_db module=cli status=ok db={}",
                config.database_path.display()
            );
            println!("initialized {}", config.database_path.display());
            Ok(())
        }
        Command::RefreshRisk { project, strategy } => {
            let service = ProjectService::new(projects, feedback);
            print_json(&service.refresh_risk(project, strategy.into(), local_today())?)
        }
        Command::SubmitFeedback {
            project,
            rating,
            comment,
            photo,
            lat,
            lng,
        } => {
            let photo = photo
                .map(|path| -> Result<Upload, Box<dyn Error>> {
                    let bytes = std::fs::read(&path)?;
                    let name = path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    Ok(Upload::new(name, bytes))
                })
                .transpose()?;

            let store = LocalFileStore::open(&config.upload_dir)?;
            let service = FeedbackService::new(
                projects,
                feedback,
                SqliteLocationRepository::new(&conn),
                store,
                IntegrityChecker::new(config.integrity.clone()),
            );
            let submission = FeedbackSubmission {
                rating,
                comment,
                location: GeoPoint::from_parts(lat, lng),
                photo,
            };
            print_json(&service.submit_feedback(
                project,
                &submission,
                Local::now().naive_local(),
            )?)
        }
        Command::Dashboard { village } => {
            let service = DashboardService::new(projects, feedback);
            print_json(&service.village_dashboard(village)?)
        }
        Command::OfficerStats {
            state,
            district,
            block,
            village,
        } => {
            let service = DashboardService::new(projects, feedback);
            let scope = RegionScope::from_filters(state, district, block, village);
            print_json(&service.officer_stats(scope)?)
        }
        Command::Alerts => {
            let store = LocalFileStore::open(&config.upload_dir)?;
            let service = ContractorService::new(
                SqliteContractorRepository::new(&conn),
                projects,
                store,
                LogNotifier,
                config.stale_update_days,
            );
            print_json(&service.overdue_alerts(Local::now().naive_local())?)
        }
        Command::Risk { .. } => Err("risk scoring does not open the database".into()),
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
