//! rollcall - terminal front end for the attendance dashboard
//!
//! Every command loads what it needs from the backend, performs one action,
//! and prints the resulting view.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use rollcall_common::api::{MarkStatus, StudentCreate, StudentUpdate};
use rollcall_common::config::DashboardConfig;
use rollcall_common::time::format_date;
use rollcall_common::token::FileTokenStore;
use rollcall_dashboard::analytics::{DEFAULT_TOP_LIMIT, DEFAULT_TREND_DAYS};
use rollcall_dashboard::face::{format_confidence, Recognition};
use rollcall_dashboard::filter::RosterFilter;
use rollcall_dashboard::output;
use rollcall_dashboard::pagination::calculate_pagination;
use rollcall_dashboard::store::DEFAULT_CLASS_ID;
use rollcall_dashboard::students::Confirmed;
use rollcall_dashboard::workflow::BulkOutcome;
use rollcall_dashboard::{ActiveView, ConsoleNotifier, Dashboard};

#[derive(Parser, Debug)]
#[command(name = "rollcall", version, about = "Student attendance dashboard")]
struct Cli {
    /// Config file (overrides ROLLCALL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

/// Search and class filter shared by the table commands
#[derive(clap::Args, Debug)]
struct FilterArgs {
    /// Case-insensitive text search
    #[arg(long, default_value = "")]
    search: String,

    /// Class key, e.g. "10 - A"
    #[arg(long)]
    class: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session token
    Login {
        email: String,
        /// Read from stdin when omitted. The prompt echoes what you type;
        /// set ROLLCALL_PASSWORD to sign in without it appearing on screen
        #[arg(long, env = "ROLLCALL_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Logout,
    /// Show the roster
    Students {
        #[command(flatten)]
        filter: FilterArgs,
    },
    Classes,
    /// Show the roster with statuses for a date
    Attendance {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Mark one student
    Mark {
        student_id: i64,
        /// present | absent
        status: MarkStatus,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Mark several students at once
    BulkMark {
        status: MarkStatus,
        /// Students to select; with none, every student matching the filter
        student_ids: Vec<i64>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Mark a whole class, one bulk request per status
    ClassMark {
        class_key: String,
        /// Status for every member not listed explicitly
        #[arg(long)]
        all: Option<MarkStatus>,
        #[arg(long, value_delimiter = ',')]
        present: Vec<i64>,
        #[arg(long, value_delimiter = ',')]
        absent: Vec<i64>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Today's summary counters
    Stats,
    Trends {
        #[arg(long, default_value_t = DEFAULT_TREND_DAYS)]
        days: u32,
        #[arg(long)]
        class_id: Option<i64>,
    },
    /// Students with the best attendance
    Top {
        #[arg(long, default_value_t = DEFAULT_TOP_LIMIT)]
        limit: u32,
        #[arg(long)]
        class_id: Option<i64>,
    },
    /// Students below the attendance threshold
    Attention {
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        class_id: Option<i64>,
    },
    AddStudent {
        roll_number: String,
        name: String,
        class_name: String,
        section: String,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        photo_url: Option<String>,
    },
    EditStudent {
        student_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "class")]
        class_name: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        branch: Option<String>,
    },
    /// Deactivate a student (recoverable)
    DeleteStudent { student_id: i64 },
    RecoverStudent { student_id: i64 },
    /// Import students from a CSV or Excel file
    Import { file: PathBuf },
    #[command(subcommand)]
    Photo(PhotoCommand),
    /// Mark attendance from a face capture
    Recognize {
        image: PathBuf,
        #[arg(long)]
        class_id: Option<i64>,
        /// Resolve the class id from a class key instead
        #[arg(long)]
        class: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum PhotoCommand {
    Upload { student_id: i64, file: PathBuf },
    Remove { student_id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DashboardConfig::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting rollcall v{}", env!("CARGO_PKG_VERSION"));
    info!(server = %config.server_url, "Using backend");

    let tokens = Arc::new(FileTokenStore::new(config.token_file.clone()));
    let notifier = Arc::new(ConsoleNotifier::new(cli.yes));
    let dashboard = Dashboard::from_config(&config, tokens, notifier)?;

    run(&dashboard, &config, cli.command).await
}

async fn run(dashboard: &Dashboard, config: &DashboardConfig, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => read_password()?,
            };
            dashboard.login(&email, &password).await?;
            let teacher = dashboard.current_teacher().await?;
            println!("Logged in as {} <{}>", teacher.name, teacher.email);
        }
        Command::Logout => {
            dashboard.logout()?;
            println!("Logged out");
        }
        Command::Students { filter } => {
            dashboard.load_students().await?;
            dashboard.store.set_active_view(ActiveView::Roster).await;
            apply_filter(dashboard, &filter).await;
            print_roster(dashboard, config, filter.page).await;
        }
        Command::Classes => {
            let classes = dashboard.load_classes().await?;
            print!("{}", output::format_classes(&classes));
        }
        Command::Attendance { date, filter } => {
            load_for_marking(dashboard, date).await?;
            apply_filter(dashboard, &filter).await;
            print_attendance(dashboard, config, filter.page).await;
        }
        Command::Mark {
            student_id,
            status,
            date,
        } => {
            load_for_marking(dashboard, date).await?;
            if dashboard.store.student(student_id).await.is_none() {
                bail!("No student with id {}", student_id);
            }
            dashboard.mark_single(student_id, status).await?;
            print_attendance(dashboard, config, 1).await;
        }
        Command::BulkMark {
            status,
            student_ids,
            date,
            filter,
        } => {
            load_for_marking(dashboard, date).await?;
            apply_filter(dashboard, &filter).await;
            if student_ids.is_empty() {
                dashboard.store.select_all_visible().await;
            } else {
                dashboard.store.select(&student_ids).await;
            }
            match dashboard.bulk_mark_selected(status).await? {
                BulkOutcome::Completed(_) => print_attendance(dashboard, config, filter.page).await,
                BulkOutcome::Declined => println!("Cancelled"),
                BulkOutcome::NothingSelected => {}
            }
        }
        Command::ClassMark {
            class_key,
            all,
            present,
            absent,
            date,
        } => {
            load_for_marking(dashboard, date).await?;
            let mut session = dashboard
                .open_class_session(&class_key)
                .await
                .ok_or_else(|| anyhow!("No students in class {}", class_key))?;
            if let Some(status) = all {
                session.mark_all(status);
            }
            for (ids, status) in [(&present, MarkStatus::Present), (&absent, MarkStatus::Absent)] {
                for id in ids {
                    if !session.set(*id, status) {
                        bail!("Student {} is not in class {}", id, class_key);
                    }
                }
            }
            let report = dashboard.save_class_session(session).await?;
            for group in &report.groups {
                if let Err(e) = &group.outcome {
                    eprintln!("{} group failed: {}", group.status, e);
                }
            }
            dashboard.store.set_filter(RosterFilter::new("", Some(class_key))).await;
            print_attendance(dashboard, config, 1).await;
        }
        Command::Stats => {
            let stats = dashboard.refresh_summary().await?;
            print!("{}", output::format_stats(&stats));
        }
        Command::Trends { days, class_id } => {
            let trends = dashboard.trends(days, class_id).await?;
            print!("{}", output::format_trends(&trends));
        }
        Command::Top { limit, class_id } => {
            let top = dashboard.top_performers(limit, class_id).await?;
            print!("{}", output::format_performers("Top performers", &top));
        }
        Command::Attention {
            threshold,
            class_id,
        } => {
            let threshold = threshold.unwrap_or(config.attention_threshold);
            let students = dashboard.attention_needed(threshold, class_id).await?;
            let title = format!("Below {:.0}% attendance", threshold);
            print!("{}", output::format_performers(&title, &students));
        }
        Command::AddStudent {
            roll_number,
            name,
            class_name,
            section,
            branch,
            photo_url,
        } => {
            let student = dashboard
                .create_student(StudentCreate {
                    roll_number,
                    name,
                    class_name,
                    section,
                    branch,
                    photo_url,
                })
                .await?;
            println!("Created student {} ({})", student.student_id, student.roll_number);
        }
        Command::EditStudent {
            student_id,
            name,
            class_name,
            section,
            branch,
        } => {
            let update = StudentUpdate {
                name,
                class_name,
                section,
                branch,
                ..Default::default()
            };
            dashboard.update_student(student_id, update).await?;
            print_roster(dashboard, config, 1).await;
        }
        Command::DeleteStudent { student_id } => {
            dashboard.load_students().await?;
            match dashboard.delete_student(student_id).await? {
                Confirmed::Done(response) if response.recovery_available => {
                    println!("Run `rollcall recover-student {}` to undo", student_id)
                }
                Confirmed::Done(_) => {}
                Confirmed::Declined => println!("Cancelled"),
            }
        }
        Command::RecoverStudent { student_id } => {
            dashboard.recover_student(student_id).await?;
        }
        Command::Import { file } => {
            let response = dashboard.import_students(&file).await?;
            if let Some(count) = response.records_processed {
                println!("{} record(s) processed", count);
            }
        }
        Command::Photo(PhotoCommand::Upload { student_id, file }) => {
            dashboard.upload_photo(student_id, &file).await?;
        }
        Command::Photo(PhotoCommand::Remove { student_id }) => {
            dashboard.remove_photo(student_id).await?;
        }
        Command::Recognize {
            image,
            class_id,
            class,
        } => {
            let class_id = match (class_id, class) {
                (Some(id), _) => id,
                (None, Some(key)) => {
                    dashboard.load_classes().await?;
                    dashboard
                        .store
                        .class_id_for_key(&key)
                        .await
                        .ok_or_else(|| anyhow!("Unknown class {}", key))?
                }
                (None, None) => DEFAULT_CLASS_ID,
            };
            let bytes = tokio::fs::read(&image).await?;
            match dashboard.recognize(&bytes, class_id).await? {
                Recognition::Recognized(student) => println!(
                    "{} ({}) marked present, confidence {}",
                    student.name,
                    student.roll_number.as_deref().unwrap_or("-"),
                    format_confidence(student.confidence)
                ),
                Recognition::NotRecognized(message) => println!("{}", message),
            }
        }
    }
    Ok(())
}

/// Roster, classes and the status map for `date` (today when omitted)
async fn load_for_marking(dashboard: &Dashboard, date: Option<NaiveDate>) -> Result<()> {
    if let Some(date) = date {
        dashboard.store.set_date(date).await;
    }
    dashboard.store.set_active_view(ActiveView::Attendance).await;
    dashboard.refresh_all().await?;
    Ok(())
}

async fn apply_filter(dashboard: &Dashboard, args: &FilterArgs) {
    dashboard
        .store
        .set_filter(RosterFilter::new(args.search.clone(), args.class.clone()))
        .await;
}

async fn print_roster(dashboard: &Dashboard, config: &DashboardConfig, page: usize) {
    let view = dashboard.store.roster_view(dashboard.client.base_url()).await;
    let summary = dashboard.store.filter_summary().await;
    let pagination = calculate_pagination(view.count, page, config.page_size);
    print!("{}", output::format_roster(&view, &pagination, summary.as_ref()));
}

async fn print_attendance(dashboard: &Dashboard, config: &DashboardConfig, page: usize) {
    let view = dashboard.store.attendance_view(dashboard.client.base_url()).await;
    let summary = dashboard.store.filter_summary().await;
    let date = format_date(dashboard.store.selected_date().await);
    let pagination = calculate_pagination(view.count, page, config.page_size);
    print!(
        "{}",
        output::format_attendance(&view, &date, &pagination, summary.as_ref())
    );
}

fn read_password() -> Result<String> {
    eprintln!("Input is echoed; set ROLLCALL_PASSWORD to avoid this.");
    eprint!("Password: ");
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Password is required");
    }
    Ok(password)
}
