mod bootstrap;
mod report;

use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;

use attendance_core::models::Student;
use attendance_core::notifications::Notice;
use attendance_core::settings::{Command, Settings};
use attendance_core::time_utils::{parse_date, Clock, SystemClock};
use attendance_data::aggregator::{ChartPeriod, StatisticsAggregator};
use attendance_data::analysis::{StatsFilter, StatsView};
use attendance_data::export::{export_attendance_to_path, export_students_to_path};
use attendance_runtime::session::{AttendanceSession, SaveHandle};
use attendance_runtime::store::JsonFileStore;

type Session = AttendanceSession<JsonFileStore>;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Attendance Tracker v{} starting", env!("CARGO_PKG_VERSION"));

    let data_dir = settings.resolved_data_dir();
    tracing::info!(
        "Data: {}, Timezone: {}, Threshold: {}",
        data_dir.display(),
        settings.timezone,
        settings.threshold
    );

    let clock = SystemClock::new(&settings.timezone);
    let store = Arc::new(JsonFileStore::new(data_dir));
    let (mut session, notices) = AttendanceSession::load(store, settings.seed_demo).await;
    print_lines(report::build_notice_lines(&notices));

    match settings.command.clone() {
        Some(command) => run_command(&mut session, command, &settings, &clock).await,
        None => show_summary(&session, None, &clock),
    }

    Ok(())
}

async fn run_command(
    session: &mut Session,
    command: Command,
    settings: &Settings,
    clock: &SystemClock,
) {
    match command {
        Command::Mark { name, status, date } => {
            let outcome = match date {
                Some(date) => session.mark_status(&date, &name, status),
                None => session.mark_today(clock, &name, status),
            };
            finish(outcome).await;
        }

        Command::AddStudent { name, id, class } => {
            finish(session.add_student(Student::new(name, id, class))).await;
        }

        Command::RemoveStudent { name } => {
            finish(session.remove_student(&name)).await;
        }

        Command::Import { path } => {
            finish(session.import_from_path(&path)).await;
        }

        Command::List {
            search,
            class,
            date,
        } => match resolve_date(date.as_deref(), clock) {
            Ok(date) => {
                let roster = session.roster();
                let students = roster.search(&search, class.as_deref());
                print_lines(report::build_student_list_lines(
                    &students,
                    roster,
                    session.ledger(),
                    date,
                ));
            }
            Err(e) => print_notice(&Notice::from_error(&e)),
        },

        Command::Export {
            path,
            range,
            students,
        } => {
            let written = if students {
                export_students_to_path(&path, session.roster())
            } else {
                let dates = StatisticsAggregator::filter_date_range(
                    &session.ledger().all_dates(),
                    range,
                    clock,
                );
                export_attendance_to_path(&path, session.roster(), session.ledger(), &dates)
            };
            match written {
                Ok(rows) => print_notice(&Notice::success(format!(
                    "Exported {rows} rows to {}",
                    path.display()
                ))),
                Err(e) => print_notice(&Notice::from_error(&e)),
            }
        }

        Command::Summary { date } => show_summary(session, date.as_deref(), clock),

        Command::Stats { class, range } => {
            let filter = StatsFilter { class, range };
            let view = StatsView::build(session.roster(), session.ledger(), &filter, clock);
            print_lines(report::build_stats_lines(
                &view.summary(),
                &view.student_stats(),
                &view.trend(ChartPeriod::Month, clock),
                filter.class.as_deref(),
                filter.range,
            ));
        }

        Command::AtRisk { class, range } => {
            let filter = StatsFilter { class, range };
            let view = StatsView::build(session.roster(), session.ledger(), &filter, clock);
            print_lines(report::build_at_risk_lines(
                &view.at_risk(settings.threshold),
                settings.threshold,
            ));
        }

        Command::History { name, range } => match session.roster().get(&name) {
            Some(student) => {
                let dates = StatisticsAggregator::filter_date_range(
                    &session.ledger().all_dates(),
                    range,
                    clock,
                );
                print_lines(report::build_history_lines(student, session.ledger(), &dates));
            }
            None => print_notice(&Notice::warning(format!("Student {name} not found"))),
        },
    }
}

fn show_summary(session: &Session, date: Option<&str>, clock: &SystemClock) {
    match resolve_date(date, clock) {
        Ok(date) => {
            let summary =
                StatisticsAggregator::daily_summary(date, session.roster(), session.ledger());
            print_lines(report::build_summary_lines(date, &summary));
        }
        Err(e) => print_notice(&Notice::from_error(&e)),
    }
}

/// Print the outcome of a mutation, then wait for its saves to land.
async fn finish(outcome: attendance_core::Result<(Notice, SaveHandle)>) {
    match outcome {
        Ok((notice, handle)) => {
            print_notice(&notice);
            for err in handle.failures().await {
                print_notice(&Notice::from_error(&err));
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "command rejected");
            print_notice(&Notice::from_error(&e));
        }
    }
}

fn resolve_date(arg: Option<&str>, clock: &impl Clock) -> attendance_core::Result<NaiveDate> {
    match arg {
        Some(s) => parse_date(s),
        None => Ok(clock.today()),
    }
}

fn print_notice(notice: &Notice) {
    println!("{notice}");
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
