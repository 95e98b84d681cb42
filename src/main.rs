use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use office_rota::demo_data::{generate_overrides, generate_roster};
use office_rota::display::{print_daily_usage, print_schedule, print_summary};
use office_rota::logging;
use office_rota::roster::{load_roster, Roster};
use office_rota::schedule::{generate, parse_month, summarize, Overrides};
use office_rota::store::{JsonStore, ScheduleState};
use office_rota::textfile::ExportVariant;
use office_rota::web::{self, AppState};

#[derive(Parser)]
#[command(name = "office-rota", version, about = "Monthly office-location rota")]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Files {
    /// Roster configuration (TOML)
    #[arg(long, default_value = "roster.toml")]
    roster: PathBuf,

    /// Saved schedule state (JSON)
    #[arg(long, default_value = "schedule.json")]
    state: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Generate the table for a month and save it
    Generate {
        #[command(flatten)]
        files: Files,
        /// Month to schedule, YYYY-MM
        #[arg(long, value_parser = parse_month_arg)]
        month: NaiveDate,
        /// All-hands day, YYYY-MM-DD (repeatable)
        #[arg(long = "all-hands", value_parser = parse_date_arg)]
        all_hands: Vec<NaiveDate>,
        /// Absence as PERSON_ID=YYYY-MM-DD (repeatable)
        #[arg(long = "absent", value_parser = parse_absence_arg)]
        absent: Vec<(String, NaiveDate)>,
    },
    /// Print the saved table, daily usage and targets
    Show {
        #[command(flatten)]
        files: Files,
    },
    /// Write the saved table as text
    Export {
        #[command(flatten)]
        files: Files,
        #[arg(long)]
        out: PathBuf,
        /// Keep the absent label instead of writing remote
        #[arg(long)]
        with_absences: bool,
    },
    /// Read an edited export back into the saved table
    Import {
        #[command(flatten)]
        files: Files,
        #[arg(long)]
        input: PathBuf,
    },
    /// Serve the HTTP API
    Serve {
        #[command(flatten)]
        files: Files,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Generate a month for a random roster without touching any file
    Demo {
        #[arg(long, default_value_t = 12)]
        people: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, value_parser = parse_month_arg)]
        month: NaiveDate,
    },
}

fn parse_month_arg(text: &str) -> Result<NaiveDate, String> {
    parse_month(text).ok_or_else(|| format!("expected YYYY-MM, got {text:?}"))
}

fn parse_date_arg(text: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got {text:?}: {e}"))
}

fn parse_absence_arg(text: &str) -> Result<(String, NaiveDate), String> {
    let (id, date) = text
        .split_once('=')
        .ok_or_else(|| format!("expected PERSON_ID=YYYY-MM-DD, got {text:?}"))?;
    Ok((id.trim().to_string(), parse_date_arg(date)?))
}

fn load_state(store: &JsonStore) -> Result<ScheduleState, Box<dyn std::error::Error>> {
    store.load()?.ok_or_else(|| {
        format!(
            "no saved schedule at {}, run `generate` first",
            store.path().display()
        )
        .into()
    })
}

fn show(roster: &Roster, state: &ScheduleState) {
    let title = format!("Schedule for {}", state.month.format("%B %Y"));
    print_schedule(&title, roster, &state.business_days, &state.table, &state.all_hands);
    print_daily_usage(roster, &state.business_days, &state.table);
    print_summary(roster, &state.summary(roster));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    match cli.command {
        Command::Generate {
            files,
            month,
            all_hands,
            absent,
        } => {
            let roster = load_roster(&files.roster)?;
            let store = JsonStore::new(&files.state);
            let mut state = store.load()?.unwrap_or_else(|| ScheduleState::new(month));

            let mut overrides = Overrides::new();
            for day in all_hands {
                overrides = overrides.with_all_hands(day);
            }
            for (person_id, day) in &absent {
                overrides = overrides.with_absence(person_id, *day);
            }

            state.set_overrides(&roster, month, overrides)?;
            state.regenerate(&roster);
            show(&roster, &state);

            store.save(&state)?;
            println!("\nSchedule saved to {}", store.path().display());
        }
        Command::Show { files } => {
            let roster = load_roster(&files.roster)?;
            let state = load_state(&JsonStore::new(&files.state))?;
            show(&roster, &state);
        }
        Command::Export {
            files,
            out,
            with_absences,
        } => {
            let roster = load_roster(&files.roster)?;
            let state = load_state(&JsonStore::new(&files.state))?;
            let variant = if with_absences {
                ExportVariant::WithAbsence
            } else {
                ExportVariant::Standard
            };
            std::fs::write(&out, state.export(&roster, variant)?)?;
            println!("Schedule written to {}", out.display());
        }
        Command::Import { files, input } => {
            let roster = load_roster(&files.roster)?;
            let store = JsonStore::new(&files.state);
            let mut state = load_state(&store)?;

            let text = std::fs::read_to_string(&input)?;
            let people = state.apply_import(&roster, &text)?;
            store.save(&state)?;
            println!("Imported {} people from {}", people, input.display());
        }
        Command::Serve {
            files,
            port,
            password,
        } => {
            let roster = load_roster(&files.roster)?;
            let store = JsonStore::new(&files.state);
            let state = match store.load()? {
                Some(state) => state,
                None => ScheduleState::new(chrono::Local::now().date_naive()),
            };

            println!("Starting web server on port {}...", port);
            println!("Access the API at http://localhost:{}/api/schedule", port);
            web::start_server(port, AppState::new(roster, state, store, password)).await?;
        }
        Command::Demo {
            people,
            seed,
            month,
        } => {
            let roster = generate_roster(people, seed);
            let overrides = generate_overrides(&roster, month, seed);
            let generation = generate(&roster, month, &overrides);

            let title = format!(
                "Demo schedule for {} ({} people, seed {})",
                month.format("%B %Y"),
                people,
                seed
            );
            print_schedule(
                &title,
                &roster,
                &generation.business_days,
                &generation.table,
                &overrides.all_hands,
            );
            print_daily_usage(&roster, &generation.business_days, &generation.table);
            print_summary(
                &roster,
                &summarize(&roster, &generation.table, &generation.targets),
            );
        }
    }

    Ok(())
}
