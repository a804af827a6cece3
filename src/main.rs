//! Grade Lens command-line shell.
//!
//! Thin front end over the commands layer: every subcommand calls the same
//! entry points a desktop or web shell would.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use grade_lens_lib::commands::{advisor, extraction, settings};
use grade_lens_lib::commands::advisor::AdviceSubmission;
use grade_lens_lib::core_state::CoreState;
use grade_lens_lib::pipeline::extraction::ExtractionStatus;

#[derive(Parser, Debug)]
#[command(name = "grade-lens")]
#[command(about = "Extract student scores from test paper photos and get study advice")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read name and score from each image and optionally write the CSV.
    Extract {
        /// Test paper photos (PNG or JPEG).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Directory to write diem_so_hoc_sinh.csv into.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Ask the study advisor a question.
    Advise {
        /// The question, sent verbatim.
        query: String,

        /// Print the advice as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Show or change the accent colour.
    Accent {
        /// New colour as #rrggbb. Omit to print the current one.
        color: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    grade_lens_lib::init_tracing();
    let args = Args::parse();
    let state = Arc::new(CoreState::from_env());

    let outcome = match args.command {
        Command::Extract { files, out } => run_extract(&state, files, out).await,
        Command::Advise { query, json } => run_advise(&state, query, json).await,
        Command::Accent { color } => run_accent(&state, color),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

async fn run_extract(
    state: &Arc<CoreState>,
    files: Vec<PathBuf>,
    out: Option<PathBuf>,
) -> Result<(), String> {
    extraction::load_files_from_paths(state, files).await?;
    eprintln!("{}", extraction::process_button_label(state)?);

    let results = extraction::process_files(state).await?;
    for result in &results {
        match result.status {
            ExtractionStatus::Success => println!(
                "{}\t{}\t{}",
                result.file_name, result.ten_hoc_sinh, result.diem_so
            ),
            ExtractionStatus::Error => println!(
                "{}\tERROR\t{}",
                result.file_name,
                result.error_message.as_deref().unwrap_or_default()
            ),
        }
    }

    if let Some(dir) = out {
        let path = extraction::export_results_csv(state, dir)?;
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

async fn run_advise(state: &Arc<CoreState>, query: String, json: bool) -> Result<(), String> {
    match advisor::submit_query(state, query).await? {
        AdviceSubmission::Published(advice) if json => {
            let rendered = serde_json::to_string_pretty(&advice).map_err(|e| e.to_string())?;
            println!("{rendered}");
            Ok(())
        }
        AdviceSubmission::Published(advice) => {
            println!("# {}\n\n{}\n", advice.title, advice.introduction);
            for section in &advice.sections {
                println!("## {} [{:?}]", section.heading, section.icon);
                for point in &section.points {
                    println!("- {}: {}", point.subheading, point.description);
                }
                println!();
            }
            println!("{}", advice.conclusion);
            Ok(())
        }
        AdviceSubmission::Failed(message) => Err(message),
        AdviceSubmission::Ignored => Err("Please enter a question.".to_string()),
    }
}

fn run_accent(state: &CoreState, color: Option<String>) -> Result<(), String> {
    let current = match color {
        Some(color) => settings::set_accent_color(state, color)?,
        None => settings::get_accent_color(state)?,
    };
    println!("{current}");
    Ok(())
}
