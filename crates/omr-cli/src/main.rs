use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omr", about = "Extract answers from an exam-sheet photo")]
struct Cli {
    /// Log level: off, error, warn, info, debug, trace.
    #[arg(short, long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract the four-digit exam code.
    ExamCode { image: PathBuf },
    /// Extract the eight-digit student ID.
    StudentId { image: PathBuf },
    /// Extract all 40 Part I answers.
    Part1 { image: PathBuf },
    /// Extract all 8 Part II questions.
    Part2 { image: PathBuf },
    /// Extract all 8 Part III questions.
    Part3 { image: PathBuf },
    /// Run every extractor and print one combined JSON object.
    All { image: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = cli.log_level.parse().unwrap_or(log::LevelFilter::Info);
    if let Err(e) = omr_core::logger::init_with_level(level) {
        eprintln!("warning: logger already initialized: {e}");
    }

    match run(cli.command) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error(transparent)]
    Extract(#[from] omr::ExtractError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn run(command: Command) -> Result<String, CliError> {
    let json = match command {
        Command::ExamCode { image } => {
            let bytes = read(&image)?;
            serde_json::to_string_pretty(&omr::extract_exam_code(&bytes)?)?
        }
        Command::StudentId { image } => {
            let bytes = read(&image)?;
            serde_json::to_string_pretty(&omr::extract_student_id(&bytes)?)?
        }
        Command::Part1 { image } => {
            let bytes = read(&image)?;
            serde_json::to_string_pretty(&omr::extract_part1(&bytes)?)?
        }
        Command::Part2 { image } => {
            let bytes = read(&image)?;
            let answers = omr::extract_part2(&bytes)?;
            let as_maps: Vec<_> = answers
                .into_iter()
                .map(|(q, opts)| serde_json::json!({"question": q, "a": opts.a, "b": opts.b, "c": opts.c, "d": opts.d}))
                .collect();
            serde_json::to_string_pretty(&as_maps)?
        }
        Command::Part3 { image } => {
            let bytes = read(&image)?;
            serde_json::to_string_pretty(&omr::extract_part3(&bytes)?)?
        }
        Command::All { image } => {
            let bytes = read(&image)?;
            let exam_code = omr::extract_exam_code(&bytes)?;
            let student_id = omr::extract_student_id(&bytes)?;
            let p1 = omr::extract_part1(&bytes)?;
            let p2 = omr::extract_part2(&bytes)?;
            let p3 = omr::extract_part3(&bytes)?;
            serde_json::to_string_pretty(&serde_json::json!({
                "exam_code": exam_code,
                "student_id": student_id,
                "part1": p1,
                "part2": p2.into_iter().map(|(q, o)| serde_json::json!({"question": q, "a": o.a, "b": o.b, "c": o.c, "d": o.d})).collect::<Vec<_>>(),
                "part3": p3,
            }))?
        }
    };
    Ok(json)
}

fn read(path: &PathBuf) -> Result<Vec<u8>, CliError> {
    fs::read(path).map_err(|e| CliError::Io(path.clone(), e))
}
