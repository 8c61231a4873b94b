#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # texgrade
//!
//! Command line front end: list units, inspect questions, preview LaTeX
//! solution files, and grade a submission.
//!
//! Configuration comes from the environment (a `.env` file is honoured):
//! `OPENAI_API_KEY` is required for `grade`, and `OPENAI_ENDPOINT`,
//! `OPENAI_MODEL`, `TEXGRADE_QUESTIONS_ROOT`, `TEXGRADE_SCRATCH_DIR` and
//! `TEXGRADE_SCRATCH_MODE` are optional.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use dotenvy::dotenv;
use tabled::Table;
use texgrade::{
    Grader, GraderConfig, LatexSolutionParser, UnitCatalog, VerdictResult, load_solution_file,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// List the discovered units
    Units,
    /// Print the materials of one question
    Show(String, usize),
    /// Parse a LaTeX solution file and print its summary
    Parse(PathBuf),
    /// Grade a submission file
    Grade(String, usize, PathBuf),
}

/// Parsed command line.
#[derive(Debug, Clone)]
struct Options {
    /// Overrides `TEXGRADE_QUESTIONS_ROOT`
    questions_root: Option<PathBuf>,
    /// Overrides `TEXGRADE_SCRATCH_DIR`
    scratch_dir:    Option<PathBuf>,
    /// Command to run
    cmd:            Cmd,
}

/// Parse the command line arguments and return `Options`
fn options() -> Options {
    /// parses a unit name
    fn u() -> impl Parser<String> {
        positional("UNIT").help("Name of the unit (its directory name)")
    }

    /// parses a question index
    fn i() -> impl Parser<usize> {
        positional::<usize>("INDEX").help("0-based question index within the unit")
    }

    /// parses a LaTeX solution file path
    fn t() -> impl Parser<PathBuf> {
        positional::<PathBuf>("TEXFILE").help("LaTeX solution file to parse")
    }

    /// parses a submission file path
    fn s() -> impl Parser<PathBuf> {
        positional::<PathBuf>("SUBMISSION").help("File holding the student's solution")
    }

    let questions_root = long("questions-root")
        .help("Directory holding one folder per unit")
        .argument::<PathBuf>("DIR")
        .optional();

    let scratch_dir = long("scratch-dir")
        .help("Directory for the prompt and reply of the latest grading call")
        .argument::<PathBuf>("DIR")
        .optional();

    let units = pure(Cmd::Units)
        .to_options()
        .command("units")
        .help("List the units found under the questions root");

    let show = construct!(Cmd::Show(u(), i()))
        .to_options()
        .command("show")
        .help("Print the question, reference solution and grading notes of a question");

    let parse = construct!(Cmd::Parse(t()))
        .to_options()
        .command("parse")
        .help("Parse a LaTeX solution file and print its questions as JSON");

    let grade = construct!(Cmd::Grade(u(), i(), s()))
        .to_options()
        .command("grade")
        .help("Grade a submission against a question's reference solution");

    let cmd = construct!([units, show, parse, grade]);

    construct!(Options {
        questions_root,
        scratch_dir,
        cmd
    })
    .to_options()
    .descr("Grades LaTeX problem-set submissions with a language model")
    .run()
}

/// Loads configuration and applies command line overrides.
fn load_config(opts: &Options) -> Result<GraderConfig> {
    let mut config = GraderConfig::from_env().context("Invalid configuration")?;
    if let Some(root) = &opts.questions_root {
        config = config.with_questions_root(root);
    }
    if let Some(dir) = &opts.scratch_dir {
        config = config.with_scratch_dir(dir);
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    let opts = options();
    let config = load_config(&opts)?;

    match &opts.cmd {
        Cmd::Units => {
            let catalog = UnitCatalog::discover(config.questions_root(), &LatexSolutionParser)?;
            let rows: Vec<_> = catalog.iter().map(|unit| unit.summary()).collect();
            println!("{}", Table::new(rows));
        }
        Cmd::Show(unit, index) => {
            let catalog = UnitCatalog::discover(config.questions_root(), &LatexSolutionParser)?;
            let record = catalog
                .get(unit)
                .with_context(|| format!("Unknown unit `{unit}`"))?;
            let q = record.question(*index).with_context(|| {
                format!("Unit `{unit}` has {} questions; index {index} is out of range", record.len())
            })?;
            println!("{}\n{}\n", "QUESTION".bold(), q.text);
            println!("{}\n{}\n", "QUESTION (LaTeX)".bold(), q.latex);
            println!("{}\n{}\n", "REFERENCE SOLUTION".bold(), q.solution);
            println!("{}\n{}", "GRADING NOTES".bold(), q.grading_notes);
        }
        Cmd::Parse(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read {}", path.display()))?;
            let summary = load_solution_file(&text)
                .with_context(|| format!("Could not parse {}", path.display()))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Cmd::Grade(unit, index, submission) => {
            let submission_text = std::fs::read_to_string(submission)
                .with_context(|| format!("Could not read {}", submission.display()))?;
            let grader = Grader::from_config(&config)?;
            let verdict = grader
                .grade_question(unit, *index, &submission_text)
                .await?;

            let label = match verdict.result {
                VerdictResult::Pass => "PASS".green().bold(),
                VerdictResult::Fail => "FAIL".red().bold(),
                VerdictResult::Error => "ERROR".yellow().bold(),
            };
            eprintln!("{label} {}", verdict.summary);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
    }

    Ok(())
}
