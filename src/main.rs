use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use compute::{build_mapping, CategoryPrompter, PayeeCounts};
use data::{DateFormat, Options};
use mapping::CategoryMap;
use read::extract_records;
use write::CsvEmitter;

mod compute;
mod data;
mod mapping;
mod read;
mod write;

/// Convert an HTML bank-statement table export into a CSV file that MMEX can
/// import, or maintain a payee-to-category mapping file from the same export.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert the HTML table to CSV (payee, amount, notes, date).
    Parse {
        /// Input HTML source file.
        #[arg(long, default_value = "example.html")]
        source: PathBuf,
        /// Output .csv file.
        #[arg(long, default_value = "output.csv")]
        output: PathBuf,
        /// Category mapping file; when given, a category column looked up by
        /// payee is appended to every row.
        #[arg(long)]
        mapping: Option<PathBuf>,
        /// Parse transaction dates strictly with this chrono format (e.g.
        /// "%d.%m.%Y") and emit them as YYYY-MM-DD. By default dates are
        /// passed through untouched.
        #[arg(long)]
        date_format: Option<String>,
    },
    /// Scan the HTML table for recurring payees and rewrite the category
    /// mapping file, keeping categories that were already filled in.
    Analyse {
        /// Input HTML source file.
        #[arg(long, default_value = "example.html")]
        source: PathBuf,
        /// Category mapping file to rewrite.
        #[arg(long, default_value = "categories.toml")]
        output: PathBuf,
        /// Ask on stdin for the category of each new recurring payee instead
        /// of writing the placeholder.
        #[arg(long)]
        prompt: bool,
    },
}

/// Asks on stdin; an empty answer means "decide later" and keeps the
/// placeholder.
struct StdinPrompter;

impl CategoryPrompter for StdinPrompter {
    fn prompt(&mut self, payee: &str) -> Result<Option<String>, anyhow::Error> {
        print!("Category for {payee}: ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        let answer = line.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}

fn read_source(source: &Path) -> Result<String, anyhow::Error> {
    fs::read_to_string(source)
        .with_context(|| format!("cannot read source file {}", source.display()))
}

fn run_parse(
    source: &Path,
    output: &Path,
    mapping: Option<&Path>,
    date_format: Option<String>,
) -> Result<(), anyhow::Error> {
    let html = read_source(source)?;
    let mapping = mapping.map(CategoryMap::load).transpose()?;
    let options = Options {
        date_format: match date_format {
            Some(format) => DateFormat::Strict(format),
            None => DateFormat::Passthrough,
        },
    };
    let file = fs::File::create(output)
        .with_context(|| format!("cannot create output file {}", output.display()))?;
    let mut emitter = CsvEmitter::new(file, mapping.as_ref());
    let count = extract_records(&html, &options, &mut emitter)?;
    emitter.flush()?;
    info!("wrote {count} rows to {}", output.display());
    Ok(())
}

fn run_analyse(source: &Path, output: &Path, prompt: bool) -> Result<(), anyhow::Error> {
    let html = read_source(source)?;
    let existing = CategoryMap::load(output)?;
    let mut counts = PayeeCounts::default();
    let count = extract_records(&html, &Options::default(), &mut counts)?;
    let mut stdin_prompter = StdinPrompter;
    let prompter: Option<&mut dyn CategoryPrompter> =
        prompt.then_some(&mut stdin_prompter as &mut dyn CategoryPrompter);
    let mapping = build_mapping(&counts, &existing, prompter)?;
    mapping.store(output)?;
    info!(
        "scanned {count} rows, wrote {} payees to {}",
        mapping.len(),
        output.display()
    );
    Ok(())
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Command::Parse {
            source,
            output,
            mapping,
            date_format,
        } => run_parse(&source, &output, mapping.as_deref(), date_format),
        Command::Analyse {
            source,
            output,
            prompt,
        } => run_analyse(&source, &output, prompt),
    }
}
