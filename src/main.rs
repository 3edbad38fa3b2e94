use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sheets2pdf::ranges::{digits_in_file_name, merged_file_name, MERGED_NAME_PREFIX};
use sheets2pdf::{read_config, BatchRunner, FolderScanner, OfficeEngine, PdfMerger, RunSummary};
use std::path::{Path, PathBuf};
use std::process;
use tokio::fs;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit code for a run whose merge step failed after the exports were written.
const EXIT_MERGE_FAILED: i32 = 2;

#[derive(Parser)]
#[command(name = "sheets2pdf")]
#[command(about = "Export numbered spreadsheet batches to PDF and merge them into range-named documents")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Options for the default `run` command
    #[command(flatten)]
    run: RunArgs,
}

#[derive(clap::Args, Debug, PartialEq)]
struct RunArgs {
    /// Config file: source, export and merge folders, then the number range
    #[arg(short = 'c', long = "config", default_value = "paths.txt")]
    config: PathBuf,

    /// LibreOffice executable used to render workbooks
    #[arg(long = "soffice", env = "SHEETS2PDF_SOFFICE", default_value = "soffice")]
    soffice: PathBuf,

    /// Print the run summary as JSON
    #[arg(long = "json")]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Export every workbook in range and merge the PDFs (default behavior)
    Run(RunArgs),
    /// List the workbooks a run would export, without exporting anything
    Plan {
        #[arg(short = 'c', long = "config", default_value = "paths.txt")]
        config: PathBuf,

        /// Print the list as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Merge already exported PDF files, numbering them by the digits in their names
    Merge {
        /// Directory containing PDF files to merge
        #[arg(short = 'd', long = "dir")]
        input_dir: PathBuf,

        /// Directory the merged PDF is written to
        #[arg(short = 'o', long = "output")]
        output_dir: PathBuf,
    },
}

async fn run(args: RunArgs) -> Result<RunSummary> {
    let config = read_config(&args.config)?;
    let engine = OfficeEngine::new(args.soffice);

    let summary = BatchRunner::new(config, &engine).run().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for skipped in &summary.skipped {
            println!("{} {} ({})", "skipped".yellow(), skipped.path.display(), skipped.reason);
        }
        match &summary.merged {
            Some(path) => println!("{} {}", "merged".green(), path.display()),
            None if summary.merge_failed() => {}
            None => println!("{}", "No PDF files to merge".yellow()),
        }
    }

    Ok(summary)
}

fn plan(config_path: &Path, json: bool) -> Result<()> {
    let config = read_config(config_path)?;
    let candidates = FolderScanner::plan(&config.source_folder, config.range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    if candidates.is_empty() {
        println!("{}", format!("No spreadsheets found for numbers {}", config.range).yellow());
        return Ok(());
    }

    for candidate in &candidates {
        println!("{:>8}  {}", candidate.number.to_string().blue(), candidate.path.display());
    }
    Ok(())
}

async fn merge_pdfs(input_dir: &Path, output_dir: &Path) -> Result<()> {
    if !input_dir.is_dir() {
        return Err(anyhow!("Input directory '{}' does not exist", input_dir.display()));
    }

    info!("Scanning directory: {}", input_dir.display().to_string().green());

    let mut entries = fs::read_dir(input_dir).await?;
    let mut pdf_files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_pdf = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        let is_previous_merge = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with(MERGED_NAME_PREFIX))
            .unwrap_or(false);
        if is_pdf && !is_previous_merge {
            pdf_files.push(path);
        }
    }

    if pdf_files.is_empty() {
        info!("No PDF files to merge in '{}'", input_dir.display());
        return Ok(());
    }

    pdf_files.sort();

    let numbers: Vec<i64> = pdf_files
        .iter()
        .filter_map(|path| {
            let number = digits_in_file_name(path);
            if number.is_none() {
                warn!("{} has no number in its name, leaving it out of the file name", path.display());
            }
            number
        })
        .collect();

    let file_name = merged_file_name(&numbers)
        .ok_or_else(|| anyhow!("None of the PDF files in '{}' has a number in its name", input_dir.display()))?;

    info!("Found {} PDF files to merge:", pdf_files.len());
    let mut merger = PdfMerger::new();
    for (i, pdf_path) in pdf_files.iter().enumerate() {
        info!("  {}: {}", i + 1, pdf_path.display().to_string().blue());
        merger.add_pdf(pdf_path).await?;
    }

    fs::create_dir_all(output_dir).await?;
    let output_path = output_dir.join(file_name);
    merger.save(&output_path).await?;

    println!("{} {}", "merged".green(), output_path.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sheets2pdf=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let args = Args::parse();

    let command = args.command.unwrap_or(Commands::Run(args.run));

    let result = match command {
        Commands::Run(run_args) => match run(run_args).await {
            Ok(summary) if summary.merge_failed() => process::exit(EXIT_MERGE_FAILED),
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        },
        Commands::Plan { config, json } => plan(&config, json),
        Commands::Merge { input_dir, output_dir } => merge_pdfs(&input_dir, &output_dir).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
