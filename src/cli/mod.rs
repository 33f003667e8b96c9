//! # CLI Module
//!
//! Command-line front end for the image similarity checker.
//!
//! ## Usage
//! ```bash
//! # Register reference images with a shared annotation
//! imgsim register refs/*.png --annotation "platform / title"
//!
//! # List references
//! imgsim list
//!
//! # Edit or clear an annotation
//! imgsim annotate 12 "new note"
//! imgsim annotate 12
//!
//! # Apply several annotation edits from a JSON file in one transaction
//! # [{"id": 12, "annotation": "poster"}, {"id": 13, "annotation": null}]
//! imgsim annotate-batch edits.json
//!
//! # Compare an upload against every reference
//! imgsim compare upload.jpg --threshold 60 --top-k 10
//!
//! # Also write the matched reference images to a directory
//! imgsim compare upload.jpg --save-matches ./matches
//!
//! # Write a reference image back to disk
//! imgsim export 12 --out ref12.png
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use image_similarity_checker::config::AppConfig;
use image_similarity_checker::core::service::{
    CompareReport, CompareRequest, ImageUpload, RegisterReport, RegisterRequest,
    RegistrationFailure, SimilarityService,
};
use image_similarity_checker::core::ranking::MatchResult;
use image_similarity_checker::core::store::{AnnotationUpdate, ReferenceRecord};
use image_similarity_checker::error::{Result, SimilarityError};
use image_similarity_checker::events::{Event, EventChannel, RegisterEvent};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::thread;

/// Image Similarity Checker - find near-duplicates of reference images
#[derive(Parser, Debug)]
#[command(name = "imgsim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to ./imgsim.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register reference images
    Register {
        /// Image files (JPEG, PNG, WEBP, ...)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Annotation applied to every image in this batch
        #[arg(short, long)]
        annotation: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// List registered references, newest first
    List {
        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Set a reference's annotation, or clear it when TEXT is omitted
    Annotate {
        /// Reference id
        id: i64,

        /// New annotation
        text: Option<String>,
    },

    /// Apply annotation edits from a JSON file, all or nothing
    AnnotateBatch {
        /// JSON array of {"id": ID, "annotation": TEXT or null}
        file: PathBuf,
    },

    /// Compare an image against every reference
    Compare {
        /// Image to compare
        file: PathBuf,

        /// Minimum similarity in percent (default from config)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Number of matches to show, 1-20 (default from config)
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u64).range(1..=20))]
        top_k: Option<u64>,

        /// Write each matched reference image into this directory
        #[arg(long, value_name = "DIR")]
        save_matches: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Write a reference's stored image to a file
    Export {
        /// Reference id
        id: i64,

        /// Destination path
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    image_similarity_checker::init_tracing(if cli.verbose { "debug" } else { "warn" });

    let config = AppConfig::load(cli.config.as_deref())?;
    let service = SimilarityService::from_config(&config)?;

    match cli.command {
        Commands::Register {
            files,
            annotation,
            output,
        } => run_register(&service, files, annotation, output),
        Commands::List { output } => run_list(&service, output),
        Commands::Annotate { id, text } => run_annotate(&service, id, text),
        Commands::AnnotateBatch { file } => run_annotate_batch(&service, &file),
        Commands::Compare {
            file,
            threshold,
            top_k,
            save_matches,
            output,
        } => run_compare(
            &service,
            &file,
            threshold.unwrap_or(config.default_threshold),
            top_k.map(|k| k as usize).unwrap_or(config.default_top_k),
            save_matches.as_deref(),
            output,
        ),
        Commands::Export { id, out } => run_export(&service, id, &out),
    }
}

fn read_upload(path: &Path) -> Result<ImageUpload> {
    let bytes = std::fs::read(path).map_err(|source| SimilarityError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ImageUpload::new(name, bytes))
}

fn run_register(
    service: &SimilarityService,
    files: Vec<PathBuf>,
    annotation: Option<String>,
    output: OutputFormat,
) -> Result<()> {
    let term = Term::stderr();

    // Unreadable files are reported alongside undecodable ones
    let mut images = Vec::new();
    let mut unreadable = Vec::new();
    for path in &files {
        match read_upload(path) {
            Ok(upload) => images.push(upload),
            Err(e) => unreadable.push(RegistrationFailure {
                file_name: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if matches!(output, OutputFormat::Pretty) {
        let pb = ProgressBar::new(images.len() as u64);
        if let Ok(progress_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(progress_style.progress_chars("█▓░"));
        }
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            let Some(ref pb) = progress_clone else {
                continue;
            };
            match event {
                Event::Register(RegisterEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    pb.set_message(p.current_name);
                }
                Event::Register(RegisterEvent::Completed { .. }) => pb.finish_and_clear(),
                Event::Register(RegisterEvent::Aborted { .. }) => pb.abandon(),
                _ => {}
            }
        }
    });

    let result = service.register_with_events(RegisterRequest::new(images, annotation), &sender);

    drop(sender);
    event_thread.join().ok();

    // Images registered before a store failure are still reported
    let mut report = match result {
        Ok(report) => report,
        Err(SimilarityError::RegistrationAborted { mut partial, source }) => {
            partial.failed.extend(unreadable);
            print_register(&term, &partial, output);
            return Err(SimilarityError::RegistrationAborted { partial, source });
        }
        Err(e) => return Err(e),
    };
    report.failed.extend(unreadable);

    print_register(&term, &report, output);

    Ok(())
}

fn print_register(term: &Term, report: &RegisterReport, output: OutputFormat) {
    match output {
        OutputFormat::Pretty => print_register_pretty(term, report),
        OutputFormat::Json => print_json(report),
    }
}

fn print_register_pretty(term: &Term, report: &RegisterReport) {
    term.write_line(&format!(
        "{} {} reference image(s) registered, {} failed",
        style("✓").green().bold(),
        style(report.registered.len()).cyan(),
        style(report.failed.len()).yellow()
    ))
    .ok();

    for image in &report.registered {
        term.write_line(&format!(
            "  {} {} {}",
            style(format!("#{}", image.id)).bold(),
            image.file_name,
            style(&image.locator).dim()
        ))
        .ok();
    }

    if !report.failed.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!("{}", style("Failed:").bold().underlined()))
            .ok();
        for failure in &report.failed {
            term.write_line(&format!(
                "  {} {}: {}",
                style("✗").red(),
                failure.file_name,
                failure.reason
            ))
            .ok();
        }
    }
}

fn run_list(service: &SimilarityService, output: OutputFormat) -> Result<()> {
    let references = service.list_references()?;

    match output {
        OutputFormat::Pretty => print_list_pretty(&Term::stdout(), &references),
        OutputFormat::Json => print_json(&references),
    }

    Ok(())
}

fn print_list_pretty(term: &Term, references: &[ReferenceRecord]) {
    if references.is_empty() {
        term.write_line("No reference images registered yet.").ok();
        return;
    }

    for record in references {
        term.write_line(&format!(
            "{} {} {} {}",
            style(format!("#{:<5}", record.id)).bold(),
            record.file_name,
            style(&record.fingerprint).dim(),
            style(
                record
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "unknown date".to_string())
            )
            .dim()
        ))
        .ok();
        term.write_line(&format!("       {}", style(&record.locator).dim()))
            .ok();
        if let Some(annotation) = &record.annotation {
            term.write_line(&format!("       {}", annotation)).ok();
        }
    }
}

fn run_annotate(service: &SimilarityService, id: i64, text: Option<String>) -> Result<()> {
    service.update_annotation(id, text.as_deref())?;

    let term = Term::stderr();
    term.write_line(&format!(
        "{} Annotation for #{} {}",
        style("✓").green().bold(),
        id,
        if text.map_or(true, |t| t.trim().is_empty()) {
            "cleared"
        } else {
            "saved"
        }
    ))
    .ok();

    Ok(())
}

fn read_annotation_updates(path: &Path) -> Result<Vec<AnnotationUpdate>> {
    let io_error = |source| SimilarityError::Io {
        path: path.to_path_buf(),
        source,
    };

    let text = std::fs::read_to_string(path).map_err(io_error)?;
    serde_json::from_str(&text).map_err(|e| io_error(std::io::Error::from(e)))
}

fn run_annotate_batch(service: &SimilarityService, file: &Path) -> Result<()> {
    let updates = read_annotation_updates(file)?;
    let count = updates.len();

    service.update_annotations(updates)?;

    Term::stderr()
        .write_line(&format!(
            "{} Saved {} annotation edit(s)",
            style("✓").green().bold(),
            count
        ))
        .ok();

    Ok(())
}

fn run_compare(
    service: &SimilarityService,
    file: &Path,
    threshold: f64,
    top_k: usize,
    save_matches: Option<&Path>,
    output: OutputFormat,
) -> Result<()> {
    let query = read_upload(file)?;
    let report = service.compare(CompareRequest::new(query, threshold, top_k))?;

    match output {
        OutputFormat::Pretty => print_compare_pretty(&Term::stdout(), &report),
        OutputFormat::Json => print_json(&report),
    }

    if let Some(dir) = save_matches {
        let written = save_match_images(service, &report.outcome.matches, dir)?;
        Term::stderr()
            .write_line(&format!(
                "{} Wrote {} matched image(s) to {}",
                style("✓").green().bold(),
                written.len(),
                dir.display()
            ))
            .ok();
    }

    Ok(())
}

/// Write each match's stored image as `{rank:02}-{id}-{file name}` in `dir`
fn save_match_images(
    service: &SimilarityService,
    matches: &[MatchResult],
    dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).map_err(|source| SimilarityError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(matches.len());
    for (rank, m) in matches.iter().enumerate() {
        let bytes = service.fetch_image(&m.locator)?;

        // Stored names come from the database; keep only the last component
        let name = Path::new(&m.file_name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let path = dir.join(format!("{:02}-{}-{}", rank + 1, m.id, name));

        std::fs::write(&path, &bytes).map_err(|source| SimilarityError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }

    Ok(written)
}

fn print_compare_pretty(term: &Term, report: &CompareReport) {
    term.write_line(&format!(
        "{} {} ({})",
        style("Query:").bold(),
        report.query_name,
        style(&report.query_fingerprint).dim()
    ))
    .ok();
    term.write_line(&format!(
        "  {} references compared in {}ms",
        style(report.total_references).cyan(),
        report.duration_ms
    ))
    .ok();
    term.write_line("").ok();

    if report.total_references == 0 {
        term.write_line("No reference images registered yet. Register some first.")
            .ok();
    } else if report.outcome.matches.is_empty() {
        term.write_line(&format!(
            "No references at or above {}% similarity.",
            report.threshold
        ))
        .ok();
    } else {
        term.write_line(&format!(
            "{}",
            style(format!(
                "Top {} of {} match(es) at or above {}%:",
                report.outcome.matches.len(),
                report.outcome.above_threshold,
                report.threshold
            ))
            .bold()
            .underlined()
        ))
        .ok();

        for (rank, m) in report.outcome.matches.iter().enumerate() {
            term.write_line(&format!(
                "  {} {} {} {}",
                style(format!("{:>2}.", rank + 1)).bold(),
                style(format!("{:>6.2}%", m.similarity)).green(),
                style(format!("#{}", m.id)).bold(),
                m.file_name
            ))
            .ok();
            term.write_line(&format!(
                "       {} | {}",
                style(m.match_type).yellow(),
                style(&m.locator).dim()
            ))
            .ok();
            term.write_line(&format!(
                "       {}",
                m.annotation.as_deref().unwrap_or("(no annotation)")
            ))
            .ok();
        }
    }

    if !report.outcome.skipped.is_empty() {
        term.write_line("").ok();
        term.write_line(&format!(
            "{} {} reference(s) skipped because their stored fingerprint is unreadable:",
            style("!").yellow().bold(),
            report.outcome.skipped.len()
        ))
        .ok();
        for skipped in &report.outcome.skipped {
            term.write_line(&format!(
                "  #{} {}: {}",
                skipped.id, skipped.file_name, skipped.reason
            ))
            .ok();
        }
    }
}

fn run_export(service: &SimilarityService, id: i64, out: &Path) -> Result<()> {
    let record = service.reference(id)?;
    let bytes = service.fetch_image(&record.locator)?;

    std::fs::write(out, &bytes).map_err(|source| SimilarityError::Io {
        path: out.to_path_buf(),
        source,
    })?;

    Term::stderr()
        .write_line(&format!(
            "{} Wrote #{} ({}) to {}",
            style("✓").green().bold(),
            id,
            record.file_name,
            out.display()
        ))
        .ok();

    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize output"),
    }
}
