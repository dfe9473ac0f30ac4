//! docmerge CLI - mail merge for DOCX templates

mod records;

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docmerge::{
    export, DocumentStats, JsonFormat, MailMerge, MergeOptions, MissingValuePolicy, OutputMode,
    ParseOptions, RecordFailure, Template,
};

/// Exit code when the batch finished but some records failed.
const EXIT_PARTIAL: i32 = 2;

#[derive(Parser)]
#[command(name = "docmerge")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Merge CSV or JSON records into DOCX templates", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge records into a template
    Merge {
        /// Template file (.docx or .dotx)
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Record file (.csv or .json)
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Write one document containing every record
        #[arg(long)]
        composed: bool,

        /// What to do with placeholders that have no value
        #[arg(long, value_enum, default_value = "keep")]
        missing: MissingMode,

        /// Replacement text for placeholders without a value
        #[arg(long, env = "DOCMERGE_FALLBACK")]
        fallback: Option<String>,

        /// Field naming separate output files
        #[arg(long, default_value = "Name")]
        name_field: String,

        /// Name of the composed output file
        #[arg(long, default_value = "merged")]
        composed_name: String,

        /// Treat a field as a postal address (repeatable)
        #[arg(long = "address-field", value_name = "FIELD")]
        address_fields: Vec<String>,

        /// Fail records missing this field (repeatable)
        #[arg(long = "require", value_name = "FIELD")]
        required: Vec<String>,

        /// Render records in parallel
        #[arg(long)]
        parallel: bool,

        /// Print the result summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the placeholders used in a template
    Fields {
        /// Template file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,
    },

    /// Print one merged record as plain text
    Preview {
        /// Template file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,

        /// Record file (.csv or .json)
        #[arg(value_name = "RECORDS")]
        records: PathBuf,

        /// Index of the record to preview
        #[arg(short, long, default_value = "0")]
        record: usize,

        /// Replacement text for placeholders without a value
        #[arg(long, env = "DOCMERGE_FALLBACK")]
        fallback: Option<String>,
    },

    /// Show template information
    Info {
        /// Template file
        #[arg(value_name = "TEMPLATE")]
        template: PathBuf,
    },

    /// Convert a document's content to JSON
    Json {
        /// Input DOCX file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum MissingMode {
    /// Leave the placeholder text in the document
    Keep,
    /// Remove the placeholder
    Empty,
}

struct MergeArgs {
    template: PathBuf,
    records: PathBuf,
    output: Option<PathBuf>,
    composed: bool,
    options: MergeOptions,
    json: bool,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Merge {
            template,
            records,
            output,
            composed,
            missing,
            fallback,
            name_field,
            composed_name,
            address_fields,
            required,
            parallel,
            json,
        } => {
            let mut options = MergeOptions::new()
                .with_missing(missing_policy(missing, fallback))
                .with_name_field(name_field)
                .with_composed_name(composed_name)
                .with_parallel(parallel);
            for field in address_fields {
                options = options.with_address_field(field);
            }
            for field in required {
                options = options.with_required_field(field);
            }

            match cmd_merge(MergeArgs {
                template,
                records,
                output,
                composed,
                options,
                json,
            }) {
                Ok(true) => Ok(()),
                Ok(false) => std::process::exit(EXIT_PARTIAL),
                Err(e) => Err(e),
            }
        }
        Commands::Fields { template } => cmd_fields(&template),
        Commands::Preview {
            template,
            records,
            record,
            fallback,
        } => cmd_preview(&template, &records, record, fallback),
        Commands::Info { template } => cmd_info(&template),
        Commands::Json {
            input,
            output,
            compact,
        } => cmd_json(&input, output.as_deref(), compact),
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn missing_policy(mode: MissingMode, fallback: Option<String>) -> MissingValuePolicy {
    match (fallback, mode) {
        (Some(text), _) => MissingValuePolicy::Fallback(text),
        (None, MissingMode::Keep) => MissingValuePolicy::Keep,
        (None, MissingMode::Empty) => MissingValuePolicy::Empty,
    }
}

/// Run a merge. Returns `Ok(false)` when some records or outputs failed.
fn cmd_merge(args: MergeArgs) -> Result<bool, Box<dyn std::error::Error>> {
    let output_dir = args.output.unwrap_or_else(|| {
        let stem = args.template.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_merged", stem))
    });

    let pb = ProgressBar::new(4);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    pb.set_message("Loading template...");
    let template = Template::open(&args.template)?;
    pb.inc(1);

    pb.set_message("Reading records...");
    let records = records::load_records(&args.records)?;
    pb.inc(1);

    pb.set_message(format!("Merging {} records...", records.len()));
    let mode = if args.composed {
        OutputMode::Composed
    } else {
        OutputMode::Separate
    };
    let result = MailMerge::new()
        .with_options(args.options)
        .with_mode(mode)
        .run(&template, &records);
    if result.phase.is_failed() {
        pb.abandon_with_message("Failed");
        if args.json {
            let summary = serde_json::json!({
                "succeeded": result.succeeded,
                "failed": result.failed,
                "phase": result.phase,
                "error": result.error.as_ref().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else if !result.failed.is_empty() {
            eprintln!("\n{}", "Failed records:".yellow().bold());
            for line in failure_lines(&result.failed) {
                eprintln!("{}", line);
            }
        }
    }
    let result = result.into_result()?;
    pb.inc(1);

    pb.set_message("Writing documents...");
    let report = result.save_all(&template, &output_dir)?;
    pb.finish_with_message("Done!");

    if args.json {
        let summary = serde_json::json!({
            "succeeded": result.succeeded,
            "failed": result.failed,
            "phase": result.phase,
            "saved": report,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(!result.has_failures() && report.is_success());
    }

    println!(
        "\n{} {} of {} records merged",
        "Done!".green().bold(),
        result.succeeded.len(),
        result.total()
    );

    if !report.written.is_empty() {
        println!("{}", "Output files:".green().bold());
        let last = report.written.len() - 1;
        for (i, path) in report.written.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            println!("  {} {}", branch.dimmed(), path.display());
        }
    }

    if result.has_failures() {
        println!("\n{}", "Failed records:".yellow().bold());
        for line in failure_lines(&result.failed) {
            println!("{}", line);
        }
    }

    if !report.is_success() {
        println!("\n{}", "Failed outputs:".yellow().bold());
        for failure in &report.failed {
            println!("  {} {}: {}", "✗".red(), failure.name, failure.message);
        }
    }

    Ok(!result.has_failures() && report.is_success())
}

fn failure_lines(failed: &[RecordFailure]) -> Vec<String> {
    failed
        .iter()
        .map(|failure| {
            format!(
                "  {} #{} {}: {}",
                "✗".red(),
                failure.index,
                failure.kind.to_string().dimmed(),
                failure.message
            )
        })
        .collect()
}

fn cmd_fields(template: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let template = Template::open(template)?;

    if template.placeholders().is_empty() {
        println!("{}", "No placeholders found".yellow());
        return Ok(());
    }

    for name in template.placeholders() {
        println!("{}", name);
    }
    Ok(())
}

fn cmd_preview(
    template: &Path,
    records: &Path,
    index: usize,
    fallback: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let template = Template::open(template)?;
    let records = records::load_records(records)?;
    let record = records.get(index).ok_or_else(|| {
        format!(
            "record {} out of range ({} records loaded)",
            index,
            records.len()
        )
    })?;

    let mut options = MergeOptions::new();
    if let Some(text) = fallback {
        options = options.with_fallback(text);
    }

    let rendered = docmerge::merge::render_with(&template, record, &options)?;
    println!("{}", export::to_text(&rendered.document));

    if !rendered.unresolved.is_empty() {
        eprintln!(
            "{} {}",
            "Unresolved:".yellow(),
            rendered.unresolved.join(", ")
        );
    }
    Ok(())
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    // Lenient so that templates with damaged style parts still show their content
    let template = Template::open_with(input, &ParseOptions::new().lenient())?;
    let doc = template.document();

    println!("{}", "Template Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {:?}", "Format".bold(), template.package().format());
    println!("{}: {}", "Parts".bold(), template.package().part_names().count());

    if let Some(ref title) = doc.metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = doc.metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = doc.metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref created) = doc.metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = doc.metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    let stats = DocumentStats::from_document(doc);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Characters".bold(), stats.char_count);
    println!("{}: {}", "Styles".bold(), stats.style_count);
    println!("{}: {}", "Numbering".bold(), stats.numbering_count);
    println!("{}: {}", "Preserved elements".bold(), stats.preserved_count);

    println!();
    println!("{}", "Placeholders".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    if template.placeholders().is_empty() {
        println!("{}", "(none)".dimmed());
    }
    for name in template.placeholders() {
        println!("  {}", name);
    }

    Ok(())
}

fn cmd_json(
    input: &Path,
    output: Option<&Path>,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = docmerge::to_json(input, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "docmerge".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Mail merge for DOCX templates");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/docmerge".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_policy() {
        assert_eq!(missing_policy(MissingMode::Keep, None), MissingValuePolicy::Keep);
        assert_eq!(missing_policy(MissingMode::Empty, None), MissingValuePolicy::Empty);
        assert_eq!(
            missing_policy(MissingMode::Empty, Some("-".into())),
            MissingValuePolicy::Fallback("-".into())
        );
    }

    #[test]
    fn test_failures_reported_when_compose_fails() {
        let mut doc = docmerge::Document::new();
        doc.add_paragraph(docmerge::Paragraph::with_text("Dear {{Name}}"));
        let template = Template::from_document(doc);
        let records = vec![
            docmerge::Record::new().with("Name", "bad\u{1}"),
            docmerge::Record::new().with("Name", f64::INFINITY),
        ];

        let result = MailMerge::new().composed().run(&template, &records);
        assert!(result.phase.is_failed());

        let lines = failure_lines(&result.failed);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("#0"));
        assert!(lines[0].contains("field 'Name' has an invalid value"));
        assert!(lines[1].contains("#1"));
        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_cli_parses_merge() {
        let cli = Cli::try_parse_from([
            "docmerge",
            "merge",
            "letter.docx",
            "people.csv",
            "--composed",
            "--require",
            "Name",
            "--address-field",
            "Street",
        ])
        .unwrap();

        match cli.command {
            Commands::Merge {
                composed,
                required,
                address_fields,
                name_field,
                ..
            } => {
                assert!(composed);
                assert_eq!(required, vec!["Name"]);
                assert_eq!(address_fields, vec!["Street"]);
                assert_eq!(name_field, "Name");
            }
            _ => panic!("expected merge command"),
        }
    }
}
