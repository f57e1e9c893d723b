use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use copybook_schema_layout::config::ConvertConfig;
use copybook_schema_layout::convert::{
    REPORT_FILE_NAME, build_report_bundle, collect_copybook_paths, collect_schema_paths,
    convert_batch, convert_input_dir, failure_code_summary, finalize_package,
    load_and_validate_schemas,
};
use copybook_schema_layout::output::{
    OutputFormat, format_fields, format_record, format_run, to_json_string,
};
use copybook_schema_layout::report::LayoutReport;
use copybook_schema_layout::{LayoutOptions, parse_copybook_with_report};

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "copybook2json")]
#[command(about = "Convert COBOL copybooks into JSON record layout schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert the copybook found in the input directory.
    Convert(ConvertArgs),
    /// Parse a copybook file and print its schema.
    ParseFile(ParseFileArgs),
    /// Parse a copybook from stdin and print its schema.
    ParseStdin(ParseStdinArgs),
    /// Convert many copybooks in parallel, optionally bundling the results.
    Batch(BatchArgs),
    /// Validate one or more schema JSON files.
    Validate(ValidateArgs),
}

/// Settings shared by the file-writing commands; each one overrides the
/// config file when given.
#[derive(Debug, Args)]
struct ConfigOverrides {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory for schema files (default: ./output_json).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Leading sequence-area columns to drop from each line.
    #[arg(long)]
    padding: Option<usize>,
    /// Output format for schema files (default: json).
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Write the whole record schema instead of its `data` array.
    #[arg(long)]
    envelope: bool,
}

impl ConfigOverrides {
    fn resolve(&self) -> Result<ConvertConfig, String> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::load(path)
                .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
            None => ConvertConfig::default(),
        };
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config.envelope |= self.envelope;
        Ok(config)
    }
}

#[derive(Debug, Args)]
struct ConvertArgs {
    /// Directory holding the copybook (default: ./input_file).
    #[arg(long)]
    input_dir: Option<PathBuf>,
    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[derive(Debug, Args)]
struct ParseFileArgs {
    /// Path to the copybook.
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    parse: ParseArgs,
}

#[derive(Debug, Args)]
struct ParseStdinArgs {
    /// Name reported for the copybook.
    #[arg(long, default_value = "stdin")]
    name: String,
    #[command(flatten)]
    parse: ParseArgs,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Leading sequence-area columns to drop from each line.
    #[arg(long, default_value_t = 0)]
    padding: usize,
    /// Output both schema and conversion report.
    #[arg(long)]
    with_report: bool,
    /// Print the whole record schema instead of its `data` array.
    #[arg(long)]
    envelope: bool,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Copybook files and/or directories (default: the configured input
    /// directory).
    inputs: Vec<PathBuf>,
    #[command(flatten)]
    overrides: ConfigOverrides,
    /// Number of parallel conversion jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    /// Comma-separated copybook extensions accepted in directories.
    #[arg(long)]
    extensions: Option<String>,
    /// Also write every converted record into one layout package file.
    #[arg(long)]
    bundle: Option<PathBuf>,
    /// Optional package name metadata.
    #[arg(long)]
    name: Option<String>,
    /// Optional package description metadata.
    #[arg(long)]
    description: Option<String>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema files and/or directories containing schema JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Convert(args) => run_convert(args),
        Command::ParseFile(args) => run_parse_file(args),
        Command::ParseStdin(args) => run_parse_stdin(args),
        Command::Batch(args) => run_batch(args),
        Command::Validate(args) => run_validate(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run_convert(args: ConvertArgs) -> Result<(), String> {
    let started = Instant::now();

    let mut config = args.overrides.resolve()?;
    if let Some(dir) = args.input_dir {
        config.input_dir = dir;
    }

    let converted = convert_input_dir(&config).map_err(|e| e.to_string())?;
    print_report_warnings(&converted.run.report);

    println!(
        "Converted '{}' into '{}'.",
        converted.input.display(),
        converted.output.display()
    );
    println!(
        "Execution completed in {} ms.",
        started.elapsed().as_millis()
    );
    Ok(())
}

fn run_parse_file(args: ParseFileArgs) -> Result<(), String> {
    let bytes = fs::read(&args.input)
        .map_err(|err| format!("Failed to read '{}': {err}", args.input.display()))?;
    let name = copybook_schema_layout::convert::copybook_name(&args.input);
    run_parse_text(&name, &String::from_utf8_lossy(&bytes), &args.parse)
}

fn run_parse_stdin(args: ParseStdinArgs) -> Result<(), String> {
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .map_err(|err| format!("Failed to read stdin: {err}"))?;
    run_parse_text(&args.name, &text, &args.parse)
}

fn run_parse_text(name: &str, text: &str, args: &ParseArgs) -> Result<(), String> {
    let run = parse_copybook_with_report(name, text, &LayoutOptions::with_padding(args.padding));

    let output = if args.with_report {
        format_run(&run, args.format)?
    } else {
        print_report_warnings(&run.report);
        if args.envelope {
            format_record(&run.record, args.format)?
        } else {
            format_fields(&run.record.data, args.format)?
        }
    };

    println!("{}", output.trim_end());
    Ok(())
}

fn run_batch(args: BatchArgs) -> Result<(), String> {
    let started = Instant::now();

    let mut config = args.overrides.resolve()?;
    if args.jobs.is_some() {
        config.jobs = args.jobs;
    }
    let extensions = parse_csv_list(args.extensions);
    if !extensions.is_empty() {
        config.extensions = extensions;
    }

    let inputs = if args.inputs.is_empty() {
        vec![config.input_dir.clone()]
    } else {
        args.inputs
    };
    let paths = collect_copybook_paths(&inputs, &config).map_err(|e| e.to_string())?;
    let outcome = convert_batch(&paths, &config, PACKAGE_VERSION).map_err(|e| e.to_string())?;

    println!(
        "Converted {} copybook(s), wrote {} schema file(s) to '{}'.",
        outcome.package.layout_count(),
        outcome.written.len(),
        config.output_dir.display()
    );

    if let Some(bundle_path) = &args.bundle {
        let package = finalize_package(outcome.package, args.name, args.description)
            .map_err(|e| e.to_string())?;
        create_parent_dir(bundle_path)?;
        let raw = to_json_string(&package)
            .map_err(|err| format!("Failed to serialize layout package: {err}"))?;
        fs::write(bundle_path, raw)
            .map_err(|err| format!("Failed to write '{}': {err}", bundle_path.display()))?;
        println!(
            "Bundled {} layout(s) into '{}'.",
            package.layout_count(),
            bundle_path.display()
        );
    }

    let report_bundle =
        build_report_bundle(PACKAGE_VERSION, outcome.reports, outcome.failures.clone());
    let report_path = config.output_dir.join(REPORT_FILE_NAME);
    create_parent_dir(&report_path)?;
    let report_raw = to_json_string(&report_bundle)
        .map_err(|err| format!("Failed to serialize conversion report: {err}"))?;
    fs::write(&report_path, report_raw)
        .map_err(|err| format!("Failed to write '{}': {err}", report_path.display()))?;

    if !outcome.failures.is_empty() {
        let breakdown: Vec<String> = failure_code_summary(&report_bundle.reports)
            .iter()
            .map(|(code, count)| format!("{count} {code}"))
            .collect();
        eprintln!(
            "{} conversion failure(s) ({}): {}",
            outcome.failures.len(),
            breakdown.join(", "),
            outcome.failures.join(", ")
        );
    }

    if !outcome.warnings.is_empty() {
        eprintln!(
            "{} warning(s) emitted during conversion.",
            outcome.warnings.len()
        );
    }

    println!(
        "Execution completed in {} ms.",
        started.elapsed().as_millis()
    );
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let paths = collect_schema_paths(&args.inputs).map_err(|e| e.to_string())?;
    let records = load_and_validate_schemas(&paths).map_err(|e| e.to_string())?;
    let fields: usize = records.iter().map(|record| record.field_count()).sum();
    println!(
        "Validated {} schema file(s) with {fields} field(s).",
        paths.len()
    );
    Ok(())
}

fn print_report_warnings(report: &LayoutReport) {
    if let Some(code) = report.failure_code {
        let detail = report.failure_detail.as_deref().unwrap_or("");
        eprintln!("warning: {}: [{code}] {detail}", report.copybook);
    }
    for warning in &report.warnings {
        eprintln!("warning: {}: {warning}", report.copybook);
    }
}

fn create_parent_dir(path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    Ok(())
}

fn parse_csv_list(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}
