// tabform CLI - build self-validating XLSX templates and read them back

mod exit_codes;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tabform_config::{OptionsError, TemplateOptions};
use tabform_core::{RecordRow, Resource, SchemaError, SchemaSet};
use tabform_engine::layout::DATA_FIRST_ROW;
use tabform_engine::{compile, plan_template, CompileError};
use tabform_io::{read_upload, write_template, UploadError, WriteError};

use exit_codes::{
    EXIT_COMPILE, EXIT_OPTIONS, EXIT_RECORDS, EXIT_SCHEMA, EXIT_SUCCESS, EXIT_UPLOAD_EMPTY, EXIT_UPLOAD_OPEN,
    EXIT_UPLOAD_OUT_OF_DATE, EXIT_UPLOAD_RESOURCE, EXIT_UPLOAD_VALUE, EXIT_USAGE, EXIT_WRITE,
};

#[derive(Parser)]
#[command(name = "tabform")]
#[command(about = "Build self-validating XLSX data-entry templates from a schema")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Log compile and decode steps to stderr (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema into an XLSX template
    #[command(after_help = "\
Examples:
  tabform template schema.json -o visits.xlsx
  tabform template schema.json -o edit.xlsx --records rows.json
  tabform template schema.json -o visites.xlsx --lang fr --options options.toml")]
    Template {
        /// Schema file (JSON: a field array, or {\"resource\": {..}, \"fields\": [..]})
        schema: PathBuf,

        /// Output workbook path
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Existing records (JSON array) to pre-fill; adds the _id column
        #[arg(long)]
        records: Option<PathBuf>,

        /// Options file (TOML, or JSON by extension)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Language for labels and notes (overrides the options file)
        #[arg(long)]
        lang: Option<String>,

        /// Number of blank data rows (overrides the options file)
        #[arg(long)]
        rows: Option<u32>,

        #[command(flatten)]
        resource: ResourceArgs,

        /// Suppress the summary line
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check a filled-in template against its schema and print the records
    #[command(after_help = "\
Examples:
  tabform check visits.xlsx --schema schema.json
  tabform check visits.xlsx --schema schema.json --resource-id visits --json")]
    Check {
        /// Uploaded workbook
        upload: PathBuf,

        /// Schema the template was built from
        #[arg(long, short = 's')]
        schema: PathBuf,

        #[command(flatten)]
        resource: ResourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the column layout and the check formulas of the first data row
    #[command(after_help = "\
Examples:
  tabform inspect schema.json
  tabform inspect schema.json --json")]
    Inspect {
        /// Schema file
        schema: PathBuf,

        /// Options file (TOML, or JSON by extension)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Language for headings
        #[arg(long)]
        lang: Option<String>,

        #[command(flatten)]
        resource: ResourceArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct ResourceArgs {
    /// Resource id written into the template (default: schema "resource.id", then the file stem)
    #[arg(long, env = "TABFORM_RESOURCE_ID")]
    resource_id: Option<String>,

    /// Resource display name (default: schema "resource.name", then the id)
    #[arg(long)]
    name: Option<String>,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tabform-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  tabform-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: tabform <command> [options]");
            eprintln!("       tabform --help for more information");
            Ok(())
        }
        Some(Commands::Template {
            schema,
            output,
            records,
            options,
            lang,
            rows,
            resource,
            quiet,
        }) => cmd_template(schema, output, records, options, lang, rows, resource, quiet),
        Some(Commands::Check {
            upload,
            schema,
            resource,
            json,
        }) => cmd_check(upload, schema, resource, json),
        Some(Commands::Inspect {
            schema,
            options,
            lang,
            resource,
            json,
        }) => cmd_inspect(schema, options, lang, resource, json),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SchemaError> for CliError {
    fn from(e: SchemaError) -> Self {
        CliError::new(EXIT_SCHEMA, e.to_string())
    }
}

impl From<OptionsError> for CliError {
    fn from(e: OptionsError) -> Self {
        CliError::new(EXIT_OPTIONS, e.to_string())
    }
}

impl From<CompileError> for CliError {
    fn from(e: CompileError) -> Self {
        let message = e.to_string();
        match e {
            CompileError::Schema(e) => e.into(),
            CompileError::Options(e) => e.into(),
            CompileError::Coercion { .. } => CliError::new(EXIT_RECORDS, message),
            _ => CliError::new(EXIT_COMPILE, message),
        }
    }
}

impl From<WriteError> for CliError {
    fn from(e: WriteError) -> Self {
        CliError::new(EXIT_WRITE, e.to_string())
    }
}

impl From<UploadError> for CliError {
    fn from(e: UploadError) -> Self {
        let message = e.to_string();
        match e {
            UploadError::Open(_) | UploadError::NoSheets | UploadError::NotATemplate => {
                CliError::new(EXIT_UPLOAD_OPEN, message)
            }
            UploadError::WrongResource(_) => CliError::new(EXIT_UPLOAD_RESOURCE, message)
                .with_hint("pass the matching schema, or --resource-id"),
            UploadError::OutOfDate { expected, found } => CliError::new(EXIT_UPLOAD_OUT_OF_DATE, message)
                .with_hint(format!("schema columns: {}; template columns: {}", expected.join(", "), found.join(", "))),
            UploadError::Empty => CliError::new(EXIT_UPLOAD_EMPTY, message),
            UploadError::Value { .. } => CliError::new(EXIT_UPLOAD_VALUE, message),
        }
    }
}

// ============================================================================
// Input files
// ============================================================================

fn read_text(path: &Path, what: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|e| CliError::args(format!("cannot read {} '{}': {}", what, path.display(), e)))
}

/// Optional `resource` object next to `fields` in a schema file.
#[derive(Deserialize)]
struct SchemaHeader {
    resource: Option<Resource>,
}

/// Load the schema and work out which resource it describes.
fn load_schema(path: &Path, args: &ResourceArgs) -> Result<(SchemaSet, Resource), CliError> {
    let text = read_text(path, "schema")?;
    let schema = SchemaSet::from_json(&text)?;

    // A bare field array has no header; that is not an error.
    let header = serde_json::from_str::<SchemaHeader>(&text)
        .ok()
        .and_then(|h| h.resource)
        .unwrap_or_default();

    let id = args
        .resource_id
        .clone()
        .or_else(|| Some(header.id.clone()).filter(|id| !id.trim().is_empty()))
        .or_else(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
        .ok_or_else(|| CliError::args("no resource id").with_hint("pass --resource-id"))?;

    let name = match &args.name {
        Some(name) => BTreeMap::from([(String::new(), name.clone())]),
        None => header.name,
    };
    let resource = Resource { id, name, url: header.url };
    debug!(resource = %resource.id, fields = schema.fields.len(), "loaded schema");
    Ok((schema, resource))
}

fn load_options(path: Option<&Path>, lang: Option<String>) -> Result<TemplateOptions, CliError> {
    let mut options = match path {
        Some(path) => TemplateOptions::load(path)?,
        None => TemplateOptions::default(),
    };
    if let Some(lang) = lang {
        options = options.with_language(lang);
    }
    Ok(options)
}

fn load_records(path: &Path) -> Result<Vec<RecordRow>, CliError> {
    let text = read_text(path, "records")?;
    RecordRow::list_from_json(&text).map_err(|e| {
        CliError::new(EXIT_RECORDS, e.to_string()).with_hint("records must be a JSON array of objects")
    })
}

// ============================================================================
// Commands
// ============================================================================

#[allow(clippy::too_many_arguments)]
fn cmd_template(
    schema_path: PathBuf,
    output: PathBuf,
    records: Option<PathBuf>,
    options: Option<PathBuf>,
    lang: Option<String>,
    rows: Option<u32>,
    resource_args: ResourceArgs,
    quiet: bool,
) -> Result<(), CliError> {
    let (schema, resource) = load_schema(&schema_path, &resource_args)?;
    let mut options = load_options(options.as_deref(), lang)?;
    if let Some(rows) = rows {
        options = options.with_default_rows(rows);
    }
    let records = match records {
        Some(path) => load_records(&path)?,
        None => Vec::new(),
    };

    let book = compile(&schema, &records, &resource, &options)?;
    let summary = write_template(&book, &output)?;

    if !quiet {
        println!("wrote {} ({})", output.display(), summary.summary());
    }
    Ok(())
}

fn cmd_check(upload: PathBuf, schema_path: PathBuf, resource_args: ResourceArgs, as_json: bool) -> Result<(), CliError> {
    let (schema, resource) = load_schema(&schema_path, &resource_args)?;
    let sheet = read_upload(&upload)?;
    let decoded = sheet.decode(&resource.id, &schema)?;

    if as_json {
        let records: Vec<Value> = decoded
            .records
            .iter()
            .map(|r| json!({ "row": r.row, "record": r.record }))
            .collect();
        let out = json!({
            "resource": resource.id,
            "sheet": sheet.sheet_name,
            "mode": decoded.mode,
            "records": records,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    } else {
        println!("mode:    {}", decoded.mode);
        println!("records: {}", decoded.records.len());
        for r in &decoded.records {
            let record = serde_json::to_string(&r.record).unwrap_or_default();
            println!("  row {:>4}  {}", r.row, record);
        }
    }
    Ok(())
}

fn cmd_inspect(
    schema_path: PathBuf,
    options: Option<PathBuf>,
    lang: Option<String>,
    resource_args: ResourceArgs,
    as_json: bool,
) -> Result<(), CliError> {
    let (schema, resource) = load_schema(&schema_path, &resource_args)?;
    let options = load_options(options.as_deref(), lang)?;
    let plan = plan_template(&schema, &[], &resource, &options)?;
    let first_row = DATA_FIRST_ROW + 1;

    if as_json {
        let columns: Vec<Value> = plan
            .layout
            .columns
            .iter()
            .map(|column| {
                let formulas = plan.formulas(column.id());
                json!({
                    "id": column.id(),
                    "column": column.letter(),
                    "heading": column.field.heading(&options.language),
                    "format": column.field.kind,
                    "role": column.field.role,
                    "error": formulas.and_then(|f| f.error.as_ref()).map(|t| t.render(first_row)),
                    "required": formulas.and_then(|f| f.required.as_ref()).map(|t| t.render(first_row)),
                    "choices": formulas.and_then(|f| f.choice_range.clone()),
                })
            })
            .collect();
        let out = json!({
            "resource": resource.id,
            "sheet": plan.data_sheet,
            "rows": plan.layout.rows,
            "columns": columns,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
        return Ok(());
    }

    println!("sheet:   {}", plan.data_sheet);
    println!("rows:    {} ({}..{})", plan.layout.rows, first_row, plan.layout.last_row() + 1);
    for column in &plan.layout.columns {
        println!(
            "{:<3} {:<20} {}",
            column.letter(),
            column.id(),
            column.field.kind.name()
        );
        let Some(formulas) = plan.formulas(column.id()) else {
            continue;
        };
        if let Some(error) = &formulas.error {
            println!("      error:    {}", error.render(first_row));
        }
        if let Some(required) = &formulas.required {
            println!("      required: {}", required.render(first_row));
        }
        if let Some(range) = &formulas.choice_range {
            println!("      choices:  {}", range);
        }
    }
    Ok(())
}
