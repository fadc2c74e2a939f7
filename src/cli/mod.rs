//! CLI subcommands: run, validate, explain, tasks, schema, init, completions.

use crate::audit::eventlog;
use crate::core::config::{self, AionConfig};
use crate::core::executor::Interpreter;
use crate::core::table::Table;
use crate::core::types::{self, TaskKind};
use crate::core::validator;
use crate::io::{self, FileSink, TableFormat};
use crate::provider::ProviderRegistry;
use crate::tasks;
use clap::{CommandFactory, Parser, Subcommand};
use schemars::schema::RootSchema;
use schemars::schema_for;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "aion",
    version,
    about = "AI-Oriented Notation: declarative pipelines over tabular data"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a program against an input table
    Run {
        /// Program file (.json, .yaml, .yml)
        program: PathBuf,

        /// Input table (.csv or .json)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Write the result table (format from extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Host configuration (default: ./aion.yaml when present)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Append run events to this JSONL file
        #[arg(long)]
        events: Option<PathBuf>,

        /// Print the execution log
        #[arg(long)]
        logs: bool,

        /// Print the execution plan as JSON
        #[arg(long)]
        plan: bool,
    },

    /// Check a program's structure without running it
    Validate {
        /// Program file
        program: PathBuf,
    },

    /// Describe what a program does
    Explain {
        /// Program file
        program: PathBuf,
    },

    /// List available task types
    Tasks,

    /// Print the JSON Schema of task configurations
    Schema {
        /// Task type (default: all)
        kind: Option<String>,
    },

    /// Create a starter program and configuration
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Run {
            program,
            input,
            output,
            config,
            events,
            logs,
            plan,
        } => cmd_run(&RunArgs {
            program: &program,
            input: input.as_deref(),
            output: output.as_deref(),
            config: config.as_deref(),
            events: events.as_deref(),
            show_logs: logs,
            show_plan: plan,
        }),
        Commands::Validate { program } => cmd_validate(&program),
        Commands::Explain { program } => cmd_explain(&program),
        Commands::Tasks => cmd_tasks(),
        Commands::Schema { kind } => cmd_schema(kind.as_deref()),
        Commands::Init { path } => cmd_init(&path),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "aion", &mut std::io::stdout());
            Ok(())
        }
    }
}

struct RunArgs<'a> {
    program: &'a Path,
    input: Option<&'a Path>,
    output: Option<&'a Path>,
    config: Option<&'a Path>,
    events: Option<&'a Path>,
    show_logs: bool,
    show_plan: bool,
}

/// Explicit config path, else `./aion.yaml` if it exists, else defaults.
fn resolve_config(explicit: Option<&Path>) -> Result<AionConfig, String> {
    let config = match explicit {
        Some(path) => config::load_config(path)?,
        None => {
            let default = Path::new(config::CONFIG_FILE);
            if default.exists() {
                config::load_config(default)?
            } else {
                AionConfig::default()
            }
        }
    };
    let errors = config::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("invalid configuration".to_string())
}

fn build_interpreter(config: &AionConfig) -> Interpreter {
    let providers = Arc::new(ProviderRegistry::from_config(config));
    Interpreter::with_registry(tasks::default_registry(providers, Arc::new(FileSink)))
}

fn cmd_run(args: &RunArgs) -> Result<(), String> {
    let program = validator::parse_program_file(args.program)?;
    let config = resolve_config(args.config)?;
    let input = args
        .input
        .map(|p| io::load_table(p).map_err(|e| format!("cannot load {}: {}", p.display(), e)))
        .transpose()?;

    let result = build_interpreter(&config).execute(&program, input);

    if args.show_logs {
        for line in &result.logs {
            println!("  {}", line);
        }
    }
    if args.show_plan {
        let plan = serde_json::to_string_pretty(&result.execution_plan)
            .map_err(|e| format!("JSON serialize error: {}", e))?;
        println!("{}", plan);
    }
    if let Some(path) = args.events.or(config.event_log.as_deref()) {
        let run_id = eventlog::record_run(path, &program, &result)?;
        tracing::info!(run_id = %run_id, "run recorded");
    }

    if !result.is_success() {
        for e in &result.errors {
            eprintln!("  ERROR: {}", e);
        }
        return Err(format!("{} error(s)", result.errors.len()));
    }

    let data = result.data.unwrap_or_default();
    println!("Result: {} rows, {} columns", data.row_count(), data.column_count());
    print!("{}", render_preview(&data, config.head_rows));

    if let Some(out) = args.output {
        let format = TableFormat::from_path(out)
            .ok_or_else(|| format!("cannot infer output format from {}", out.display()))?;
        io::save_table(&data, out, format).map_err(|e| e.to_string())?;
        println!("Saved: {}", out.display());
    }
    Ok(())
}

/// First `rows` rows as an aligned text table.
fn render_preview(table: &Table, rows: usize) -> String {
    if table.column_count() == 0 {
        return String::new();
    }
    let head = table.head(rows);
    let cells: Vec<Vec<String>> = head
        .rows()
        .iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect();
    let widths: Vec<usize> = head
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = preview_line(head.columns().iter().map(String::as_str), &widths);
    for row in &cells {
        out.push_str(&preview_line(row.iter().map(String::as_str), &widths));
    }
    if table.row_count() > rows {
        out.push_str(&format!("  ... {} more rows\n", table.row_count() - rows));
    }
    out
}

fn preview_line<'a>(values: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let padded: Vec<String> = values
        .zip(widths)
        .map(|(v, w)| format!("{:<width$}", v, width = *w))
        .collect();
    format!("  {}\n", padded.join("  ").trim_end())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let program = validator::parse_program_file(file)?;
    let errors = validator::validate_program(&program);

    if errors.is_empty() {
        let tasks = program
            .get("pipeline")
            .and_then(|p| p.as_array())
            .map_or(0, Vec::len);
        println!("OK: {} ({} tasks)", file.display(), tasks);
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

fn cmd_explain(file: &Path) -> Result<(), String> {
    let program = validator::parse_program_file(file)?;
    println!("{}", Interpreter::new().explain(&program).trim_end());
    Ok(())
}

fn cmd_tasks() -> Result<(), String> {
    let interp = Interpreter::new();
    let registry = interp.registry();
    println!("Available tasks ({}):", registry.len());
    for kind in registry.kinds() {
        let meta = registry.metadata(kind).cloned().unwrap_or_default();
        println!(
            "  {:<12} {} (requires: {})",
            kind,
            meta.description,
            meta.required_fields.join(", ")
        );
    }
    Ok(())
}

/// JSON Schema of one task kind's configuration.
pub fn task_schema(kind: TaskKind) -> RootSchema {
    match kind {
        TaskKind::Filter => schema_for!(types::FilterTask),
        TaskKind::Sort => schema_for!(types::SortTask),
        TaskKind::Transform => schema_for!(types::TransformTask),
        TaskKind::ModelCall => schema_for!(types::ModelCallTask),
        TaskKind::Aggregate => schema_for!(types::AggregateTask),
        TaskKind::Export => schema_for!(types::ExportTask),
    }
}

fn schema_json(kind: Option<&str>) -> Result<serde_json::Value, String> {
    let to_value =
        |s: RootSchema| serde_json::to_value(s).map_err(|e| format!("JSON serialize error: {}", e));
    match kind {
        Some(k) => to_value(task_schema(k.parse()?)),
        None => {
            let mut all = serde_json::Map::new();
            for k in TaskKind::ALL {
                all.insert(k.as_str().to_string(), to_value(task_schema(k))?);
            }
            Ok(serde_json::Value::Object(all))
        }
    }
}

fn cmd_schema(kind: Option<&str>) -> Result<(), String> {
    let schema = schema_json(kind)?;
    let text =
        serde_json::to_string_pretty(&schema).map_err(|e| format!("JSON serialize error: {}", e))?;
    println!("{}", text);
    Ok(())
}

const STARTER_PROGRAM: &str = r#"{
  "pipeline": [
    {"task": "filter", "condition": {"field": "status", "operator": "==", "value": "active"}},
    {"task": "sort", "operation": {"field": "score", "order": "desc"}},
    {"task": "transform", "mapping": {
      "summary": {"concat": ["name", " (", "score", ")"]}
    }}
  ]
}
"#;

const STARTER_CONFIG: &str = r#"# Extra model providers, resolved by name from model_call tasks.
providers: {}

# Append run events here (JSONL).
# event_log: state/events.jsonl

head_rows: 5
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let program_path = path.join("program.json");
    if program_path.exists() {
        return Err(format!("{} already exists", program_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&program_path, STARTER_PROGRAM)
        .map_err(|e| format!("cannot write {}: {}", program_path.display(), e))?;

    let config_path = path.join(config::CONFIG_FILE);
    let wrote_config = !config_path.exists();
    if wrote_config {
        std::fs::write(&config_path, STARTER_CONFIG)
            .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;
    }

    println!("Initialized AION project at {}", path.display());
    println!("  Created: {}", program_path.display());
    if wrote_config {
        println!("  Created: {}", config_path.display());
    }
    Ok(())
}
