mod facts;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use acs_core::LoadError;
use acs_eval::{Answer, Engine, EngineConfig, EngineError, Value};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Access control statement policy engine.
#[derive(Parser)]
#[command(name = "acs", version, about = "Access control statement policy engine")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Log engine activity to stderr at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Engine configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a model file
    Check {
        /// Path to the model file
        model: PathBuf,
    },

    /// Decide a request against a model and its facts
    Enforce {
        /// Path to the model file
        model: PathBuf,
        /// Request type to enforce
        request_type: String,
        /// Request content as a value list, e.g. "['T1', {'alice'}]"
        content: String,
        /// Facts file to announce first (JSON, or .facts lines); repeatable
        #[arg(long)]
        facts: Vec<PathBuf>,
    },

    /// Query a term's facts with a pattern such as "['T1', _]"
    Query {
        /// Path to the model file
        model: PathBuf,
        /// Term to query
        term: String,
        /// Pattern: values, `_` placeholders, and `X` wildcards
        pattern: String,
        /// Facts file to announce first (JSON, or .facts lines); repeatable
        #[arg(long)]
        facts: Vec<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => read_config(path, cli.output, cli.quiet),
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Check { model } => {
            cmd_check(&model, config, cli.output, cli.quiet);
        }
        Commands::Enforce {
            model,
            request_type,
            content,
            facts,
        } => {
            cmd_enforce(
                &model,
                &request_type,
                &content,
                &facts,
                config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Query {
            model,
            term,
            pattern,
            facts,
        } => {
            cmd_query(&model, &term, &pattern, &facts, config, cli.output, cli.quiet);
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_env("ACS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

fn read_config(path: &Path, output: OutputFormat, quiet: bool) -> EngineConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading config '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match toml::from_str(&text) {
        Ok(config) => config,
        Err(e) => {
            let msg = format!("error: invalid config in {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

/// Read a model file and load it into a fresh engine, exiting on failure.
fn load_engine(model_path: &Path, config: EngineConfig, output: OutputFormat, quiet: bool) -> Engine {
    let text = match std::fs::read_to_string(model_path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading model '{}': {}", model_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    let engine = Engine::with_config(config);
    if let Err(e) = engine.setup_model(&text) {
        report_engine_error(&e, output, quiet);
        process::exit(1);
    }
    engine
}

fn announce_all(engine: &Engine, files: &[PathBuf], output: OutputFormat, quiet: bool) {
    for path in files {
        if let Err(e) = facts::announce_file(engine, path) {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_check(model_path: &Path, config: EngineConfig, output: OutputFormat, quiet: bool) {
    let engine = load_engine(model_path, config, output, quiet);
    if quiet {
        return;
    }
    let summary = engine.with_model(|model| {
        let policy = model.policy();
        let requests: serde_json::Map<String, serde_json::Value> = policy
            .request_templates()
            .iter()
            .map(|(name, fields)| (name.clone(), serde_json::json!(fields)))
            .collect();
        let terms: serde_json::Map<String, serde_json::Value> = policy
            .term_templates()
            .iter()
            .map(|(name, term)| (name.clone(), serde_json::json!(term.fields)))
            .collect();
        (requests, terms)
    });
    let (requests, terms) = match summary {
        Ok(summary) => summary,
        Err(e) => {
            report_engine_error(&e, output, quiet);
            process::exit(1);
        }
    };

    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "model": model_path.display().to_string(),
                "requests": requests,
                "terms": terms,
                "valid": true,
            });
            let pretty = serde_json::to_string_pretty(&json)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
        OutputFormat::Text => {
            println!(
                "{}: ok ({} request type(s), {} term(s))",
                model_path.display(),
                requests.len(),
                terms.len()
            );
        }
    }
}

fn cmd_enforce(
    model_path: &Path,
    request_type: &str,
    content: &str,
    facts_files: &[PathBuf],
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let engine = load_engine(model_path, config, output, quiet);
    announce_all(&engine, facts_files, output, quiet);

    let allowed = match engine.enforce_request(request_type, content) {
        Ok(allowed) => allowed,
        Err(e) => {
            report_engine_error(&e, output, quiet);
            process::exit(1);
        }
    };

    // The verdict is the command's answer, so it prints even with --quiet.
    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "request_type": request_type,
                "allowed": allowed,
            });
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}", if allowed { "allow" } else { "deny" });
        }
    }
}

fn cmd_query(
    model_path: &Path,
    term: &str,
    pattern: &str,
    facts_files: &[PathBuf],
    config: EngineConfig,
    output: OutputFormat,
    quiet: bool,
) {
    let engine = load_engine(model_path, config, output, quiet);
    announce_all(&engine, facts_files, output, quiet);

    let answer = match engine.query_pattern(term, pattern) {
        Ok(answer) => answer,
        Err(e) => {
            report_engine_error(&e, output, quiet);
            process::exit(1);
        }
    };

    match (output, answer) {
        (OutputFormat::Json, Answer::Holds(holds)) => {
            println!("{}", serde_json::json!({ "term": term, "holds": holds }));
        }
        (OutputFormat::Json, Answer::Matches(values)) => {
            let matches: Vec<serde_json::Value> = values.iter().map(Value::to_json).collect();
            println!("{}", serde_json::json!({ "term": term, "matches": matches }));
        }
        (OutputFormat::Text, Answer::Holds(holds)) => println!("{}", holds),
        (OutputFormat::Text, Answer::Matches(values)) => {
            for value in values {
                println!("{}", value);
            }
        }
    }
}

/// Report an engine error, with the source snippet for parse errors.
fn report_engine_error(err: &EngineError, output: OutputFormat, quiet: bool) {
    let EngineError::Load(LoadError::Parse(parse)) = err else {
        report_error(&format!("error: {}", err), output, quiet);
        return;
    };
    match output {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "error": err.to_string(),
                "parse": parse.to_json_value(),
            });
            eprintln!("{}", json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", parse.render());
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Text => {
            if !quiet {
                eprintln!("{}", msg);
            }
        }
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
