use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use json_template_rewrite::loader::{load_catalog_dir, load_document, load_vars, to_pretty, write_document};
use json_template_rewrite::{
    Catalog, CompositeCatalog, Context, Engine, EngineOptions, Policy, PrefixCatalog, PrefixMode, RuleSet,
    ValidationPolicy, Vars,
};
use serde_json::{Map, Value};

/// Render a templated JSON document into a concrete one.
#[derive(Parser, Debug)]
#[command(name = "jtr", author, version, about)]
struct Args {
    /// Input JSON document.
    input: PathBuf,
    /// JSON object of variables.
    #[arg(long)]
    vars: Option<PathBuf>,
    /// Extra variable, NAME=VALUE. VALUE is parsed as JSON when it can be,
    /// otherwise taken as a string. Overrides --vars.
    #[arg(long = "var", value_parser = parse_assignment)]
    var: Vec<(String, String)>,
    /// Catalog directory of *.json files, PREFIX=DIR. Each file is exposed as
    /// PREFIX + file stem. Earlier catalogs take precedence.
    #[arg(long = "refs", value_parser = parse_assignment)]
    refs: Vec<(String, String)>,
    /// Tolerate every category of defect instead of failing.
    #[arg(long)]
    lenient: bool,
    #[arg(long, value_enum)]
    on_invalid_name: Option<Policy>,
    #[arg(long, value_enum)]
    on_invalid_value: Option<Policy>,
    #[arg(long, value_enum)]
    on_undefined: Option<Policy>,
    /// Write the result here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}

fn policy(args: &Args) -> ValidationPolicy {
    let base = if args.lenient {
        ValidationPolicy::lenient()
    } else {
        ValidationPolicy::strict()
    };
    ValidationPolicy {
        on_invalid_property_name: args.on_invalid_name.unwrap_or(base.on_invalid_property_name),
        on_invalid_property_value: args.on_invalid_value.unwrap_or(base.on_invalid_property_value),
        on_undefined_property_value: args.on_undefined.unwrap_or(base.on_undefined_property_value),
    }
}

fn context(args: &Args) -> Result<Context, String> {
    let mut vars = match &args.vars {
        Some(path) => load_vars(path).map_err(|e| e.to_string())?,
        None => Vars::new(),
    };
    if !args.var.is_empty() {
        let mut extra = Map::new();
        for (name, raw) in &args.var {
            let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            extra.insert(name.clone(), value);
        }
        vars = vars.overlay(extra);
    }

    let mut cx = Context::new(vars);
    if !args.refs.is_empty() {
        let mut composite = CompositeCatalog::default();
        for (prefix, dir) in &args.refs {
            let table = load_catalog_dir(&PathBuf::from(dir)).map_err(|e| e.to_string())?;
            composite.push(Arc::new(PrefixCatalog::new(prefix.clone(), PrefixMode::Add, Arc::new(table))));
        }
        let refs: Arc<dyn Catalog> = Arc::new(composite);
        cx = cx.with_refs(refs);
    }
    Ok(cx)
}

fn run(args: &Args) -> Result<(), String> {
    let document = load_document(&args.input).map_err(|e| e.to_string())?;
    let engine = Engine::new(
        RuleSet::standard(),
        context(args)?,
        EngineOptions::with_policy(policy(args)),
    );
    let out = engine
        .clone_value(&document, None)
        .map_err(|e| format!("{}: {e}", args.input.display()))?;

    match &args.output {
        Some(path) => write_document(path, &out).map_err(|e| e.to_string()),
        None => {
            print!("{}", to_pretty(&out));
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Parse CLI arguments.
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
