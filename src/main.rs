use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use constraint_filter::{filter_datasources, shared_context_with, FactsConfig, SystemFacts};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Filter the datasources of a configuration by their constraints on this host.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration file (YAML, or JSON by `.json` extension).
    config: Option<PathBuf>,
    /// Agent info file holding the agent id; created when missing.
    #[arg(long, env = "AGENT_INFO_PATH")]
    agent_info: Option<PathBuf>,
    /// Print the variables available to constraints.
    #[arg(long)]
    facts: bool,
    /// Evaluate a single constraint and print the verdict.
    #[arg(long, value_name = "EXPR")]
    eval: Option<String>,
    /// Output format for the filtered configuration and `--facts`.
    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    output: Format,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    if args.config.is_none() && args.eval.is_none() && !args.facts {
        return Err("nothing to do: pass a CONFIG file, --eval or --facts".into());
    }

    let provider = SystemFacts::new(FactsConfig {
        agent_info_path: args.agent_info.clone(),
    });
    let ctx = shared_context_with(&provider)?;

    if args.facts {
        print_tree(&serde_json::to_value(ctx.vars())?, args.output)?;
    }

    if let Some(expr) = &args.eval {
        println!("{}", ctx.evaluate(expr)?);
    }

    if let Some(path) = &args.config {
        let mut tree = load(path)?;
        let removed = filter_datasources(&mut tree, &ctx)?;
        tracing::info!(removed, path = %path.display(), "filtered datasources");
        print_tree(&tree, args.output)?;
    }
    Ok(())
}

fn print_tree(tree: &Value, format: Format) -> Result<(), Box<dyn Error>> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(tree)?),
        Format::Yaml => print!("{}", serde_yaml::to_string(tree)?),
    }
    Ok(())
}

fn load(path: &Path) -> Result<Value, Box<dyn Error>> {
    let text = fs::read_to_string(path)?;
    let tree = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&text)?
    } else {
        serde_yaml::from_str(&text)?
    };
    Ok(tree)
}
