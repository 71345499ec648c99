use clap::Parser;
use metaroute::context::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_ORDERING_KEYS};
use metaroute::{CompileError, Context, Engine, Registry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Select the clients whose metadata matches a query.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Query JSON, or `@file` to read it from a file.
    query: String,
    /// Client list JSON (`[{"id": ..., "metadata": {...}}]`), or `@file`.
    #[arg(required_unless_present = "check")]
    clients: Option<String>,
    /// Only compile the query and report whether it is valid.
    #[arg(long)]
    check: bool,
    /// Deepest allowed nesting of logical operators.
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
    /// Most ordering keys accepted in `select.ordering`.
    #[arg(long, default_value_t = DEFAULT_MAX_ORDERING_KEYS)]
    max_ordering_keys: usize,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Deserialize)]
struct Client {
    id: Value,
    #[serde(default)]
    metadata: Value,
}

#[derive(Debug, Serialize)]
struct Output<'a> {
    query: Option<&'a str>,
    recipients: Vec<&'a Value>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("cannot read `{path}`: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid client list: {0}")]
    Clients(serde_json::Error),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("cannot render output: {0}")]
    Output(serde_json::Error),
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<String, CliError> {
    let ctx = Context::default()
        .with_max_depth(args.max_depth)
        .with_max_ordering_keys(args.max_ordering_keys);
    let engine = Engine::new(Registry::new()).with_context(ctx);

    let query = engine.compile_str(&load(&args.query)?)?;
    let clients = match args.clients.as_deref() {
        Some(clients) if !args.check => clients,
        _ => return Ok(format!("ok: {}", query.name().unwrap_or("<unnamed>"))),
    };

    let clients: Vec<Client> = serde_json::from_str(&load(clients)?).map_err(CliError::Clients)?;
    tracing::info!(clients = clients.len(), "loaded clients");

    let recipients = engine.route(&query, clients.iter().map(|c| (&c.id, &c.metadata)));
    let out = Output {
        query: query.name(),
        recipients: recipients.into_iter().map(|r| r.handle).collect(),
    };
    serde_json::to_string_pretty(&out).map_err(CliError::Output)
}

// `@path` reads a file, anything else is taken literally.
fn load(arg: &str) -> Result<String, CliError> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_string(),
            source,
        }),
        None => Ok(arg.to_string()),
    }
}
