use serde::Serialize;
use std::io::Read;
use trellis::hybrid::{complexity, select_mode};
use trellis::{
    AdaptiveSelector, ConstraintSolver, Graph, GraphEvent, GraphMetrics, HybridMode, LayoutConfig,
    NestedLayoutComposer, StrategyKind, create_inline_strategy,
};
use trellis_graph::GraphDocument;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Graph(trellis_graph::GraphError),
    Layout(trellis::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Graph(err) => write!(f, "invalid graph: {err}"),
            CliError::Layout(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<trellis_graph::GraphError> for CliError {
    fn from(value: trellis_graph::GraphError) -> Self {
        Self::Graph(value)
    }
}

impl From<trellis::Error> for CliError {
    fn from(value: trellis::Error) -> Self {
        Self::Layout(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Metrics,
    Select,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    strategy: Option<StrategyKind>,
    nested: bool,
    constraints: bool,
    pretty: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MetricsOut {
    metrics: GraphMetrics,
    complexity: f64,
    mode: HybridMode,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SelectOut<'a> {
    strategy: StrategyKind,
    reason: &'a str,
    metrics: GraphMetrics,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOut {
    strategy: StrategyKind,
    graph: GraphDocument,
    events: Vec<GraphEvent>,
}

fn usage() -> &'static str {
    "trellis-cli\n\
\n\
USAGE:\n\
  trellis-cli [layout] [--strategy <name>] [--nested] [--constraints] [--config <path>] [--pretty] [<path>|-]\n\
  trellis-cli metrics [--config <path>] [--pretty] [<path>|-]\n\
  trellis-cli select [--config <path>] [--pretty] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the graph document is read from stdin.\n\
  - A graph document is JSON: {\"nodes\": [...], \"edges\": [...]}.\n\
  - layout picks a strategy adaptively unless --strategy is given.\n\
  - --nested lays out container children; --constraints relaxes edge and group constraints.\n\
  - Set RUST_LOG (e.g. RUST_LOG=trellis=debug) for diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "metrics" => args.command = Command::Metrics,
            "select" => args.command = Command::Select,
            "--pretty" => args.pretty = true,
            "--nested" => args.nested = true,
            "--constraints" => args.constraints = true,
            "--strategy" => {
                let Some(name) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.strategy = Some(name.parse::<StrategyKind>()?);
            }
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            other if other.starts_with('-') && other != "-" => {
                return Err(CliError::Usage(usage()));
            }
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn load_config(path: Option<&str>) -> Result<LayoutConfig, CliError> {
    match path {
        None => Ok(LayoutConfig::default()),
        Some(path) => Ok(LayoutConfig::from_json(&std::fs::read_to_string(path)?)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let doc: GraphDocument = serde_json::from_str(&text)?;
    let mut graph = Graph::from_document(doc)?;
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Metrics => {
            let metrics = GraphMetrics::compute(&graph);
            let out = MetricsOut {
                metrics,
                complexity: complexity(&metrics),
                mode: select_mode(&graph, &config),
            };
            write_json(&out, args.pretty)
        }
        Command::Select => {
            let selection = AdaptiveSelector::new(config).select(&graph);
            let out = SelectOut {
                strategy: selection.strategy,
                reason: &selection.reason,
                metrics: selection.metrics,
            };
            write_json(&out, args.pretty)
        }
        Command::Layout => {
            let kind = match args.strategy {
                Some(kind) => kind,
                None => {
                    let selection = AdaptiveSelector::new(config.clone()).select(&graph);
                    tracing::info!(strategy = %selection.strategy, rule = %selection.reason, "strategy selected");
                    selection.strategy
                }
            };
            let mut strategy = create_inline_strategy(kind);
            strategy.init(&mut graph, &config)?;
            strategy.dispose();
            if args.nested {
                let mut composer = NestedLayoutComposer::new();
                composer.layout(&mut graph, &config)?;
                composer.dispose();
            }
            if args.constraints {
                let report = ConstraintSolver::new(config.solver.clone()).layout(&mut graph, &config.solver);
                tracing::debug!(
                    iterations = report.iterations,
                    converged = report.converged,
                    "constraints relaxed"
                );
            }
            let out = LayoutOut {
                strategy: kind,
                events: graph.drain_events(),
                graph: graph.to_document(),
            };
            write_json(&out, args.pretty)
        }
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
