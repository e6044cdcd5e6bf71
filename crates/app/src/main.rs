use std::{
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use sentiment_scatter_core::{
    dataset::{self, ColumnKind},
    AppConfig, Event, Explorer, LoadState, MarkerMode, ScatterError,
};
use tracing_subscriber::EnvFilter;

fn main() -> sentiment_scatter_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Explore {
            input,
            config,
            script,
        } => run_explore(&input, config.as_deref(), script.as_deref()),
        Commands::Describe { input, config } => run_describe(&input, config.as_deref()),
    }
}

fn load_config(input: &Path, config: Option<&Path>) -> sentiment_scatter_core::Result<AppConfig> {
    let mut config = match config {
        Some(path) => AppConfig::from_path(path)?,
        None => AppConfig::default(),
    };
    config.dataset.path = input.to_path_buf();
    Ok(config)
}

fn run_explore(
    input: &Path,
    config: Option<&Path>,
    script: Option<&Path>,
) -> sentiment_scatter_core::Result<()> {
    let config = load_config(input, config)?;
    tracing::info!(?input, "loading dataset");

    let mut state = LoadState::load(config.clone());
    let explorer = match &mut state {
        LoadState::Ready(explorer) => explorer,
        LoadState::Failed(message) => return Err(ScatterError::Load(message.clone())),
    };
    report(explorer);

    let lines: Box<dyn BufRead> = match script {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    for line in lines.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_command(line, &config) {
            Ok(Command::Wait(ms)) => {
                explorer.advance(ms);
                let now_ms = explorer.now_ms();
                let drawn = explorer.backend().draw(now_ms);
                tracing::info!(
                    now_ms,
                    settled = explorer.scene().is_settled(now_ms),
                    "clock advanced"
                );
                tracing::debug!(?drawn, "mark states");
            }
            Ok(Command::Event(event)) => match explorer.handle(event) {
                Ok(()) => report(explorer),
                Err(err) => tracing::warn!(error = %err, line, "event rejected"),
            },
            Err(err) => tracing::warn!(error = %err, line, "unrecognised command"),
        }
    }
    Ok(())
}

fn run_describe(input: &Path, config: Option<&Path>) -> sentiment_scatter_core::Result<()> {
    let config = load_config(input, config)?;
    let data = dataset::load(&config.dataset)?;

    println!("records: {}", data.len());
    for column in &data.columns {
        let kind = match column.kind {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Text => "text",
        };
        println!("  {:<20} {kind}", column.name);
    }
    println!("senders:");
    for (id, name) in data.senders.names().iter().enumerate() {
        println!("  {id:>4} {name}");
    }
    for rejected in &data.rejected {
        println!("rejected: {rejected}");
    }
    Ok(())
}

fn report(explorer: &Explorer) {
    let scene = explorer.scene();
    let view = explorer.view();
    tracing::info!(
        x = %view.x_field,
        y = %view.y_field,
        marker = ?view.marker,
        scale = ?view.scale_mode,
        marks = scene.marks.len(),
        excluded = explorer.projection().excluded.len(),
        "scene rendered"
    );
    if let Some(axis) = &scene.x_axis {
        tracing::info!(domain = ?axis.scale.domain(), ticks = axis.ticks.len(), "x axis");
    }
    if let Some(axis) = &scene.y_axis {
        tracing::info!(domain = ?axis.scale.domain(), ticks = axis.ticks.len(), "y axis");
    }
    if explorer.tooltip().visible {
        println!("tooltip: {}", explorer.tooltip().text);
    }
    if let Some(panel) = explorer.detail() {
        println!("{}", panel.info_html());
        println!("{}", panel.text_html());
        println!("{}", panel.annotations_html());
    }
}

enum Command {
    Event(Event),
    Wait(f64),
}

fn parse_command(line: &str, config: &AppConfig) -> sentiment_scatter_core::Result<Command> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    let arg = |index: usize| {
        args.get(index)
            .copied()
            .ok_or_else(|| ScatterError::msg(format!("`{verb}` expects more arguments")))
    };
    let number = |index: usize| -> sentiment_scatter_core::Result<f64> {
        let raw = arg(index)?;
        raw.parse()
            .map_err(|_| ScatterError::msg(format!("`{raw}` is not a number")))
    };
    let row = |index: usize| -> sentiment_scatter_core::Result<usize> {
        let raw = arg(index)?;
        raw.parse()
            .map_err(|_| ScatterError::msg(format!("`{raw}` is not a row index")))
    };

    let event = match verb {
        "x" => Event::SelectX(arg(0)?.to_string()),
        "y" => Event::SelectY(arg(0)?.to_string()),
        "marker" => Event::SelectMarker(MarkerMode::from_option(arg(0)?, &config.marker)),
        "scale" => {
            let mode = match arg(0)? {
                "relative" => sentiment_scatter_core::ScaleMode::Relative,
                "counts" | "absolute" => sentiment_scatter_core::ScaleMode::Absolute,
                label => config
                    .scale_labels
                    .parse(label)
                    .ok_or_else(|| ScatterError::msg(format!("unknown scale `{label}`")))?,
            };
            Event::SelectScale(mode)
        }
        "hover" => Event::Hover {
            row: row(0)?,
            pointer: (number(1)?, number(2)?),
        },
        "unhover" => Event::Unhover(row(0)?),
        "click" => Event::Click(row(0)?),
        "wait" => return Ok(Command::Wait(number(0)?)),
        other => return Err(ScatterError::msg(format!("unknown command `{other}`"))),
    };
    Ok(Command::Event(event))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Interactive scatter explorer for annotated messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a dataset and drive the plot with scripted events.
    Explore {
        /// Comma separated input file.
        input: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Event script, one command per line. Reads stdin when omitted.
        #[arg(short, long)]
        script: Option<PathBuf>,
    },
    /// Print the column classification and sender registry of a dataset.
    Describe {
        /// Comma separated input file.
        input: PathBuf,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
