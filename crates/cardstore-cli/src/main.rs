//! Cardstore CLI
//!
//! - `pack`: JSON model dump → `.csh5` container
//! - `unpack`: `.csh5` container → JSON model dump
//! - `inspect`, `stats`, `cards`: look inside documents and the card registry

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use cardstore_codec::{open_model, save_model, CodecConfig, TextEncoding};
use cardstore_container::Document;
use cardstore_model::{cards, Model, ModelDump};

mod inspect;
mod report;

#[derive(Parser)]
#[command(name = "cardstore")]
#[command(author, version, about = "Cardstore: typed card models in hierarchical containers")]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON model dump into a container.
    Pack {
        input: PathBuf,

        #[arg(short, long)]
        out: PathBuf,

        /// Codec options as JSON (`encoding`, `columnar`, `write_cards_to_read`).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured text encoding.
        #[arg(long)]
        encoding: Option<TextEncoding>,
    },

    /// Decode a container back into a JSON model dump.
    Unpack {
        input: PathBuf,

        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print the group/dataset tree of a container.
    Inspect {
        input: PathBuf,

        /// Stop descending below this depth.
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Load a container and report per-type counts.
    Stats {
        input: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// List registered card types.
    Cards {
        /// Show the field table of one type.
        #[arg(long)]
        tag: Option<String>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Pack {
            input,
            out,
            config,
            encoding,
        } => cmd_pack(&input, &out, config.as_deref(), encoding),
        Commands::Unpack { input, out } => cmd_unpack(&input, &out),
        Commands::Inspect { input, depth } => cmd_inspect(&input, depth),
        Commands::Stats { input, json } => cmd_stats(&input, json),
        Commands::Cards { tag } => cmd_cards(tag.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<CodecConfig> {
    let Some(path) = path else {
        return Ok(CodecConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn cmd_pack(input: &Path, out: &Path, config: Option<&Path>, encoding: Option<TextEncoding>) -> Result<()> {
    println!("{} {}", "Packing".green().bold(), input.display());

    let mut config = load_config(config)?;
    if let Some(encoding) = encoding {
        config.encoding = encoding;
    }
    let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let dump: ModelDump = serde_json::from_str(&text).with_context(|| format!("parsing {}", input.display()))?;
    let model = Model::from_dump(dump)?;

    let registry = cards::registry()?;
    let diagnostics = save_model(out, &registry, &model, &config)
        .with_context(|| format!("exporting {}", input.display()))?;
    for diagnostic in diagnostics.iter() {
        eprintln!(
            "{} {}: {}",
            "warning:".yellow().bold(),
            diagnostic.location,
            diagnostic.message
        );
    }

    println!(
        "  {} {} entities, encoding={} {} {}",
        "→".cyan(),
        model.entity_count(),
        config.encoding.to_string().cyan(),
        "→".cyan(),
        out.display()
    );
    Ok(())
}

fn cmd_unpack(input: &Path, out: &Path) -> Result<()> {
    println!("{} {}", "Unpacking".green().bold(), input.display());

    let registry = cards::registry()?;
    let report = open_model(input, &registry).with_context(|| format!("loading {}", input.display()))?;
    let json = serde_json::to_string_pretty(&report.model.to_dump())?;
    fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;

    println!(
        "  {} {} entities {} {}",
        "→".cyan(),
        report.model.entity_count(),
        "→".cyan(),
        out.display()
    );
    Ok(())
}

fn cmd_inspect(input: &Path, depth: Option<usize>) -> Result<()> {
    let document = Document::read_from(input).with_context(|| format!("reading {}", input.display()))?;
    println!("{}", input.display().to_string().bold());
    println!("{}", inspect::format_note().dimmed());
    print!("{}", inspect::render_tree(document.root(), depth));
    Ok(())
}

fn cmd_stats(input: &Path, json: bool) -> Result<()> {
    let registry = cards::registry()?;
    let report = open_model(input, &registry).with_context(|| format!("loading {}", input.display()))?;
    let stats = report::ModelStats::collect(&report.model, report.encoding);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", stats.render());
    }
    Ok(())
}

fn cmd_cards(tag: Option<&str>) -> Result<()> {
    let registry = cards::registry()?;
    match tag {
        Some(tag) => print!("{}", report::render_card(registry.resolve(tag)?)),
        None => print!("{}", report::render_registry(&registry)),
    }
    Ok(())
}
