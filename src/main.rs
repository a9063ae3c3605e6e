use std::str::FromStr;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use blocknest::config::EditorConfig;
use blocknest::editor::{DEFAULT_GROUP_NAME, EditorSession};
use blocknest::generator::generate_diagram_xml;
use blocknest::model::Diagram;
use blocknest::parser::{DiagramParser, FsSource};
use blocknest::resolver::flattened_connections;
use blocknest::store::{DiagramStore, FileStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert, group and store nested block diagrams", long_about = None)]
struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Editor configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a diagram (JSON or XML) to XML
    ExportXml {
        #[arg(value_name = "DIAGRAM_FILE")]
        input: Utf8PathBuf,
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// Convert diagram XML to JSON
    ImportXml {
        #[arg(value_name = "XML_FILE")]
        input: Utf8PathBuf,
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// Group sibling blocks into a new composite block
    Group {
        #[arg(value_name = "DIAGRAM_FILE")]
        input: Utf8PathBuf,
        /// Ids of the blocks to group (at least two)
        #[arg(long, value_delimiter = ',', required = true)]
        blocks: Vec<String>,
        /// Group whose interior holds the blocks (defaults to the top level)
        #[arg(long)]
        view: Option<String>,
        #[arg(long, default_value = DEFAULT_GROUP_NAME)]
        name: String,
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },
    /// List the connections of a view, or all connections with proxies collapsed
    Edges {
        #[arg(value_name = "DIAGRAM_FILE")]
        input: Utf8PathBuf,
        #[arg(long, conflicts_with = "flatten")]
        view: Option<String>,
        #[arg(long)]
        flatten: bool,
    },
    /// Check a diagram's structure
    Validate {
        #[arg(value_name = "DIAGRAM_FILE")]
        input: Utf8PathBuf,
    },
    /// Manage a directory of stored diagrams
    Store {
        #[arg(long, value_name = "DIR")]
        dir: Utf8PathBuf,
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand, Debug)]
enum StoreAction {
    List,
    Show {
        id: String,
        #[arg(long)]
        xml: bool,
    },
    Remove {
        id: String,
    },
    /// Store a diagram file under a new id
    Import {
        #[arg(value_name = "DIAGRAM_FILE")]
        input: Utf8PathBuf,
        /// Overrides the diagram's own name
        #[arg(long)]
        name: Option<String>,
    },
}

fn load_diagram(path: &Utf8Path) -> Result<Diagram> {
    if path.extension() == Some("xml") {
        return DiagramParser::new(FsSource).parse_file(path);
    }
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    Diagram::from_json(&text).with_context(|| format!("Failed to load {}", path))
}

fn write_output(output: Option<&Utf8Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text).with_context(|| format!("Failed to write {}", path)),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn open_session(path: &Utf8Path, view: Option<&str>, config: EditorConfig) -> Result<EditorSession> {
    let mut session = EditorSession::new(load_diagram(path)?, config);
    if let Some(group) = view {
        session
            .view
            .open(&session.diagram, group)
            .with_context(|| format!("Cannot open view {}", group))?;
    }
    Ok(session)
}

fn run_store(dir: &Utf8Path, action: StoreAction) -> Result<()> {
    let mut store = FileStore::open(dir)?;
    match action {
        StoreAction::List => {
            for s in store.list()? {
                println!("{}\t{}", s.id, s.name);
            }
        }
        StoreAction::Show { id, xml } => {
            let diagram = store.get(&id)?;
            if xml {
                print!("{}", generate_diagram_xml(&diagram));
            } else {
                println!("{}", diagram.to_json_pretty()?);
            }
        }
        StoreAction::Remove { id } => store.remove(&id)?,
        StoreAction::Import { input, name } => {
            let diagram = load_diagram(&input)?;
            let name = name.unwrap_or(diagram.name);
            let created = store.create(&name, diagram.blocks)?;
            println!("{}", created.id);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = LevelFilter::from_str(&cli.log_level).unwrap_or_else(|_| {
        eprintln!("Invalid log level: {}. Using 'warn' instead.", cli.log_level);
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(level)
        .init();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::ExportXml { input, output } => {
            let diagram = load_diagram(&input)?;
            write_output(output.as_deref(), &generate_diagram_xml(&diagram))?;
        }
        Command::ImportXml { input, output } => {
            let diagram = DiagramParser::new(FsSource).parse_file(&input)?;
            write_output(output.as_deref(), &diagram.to_json_pretty()?)?;
        }
        Command::Group {
            input,
            blocks,
            view,
            name,
            output,
        } => {
            let mut session = open_session(&input, view.as_deref(), config)?;
            for id in &blocks {
                session.toggle_selection(id)?;
            }
            let outcome = session.group_selection(&name)?;
            log::info!(
                "created {} with {} inputs and {} outputs",
                outcome.group_id,
                outcome.inputs,
                outcome.outputs
            );
            write_output(output.as_deref(), &session.export_json()?)?;
        }
        Command::Edges {
            input,
            view,
            flatten,
        } => {
            if flatten {
                for (source, target) in flattened_connections(&load_diagram(&input)?) {
                    println!("{} -> {}", source, target);
                }
            } else {
                let session = open_session(&input, view.as_deref(), config)?;
                for c in session.connections() {
                    println!(
                        "{} -> {}\t({}, {}) -> ({}, {})",
                        c.source, c.target, c.from.x, c.from.y, c.to.x, c.to.y
                    );
                }
            }
        }
        Command::Validate { input } => {
            let diagram = load_diagram(&input)?;
            println!(
                "{}: {} blocks, {} edges",
                diagram.id,
                diagram.block_ids().len(),
                diagram.edges().len()
            );
        }
        Command::Store { dir, action } => run_store(&dir, action)?,
    }
    Ok(())
}
