use crate::config::{load_config, Config};
use crate::layout_dump::write_layout_dump;
use crate::model::Outcome;
use crate::persist::FileStore;
use crate::render::{write_output_png, write_output_svg, SvgScene};
use crate::service::NoteGraph;
use crate::theme::Theme;
use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_STORE_DIR: &str = ".notegraph";

#[derive(Parser, Debug)]
#[command(name = "ngr", version, about = "Note graph: linked notes with a force-directed layout")]
pub struct Args {
    /// Directory holding the saved graph
    #[arg(short = 's', long = "store", global = true)]
    pub store: Option<PathBuf>,

    /// Config file (JSON5)
    #[arg(short = 'c', long = "configFile", global = true)]
    pub config: Option<PathBuf>,

    /// Theme preset (light, dark)
    #[arg(short = 't', long = "theme", global = true)]
    pub theme: Option<String>,

    /// Log simulation and camera changes
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a note
    Add { id: String, body: Option<String> },
    /// Rename a note and/or replace its body
    Edit {
        id: String,
        #[arg(long = "id")]
        new_id: Option<String>,
        #[arg(long = "body")]
        new_body: Option<String>,
    },
    /// Link two notes
    Link { source: String, target: String },
    /// Delete a note and its links
    Delete { id: String },
    /// Highlight notes whose title or body contains the query
    Search { query: String },
    /// Remove every note and link
    Clear,
    /// Print all notes as JSON
    List,
    /// Settle the layout and write a snapshot
    Render(RenderArgs),
}

#[derive(clap::Args, Debug)]
pub struct RenderArgs {
    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Frame the whole graph instead of the identity camera
    #[arg(long = "fit")]
    pub fit: bool,

    /// Select a note first (pins it to the center)
    #[arg(long = "select")]
    pub select: Option<String>,

    /// Maximum simulation frames to run
    #[arg(long = "steps", default_value_t = 2_000)]
    pub steps: usize,

    /// Also write the settled positions as JSON
    #[arg(long = "dumpLayout")]
    pub dump_layout: Option<PathBuf>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

type CliGraph = NoteGraph<SvgScene, FileStore>;

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(name) = args.theme.as_deref() {
        let theme =
            Theme::by_name(name).ok_or_else(|| anyhow::anyhow!("unknown theme \"{name}\""))?;
        config.render.background = theme.background.clone();
        config.theme = theme;
    }
    if let Command::Render(render) = &args.command {
        if let Some(width) = render.width {
            config.render.width = width;
        }
        if let Some(height) = render.height {
            config.render.height = height;
        }
    }
    let dir = resolve_store_dir(args.store.as_deref(), &config);
    let mut graph = open_graph(config, dir);

    match args.command {
        Command::Add { id, body } => apply(&mut graph, |g| g.add_note(&id, body.as_deref())),
        Command::Edit {
            id,
            new_id,
            new_body,
        } => apply(&mut graph, |g| {
            g.edit_note(&id, new_id.as_deref(), new_body.as_deref())
        }),
        Command::Link { source, target } => apply(&mut graph, |g| g.connect_notes(&source, &target)),
        Command::Delete { id } => apply(&mut graph, |g| g.delete_note(&id)),
        Command::Search { query } => apply(&mut graph, |g| g.search_notes(&query)),
        Command::Clear => apply(&mut graph, |g| g.clear()),
        Command::List => {
            let outcome = graph.list_notes();
            report(&outcome)?;
            if let Some(data) = &outcome.data {
                println!("{}", serde_json::to_string_pretty(data)?);
            }
            Ok(())
        }
        Command::Render(render) => render_snapshot(&mut graph, &render),
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "notegraph=debug" } else { "notegraph=warn" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn resolve_store_dir(cli: Option<&Path>, config: &Config) -> PathBuf {
    cli.map(Path::to_path_buf)
        .or_else(|| config.storage.dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_DIR))
}

fn open_graph(config: Config, dir: PathBuf) -> CliGraph {
    let scene = SvgScene::new(config.theme.clone(), config.render.clone());
    NoteGraph::new(config, scene, FileStore::new(dir))
}

/// Run one mutation, let the layout settle so saved positions are final,
/// and turn a rejected outcome into an error.
fn apply(graph: &mut CliGraph, op: impl FnOnce(&mut CliGraph) -> Outcome) -> Result<()> {
    let outcome = op(graph);
    report(&outcome)?;
    graph.settle(10_000);
    graph.save();
    Ok(())
}

fn report(outcome: &Outcome) -> Result<()> {
    if !outcome.ok {
        return Err(anyhow::anyhow!(outcome.message.clone()));
    }
    println!("{}", outcome.message);
    Ok(())
}

fn render_snapshot(graph: &mut CliGraph, args: &RenderArgs) -> Result<()> {
    graph.resize();
    if let Some(id) = args.select.as_deref()
        && !graph.click_node(id)
    {
        return Err(anyhow::anyhow!("Note \"{id}\" not found."));
    }
    graph.settle(args.steps);
    if args.fit {
        graph.zoom_to_fit(Some(Duration::ZERO));
    } else {
        graph.reset_zoom(Some(Duration::ZERO));
    }

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, &graph.dump())?;
    }

    let svg = graph.scene().to_svg();
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &graph.config().render)?;
        }
    }
    Ok(())
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_edit_with_optional_flags() {
        let args = Args::parse_from(["ngr", "--store", "/tmp/x", "edit", "Old", "--id", "New"]);
        assert_eq!(args.store.as_deref(), Some(Path::new("/tmp/x")));
        match args.command {
            Command::Edit {
                id,
                new_id,
                new_body,
            } => {
                assert_eq!(id, "Old");
                assert_eq!(new_id.as_deref(), Some("New"));
                assert_eq!(new_body, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn store_dir_prefers_flag_then_config() {
        let mut config = Config::default();
        assert_eq!(resolve_store_dir(None, &config), PathBuf::from(DEFAULT_STORE_DIR));
        config.storage.dir = Some(PathBuf::from("cfg"));
        assert_eq!(resolve_store_dir(None, &config), PathBuf::from("cfg"));
        assert_eq!(
            resolve_store_dir(Some(Path::new("flag")), &config),
            PathBuf::from("flag")
        );
    }

    #[test]
    fn commands_persist_between_runs() {
        let dir = std::env::temp_dir().join(format!("notegraph-cli-{}", std::process::id()));
        let mut graph = open_graph(Config::default(), dir.clone());
        apply(&mut graph, |g| g.add_note("a", Some("body"))).unwrap();
        apply(&mut graph, |g| g.add_note("b", None)).unwrap();
        apply(&mut graph, |g| g.connect_notes("a", "b")).unwrap();
        assert!(apply(&mut graph, |g| g.connect_notes("b", "a")).is_err());

        let reopened = open_graph(Config::default(), dir.clone());
        assert_eq!(reopened.store().len(), 2);
        assert!(reopened.store().has_edge("a", "b"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn search_carries_into_a_later_render() {
        let dir = std::env::temp_dir().join(format!("notegraph-cli-search-{}", std::process::id()));
        let mut graph = open_graph(Config::default(), dir.clone());
        apply(&mut graph, |g| g.add_note("apple", None)).unwrap();
        apply(&mut graph, |g| g.add_note("pear", None)).unwrap();
        apply(&mut graph, |g| g.search_notes("app")).unwrap();

        let mut reopened = open_graph(Config::default(), dir.clone());
        assert_eq!(reopened.store().highlighted_ids(), vec!["apple"]);
        assert_eq!(reopened.layout().focus(), Some("apple"));

        let svg_path = dir.join("out.svg");
        let args = RenderArgs {
            output: Some(svg_path.clone()),
            output_format: OutputFormat::Svg,
            fit: false,
            select: None,
            steps: 200,
            dump_layout: None,
            width: None,
            height: None,
        };
        render_snapshot(&mut reopened, &args).unwrap();
        let svg = std::fs::read_to_string(&svg_path).unwrap();
        let highlight = &Config::default().theme.highlight_background;
        assert!(svg.contains(&format!("fill=\"{highlight}\"")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
