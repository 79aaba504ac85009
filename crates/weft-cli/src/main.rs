use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use smol_str::SmolStr;
use weft_common::config::{FileStore, Settings};
use weft_common::telemetry::{self, TelemetryConfig};
use weft_editor_core::{SharedSource, SourceDocument};
use weft_widgets::controller::insert_marker;
use weft_widgets::marker;
use weft_widgets::store::Owner;
use weft_widgets::{
    Attributes, MemoryStore, SpliceOutcome, ThemeManager, WidgetContext, WidgetController, WidgetHost,
    WidgetOutput, WidgetRegistry,
};

#[derive(Parser)]
#[command(version, about = "Weft - inspect and edit widget markers in documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Settings file (.json or .toml)
    #[arg(long, global = true, env = "WEFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered widget types
    Types,
    /// Mount every widget in a document and print what it renders
    Render {
        file: PathBuf,

        /// Render as a read-only preview
        #[arg(long)]
        preview: bool,

        /// Print HTML instead of a text outline
        #[arg(long)]
        html: bool,

        /// JSON dump of persisted widgets backing `cloud_widget` markers
        #[arg(long)]
        store: Option<PathBuf>,
    },
    /// Merge attributes into the n-th marker
    Set {
        file: PathBuf,
        index: usize,
        /// Attributes as key=value
        #[arg(value_parser = parse_pair, required = true)]
        attributes: Vec<(SmolStr, String)>,
    },
    /// Delete the n-th marker
    Remove { file: PathBuf, index: usize },
    /// Insert a new marker at a character offset
    Insert {
        file: PathBuf,
        offset: usize,
        widget_type: String,
        /// Attributes as key=value
        #[arg(value_parser = parse_pair)]
        attributes: Vec<(SmolStr, String)>,
    },
    /// Show the settings, or update and save the file given by --config
    Config {
        #[arg(long)]
        theme: Option<SmolStr>,

        /// Name shown as the local viewer
        #[arg(long)]
        author: Option<String>,

        /// Origin whose links open in-app; pass an empty string to clear
        #[arg(long)]
        app_origin: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init(TelemetryConfig::from_env("weft-cli"));

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Types => {
            for widget_type in WidgetRegistry::with_builtins().types() {
                println!("{widget_type}");
            }
        }
        Commands::Render {
            file,
            preview,
            html,
            store,
        } => render(&settings, &file, preview, html, store.as_deref()).await?,
        Commands::Set {
            file,
            index,
            attributes,
        } => {
            let source = open(&file)?;
            let controller = controller_at(&source, index)?;
            let outcome = controller.set_attributes(&attributes.into_iter().collect())?;
            report(outcome, &controller);
            write_back(&file, &source)?;
        }
        Commands::Remove { file, index } => {
            let source = open(&file)?;
            let controller = controller_at(&source, index)?;
            let removed = controller.marker_text();
            match controller.remove_self() {
                SpliceOutcome::Applied => println!("removed {removed}"),
                outcome => println!("nothing removed ({outcome:?})"),
            }
            write_back(&file, &source)?;
        }
        Commands::Insert {
            file,
            offset,
            widget_type,
            attributes,
        } => {
            let source = open(&file)?;
            let attributes: Attributes = attributes.into_iter().collect();
            let range = insert_marker(&source, offset, &widget_type, &attributes)?;
            println!(
                "inserted {} at {}..{}",
                marker::format_marker(&widget_type, &attributes),
                range.start,
                range.end
            );
            write_back(&file, &source)?;
        }
        Commands::Config {
            theme,
            author,
            app_origin,
        } => {
            let update = SettingsUpdate {
                theme,
                author,
                app_origin,
            };
            configure(settings, cli.config.as_deref(), update).await?;
        }
    }

    Ok(())
}

struct SettingsUpdate {
    theme: Option<SmolStr>,
    author: Option<String>,
    app_origin: Option<String>,
}

impl SettingsUpdate {
    fn is_empty(&self) -> bool {
        self.theme.is_none() && self.author.is_none() && self.app_origin.is_none()
    }
}

async fn configure(mut settings: Settings, path: Option<&Path>, update: SettingsUpdate) -> Result<()> {
    if !update.is_empty() {
        let path = path.ok_or_else(|| miette::miette!(help = "pass --config or set WEFT_CONFIG", "No settings file to update"))?;
        if let Some(theme) = update.theme {
            if !ThemeManager::new().names().contains(&theme) {
                tracing::warn!(%theme, "unknown theme, the default is used when rendering");
            }
            settings.theme = theme;
        }
        if let Some(author) = update.author {
            settings.set_author_name(&author);
        }
        if let Some(origin) = update.app_origin {
            settings.set_app_origin(Some(&origin));
        }
        settings.save(&FileStore::new(path)).await?;
        tracing::info!(path = %path.display(), "settings saved");
    }

    println!("theme = {}", settings.theme);
    println!("author_name = {}", settings.author_name);
    println!("app_origin = {}", settings.app_origin.as_deref().unwrap_or("(none)"));
    Ok(())
}

async fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    match Settings::load(&FileStore::new(path)).await {
        Ok(settings) => Ok(settings),
        Err(e) if e.is_not_found() => {
            tracing::debug!(path = %path.display(), "settings file missing, using defaults");
            Ok(Settings::default())
        }
        Err(e) => Err(e.into()),
    }
}

async fn render(settings: &Settings, file: &Path, preview: bool, html: bool, store: Option<&Path>) -> Result<()> {
    let viewer = Owner::new("local", settings.author_name.as_str());
    let memory = Rc::new(MemoryStore::new(viewer));
    if let Some(store) = store {
        let raw = std::fs::read_to_string(store)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read widget store {}", store.display()))?;
        let loaded = memory.load_json(&raw).into_diagnostic()?;
        tracing::debug!(widgets = loaded, "widget store loaded");
    }

    let themes = Rc::new(ThemeManager::new());
    themes.select(&settings.theme);

    let mut context = WidgetContext::new(memory);
    if let Some(origin) = &settings.app_origin {
        context = context.with_app_origin(origin.as_str());
    }

    let source = open(file)?;
    let mut host = WidgetHost::new(Arc::new(WidgetRegistry::with_builtins()), source, context, themes)
        .with_preview(preview);
    host.render();
    host.settle().await;

    if html {
        println!("{}", host.to_html());
        return Ok(());
    }

    for (index, widget) in host.widgets().iter().enumerate() {
        let range = widget.range();
        let status = match widget.output() {
            WidgetOutput::Mounted => "mounted",
            WidgetOutput::Absent => "absent",
            WidgetOutput::Unknown => "unknown type",
        };
        println!(
            "[{index}] {} at {}..{} ({status})",
            widget.widget_type(),
            range.start,
            range.end
        );
        for (key, value) in widget.attributes().iter() {
            println!("    {key} = {value:?}");
        }
        if let Some(view) = host.view(index) {
            let text = view.text_content();
            if !text.trim().is_empty() {
                println!("    | {}", text.trim());
            }
        }
    }
    if host.is_empty() {
        println!("no widgets");
    }
    Ok(())
}

fn open(file: &Path) -> Result<SharedSource> {
    let text = std::fs::read_to_string(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
    Ok(SourceDocument::shared(&text))
}

fn write_back(file: &Path, source: &SharedSource) -> Result<()> {
    let text = source.borrow().text();
    std::fs::write(file, text)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to write {}", file.display()))
}

fn controller_at(source: &SharedSource, index: usize) -> Result<WidgetController> {
    let (text, revision) = {
        let doc = source.borrow();
        (doc.text(), doc.revision())
    };
    let markers = marker::scan(&text);
    let found = markers.len();
    let target = markers
        .into_iter()
        .nth(index)
        .ok_or_else(|| miette::miette!("No marker at index {index} ({found} found)"))?;
    Ok(WidgetController::new(source.clone(), &target, revision))
}

fn report(outcome: SpliceOutcome, controller: &WidgetController) {
    match outcome {
        SpliceOutcome::Applied => println!("{}", controller.marker_text()),
        SpliceOutcome::Unchanged => println!("unchanged"),
        SpliceOutcome::Detached => println!("marker not found"),
    }
}

fn parse_pair(input: &str) -> Result<(SmolStr, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{input}`"))?;
    Ok((SmolStr::new(key.trim()), value.to_string()))
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
