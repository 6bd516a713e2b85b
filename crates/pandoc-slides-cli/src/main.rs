mod host;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use host::{HostAction, HostEditor, HostEvent, HostSurface, file_uri};
use pandoc_slides_config::Config;
use pandoc_slides_engine::convert::{ConversionJob, Converter, OutputTarget, PandocConverter};
use pandoc_slides_engine::protocol::{RendererCommand, SourceRange};
use pandoc_slides_engine::session::{Event, PositionRecord};
use pandoc_slides_engine::{
    Controller, ControllerOptions, DocumentId, EditorHost, PreviewSurface, Renderer, Session,
    SessionSettings, io,
};

#[derive(Parser)]
#[command(version, about = "Reveal.js slide previews for Markdown documents", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// pandoc executable, overriding the config file
    #[arg(long, global = true)]
    pandoc: Option<PathBuf>,

    /// Template for documents whose front matter names none
    #[arg(long, global = true)]
    template: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a document as an interactive deck and print it
    Render {
        /// Markdown document
        file: PathBuf,
    },
    /// Render a document to a standalone HTML file
    Export {
        /// Markdown document
        file: PathBuf,

        /// Output file (defaults to the document name with an .html extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the slide generated from each annotated source range
    Positions {
        /// Markdown document
        file: PathBuf,
    },
    /// Drive previews for an editor host over JSON lines on stdin/stdout
    Serve,
}

/// Effective settings after applying command-line overrides.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    pandoc_path: PathBuf,
    template: Option<PathBuf>,
    assets_dir: PathBuf,
    session: SessionSettings,
}

impl Settings {
    fn resolve(config: Config, pandoc: Option<PathBuf>, template: Option<PathBuf>) -> Self {
        let assets_dir = config.assets_dir();
        Self {
            pandoc_path: pandoc.unwrap_or(config.pandoc_path),
            template: template.or(config.template),
            assets_dir,
            session: SessionSettings {
                compile_on_save: config.compile_on_save,
                show_navigation_code_lenses: config.show_navigation_code_lenses,
            },
        }
    }

    fn controller(&self) -> Controller<PandocConverter> {
        Controller::new(
            Session::new(self.session),
            PandocConverter::new(&self.pandoc_path),
            ControllerOptions {
                assets_dir: self.assets_dir.clone(),
                template: self.template.clone(),
            },
        )
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_path(path)?
            .ok_or_else(|| anyhow!("Config file not found: {}", path.display())),
        None => {
            log::debug!("Config path: {}", Config::config_path().display());
            Ok(Config::load_or_default()?)
        }
    }
}

/// Surface for one-shot renders: keeps the last page shown.
#[derive(Default)]
struct CaptureSurface {
    page: Option<String>,
}

impl PreviewSurface for CaptureSurface {
    fn open(&mut self, title: &str) {
        log::debug!("{title}");
    }

    fn set_title(&mut self, _title: &str) {}

    fn reveal(&mut self) {}

    fn show_html(&mut self, html: String) {
        self.page = Some(html);
    }

    fn post_command(&mut self, _command: RendererCommand) {}

    fn resource_uri(&self, path: &Path) -> String {
        file_uri(path)
    }
}

/// Editor stand-in for one-shot renders: collects errors.
#[derive(Default)]
struct ConsoleEditor {
    errors: Vec<String>,
}

impl EditorHost for ConsoleEditor {
    fn reveal_range(&mut self, _document: &DocumentId, _range: SourceRange) {}

    fn set_code_lenses(&mut self, _document: &DocumentId, _records: &[PositionRecord]) {}

    fn clear_code_lenses(&mut self) {}

    fn show_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }

    fn show_info(&mut self, message: &str) {
        log::info!("{message}");
    }
}

async fn render_once(settings: &Settings, file: &Path) -> Result<String> {
    io::validate_document(file)?;
    let document = DocumentId::new(std::path::absolute(file)?);

    let mut controller = settings.controller();
    let mut surface = CaptureSurface::default();
    let mut editor = ConsoleEditor::default();
    controller.dispatch(
        Event::PreviewRequested {
            active: Some(document),
            reveal: false,
        },
        &mut surface,
        &mut editor,
    );
    controller.run_until_idle(&mut surface, &mut editor).await;

    if let Some(error) = editor.errors.into_iter().next() {
        bail!(error);
    }
    surface
        .page
        .ok_or_else(|| anyhow!("Nothing was rendered for {}", file.display()))
}

async fn export(settings: &Settings, file: &Path, output: Option<PathBuf>) -> Result<PathBuf> {
    io::validate_document(file)?;
    let document = DocumentId::new(std::path::absolute(file)?);
    let output = output.unwrap_or_else(|| document.export_path());

    let converter = PandocConverter::new(&settings.pandoc_path);
    let job = ConversionJob {
        input: document.path().to_path_buf(),
        output: OutputTarget::File(output.clone()),
        template: settings.template.clone(),
        preview: None,
    };
    converter
        .convert(&job)
        .await
        .context("Failed to export slides")?;
    Ok(output)
}

/// One `sourcepos -> h,v` line per annotated slide.
fn format_positions(html: &str) -> String {
    let (renderer, _) = Renderer::initialize(html);
    renderer
        .scan()
        .records
        .iter()
        .map(|record| format!("{} -> {}\n", record.sourcepos, record.coordinate))
        .collect()
}

async fn serve(settings: &Settings) -> Result<()> {
    let (actions_tx, mut actions_rx) = mpsc::unbounded_channel();
    let mut surface = HostSurface::new(actions_tx.clone());
    let mut editor = HostEditor::new(actions_tx);
    let mut controller = settings.controller();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    log::info!("Serving editor host on stdin/stdout");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from host")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match HostEvent::parse(&line).and_then(HostEvent::into_event) {
                    Ok(event) => controller.dispatch(event, &mut surface, &mut editor),
                    Err(e) => log::warn!("Ignoring malformed host event: {e}"),
                }
            }
            Some(event) = controller.next_completion() => {
                controller.dispatch(event, &mut surface, &mut editor);
            }
        }

        while let Ok(action) = actions_rx.try_recv() {
            write_action(&mut stdout, &action).await?;
        }
    }

    log::info!("Host closed input, shutting down");
    Ok(())
}

async fn write_action(stdout: &mut tokio::io::Stdout, action: &HostAction) -> Result<()> {
    stdout.write_all(action.to_line()?.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let settings = Settings::resolve(config, cli.pandoc, cli.template);

    match cli.command {
        Commands::Render { file } => {
            let html = render_once(&settings, &file).await?;
            print!("{html}");
        }
        Commands::Export { file, output } => {
            let output = export(&settings, &file, output).await?;
            log::info!("Exported {} to {}", file.display(), output.display());
        }
        Commands::Positions { file } => {
            let html = render_once(&settings, &file).await?;
            print!("{}", format_positions(&html));
        }
        Commands::Serve => serve(&settings).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            pandoc_path: PathBuf::from("/opt/pandoc/bin/pandoc"),
            compile_on_save: false,
            template: Some(PathBuf::from("/config/default.revealjs")),
            assets_dir: Some(PathBuf::from("/cache/slides")),
            ..Config::default()
        };

        let settings = Settings::resolve(
            config,
            Some(PathBuf::from("pandoc-3")),
            Some(PathBuf::from("talk.revealjs")),
        );

        assert_eq!(settings.pandoc_path, PathBuf::from("pandoc-3"));
        assert_eq!(settings.template, Some(PathBuf::from("talk.revealjs")));
        assert_eq!(settings.assets_dir, PathBuf::from("/cache/slides"));
        assert!(!settings.session.compile_on_save);
        assert!(settings.session.show_navigation_code_lenses);
    }

    #[test]
    fn test_config_used_without_flags() {
        let settings = Settings::resolve(Config::default(), None, None);

        assert_eq!(settings.pandoc_path, PathBuf::from("pandoc"));
        assert_eq!(settings.template, None);
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("missing.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_format_positions() {
        let html = r#"<div class="slides">
<section data-pos="deck.md@1:1-3:1"><h1>Intro</h1></section>
<section>
  <section data-pos="deck.md@4:1-6:1">Detail</section>
  <section data-pos="deck.md@7:1-9:1">More</section>
</section>
</div>"#;

        assert_eq!(
            format_positions(html),
            "deck.md@1:1-3:1 -> 0,0\ndeck.md@4:1-6:1 -> 1,0\ndeck.md@7:1-9:1 -> 1,1\n"
        );
    }

    #[test]
    fn test_cli_parses_export_output() {
        let cli = Cli::try_parse_from([
            "pandoc-slides",
            "--pandoc",
            "pandoc-3",
            "export",
            "deck.md",
            "-o",
            "out/deck.html",
        ])
        .unwrap();

        assert_eq!(cli.pandoc, Some(PathBuf::from("pandoc-3")));
        match cli.command {
            Commands::Export { file, output } => {
                assert_eq!(file, PathBuf::from("deck.md"));
                assert_eq!(output, Some(PathBuf::from("out/deck.html")));
            }
            _ => panic!("expected export"),
        }
    }

    #[tokio::test]
    async fn test_render_rejects_non_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "text").unwrap();
        let settings = Settings::resolve(Config::default(), None, None);

        assert!(render_once(&settings, &notes).await.is_err());
    }
}
