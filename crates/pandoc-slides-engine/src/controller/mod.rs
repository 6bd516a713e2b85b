//! Drives a [`Session`] against a live editor and render surface.
//!
//! The controller feeds events into the session and carries out the
//! resulting effects. Conversions run on spawned tasks; their completions
//! come back through [`Controller::next_completion`] and must be dispatched
//! like any other event. Starting a render aborts the one still in flight,
//! which also kills its converter process.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::convert::{ConversionJob, Converter, OutputTarget, PreviewHeaders, error_page};
use crate::io;
use crate::models::DocumentId;
use crate::protocol::{RendererCommand, SourceRange};
use crate::renderer::BOOTSTRAP_FILE_NAME;
use crate::session::{Effect, Event, ExportRequest, PositionRecord, RenderRequest, Session};

/// The panel showing the rendered deck.
pub trait PreviewSurface {
    fn open(&mut self, title: &str);
    fn set_title(&mut self, title: &str);
    fn reveal(&mut self);
    fn show_html(&mut self, html: String);
    fn post_command(&mut self, command: RendererCommand);
    /// URI under which the surface can load a local file or directory.
    fn resource_uri(&self, path: &Path) -> String;
    /// Icon shown on the conversion error page, if the surface has one.
    fn error_icon_uri(&self) -> Option<String> {
        None
    }
}

/// The editor hosting the source documents.
pub trait EditorHost {
    fn reveal_range(&mut self, document: &DocumentId, range: SourceRange);
    fn set_code_lenses(&mut self, document: &DocumentId, records: &[PositionRecord]);
    fn clear_code_lenses(&mut self);
    fn show_error(&mut self, message: &str);
    fn show_info(&mut self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Directory the bootstrap plugin is written to
    pub assets_dir: PathBuf,
    /// Template for documents whose front matter names none
    pub template: Option<PathBuf>,
}

pub struct Controller<C> {
    session: Session,
    converter: Arc<C>,
    options: ControllerOptions,
    assets_ready: bool,
    render_task: Option<JoinHandle<()>>,
    export_tasks: Vec<JoinHandle<()>>,
    completions_tx: mpsc::UnboundedSender<Event>,
    completions_rx: mpsc::UnboundedReceiver<Event>,
}

impl<C> Controller<C>
where
    C: Converter + Send + Sync + 'static,
{
    pub fn new(session: Session, converter: C, options: ControllerOptions) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            session,
            converter: Arc::new(converter),
            options,
            assets_ready: false,
            render_task: None,
            export_tasks: Vec::new(),
            completions_tx,
            completions_rx,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// Apply one event and carry out its effects.
    pub fn dispatch<S, E>(&mut self, event: Event, surface: &mut S, editor: &mut E)
    where
        S: PreviewSurface,
        E: EditorHost,
    {
        self.export_tasks.retain(|task| !task.is_finished());
        for effect in self.session.apply(event) {
            self.execute(effect, surface, editor);
        }
    }

    /// Wait for the next finished conversion.
    pub async fn next_completion(&mut self) -> Option<Event> {
        self.completions_rx.recv().await
    }

    /// Dispatch completions until no conversion is running.
    pub async fn run_until_idle<S, E>(&mut self, surface: &mut S, editor: &mut E)
    where
        S: PreviewSurface,
        E: EditorHost,
    {
        loop {
            if let Some(task) = self.render_task.take() {
                let _ = task.await;
            }
            for task in std::mem::take(&mut self.export_tasks) {
                let _ = task.await;
            }

            let mut dispatched = false;
            while let Ok(event) = self.completions_rx.try_recv() {
                self.dispatch(event, surface, editor);
                dispatched = true;
            }
            if !dispatched && self.render_task.is_none() && self.export_tasks.is_empty() {
                break;
            }
        }
    }

    fn execute<S, E>(&mut self, effect: Effect, surface: &mut S, editor: &mut E)
    where
        S: PreviewSurface,
        E: EditorHost,
    {
        match effect {
            Effect::OpenSurface { title } => surface.open(&title),
            Effect::RetitleSurface { title } => surface.set_title(&title),
            Effect::RevealSurface => surface.reveal(),
            Effect::Render(request) => self.start_render(request, surface),
            Effect::Export(request) => self.start_export(request),
            Effect::ShowHtml(html) => surface.show_html(html),
            Effect::ShowConversionError { diagnostic } => {
                let icon = surface.error_icon_uri();
                surface.show_html(error_page(&diagnostic, icon.as_deref()));
            }
            Effect::PostCommand(command) => surface.post_command(command),
            Effect::RevealRange { document, range } => editor.reveal_range(&document, range),
            Effect::UpdateCodeLenses { document, records } => {
                editor.set_code_lenses(&document, &records)
            }
            Effect::ClearCodeLenses => editor.clear_code_lenses(),
            Effect::ShowError(message) => editor.show_error(&message),
            Effect::ShowInfo(message) => editor.show_info(&message),
        }
    }

    fn ensure_assets(&mut self) {
        if self.assets_ready {
            return;
        }
        match io::materialize_bootstrap(&self.options.assets_dir) {
            Ok(path) => {
                log::debug!("Bootstrap plugin at {}", path.display());
                self.assets_ready = true;
            }
            Err(e) => log::warn!("Failed to write bootstrap plugin: {e}"),
        }
    }

    fn preview_job<S: PreviewSurface>(&self, request: &RenderRequest, surface: &S) -> ConversionJob {
        let mut base_uri = surface.resource_uri(request.document.parent_dir());
        if !base_uri.ends_with('/') {
            base_uri.push('/');
        }
        let bootstrap_uri = surface.resource_uri(&self.options.assets_dir.join(BOOTSTRAP_FILE_NAME));

        ConversionJob {
            input: request.document.path().to_path_buf(),
            output: OutputTarget::Capture,
            template: self.options.template.clone(),
            preview: Some(PreviewHeaders {
                base_uri,
                reload_id: request.reload_id,
                target: request.target,
                bootstrap_uri,
            }),
        }
    }

    fn start_render<S: PreviewSurface>(&mut self, request: RenderRequest, surface: &S) {
        self.ensure_assets();
        let job = self.preview_job(&request, surface);

        if let Some(previous) = self.render_task.take()
            && !previous.is_finished()
        {
            log::debug!("Aborting in-flight render");
            previous.abort();
        }

        let converter = Arc::clone(&self.converter);
        let completions = self.completions_tx.clone();
        let generation = request.generation;
        self.render_task = Some(tokio::spawn(async move {
            let result = converter
                .convert(&job)
                .await
                .map_err(|e| e.to_string());
            let _ = completions.send(Event::RenderFinished { generation, result });
        }));
    }

    fn start_export(&mut self, request: ExportRequest) {
        let ExportRequest { document, output } = request;
        let job = ConversionJob {
            input: document.path().to_path_buf(),
            output: OutputTarget::File(output.clone()),
            template: self.options.template.clone(),
            preview: None,
        };

        let converter = Arc::clone(&self.converter);
        let completions = self.completions_tx.clone();
        self.export_tasks.push(tokio::spawn(async move {
            log::info!("Exporting {} to {}", document.path().display(), output.display());
            let result = converter
                .convert(&job)
                .await
                .map(|_| output)
                .map_err(|e| e.to_string());
            let _ = completions.send(Event::ExportFinished { document, result });
        }));
    }
}

impl<C> Drop for Controller<C> {
    fn drop(&mut self) {
        if let Some(task) = self.render_task.take() {
            task.abort();
        }
    }
}
