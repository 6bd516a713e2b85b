//! Controller-side state for one preview panel.
//!
//! A [`Session`] pairs one source document with one render surface and keeps
//! what the controller knows about the renderer: the last slide the user was
//! on and the table mapping source ranges to slides. It never talks to the
//! editor, the renderer, or the converter itself. Every input is an [`Event`]
//! and every reaction is a list of [`Effect`]s for the caller to carry out, so
//! the whole protocol can be exercised without a live editor or webview.
//!
//! ## States
//!
//! - **Unpaired**: no document is paired and no surface exists.
//! - **Idle**: a document is paired and the lookup table matches it.
//! - **Stale**: an edit moved lines since the last render; the table is
//!   cleared until the next `sourcepos` batch arrives.
//!
//! ## Overlapping renders
//!
//! Every render request gets a new generation number. Only the completion
//! carrying the latest generation is shown; older ones are dropped.

pub mod edits;
pub mod lookup;

pub use edits::ContentChange;
pub use lookup::{LookupTable, PositionRecord};

use std::path::PathBuf;
use uuid::Uuid;

use crate::models::DocumentId;
use crate::protocol::{
    RendererCommand, RendererMessage, SlideCoordinate, SourcePosition, SourceRange,
};

/// Observable state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unpaired,
    Idle,
    Stale,
}

/// Behaviour switches taken from user configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub compile_on_save: bool,
    pub show_navigation_code_lenses: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            compile_on_save: true,
            show_navigation_code_lenses: true,
        }
    }
}

/// An interactive render of the paired document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub generation: u64,
    pub document: DocumentId,
    /// Slide the renderer should restore once the deck loads
    pub target: SlideCoordinate,
    /// Embedded in the output so every render reloads the surface
    pub reload_id: Uuid,
}

/// A render of a document to a file, outside the preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub document: DocumentId,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The user asked to preview the active document (`None` if no editor is active).
    PreviewRequested {
        active: Option<DocumentId>,
        reveal: bool,
    },
    /// The user asked to export the active document.
    ExportRequested { active: Option<DocumentId> },
    /// The converter finished an interactive render. `Err` carries the
    /// converter's diagnostic text.
    RenderFinished {
        generation: u64,
        result: Result<String, String>,
    },
    /// The converter finished an export.
    ExportFinished {
        document: DocumentId,
        result: Result<PathBuf, String>,
    },
    /// A message arrived from the renderer.
    Renderer(RendererMessage),
    /// A document was edited.
    DocumentChanged {
        document: DocumentId,
        changes: Vec<ContentChange>,
    },
    /// A document was saved.
    DocumentSaved { document: DocumentId },
    /// Navigate the deck to a record, e.g. from a code lens.
    JumpToSlide(PositionRecord),
    /// Navigate the deck to the slide generated from a source position.
    JumpToPosition {
        document: DocumentId,
        position: SourcePosition,
    },
    /// The user closed the render surface.
    SurfaceDisposed,
}

/// Side effects requested by the session.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    OpenSurface {
        title: String,
    },
    RetitleSurface {
        title: String,
    },
    RevealSurface,
    Render(RenderRequest),
    Export(ExportRequest),
    /// Replace the surface contents with a rendered deck.
    ShowHtml(String),
    /// Replace the surface contents with an error page for this diagnostic.
    ShowConversionError {
        diagnostic: String,
    },
    PostCommand(RendererCommand),
    /// Select a range in the editor and scroll it into view.
    RevealRange {
        document: DocumentId,
        range: SourceRange,
    },
    UpdateCodeLenses {
        document: DocumentId,
        records: Vec<PositionRecord>,
    },
    ClearCodeLenses,
    ShowError(String),
    ShowInfo(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRender {
    generation: u64,
    reload_id: Uuid,
    reveal: bool,
}

/// Pairing between one source document and one render surface.
#[derive(Debug, Default)]
pub struct Session {
    settings: SessionSettings,
    paired: Option<DocumentId>,
    last_slide: SlideCoordinate,
    lookup: LookupTable,
    stale: bool,
    generation: u64,
    pending: Option<PendingRender>,
    /// Reload id of the deck currently on the surface
    shown_reload: Option<Uuid>,
    /// The deck on the surface no longer matches the paired document; only a
    /// batch from a render finished since then may fill the table
    awaiting_deck: bool,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.paired, self.stale) {
            (None, _) => SessionState::Unpaired,
            (Some(_), false) => SessionState::Idle,
            (Some(_), true) => SessionState::Stale,
        }
    }

    pub fn paired_document(&self) -> Option<&DocumentId> {
        self.paired.as_ref()
    }

    pub fn last_slide(&self) -> SlideCoordinate {
        self.last_slide
    }

    pub fn lookup(&self) -> &LookupTable {
        &self.lookup
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// True while a render surface exists.
    pub fn has_surface(&self) -> bool {
        self.paired.is_some()
    }

    /// Generation of the most recent interactive render request.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Feed one event through the state machine.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::PreviewRequested { active, reveal } => match active {
                Some(document) => self.preview(document, reveal),
                None => {
                    log::debug!("Preview requested without an active document");
                    Vec::new()
                }
            },
            Event::ExportRequested { active } => match active {
                Some(document) => {
                    let output = document.export_path();
                    vec![Effect::Export(ExportRequest { document, output })]
                }
                None => Vec::new(),
            },
            Event::RenderFinished { generation, result } => {
                self.render_finished(generation, result)
            }
            Event::ExportFinished { document, result } => match result {
                Ok(output) => vec![Effect::ShowInfo(format!(
                    "Exported {} to {}",
                    document.display_name(),
                    output.display()
                ))],
                Err(diagnostic) => vec![Effect::ShowError(format!(
                    "Failed to export slides: {diagnostic}"
                ))],
            },
            Event::Renderer(message) => self.renderer_message(message),
            Event::DocumentChanged { document, changes } => {
                self.document_changed(&document, &changes)
            }
            Event::DocumentSaved { document } => {
                if self.settings.compile_on_save && self.paired.as_ref() == Some(&document) {
                    vec![self.request_render(document, false)]
                } else {
                    Vec::new()
                }
            }
            Event::JumpToSlide(record) => self.jump_to(record.coordinate),
            Event::JumpToPosition { document, position } => {
                if self.paired.as_ref() != Some(&document) {
                    return Vec::new();
                }
                match self.lookup.find(position) {
                    Some(record) => {
                        let coordinate = record.coordinate;
                        self.jump_to(coordinate)
                    }
                    None => Vec::new(),
                }
            }
            Event::SurfaceDisposed => {
                self.paired = None;
                self.pending = None;
                self.shown_reload = None;
                self.awaiting_deck = false;
                self.stale = false;
                self.lookup = LookupTable::default();
                vec![Effect::ClearCodeLenses]
            }
        }
    }

    fn preview(&mut self, document: DocumentId, reveal: bool) -> Vec<Effect> {
        let mut effects = Vec::new();
        let title = document.preview_title();

        match &self.paired {
            None => effects.push(Effect::OpenSurface { title }),
            Some(paired) if *paired != document => {
                log::info!("Pairing preview with {}", document.path().display());
                effects.push(Effect::RetitleSurface { title });
            }
            Some(_) => {}
        }

        if self.paired.as_ref() != Some(&document) {
            if self.paired.is_some() {
                self.invalidate_deck();
            }
            self.last_slide = SlideCoordinate::default();
            self.lookup = LookupTable::default();
            self.stale = false;
            effects.push(Effect::ClearCodeLenses);
            self.paired = Some(document.clone());
        }

        effects.push(self.request_render(document, reveal));
        effects
    }

    fn request_render(&mut self, document: DocumentId, reveal: bool) -> Effect {
        self.generation += 1;
        let pending = PendingRender {
            generation: self.generation,
            reload_id: Uuid::new_v4(),
            reveal,
        };
        if let Some(previous) = self.pending.replace(pending) {
            log::debug!("Render {} superseded", previous.generation);
        }
        Effect::Render(RenderRequest {
            generation: pending.generation,
            document,
            target: self.last_slide,
            reload_id: pending.reload_id,
        })
    }

    fn render_finished(&mut self, generation: u64, result: Result<String, String>) -> Vec<Effect> {
        let Some(pending) = self.pending.filter(|p| p.generation == generation) else {
            log::debug!("Discarding result of superseded render {generation}");
            return Vec::new();
        };
        self.pending = None;
        if self.paired.is_none() {
            return Vec::new();
        }

        let mut effects = match result {
            Ok(html) => {
                self.shown_reload = Some(pending.reload_id);
                vec![Effect::ShowHtml(html)]
            }
            Err(diagnostic) => {
                log::warn!("Failed to compile slides: {diagnostic}");
                vec![
                    Effect::ShowError(format!("Failed to compile slides: {diagnostic}")),
                    Effect::ShowConversionError { diagnostic },
                ]
            }
        };
        if pending.reveal {
            effects.push(Effect::RevealSurface);
        }
        effects
    }

    fn renderer_message(&mut self, message: RendererMessage) -> Vec<Effect> {
        match message {
            RendererMessage::SlideChanged { coordinate } => {
                self.last_slide = coordinate;
                Vec::new()
            }
            RendererMessage::Sourcepos { records, reload } => {
                let Some(document) = self.paired.clone() else {
                    return Vec::new();
                };
                if !self.accepts_batch(reload.as_deref()) {
                    log::debug!("Ignoring sourcepos batch from superseded deck {reload:?}");
                    return Vec::new();
                }
                self.awaiting_deck = false;

                self.lookup = LookupTable::from_batch(&records);
                self.stale = false;
                log::debug!(
                    "Lookup table rebuilt with {} of {} records",
                    self.lookup.len(),
                    records.len()
                );
                if self.settings.show_navigation_code_lenses {
                    vec![Effect::UpdateCodeLenses {
                        document,
                        records: self.lookup.records().to_vec(),
                    }]
                } else {
                    Vec::new()
                }
            }
            RendererMessage::SourceposNavigate { value } => {
                let Some(document) = self.paired.clone() else {
                    return Vec::new();
                };
                match SourceRange::parse(&value) {
                    Ok(range) => vec![Effect::RevealRange { document, range }],
                    Err(e) => {
                        log::warn!("Ignoring navigation request: {e}");
                        Vec::new()
                    }
                }
            }
            RendererMessage::Unknown => {
                log::warn!("Received unexpected message from renderer");
                Vec::new()
            }
        }
    }

    fn document_changed(&mut self, document: &DocumentId, changes: &[ContentChange]) -> Vec<Effect> {
        if self.paired.as_ref() != Some(document) {
            return Vec::new();
        }
        match changes.iter().find(|change| change.shifts_lines()) {
            Some(change) => {
                // A deck rendered before this edit is outdated even if the
                // session is already stale.
                self.invalidate_deck();
                if self.stale {
                    return Vec::new();
                }
                log::debug!("Line delta {} invalidates lookup table", change.line_delta());
                self.stale = true;
                self.lookup = LookupTable::default();
                vec![Effect::ClearCodeLenses]
            }
            None => Vec::new(),
        }
    }

    /// Forget the deck on the surface so its batches are no longer accepted.
    fn invalidate_deck(&mut self) {
        self.shown_reload = None;
        self.awaiting_deck = true;
    }

    /// Whether a `sourcepos` batch tagged with `reload` describes the deck
    /// the table should follow.
    fn accepts_batch(&self, reload: Option<&str>) -> bool {
        match (reload, &self.shown_reload) {
            (Some(reload), Some(shown)) => reload == shown.to_string(),
            (_, None) | (None, _) => !self.awaiting_deck,
        }
    }

    fn jump_to(&self, coordinate: SlideCoordinate) -> Vec<Effect> {
        if !self.has_surface() {
            return Vec::new();
        }
        vec![Effect::PostCommand(RendererCommand::Slide(coordinate))]
    }
}
