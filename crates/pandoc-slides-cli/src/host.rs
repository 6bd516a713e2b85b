//! JSON-lines bridge between an editor host and the controller.
//!
//! The host writes one [`HostEvent`] per line on stdin and reads one
//! [`HostAction`] per line from stdout:
//!
//! ```json
//! {"event": "preview", "document": "/talks/deck.md"}
//! {"event": "renderer", "message": {"type": "slidechanged", "indexh": 2, "indexv": 1}}
//! {"action": "post-message", "message": {"method": "slide", "args": [2, 1]}}
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::mpsc;

use pandoc_slides_engine::protocol::{RendererCommand, RendererMessage, SourcePosition, SourceRange};
use pandoc_slides_engine::session::{ContentChange, Event, PositionRecord};
use pandoc_slides_engine::{DocumentId, EditorHost, PreviewSurface};

fn default_reveal() -> bool {
    true
}

/// Input from the editor host.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    Preview {
        document: Option<DocumentId>,
        #[serde(default = "default_reveal")]
        reveal: bool,
    },
    Export {
        document: Option<DocumentId>,
    },
    /// A message posted by the renderer inside the host's panel.
    Renderer {
        message: serde_json::Value,
    },
    Changed {
        document: DocumentId,
        changes: Vec<ContentChange>,
    },
    Saved {
        document: DocumentId,
    },
    JumpToSlide {
        record: PositionRecord,
    },
    /// Jump to the slide under a cursor (0-based line and column).
    JumpToCursor {
        document: DocumentId,
        line: u32,
        column: u32,
    },
    Disposed,
}

impl HostEvent {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    pub fn into_event(self) -> Result<Event, serde_json::Error> {
        Ok(match self {
            HostEvent::Preview { document, reveal } => Event::PreviewRequested {
                active: document,
                reveal,
            },
            HostEvent::Export { document } => Event::ExportRequested { active: document },
            HostEvent::Renderer { message } => {
                Event::Renderer(RendererMessage::from_value(message)?)
            }
            HostEvent::Changed { document, changes } => Event::DocumentChanged { document, changes },
            HostEvent::Saved { document } => Event::DocumentSaved { document },
            HostEvent::JumpToSlide { record } => Event::JumpToSlide(record),
            HostEvent::JumpToCursor {
                document,
                line,
                column,
            } => Event::JumpToPosition {
                document,
                position: SourcePosition::new(line, column),
            },
            HostEvent::Disposed => Event::SurfaceDisposed,
        })
    }
}

/// Output for the editor host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum HostAction {
    OpenPanel {
        title: String,
    },
    SetTitle {
        title: String,
    },
    RevealPanel,
    ShowHtml {
        html: String,
    },
    /// Forward to the renderer inside the panel.
    PostMessage {
        message: RendererCommand,
    },
    RevealRange {
        document: DocumentId,
        range: SourceRange,
    },
    SetCodeLenses {
        document: DocumentId,
        lenses: Vec<PositionRecord>,
    },
    ClearCodeLenses,
    ShowError {
        message: String,
    },
    ShowInfo {
        message: String,
    },
}

impl HostAction {
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// `file:` URL for a local path. Directories end in `/`.
pub fn file_uri(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let url = if absolute.is_dir() {
        url::Url::from_directory_path(&absolute)
    } else {
        url::Url::from_file_path(&absolute)
    };
    match url {
        Ok(url) => url.to_string(),
        Err(()) => {
            log::warn!("Cannot express {} as a file URL", absolute.display());
            absolute.to_string_lossy().into_owned()
        }
    }
}

fn send(actions: &mpsc::UnboundedSender<HostAction>, action: HostAction) {
    if actions.send(action).is_err() {
        log::debug!("Host output closed; dropping action");
    }
}

/// The host's preview panel, reached through [`HostAction`]s.
pub struct HostSurface {
    actions: mpsc::UnboundedSender<HostAction>,
}

impl HostSurface {
    pub fn new(actions: mpsc::UnboundedSender<HostAction>) -> Self {
        Self { actions }
    }
}

impl PreviewSurface for HostSurface {
    fn open(&mut self, title: &str) {
        send(
            &self.actions,
            HostAction::OpenPanel {
                title: title.to_string(),
            },
        );
    }

    fn set_title(&mut self, title: &str) {
        send(
            &self.actions,
            HostAction::SetTitle {
                title: title.to_string(),
            },
        );
    }

    fn reveal(&mut self) {
        send(&self.actions, HostAction::RevealPanel);
    }

    fn show_html(&mut self, html: String) {
        send(&self.actions, HostAction::ShowHtml { html });
    }

    fn post_command(&mut self, command: RendererCommand) {
        send(&self.actions, HostAction::PostMessage { message: command });
    }

    fn resource_uri(&self, path: &Path) -> String {
        file_uri(path)
    }
}

/// The host's editor, reached through [`HostAction`]s.
pub struct HostEditor {
    actions: mpsc::UnboundedSender<HostAction>,
}

impl HostEditor {
    pub fn new(actions: mpsc::UnboundedSender<HostAction>) -> Self {
        Self { actions }
    }
}

impl EditorHost for HostEditor {
    fn reveal_range(&mut self, document: &DocumentId, range: SourceRange) {
        send(
            &self.actions,
            HostAction::RevealRange {
                document: document.clone(),
                range,
            },
        );
    }

    fn set_code_lenses(&mut self, document: &DocumentId, records: &[PositionRecord]) {
        send(
            &self.actions,
            HostAction::SetCodeLenses {
                document: document.clone(),
                lenses: records.to_vec(),
            },
        );
    }

    fn clear_code_lenses(&mut self) {
        send(&self.actions, HostAction::ClearCodeLenses);
    }

    fn show_error(&mut self, message: &str) {
        send(
            &self.actions,
            HostAction::ShowError {
                message: message.to_string(),
            },
        );
    }

    fn show_info(&mut self, message: &str) {
        send(
            &self.actions,
            HostAction::ShowInfo {
                message: message.to_string(),
            },
        );
    }
}
