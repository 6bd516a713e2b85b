pub mod controller;
pub mod convert;
pub mod io;
pub mod models;
pub mod protocol;
pub mod renderer;
pub mod session;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use controller::{Controller, ControllerOptions, EditorHost, PreviewSurface};
pub use convert::{ConversionJob, ConvertError, Converter, OutputTarget, PandocConverter};
pub use models::DocumentId;
pub use protocol::{
    RendererCommand, RendererMessage, SlideCoordinate, SourcePosition, SourceRange,
    SourceposRecord,
};
pub use renderer::{Deck, Renderer};
pub use session::{
    ContentChange, Effect, Event, LookupTable, PositionRecord, Session, SessionSettings,
    SessionState,
};
