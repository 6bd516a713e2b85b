//! Messages exchanged between the controller and the slide renderer.
//!
//! The two endpoints share nothing but an asynchronous channel carrying JSON
//! values. Messages from one endpoint arrive in the order they were sent;
//! there is no ordering between the two directions and no replies.
//!
//! Renderer → controller messages are tagged by `type`:
//!
//! ```json
//! {"type": "slidechanged", "indexh": 2, "indexv": 1}
//! {"type": "sourcepos", "records": [{"sourcepos": "deck.md@3:1-3:9", "indexh": 1, "indexv": 0}]}
//! {"type": "sourcepos-navigate", "value": "deck.md@3:1-3:9"}
//! ```
//!
//! Controller → renderer commands name a method of the deck API:
//!
//! ```json
//! {"method": "slide", "args": [2, 1]}
//! ```

pub mod sourcepos;

pub use sourcepos::{SourcePosition, SourceRange, SourceposError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a slide in a two-dimensional deck.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SlideCoordinate {
    #[serde(rename = "indexh")]
    pub horizontal: u32,
    #[serde(rename = "indexv")]
    pub vertical: u32,
}

impl SlideCoordinate {
    pub fn new(horizontal: u32, vertical: u32) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Parse the `h,v` form used by the `slide-indices` meta tag.
    pub fn parse_indices(value: &str) -> Option<Self> {
        let (horizontal, vertical) = value.split_once(',')?;
        Some(Self::new(
            horizontal.trim().parse().ok()?,
            vertical.trim().parse().ok()?,
        ))
    }
}

impl fmt::Display for SlideCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.horizontal, self.vertical)
    }
}

/// One annotated slide as reported by the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceposRecord {
    /// Raw annotation, e.g. `deck.md@3:1-5:1`
    pub sourcepos: String,
    #[serde(flatten)]
    pub coordinate: SlideCoordinate,
}

impl SourceposRecord {
    pub fn new(sourcepos: impl Into<String>, coordinate: SlideCoordinate) -> Self {
        Self {
            sourcepos: sourcepos.into(),
            coordinate,
        }
    }
}

/// Notifications sent by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RendererMessage {
    /// The visible slide changed.
    #[serde(rename = "slidechanged")]
    SlideChanged {
        #[serde(flatten)]
        coordinate: SlideCoordinate,
    },
    /// Every annotated slide of the current deck, sent once per load.
    #[serde(rename = "sourcepos")]
    Sourcepos {
        records: Vec<SourceposRecord>,
        /// Reload identifier of the render that produced the deck
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reload: Option<String>,
    },
    /// The user clicked an annotated element and wants to see its source.
    #[serde(rename = "sourcepos-navigate")]
    SourceposNavigate { value: String },
    /// Anything this controller does not understand.
    #[serde(other)]
    Unknown,
}

impl RendererMessage {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// Imperative navigation commands sent to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireCommand", try_from = "WireCommand")]
pub enum RendererCommand {
    /// Navigate with the deck's configured transition.
    Slide(SlideCoordinate),
    /// Navigate with transitions suppressed, then restore them.
    Restore(SlideCoordinate),
}

impl RendererCommand {
    pub fn coordinate(&self) -> SlideCoordinate {
        match self {
            RendererCommand::Slide(coordinate) | RendererCommand::Restore(coordinate) => {
                *coordinate
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireCommand {
    method: String,
    args: Vec<u32>,
}

impl From<RendererCommand> for WireCommand {
    fn from(command: RendererCommand) -> Self {
        let (method, coordinate) = match command {
            RendererCommand::Slide(coordinate) => ("slide", coordinate),
            RendererCommand::Restore(coordinate) => ("restore", coordinate),
        };
        WireCommand {
            method: method.to_string(),
            args: vec![coordinate.horizontal, coordinate.vertical],
        }
    }
}

impl TryFrom<WireCommand> for RendererCommand {
    type Error = String;

    fn try_from(wire: WireCommand) -> Result<Self, Self::Error> {
        let coordinate = match wire.args.as_slice() {
            [horizontal] => SlideCoordinate::new(*horizontal, 0),
            [horizontal, vertical, ..] => SlideCoordinate::new(*horizontal, *vertical),
            [] => return Err(format!("command {:?} has no arguments", wire.method)),
        };
        match wire.method.as_str() {
            "slide" => Ok(RendererCommand::Slide(coordinate)),
            "restore" => Ok(RendererCommand::Restore(coordinate)),
            other => Err(format!("unsupported renderer method {other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_slidechanged_from_renderer() {
        let message =
            RendererMessage::from_json(r#"{"type":"slidechanged","indexh":2,"indexv":1}"#)
                .unwrap();

        assert_eq!(
            message,
            RendererMessage::SlideChanged {
                coordinate: SlideCoordinate::new(2, 1)
            }
        );
    }

    #[test]
    fn test_sourcepos_batch_from_renderer() {
        let message = RendererMessage::from_value(json!({
            "type": "sourcepos",
            "records": [
                {"sourcepos": "deck.md@1:1-3:1", "indexh": 0, "indexv": 0},
                {"sourcepos": "deck.md@4:1-9:1", "indexh": 1, "indexv": 2},
            ],
        }))
        .unwrap();

        assert_eq!(
            message,
            RendererMessage::Sourcepos {
                records: vec![
                    SourceposRecord::new("deck.md@1:1-3:1", SlideCoordinate::new(0, 0)),
                    SourceposRecord::new("deck.md@4:1-9:1", SlideCoordinate::new(1, 2)),
                ],
                reload: None,
            }
        );
    }

    #[test]
    fn test_unknown_message_type_is_tolerated() {
        let message = RendererMessage::from_json(r#"{"type":"ready","deck":"x"}"#).unwrap();
        assert_eq!(message, RendererMessage::Unknown);
    }

    #[test]
    fn test_slide_command_wire_shape() {
        let command = RendererCommand::Slide(SlideCoordinate::new(3, 1));
        assert_eq!(
            serde_json::to_value(command).unwrap(),
            json!({"method": "slide", "args": [3, 1]})
        );

        let restore = RendererCommand::Restore(SlideCoordinate::new(2, 0));
        assert_eq!(
            serde_json::to_value(restore).unwrap(),
            json!({"method": "restore", "args": [2, 0]})
        );
    }

    #[test]
    fn test_command_rejects_unknown_method() {
        let result: Result<RendererCommand, _> =
            serde_json::from_value(json!({"method": "shuffle", "args": [1, 2]}));
        assert!(result.is_err());

        let parsed: RendererCommand =
            serde_json::from_value(json!({"method": "slide", "args": [4]})).unwrap();
        assert_eq!(parsed, RendererCommand::Slide(SlideCoordinate::new(4, 0)));
    }

    #[test]
    fn test_parse_slide_indices() {
        assert_eq!(
            SlideCoordinate::parse_indices("2,1"),
            Some(SlideCoordinate::new(2, 1))
        );
        assert_eq!(
            SlideCoordinate::parse_indices(" 0 , 3 "),
            Some(SlideCoordinate::new(0, 3))
        );
        assert_eq!(SlideCoordinate::parse_indices("2"), None);
        assert_eq!(SlideCoordinate::parse_indices("a,b"), None);
        assert_eq!(SlideCoordinate::new(5, 2).to_string(), "5,2");
    }
}
