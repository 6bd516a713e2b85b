//! Pandoc defaults file for one conversion.
//!
//! See <https://pandoc.org/MANUAL.html#defaults-files>. The document's
//! front-matter `pandoc` mapping is the starting point; keys it leaves out
//! are filled in here.

use serde_json::{Map, Value, json};
use std::path::PathBuf;
use uuid::Uuid;

use crate::protocol::SlideCoordinate;
use crate::renderer::PLUGIN_IDENTIFIER;
use crate::renderer::markup::{META_BASE_URI, META_RELOAD_ID, META_SLIDE_INDICES, meta_tag};

pub const DEFAULT_FROM: &str = "commonmark_x+sourcepos";
pub const DEFAULT_TO: &str = "revealjs";
/// Variable holding the bootstrap script URL, for templates that load it themselves
pub const PLUGIN_URL_VARIABLE: &str = "pandoc-slides-plugin-url";

/// Where the converter writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Capture standard output
    Capture,
    File(PathBuf),
}

/// Values only an interactive preview needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewHeaders {
    /// URI of the document's directory as the surface sees it, ending in `/`
    pub base_uri: String,
    pub reload_id: Uuid,
    pub target: SlideCoordinate,
    /// URI of the bootstrap plugin as the surface sees it
    pub bootstrap_uri: String,
}

impl PreviewHeaders {
    /// `header-includes` entries injected into the rendered `<head>`.
    pub fn header_includes(&self) -> Vec<String> {
        vec![
            meta_tag(META_BASE_URI, &self.base_uri),
            meta_tag(META_RELOAD_ID, &self.reload_id.to_string()),
            meta_tag(META_SLIDE_INDICES, &self.target.to_string()),
            format!(
                r#"<script src="{}"></script>"#,
                html_escape::encode_double_quoted_attribute(&self.bootstrap_uri)
            ),
        ]
    }
}

/// Everything needed to run one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: OutputTarget,
    /// Template used when the front matter names none
    pub template: Option<PathBuf>,
    /// Present for previews, absent for exports
    pub preview: Option<PreviewHeaders>,
}

impl ConversionJob {
    pub fn is_interactive(&self) -> bool {
        self.preview.is_some()
    }

    /// Identifier the bootstrap plugin registers under, for interactive jobs.
    pub fn plugin_identifier(&self) -> Option<&'static str> {
        self.preview.as_ref().map(|_| PLUGIN_IDENTIFIER)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Set `key` to `value` unless the map already has it; returns the value now stored.
fn set_if_absent<'a>(map: &'a mut Map<String, Value>, key: &str, value: Value) -> &'a mut Value {
    map.entry(key).or_insert(value)
}

/// Merge front-matter options with the job into a defaults file.
pub fn build_defaults(mut options: Map<String, Value>, job: &ConversionJob) -> Map<String, Value> {
    options.insert(
        "input-file".to_string(),
        Value::String(job.input.to_string_lossy().into_owned()),
    );
    let output = match &job.output {
        OutputTarget::Capture => "-".to_string(),
        OutputTarget::File(path) => path.to_string_lossy().into_owned(),
    };
    options.insert("output-file".to_string(), Value::String(output));

    set_if_absent(&mut options, "to", json!(DEFAULT_TO));
    set_if_absent(&mut options, "from", json!(DEFAULT_FROM));
    if let Some(template) = &job.template {
        set_if_absent(
            &mut options,
            "template",
            Value::String(template.to_string_lossy().into_owned()),
        );
    }

    let mut variables = match options.remove("variables") {
        Some(Value::Object(variables)) => variables,
        Some(other) => {
            log::warn!("Ignoring non-mapping `variables` in front matter: {other}");
            Map::new()
        }
        None => Map::new(),
    };

    // highlight.js does the highlighting by default, so pandoc's own
    // highlighter is switched off unless configured.
    if is_truthy(set_if_absent(&mut variables, "highlightjs", json!(true))) {
        set_if_absent(&mut options, "highlight-style", Value::Null);
    }

    if let Some(preview) = &job.preview {
        let includes = variables
            .entry("header-includes")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !includes.is_array() {
            *includes = Value::Array(vec![includes.take()]);
        }
        if let Value::Array(includes) = includes {
            includes.extend(preview.header_includes().into_iter().map(Value::String));
        }
        variables.insert(
            PLUGIN_URL_VARIABLE.to_string(),
            Value::String(preview.bootstrap_uri.clone()),
        );
    }

    options.insert("variables".to_string(), Value::Object(variables));
    options
}
