//! Conversion of Markdown documents into reveal.js decks.

pub mod defaults;
pub mod frontmatter;
pub mod pandoc;

pub use defaults::{ConversionJob, OutputTarget, PreviewHeaders, build_defaults};
pub use frontmatter::FrontMatterError;
pub use pandoc::PandocConverter;

use regex::Regex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("Failed to read {path}: {source}")]
    ReadInput {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    FrontMatter(#[from] FrontMatterError),
    #[error("Failed to write pandoc defaults file: {0}")]
    DefaultsFile(std::io::Error),
    #[error("Failed to serialize pandoc defaults: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },
    #[error("{stderr}")]
    Failed { status: Option<i32>, stderr: String },
    #[error("Converter produced no output")]
    EmptyOutput,
}

/// Something that turns a document into a rendered deck.
pub trait Converter {
    /// Run one conversion. Captured jobs resolve to the rendered markup;
    /// file jobs resolve once the file is written.
    fn convert(
        &self,
        job: &ConversionJob,
    ) -> impl Future<Output = Result<String, ConvertError>> + Send;
}

fn plugins_regex() -> &'static Regex {
    static PLUGINS_REGEX: OnceLock<Regex> = OnceLock::new();
    PLUGINS_REGEX.get_or_init(|| Regex::new(r"plugins\s*:\s*\[").expect("Invalid plugins regex"))
}

fn initialize_regex() -> &'static Regex {
    static INITIALIZE_REGEX: OnceLock<Regex> = OnceLock::new();
    INITIALIZE_REGEX
        .get_or_init(|| Regex::new(r"Reveal\.initialize\(\s*\{").expect("Invalid initialize regex"))
}

/// Add `plugin` to the `Reveal.initialize` plugin list of a rendered deck.
///
/// pandoc's revealjs template has no hook for extra plugins, so the
/// identifier is spliced into the generated script. Documents without an
/// initialize call are returned unchanged.
pub fn register_plugin(html: &str, plugin: &str) -> String {
    let Some(initialize) = initialize_regex().find(html) else {
        log::warn!("No Reveal.initialize call found; {plugin} not registered");
        return html.to_string();
    };

    let config = &html[initialize.end()..];
    if let Some(plugins) = plugins_regex().find(config) {
        let list = &config[plugins.end()..];
        let list_end = list.find(']').unwrap_or(list.len());
        if list[..list_end].contains(plugin) {
            return html.to_string();
        }
        let at = initialize.end() + plugins.end();
        return format!("{}{plugin}, {}", &html[..at], &html[at..]);
    }

    let at = initialize.end();
    format!("{}plugins: [{plugin}], {}", &html[..at], &html[at..])
}

/// Page shown in place of the deck when conversion fails.
pub fn error_page(diagnostic: &str, icon_uri: Option<&str>) -> String {
    let icon = icon_uri
        .map(|uri| {
            format!(
                r#"<img src="{}" alt=""> "#,
                html_escape::encode_double_quoted_attribute(uri)
            )
        })
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html>\n<html>\n<body>\n<h1>{icon}Failed to compile slides.</h1>\n<pre style=\"white-space: pre-wrap;\">{}</pre>\n</body>\n</html>\n",
        html_escape::encode_text(diagnostic)
    )
}
