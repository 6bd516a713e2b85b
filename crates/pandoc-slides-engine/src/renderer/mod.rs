//! The renderer endpoint.
//!
//! Inside the preview the renderer is reveal.js plus the bundled bootstrap
//! plugin ([`BOOTSTRAP_SCRIPT`]). The same steps are implemented here over
//! rendered markup, for tests and for the command line.

pub mod deck;
pub mod markup;

pub use deck::{Deck, Navigation, Renderer};
pub use markup::{BootstrapHints, DeckScan, Rewrite};

/// Bootstrap plugin loaded into every interactive render
pub const BOOTSTRAP_SCRIPT: &str = include_str!("../../assets/pandoc-slides.js");

/// File name the bootstrap plugin is materialized under
pub const BOOTSTRAP_FILE_NAME: &str = "pandoc-slides.js";

/// Global name of the plugin object registered with `Reveal.initialize`
pub const PLUGIN_IDENTIFIER: &str = "PandocSlides";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_defines_registered_plugin() {
        assert!(BOOTSTRAP_SCRIPT.contains(&format!("const {PLUGIN_IDENTIFIER} = {{")));
        assert!(BOOTSTRAP_SCRIPT.contains("\"sourcepos\""));
        assert!(BOOTSTRAP_SCRIPT.contains("\"slidechanged\""));
    }
}
