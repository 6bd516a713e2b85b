use crate::protocol::{RendererCommand, RendererMessage, SlideCoordinate};
use crate::renderer::markup::{self, BootstrapHints, DeckScan};

/// Transition used when the deck does not configure one
pub const DEFAULT_TRANSITION: &str = "slide";

/// One navigation performed by the deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub coordinate: SlideCoordinate,
    pub animated: bool,
}

/// Navigable slide positions and the current slide.
#[derive(Debug, Clone)]
pub struct Deck {
    stacks: Vec<u32>,
    current: SlideCoordinate,
    transition: String,
    history: Vec<Navigation>,
}

impl Deck {
    pub fn new(stacks: Vec<u32>) -> Self {
        Self {
            stacks,
            current: SlideCoordinate::default(),
            transition: DEFAULT_TRANSITION.to_string(),
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> SlideCoordinate {
        self.current
    }

    pub fn transition(&self) -> &str {
        &self.transition
    }

    /// Every navigation performed so far, oldest first.
    pub fn history(&self) -> &[Navigation] {
        &self.history
    }

    /// Nearest existing slide to `coordinate`.
    pub fn clamp(&self, coordinate: SlideCoordinate) -> SlideCoordinate {
        let Some(last) = self.stacks.len().checked_sub(1) else {
            return SlideCoordinate::default();
        };
        let horizontal = (coordinate.horizontal as usize).min(last);
        let vertical = coordinate
            .vertical
            .min(self.stacks[horizontal].saturating_sub(1));
        SlideCoordinate::new(horizontal as u32, vertical)
    }

    /// Navigate using the configured transition. Returns the `slidechanged`
    /// notification when the visible slide changed.
    pub fn slide(&mut self, coordinate: SlideCoordinate) -> Option<RendererMessage> {
        let animated = self.transition != "none";
        self.navigate(coordinate, animated)
    }

    /// Navigate with the transition switched off, then switch it back on.
    pub fn restore(&mut self, coordinate: SlideCoordinate) -> Option<RendererMessage> {
        let transition = std::mem::replace(&mut self.transition, "none".to_string());
        let message = self.slide(coordinate);
        self.transition = transition;
        message
    }

    fn navigate(&mut self, coordinate: SlideCoordinate, animated: bool) -> Option<RendererMessage> {
        let target = self.clamp(coordinate);
        self.history.push(Navigation {
            coordinate: target,
            animated,
        });
        if target == self.current {
            return None;
        }
        self.current = target;
        Some(RendererMessage::SlideChanged { coordinate: target })
    }
}

/// The renderer endpoint: a loaded deck plus the bootstrap behaviour that
/// runs inside the render surface.
///
/// The bundled bootstrap script does the same work in the surface itself;
/// this type runs it over rendered markup so the protocol can be driven
/// without a browser.
#[derive(Debug, Clone)]
pub struct Renderer {
    html: String,
    hints: BootstrapHints,
    scan: DeckScan,
    deck: Deck,
}

impl Renderer {
    /// Load a rendered document and run the bootstrap steps: rewrite relative
    /// asset references, report annotated slides in one `sourcepos` batch,
    /// and restore the hinted slide without a transition.
    pub fn initialize(html: &str) -> (Self, Vec<RendererMessage>) {
        let hints = BootstrapHints::from_html(html);

        let html = match &hints.base_uri {
            Some(base) => {
                let rewrite = markup::absolutize_asset_refs(html, base);
                log::debug!("Replaced {} relative asset references", rewrite.replaced);
                rewrite.html
            }
            None => html.to_string(),
        };

        let scan = markup::scan_deck(&html);
        let mut deck = Deck::new(scan.stacks.clone());
        let mut messages = vec![RendererMessage::Sourcepos {
            records: scan.records.clone(),
            reload: hints.reload_id.clone(),
        }];
        if let Some(target) = hints.target
            && let Some(changed) = deck.restore(target)
        {
            messages.push(changed);
        }

        let renderer = Self {
            html,
            hints,
            scan,
            deck,
        };
        (renderer, messages)
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn hints(&self) -> &BootstrapHints {
        &self.hints
    }

    pub fn scan(&self) -> &DeckScan {
        &self.scan
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    /// Apply a command from the controller.
    pub fn handle_command(&mut self, command: RendererCommand) -> Vec<RendererMessage> {
        let changed = match command {
            RendererCommand::Slide(coordinate) => self.deck.slide(coordinate),
            RendererCommand::Restore(coordinate) => self.deck.restore(coordinate),
        };
        changed.into_iter().collect()
    }

    /// The user navigated inside the surface.
    pub fn user_navigate(&mut self, coordinate: SlideCoordinate) -> Vec<RendererMessage> {
        self.deck.slide(coordinate).into_iter().collect()
    }

    /// The user clicked an element annotated with `sourcepos`.
    pub fn click_annotation(&self, sourcepos: &str) -> RendererMessage {
        RendererMessage::SourceposNavigate {
            value: sourcepos.to_string(),
        }
    }
}
