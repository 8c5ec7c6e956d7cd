use ratatui::text::Line;
use std::path::PathBuf;

use crate::feed::SourceResult;
use crate::llm::{ChatMessage, CompletionError, Summary};
use crate::session::Session;
use crate::status::Slot;

// ============================================================================
// Panels and Modes
// ============================================================================

/// The four dashboard panels, in tab order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    News,
    Chat,
    Proxy,
    Video,
}

impl Panel {
    pub const ALL: [Panel; 4] = [Panel::News, Panel::Chat, Panel::Proxy, Panel::Video];

    pub fn title(self) -> &'static str {
        match self {
            Panel::News => "News",
            Panel::Chat => "Chat",
            Panel::Proxy => "Proxy",
            Panel::Video => "Video",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Panel::News => 0,
            Panel::Chat => 1,
            Panel::Proxy => 2,
            Panel::Video => 3,
        }
    }

    /// Panel for a 1-based digit key.
    pub fn from_digit(c: char) -> Option<Self> {
        let n = c.to_digit(10)? as usize;
        Self::ALL.get(n.checked_sub(1)?).copied()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Status slot owned by this panel.
    pub fn slot(self) -> Slot {
        match self {
            Panel::News => Slot::News,
            Panel::Chat => Slot::Chat,
            Panel::Proxy => Slot::Proxy,
            Panel::Video => Slot::Video,
        }
    }

    /// Label of the panel's input line.
    pub fn input_label(self) -> &'static str {
        match self {
            Panel::News => "Add RSS feed URL",
            Panel::Chat => "Message",
            Panel::Proxy => "URL to fetch via proxy",
            Panel::Video => "Video URL",
        }
    }
}

/// Where key presses go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Keys are commands.
    Normal,
    /// Keys edit the active panel's input line.
    Editing,
    /// Keys edit the API key prompt.
    ApiKey,
}

// ============================================================================
// Background Events
// ============================================================================

/// Results sent back by spawned tasks.
#[derive(Debug)]
pub enum AppEvent {
    FeedsRefreshed {
        generation: u64,
        results: Vec<SourceResult>,
        /// Set when the refresh was triggered by adding this source.
        added: Option<String>,
    },
    SummaryReady {
        /// Generation of the article list that was summarized.
        generation: u64,
        summary: Option<Summary>,
    },
    ChatReply {
        request: Vec<ChatMessage>,
        result: Result<Option<String>, CompletionError>,
    },
    ProxyLoaded(Option<String>),
    VideoFinished(Result<Option<PathBuf>, String>),
    TaskPanicked {
        task: &'static str,
        error: String,
    },
}

// ============================================================================
// App
// ============================================================================

/// Front-end state wrapped around the [`Session`].
pub struct App {
    pub session: Session,
    pub panel: Panel,
    pub mode: InputMode,
    inputs: [String; 4],
    pub key_input: String,
    /// Scroll offset per panel.
    pub scroll: [usize; 4],
    pub refreshing: bool,
    /// Bumped per spawned refresh; older results are dropped.
    pub refresh_generation: u64,
    /// Generation of the refresh whose articles are shown.
    pub articles_generation: u64,
    pub summarizing: bool,
    pub proxy_loading: bool,
    /// Summary text rendered once when it arrives.
    pub summary_lines: Vec<Line<'static>>,
    pub spinner_frame: usize,
    pub needs_redraw: bool,
}

impl App {
    pub fn new(session: Session) -> Self {
        session.status.set_active(Slot::News);
        Self {
            session,
            panel: Panel::News,
            mode: InputMode::Normal,
            inputs: Default::default(),
            key_input: String::new(),
            scroll: [0; 4],
            refreshing: false,
            refresh_generation: 0,
            articles_generation: 0,
            summarizing: false,
            proxy_loading: false,
            summary_lines: Vec::new(),
            spinner_frame: 0,
            needs_redraw: true,
        }
    }

    pub fn switch_panel(&mut self, panel: Panel) {
        if self.panel != panel {
            tracing::debug!(from = self.panel.title(), to = panel.title(), "Switching panel");
        }
        self.panel = panel;
        self.mode = InputMode::Normal;
        self.session.status.set_active(panel.slot());
    }

    pub fn input(&self) -> &str {
        &self.inputs[self.panel.index()]
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.inputs[self.panel.index()]
    }

    pub fn input_for(&self, panel: Panel) -> &str {
        &self.inputs[panel.index()]
    }

    /// Take the active panel's input, leaving it empty.
    pub fn take_input(&mut self) -> String {
        std::mem::take(self.input_mut())
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let offset = &mut self.scroll[self.panel.index()];
        *offset = offset.saturating_add_signed(delta).min(crate::ui::MAX_SCROLL);
    }

    /// Whether a background flow is running, so ticks should redraw.
    pub fn is_busy(&self) -> bool {
        use crate::video::VideoStage;
        self.refreshing
            || self.summarizing
            || self.proxy_loading
            || self.session.chat.is_in_flight()
            || matches!(
                self.session.video.stage(),
                VideoStage::Initializing | VideoStage::Downloading
            )
    }
}
