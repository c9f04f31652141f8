use crate::themes::Theme;
use ratatui::text::{Line, Span};

/// Key hints shown at the end of the filter bar.
pub const KEY_HINTS: &str = "p/P project · e/E employee · a all · r refresh · q quit";

/// One-line summary of the active project / employee selection.
pub struct FilterBar<'a> {
    pub project: Option<&'a str>,
    pub employee: Option<&'a str>,
    pub theme: &'a Theme,
}

impl<'a> FilterBar<'a> {
    pub fn new(project: Option<&'a str>, employee: Option<&'a str>, theme: &'a Theme) -> Self {
        Self {
            project,
            employee,
            theme,
        }
    }

    pub fn to_line(&self) -> Line<'a> {
        Line::from(vec![
            Span::styled("Project: ", self.theme.label),
            self.selection(self.project),
            Span::styled("  Employee: ", self.theme.label),
            self.selection(self.employee),
            Span::styled("   ", self.theme.dim),
            Span::styled(KEY_HINTS, self.theme.dim),
        ])
    }

    fn selection(&self, value: Option<&'a str>) -> Span<'a> {
        match value {
            Some(v) => Span::styled(format!(" {v} "), self.theme.selected),
            None => Span::styled(" all ", self.theme.value),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
