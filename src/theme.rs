/// Colors and glyphs used by the renderer.
///
/// Passed into [`crate::render::StatusLine`] by reference; there is no global
/// palette. `Theme::plain()` carries empty escape codes so the same render path
/// produces uncolored text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub reset: &'static str,
    pub dim: &'static str,
    pub magenta: &'static str,
    pub yellow: &'static str,
    pub cyan: &'static str,
    pub green: &'static str,
    pub red: &'static str,
    pub white: &'static str,
    pub blue: &'static str,
    pub agent_marker: &'static str,
    pub bar_fill: char,
    pub bar_empty: char,
}

impl Theme {
    pub const fn ansi() -> Self {
        Self {
            reset: "\x1b[0m",
            dim: "\x1b[2m",
            magenta: "\x1b[35m",
            yellow: "\x1b[33m",
            cyan: "\x1b[36m",
            green: "\x1b[32m",
            red: "\x1b[31m",
            white: "\x1b[37m",
            blue: "\x1b[34m",
            agent_marker: "◉",
            bar_fill: '=',
            bar_empty: ' ',
        }
    }

    pub const fn plain() -> Self {
        Self {
            reset: "",
            dim: "",
            magenta: "",
            yellow: "",
            cyan: "",
            green: "",
            red: "",
            white: "",
            blue: "",
            agent_marker: "◉",
            bar_fill: '=',
            bar_empty: ' ',
        }
    }

    /// Wrap `text` in `color` and a reset.
    pub fn paint(&self, color: &str, text: impl std::fmt::Display) -> String {
        format!("{color}{text}{}", self.reset)
    }

    /// Dimmed ` | ` separator between segments.
    pub fn separator(&self) -> String {
        format!(" {} ", self.paint(self.dim, "|"))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::ansi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_paint_wraps_with_reset() {
        let theme = Theme::ansi();
        assert_eq!(theme.paint(theme.red, "*"), "\x1b[31m*\x1b[0m");
    }

    #[test]
    fn plain_paint_is_identity() {
        let theme = Theme::plain();
        assert_eq!(theme.paint(theme.cyan, "main"), "main");
        assert_eq!(theme.separator(), " | ");
    }
}
