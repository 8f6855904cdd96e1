use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

/// Styles for each kind of status line
#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    styled: bool,
}

impl Theme {
    /// Pick a theme for the current stdout and environment
    pub fn detect() -> Self {
        Self::for_terminal(
            console::Term::stdout().is_term(),
            std::env::var_os("NO_COLOR").is_some(),
        )
    }

    /// Colors only on an interactive terminal, and never when `NO_COLOR` is set
    pub fn for_terminal(interactive: bool, no_color: bool) -> Self {
        let styled = interactive && !no_color;
        let pick = |style: Style| if styled { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            warn: pick(Style::new().yellow()),
            info: pick(Style::new().blue()),
            dim: pick(Style::new().dimmed()),
            styled,
        }
    }

    pub fn is_plain(&self) -> bool {
        !self.styled
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_without_terminal() {
        assert!(Theme::for_terminal(false, false).is_plain());
        assert!(Theme::for_terminal(true, true).is_plain());
    }

    #[test]
    fn test_colored_on_terminal() {
        assert!(!Theme::for_terminal(true, false).is_plain());
    }
}
