use ratatui::style::Color;

/// Theme configuration for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub bg: Color,
    pub fg: Color,
    pub beat_off: Color,
    pub beat_normal: Color,
    pub beat_accent: Color,
    pub cursor: Color,
    pub label: Color,
    pub playhead: Color,
    pub count_in: Color,
    pub recording: Color,
    pub border: Color,
    pub dimmed: Color,
}

impl Theme {
    /// Default theme - uses terminal's ANSI colors
    pub fn default_theme() -> Self {
        Self {
            name: "default",
            bg: Color::Reset,
            fg: Color::Reset,
            beat_off: Color::DarkGray,
            beat_normal: Color::Blue,
            beat_accent: Color::Magenta,
            cursor: Color::Yellow,
            label: Color::Cyan,
            playhead: Color::White,
            count_in: Color::Yellow,
            recording: Color::Red,
            border: Color::White,
            dimmed: Color::DarkGray,
        }
    }

    /// Classic green CRT phosphor look
    pub fn phosphor_green() -> Self {
        Self {
            name: "phosphor-green",
            bg: Color::Black,
            fg: Color::Rgb(0, 255, 0),
            beat_off: Color::Rgb(0, 70, 0),
            beat_normal: Color::Rgb(0, 180, 0),
            beat_accent: Color::Rgb(120, 255, 120),
            cursor: Color::Rgb(200, 255, 200),
            label: Color::Rgb(0, 200, 0),
            playhead: Color::Rgb(220, 255, 220),
            count_in: Color::Rgb(150, 255, 150),
            recording: Color::Rgb(255, 255, 255),
            border: Color::Rgb(0, 180, 0),
            dimmed: Color::Rgb(0, 60, 0),
        }
    }

    /// Warm amber monochrome CRT
    pub fn amber_crt() -> Self {
        Self {
            name: "amber-crt",
            bg: Color::Black,
            fg: Color::Rgb(255, 176, 0),
            beat_off: Color::Rgb(80, 55, 0),
            beat_normal: Color::Rgb(200, 140, 0),
            beat_accent: Color::Rgb(255, 200, 80),
            cursor: Color::Rgb(255, 230, 170),
            label: Color::Rgb(200, 140, 0),
            playhead: Color::Rgb(255, 240, 200),
            count_in: Color::Rgb(255, 220, 150),
            recording: Color::Rgb(255, 90, 40),
            border: Color::Rgb(180, 125, 0),
            dimmed: Color::Rgb(60, 40, 0),
        }
    }

    /// Stark black and white high contrast
    pub fn high_contrast() -> Self {
        Self {
            name: "high-contrast",
            bg: Color::Black,
            fg: Color::White,
            beat_off: Color::Rgb(60, 60, 60),
            beat_normal: Color::Rgb(190, 190, 190),
            beat_accent: Color::White,
            cursor: Color::White,
            label: Color::White,
            playhead: Color::White,
            count_in: Color::White,
            recording: Color::White,
            border: Color::White,
            dimmed: Color::Rgb(80, 80, 80),
        }
    }

    /// Get theme by name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::default_theme()),
            "phosphor-green" => Some(Self::phosphor_green()),
            "amber-crt" => Some(Self::amber_crt()),
            "high-contrast" => Some(Self::high_contrast()),
            _ => None,
        }
    }

    /// List all available theme names
    pub fn available_themes() -> &'static [&'static str] {
        &["default", "phosphor-green", "amber-crt", "high-contrast"]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_theme_resolves() {
        for name in Theme::available_themes() {
            assert_eq!(Theme::from_name(name).map(|t| t.name), Some(*name));
        }
        assert!(Theme::from_name("solarized").is_none());
    }
}
