//! Palette for the panel, picked up from the user's kitty theme when one is
//! around so the panel blends into the terminal it runs in.

use ratatui::style::Color;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Theme {
    /// Active call, controls bar highlights.
    pub accent: Color,
    /// Passing calls and the PASS badge.
    pub success: Color,
    /// Failing calls, caught exceptions, the FAIL badge.
    pub danger: Color,
    /// Discrepancy banner.
    pub warning: Color,
    /// Primary text.
    pub text: Color,
    /// Waiting calls, disabled key hints, secondary text.
    pub text_dim: Color,
    /// Selection row background.
    pub bg_selected: Color,
    /// Inactive borders.
    pub inactive: Color,
}

impl Default for Theme {
    fn default() -> Self {
        // Catppuccin-ish fallback when no terminal theme is found.
        Self {
            accent: Color::Rgb(137, 180, 250),
            success: Color::Rgb(166, 218, 149),
            danger: Color::Rgb(243, 139, 168),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
        }
    }
}

impl Theme {
    pub fn load() -> Self {
        Self::from_kitty_theme().unwrap_or_default()
    }

    /// Read colors from the kitty theme file, when the user has one.
    fn from_kitty_theme() -> Option<Self> {
        let content = Self::kitty_theme_paths()
            .into_iter()
            .find_map(|p| fs::read_to_string(p).ok())?;

        let lookup = |key: &str| -> Option<Color> {
            content.lines().find_map(|line| {
                let (k, v) = line.trim().split_once(char::is_whitespace)?;
                if k == key {
                    parse_hex_color(v.trim())
                } else {
                    None
                }
            })
        };

        let fallback = Self::default();
        Some(Self {
            accent: lookup("color4").unwrap_or(fallback.accent),
            success: lookup("color2").unwrap_or(fallback.success),
            danger: lookup("color1").unwrap_or(fallback.danger),
            warning: lookup("color3").unwrap_or(fallback.warning),
            text: lookup("foreground").unwrap_or(fallback.text),
            text_dim: lookup("color8").unwrap_or(fallback.text_dim),
            bg_selected: lookup("selection_background").unwrap_or(fallback.bg_selected),
            inactive: lookup("color8").unwrap_or(fallback.inactive),
        })
    }

    fn kitty_theme_paths() -> Vec<PathBuf> {
        let Some(config) = dirs::config_dir() else {
            return Vec::new();
        };
        vec![
            config.join("kitty/current-theme.conf"),
            config.join("kitty/kitty.conf"),
        ]
    }
}

/// Parse `#RRGGBB` or `#RGB`.
fn parse_hex_color(s: &str) -> Option<Color> {
    let s = s.trim_start_matches('#');
    match s.len() {
        6 => {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(parse_hex_color("#ff0000"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color("#f00"), Some(Color::Rgb(255, 0, 0)));
        assert_eq!(parse_hex_color("nope"), None);
    }
}
