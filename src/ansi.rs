//! ANSI escape filter for captured error text.
//!
//! Instrumented runs capture error output with SGR color codes intact. This
//! converts the basic codes (colors, bold, dim, reset) into styled spans and
//! strips everything it does not understand, so raw escapes never reach the
//! terminal.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

/// Convert text with SGR escapes into styled lines.
pub fn filter(input: &str) -> Text<'static> {
    let mut lines = Vec::new();
    for raw in input.split('\n') {
        lines.push(filter_line(raw));
    }
    Text::from(lines)
}

fn filter_line(raw: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut style = Style::default();
    let mut buf = String::new();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\x1b' {
            buf.push(c);
            continue;
        }

        // Escape found: flush the text collected under the current style.
        if !buf.is_empty() {
            spans.push(Span::styled(std::mem::take(&mut buf), style));
        }

        match chars.peek() {
            Some('[') => {
                chars.next();
                let mut params = String::new();
                let mut terminator = None;
                for c in chars.by_ref() {
                    if c.is_ascii_digit() || c == ';' {
                        params.push(c);
                    } else {
                        terminator = Some(c);
                        break;
                    }
                }
                // Only SGR ('m') sequences carry styling; the rest are
                // cursor movement and get dropped.
                if terminator == Some('m') {
                    style = apply_sgr(style, &params);
                }
            }
            Some(']') => {
                // OSC sequence: skip to BEL or ST.
                chars.next();
                while let Some(c) = chars.next() {
                    if c == '\x07' {
                        break;
                    }
                    if c == '\x1b' && chars.peek() == Some(&'\\') {
                        chars.next();
                        break;
                    }
                }
            }
            _ => {
                // Lone escape or two-char sequence: drop the next char too.
                chars.next();
            }
        }
    }

    if !buf.is_empty() {
        spans.push(Span::styled(buf, style));
    }
    Line::from(spans)
}

fn apply_sgr(mut style: Style, params: &str) -> Style {
    // An empty parameter list means reset, same as "0".
    if params.is_empty() {
        return Style::default();
    }
    for param in params.split(';') {
        let code: u16 = match param.parse() {
            Ok(n) => n,
            Err(_) => continue,
        };
        style = match code {
            0 => Style::default(),
            1 => style.add_modifier(Modifier::BOLD),
            2 => style.add_modifier(Modifier::DIM),
            22 => style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            30..=37 => style.fg(basic_color(code - 30)),
            39 => style.fg(Color::Reset),
            90..=97 => style.fg(bright_color(code - 90)),
            _ => style,
        };
    }
    style
}

fn basic_color(index: u16) -> Color {
    match index {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::White,
    }
}

fn bright_color(index: u16) -> Color {
    match index {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::White,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &Text) -> String {
        text.lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = filter("expected 1\nreceived 2");
        assert_eq!(plain(&text), "expected 1\nreceived 2");
    }

    #[test]
    fn test_sgr_color_becomes_style() {
        let text = filter("\x1b[31mboom\x1b[0m done");
        let line = &text.lines[0];
        assert_eq!(line.spans[0].content, "boom");
        assert_eq!(line.spans[0].style.fg, Some(Color::Red));
        assert_eq!(line.spans[1].content, " done");
        assert_eq!(line.spans[1].style.fg, None);
    }

    #[test]
    fn test_bold_and_reset() {
        let text = filter("\x1b[1;32mok\x1b[m!");
        let line = &text.lines[0];
        assert!(line.spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(line.spans[0].style.fg, Some(Color::Green));
        assert_eq!(line.spans[1].style, Style::default());
    }

    #[test]
    fn test_unknown_sequences_are_stripped() {
        let text = filter("\x1b[2Kcleared \x1b]0;title\x07line");
        assert_eq!(plain(&text), "cleared line");
    }
}
