use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::ui::Theme;

/// Render the keybinding overlay centered in `area`
pub fn render_help(frame: &mut Frame, area: Rect, theme: &Theme) {
    let lines = build_help_lines(theme);
    let height = (lines.len() as u16 + 2).min(area.height);
    let width = 52u16.min(area.width);
    let popup = Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    );

    let block = Block::default()
        .title(Span::styled(" Help ", Style::default().fg(theme.label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(lines)
            .style(Style::default().bg(theme.bg))
            .block(block),
        popup,
    );
}

fn build_help_lines(theme: &Theme) -> Vec<Line<'static>> {
    let header_style = Style::default().fg(theme.beat_accent).bold();
    let key_style = Style::default().fg(theme.cursor);
    let desc_style = Style::default().fg(theme.fg);
    let dim_style = Style::default().fg(theme.dimmed);

    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled("  TRANSPORT", header_style)));
    lines.push(Line::from(Span::styled(
        "  ──────────────────────────────────",
        dim_style,
    )));
    add_key(&mut lines, "  P         ", "Play / stop (count-in first)", key_style, desc_style);
    add_key(&mut lines, "  R         ", "Record a take after the count-in", key_style, desc_style);
    add_key(&mut lines, "  S         ", "Stop", key_style, desc_style);
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled("  PATTERN", header_style)));
    lines.push(Line::from(Span::styled(
        "  ──────────────────────────────────",
        dim_style,
    )));
    add_key(&mut lines, "  Arrows    ", "Move cursor (also H/L)", key_style, desc_style);
    add_key(&mut lines, "  Space     ", "Cycle beat: off > normal > accent", key_style, desc_style);
    add_key(&mut lines, "  + / -     ", "BPM up/down by 5 (stopped)", key_style, desc_style);
    add_key(&mut lines, "  , / .     ", "Previous / next preset (stopped)", key_style, desc_style);
    lines.push(Line::from(""));

    add_key(&mut lines, "  ?         ", "Toggle this help", key_style, desc_style);
    add_key(&mut lines, "  Q / Esc   ", "Quit", key_style, desc_style);

    lines
}

fn add_key(lines: &mut Vec<Line<'static>>, key: &str, desc: &str, key_style: Style, desc_style: Style) {
    lines.push(Line::from(vec![
        Span::styled(key.to_string(), key_style),
        Span::styled(format!("  {}", desc), desc_style),
    ]));
}
