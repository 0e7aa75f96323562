use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::sequencer::{BeatState, Pattern, TransportPhase, STEPS, STEPS_PER_BEAT};
use crate::ui::Theme;

/// Beat cursor state
pub struct GridState {
    pub cursor_step: usize,
}

impl GridState {
    pub fn new() -> Self {
        Self { cursor_step: 0 }
    }

    pub fn move_cursor(&mut self, dx: i32) {
        self.cursor_step = ((self.cursor_step as i32 + dx).rem_euclid(STEPS as i32)) as usize;
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}

/// What the transport looks like to the beat row
#[derive(Debug, Clone, Copy)]
pub struct PlayheadView {
    pub phase: TransportPhase,
    /// Step most recently scheduled, if any
    pub step: Option<usize>,
    /// 1..=4 during the count-in
    pub count_in_beat: Option<usize>,
}

impl PlayheadView {
    /// Step to highlight. The playhead is hidden while counting in.
    pub fn highlighted_step(&self) -> Option<usize> {
        match self.phase {
            TransportPhase::Playing | TransportPhase::Recording => self.step,
            _ => None,
        }
    }
}

fn beat_symbol(state: BeatState) -> &'static str {
    match state {
        BeatState::Off => "··",
        BeatState::Normal => "▄▄",
        BeatState::Accent => "██",
    }
}

/// Render the 16-slot beat row
pub fn render_beats(
    frame: &mut Frame,
    area: Rect,
    pattern: &Pattern,
    grid_state: &GridState,
    view: PlayheadView,
    theme: &Theme,
) {
    let block = Block::default()
        .title(Span::styled(" Beats ", Style::default().fg(theme.label)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .style(Style::default().bg(theme.bg));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height == 0 {
        return;
    }

    let cell_width = (inner.width / STEPS as u16).clamp(3, 6);
    let playhead = view.highlighted_step();

    for step in 0..STEPS {
        let step_x = inner.x + (step as u16 * cell_width);
        if step_x + 2 > inner.x + inner.width {
            break;
        }

        let state = pattern.get(step);
        let is_cursor = step == grid_state.cursor_step;
        let is_playhead = playhead == Some(step);

        let beat_color = match state {
            BeatState::Off => theme.beat_off,
            BeatState::Normal => theme.beat_normal,
            BeatState::Accent => theme.beat_accent,
        };

        let style = if is_playhead {
            Style::default().fg(theme.bg).bg(theme.playhead).bold()
        } else if is_cursor {
            Style::default().fg(beat_color).bg(theme.bg).bold().underlined()
        } else {
            Style::default().fg(beat_color).bg(theme.bg)
        };

        frame.render_widget(
            Paragraph::new(beat_symbol(state)).style(style),
            Rect::new(step_x, inner.y, 2, 1),
        );

        // Marker row: cursor caret, or the count-in beat over each quarter note
        if inner.height > 1 {
            let (marker, marker_style) = if let Some(beat) = count_in_marker(view, step) {
                (beat, Style::default().fg(theme.count_in).bold())
            } else if is_cursor {
                ("^^".to_string(), Style::default().fg(theme.cursor).bold())
            } else if step % STEPS_PER_BEAT == 0 {
                (
                    format!("{:<2}", step / STEPS_PER_BEAT + 1),
                    Style::default().fg(theme.dimmed),
                )
            } else {
                (String::new(), Style::default())
            };
            frame.render_widget(
                Paragraph::new(marker).style(marker_style.bg(theme.bg)),
                Rect::new(step_x, inner.y + 1, 2, 1),
            );
        }
    }
}

/// Count-in beat number shown above quarter note `step`, once that beat has sounded
fn count_in_marker(view: PlayheadView, step: usize) -> Option<String> {
    let beat = view.count_in_beat?;
    if view.phase != TransportPhase::CountingIn || step % STEPS_PER_BEAT != 0 {
        return None;
    }
    let quarter = step / STEPS_PER_BEAT + 1;
    (quarter <= beat).then(|| format!("{:<2}", quarter))
}

/// Render transport status bar
pub fn render_transport(
    frame: &mut Frame,
    area: Rect,
    view: PlayheadView,
    bpm: u32,
    preset: &str,
    theme: &Theme,
) {
    let status_style = match view.phase {
        TransportPhase::Stopped => Style::default().fg(theme.dimmed),
        TransportPhase::CountingIn => Style::default().fg(theme.count_in).bold(),
        TransportPhase::Playing => Style::default().fg(theme.beat_accent).bold(),
        TransportPhase::Recording => Style::default().fg(theme.recording).bold(),
    };

    let position = match (view.phase, view.count_in_beat, view.highlighted_step()) {
        (TransportPhase::CountingIn, Some(beat), _) => format!("Count: {}/4", beat),
        (_, _, Some(step)) => format!("Step: {:2}/{}", step + 1, STEPS),
        _ => format!("Step: --/{}", STEPS),
    };

    let transport_text = vec![
        Span::styled(format!(" {} ", view.phase.label()), status_style),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(format!("BPM: {}", bpm), Style::default().fg(theme.fg)),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(position, Style::default().fg(theme.fg)),
        Span::styled(" | ", Style::default().fg(theme.border)),
        Span::styled(preset.to_string(), Style::default().fg(theme.label)),
    ];

    let transport = Paragraph::new(Line::from(transport_text))
        .style(Style::default().bg(theme.bg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.border))
                .style(Style::default().bg(theme.bg)),
        );

    frame.render_widget(transport, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(phase: TransportPhase, step: Option<usize>, beat: Option<usize>) -> PlayheadView {
        PlayheadView {
            phase,
            step,
            count_in_beat: beat,
        }
    }

    #[test]
    fn cursor_wraps() {
        let mut grid = GridState::new();
        grid.move_cursor(-1);
        assert_eq!(grid.cursor_step, STEPS - 1);
        grid.move_cursor(2);
        assert_eq!(grid.cursor_step, 1);
    }

    #[test]
    fn playhead_hidden_during_count_in() {
        assert_eq!(
            view(TransportPhase::CountingIn, Some(5), Some(2)).highlighted_step(),
            None
        );
        assert_eq!(view(TransportPhase::Playing, Some(5), None).highlighted_step(), Some(5));
        assert_eq!(view(TransportPhase::Recording, Some(0), None).highlighted_step(), Some(0));
        assert_eq!(view(TransportPhase::Stopped, None, None).highlighted_step(), None);
    }

    #[test]
    fn count_in_markers_follow_the_beat() {
        let v = view(TransportPhase::CountingIn, Some(5), Some(2));
        assert_eq!(count_in_marker(v, 0).as_deref(), Some("1 "));
        assert_eq!(count_in_marker(v, 4).as_deref(), Some("2 "));
        assert_eq!(count_in_marker(v, 8), None);
        assert_eq!(count_in_marker(v, 1), None);

        let playing = view(TransportPhase::Playing, Some(5), None);
        assert_eq!(count_in_marker(playing, 0), None);
    }
}
