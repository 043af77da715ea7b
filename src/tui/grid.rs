use crate::shared::{DisplayState, Instrument, NUM_STEPS};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const LABEL_WIDTH: usize = 6;

// One line per instrument, one 3-char cell per step. Beats (every 4th step)
// get a brighter off-colour so the bar is easy to read.
pub fn draw_step_grid(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let mut lines = Vec::with_capacity(Instrument::ALL.len() + 1);
    lines.push(step_numbers(state));

    for inst in Instrument::ALL {
        let row = inst.row();
        let mut spans = vec![Span::raw(format!("{:<width$}", inst.label(), width = LABEL_WIDTH))];
        for step in 0..NUM_STEPS {
            let on = state.cells[row][step];
            let playing = state.playing_step == Some(step as u8);
            let cursor = state.cursor == (row, step);
            spans.push(Span::styled(cell_text(on), cell_style(on, playing, cursor, step)));
        }
        lines.push(Line::from(spans));
    }

    let block = Block::default().borders(Borders::ALL).title(" pattern ");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn step_numbers(state: &DisplayState) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(LABEL_WIDTH))];
    for step in 0..NUM_STEPS {
        let style = if state.playing_step == Some(step as u8) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{:>2} ", step + 1), style));
    }
    Line::from(spans)
}

fn cell_text(on: bool) -> &'static str {
    if on { "[#]" } else { "[ ]" }
}

fn cell_style(on: bool, playing: bool, cursor: bool, step: usize) -> Style {
    let mut style = match (on, playing) {
        (true, true) => Style::default().fg(Color::Black).bg(Color::Yellow),
        (true, false) => Style::default().fg(Color::LightMagenta),
        (false, true) => Style::default().fg(Color::Yellow),
        (false, false) if step % 4 == 0 => Style::default().fg(Color::Gray),
        (false, false) => Style::default().fg(Color::DarkGray),
    };
    if cursor {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}
