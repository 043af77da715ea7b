use crate::shared::{DisplayState, Instrument};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use super::grid::draw_step_grid;

pub const SPECTRUM_BANDS: usize = 32;
const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

const HELP: &str = "space play/stop  arrows move  enter toggle  +/- bpm  [/] bpm x10  c clear  esc quit";

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // screen: status + tempo
            Constraint::Length(3), // level meter + spectrum
            Constraint::Length(Instrument::ALL.len() as u16 + 3), // grid
            Constraint::Min(1), // help
        ])
        .split(area);

    draw_screen(frame, sections[0], state);
    draw_meter(frame, sections[1], state);
    draw_step_grid(frame, sections[2], state);
    frame.render_widget(
        Paragraph::new(Line::from(HELP)).style(Style::default().fg(Color::DarkGray)),
        sections[3],
    );
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let icon = if state.playing { ">" } else { "#" };
    let text = format!("{icon} {:<10} {:>3} BPM", state.display_text, state.bpm);
    let block = Block::default().borders(Borders::ALL).title(" beatgrid ");
    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_meter(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(SPECTRUM_BANDS as u16 + 2)])
        .split(area);

    let ratio = (state.level as f64 * 2.0).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(" level "))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio);
    frame.render_widget(gauge, halves[0]);

    let bars = Paragraph::new(spectrum_line(&state.spectrum))
        .style(Style::default().fg(Color::Magenta))
        .block(Block::default().borders(Borders::ALL).title(" spectrum "));
    frame.render_widget(bars, halves[1]);
}

// one block character per band; magnitudes are small, so scale up before
// picking a height
fn spectrum_line(bands: &[f32]) -> String {
    bands
        .iter()
        .map(|m| {
            let h = ((m * 40.0).clamp(0.0, 1.0) * (BARS.len() - 1) as f32).round() as usize;
            BARS[h]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spectrum_line_has_one_bar_per_band() {
        let line = spectrum_line(&[0.0, 1.0, 0.01]);
        assert_eq!(line.chars().collect::<Vec<_>>(), vec!['▁', '█', '▄']);
        assert!(spectrum_line(&[]).is_empty());
    }
}
