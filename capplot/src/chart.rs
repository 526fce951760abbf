//! Terminal line chart.

use std::io;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    style::{Color, Style},
    symbols,
    text::Line,
    widgets::{Axis, Block, Chart, Dataset, GraphType},
    Frame, Terminal,
};

use crate::series::Series;

fn axis_labels(bounds: [f64; 2]) -> Vec<Line<'static>> {
    let [lo, hi] = bounds;
    [lo, (lo + hi) / 2.0, hi]
        .iter()
        .map(|v| Line::from(format!("{v:.1}")))
        .collect()
}

/// Render `series` over the whole frame.
pub fn draw(frame: &mut Frame, series: &Series, title: &str) {
    let points = series.points();
    let dataset = Dataset::default()
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::bordered().title(format!(" {title} (q to quit) ")))
        .x_axis(
            Axis::default()
                .title("t - t0")
                .style(Style::default().fg(Color::Gray))
                .bounds(series.x_bounds())
                .labels(axis_labels(series.x_bounds())),
        )
        .y_axis(
            Axis::default()
                .title("value")
                .style(Style::default().fg(Color::Gray))
                .bounds(series.y_bounds())
                .labels(axis_labels(series.y_bounds())),
        );

    frame.render_widget(chart, frame.area());
}

fn event_loop<B: Backend>(terminal: &mut Terminal<B>, series: &Series, title: &str) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, series, title))?;
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                return Ok(());
            }
        }
    }
}

/// Show `series` in the alternate screen until `q` or `Esc`.
pub fn show(series: &Series, title: &str) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = event_loop(&mut terminal, series, title);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn rendered(series: &Series, title: &str) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 20)).unwrap();
        terminal.draw(|f| draw(f, series, title)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn chart_shows_title_and_axis_labels() {
        let series = Series::parse("0, 1\n1, 2\n2, 3\n").unwrap();
        let screen = rendered(&series, "caps.log");
        assert!(screen.contains("caps.log"));
        assert!(screen.contains("0.0"));
        assert!(screen.contains("3.0"));
    }

    #[test]
    fn empty_series_still_renders() {
        let screen = rendered(&Series::default(), "empty.log");
        assert!(screen.contains("empty.log"));
    }

    #[test]
    fn labels_span_bounds() {
        let labels: Vec<String> = axis_labels([0.0, 10.0])
            .iter()
            .map(|l| l.to_string())
            .collect();
        assert_eq!(labels, vec!["0.0", "5.0", "10.0"]);
    }
}
