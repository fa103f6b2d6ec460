use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::{Paragraph, Widget},
};

/// Counters shown on the one-line debug strip (`--debug`).
#[derive(Debug, Default)]
pub struct DebugState {
    pub enabled: bool,
    pub num_events: usize,
    pub num_frames: usize,
    pub num_runs: usize,
    pub last_key: Option<String>,
    pub last_run: Option<Duration>,
}

impl DebugState {
    pub fn on_key(&mut self, event: &KeyEvent) {
        let mut key = String::new();
        if event.modifiers.contains(KeyModifiers::CONTROL) {
            key.push_str("C-");
        }
        if event.modifiers.contains(KeyModifiers::ALT) {
            key.push_str("A-");
        }
        match event.code {
            KeyCode::Char(c) => key.push(c),
            code => key.push_str(&format!("{:?}", code)),
        }
        self.last_key = Some(key);
    }

    pub fn on_run(&mut self, elapsed: Duration) {
        self.num_runs += 1;
        self.last_run = Some(elapsed);
    }

    fn line(&self) -> String {
        let mut parts = vec![
            format!("events: {}", self.num_events),
            format!("frames: {}", self.num_frames),
            format!("runs: {}", self.num_runs),
        ];
        if let Some(key) = &self.last_key {
            parts.push(format!("key: {}", key));
        }
        if let Some(elapsed) = self.last_run {
            parts.push(format!("pipeline: {:.1}ms", elapsed.as_secs_f64() * 1000.0));
        }
        parts.join(" | ")
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer) {
        Paragraph::new(self.line())
            .style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_keys_and_runs() {
        let mut debug = DebugState::default();
        debug.on_key(&KeyEvent::new(KeyCode::Char('x'), KeyModifiers::CONTROL));
        debug.on_run(Duration::from_millis(3));
        let line = debug.line();
        assert!(line.contains("key: C-x"));
        assert!(line.contains("runs: 1"));
        assert!(line.contains("pipeline: 3.0ms"));
    }
}
