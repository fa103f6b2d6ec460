use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    widgets::{Paragraph, Widget},
};

const DEFAULT_CONTROLS: [(&str, &str); 7] = [
    ("Tab", "Focus"),
    ("␣", "Toggle"),
    ("/", "Search"),
    ("←→", "Selector"),
    ("e", "Export"),
    ("o", "Open"),
    ("q", "Quit"),
];

/// Key hints along the bottom of the screen, with an optional row count.
pub struct Controls {
    pub row_count: Option<(usize, usize)>,
    pub dimmed: bool,
    pub controls: Vec<(&'static str, &'static str)>,
    pub bg: Color,
    pub key_fg: Color,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            row_count: None,
            dimmed: false,
            controls: DEFAULT_CONTROLS.to_vec(),
            bg: Color::DarkGray,
            key_fg: Color::Cyan,
        }
    }
}

impl Controls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `filtered of total` rows on the right.
    pub fn with_row_count(mut self, filtered: usize, total: usize) -> Self {
        self.row_count = Some((filtered, total));
        self
    }

    pub fn with_dimmed(mut self, dimmed: bool) -> Self {
        self.dimmed = dimmed;
        self
    }

    pub fn with_custom_controls(mut self, controls: Vec<(&'static str, &'static str)>) -> Self {
        self.controls = controls;
        self
    }

    pub fn with_colors(mut self, bg: Color, key_fg: Color) -> Self {
        self.bg = bg;
        self.key_fg = key_fg;
        self
    }

    fn row_count_text(&self) -> Option<String> {
        self.row_count
            .map(|(filtered, total)| format!("Rows: {} of {}", filtered, total))
    }
}

impl Widget for &Controls {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let mut constraints = self
            .controls
            .iter()
            .fold(vec![], |mut acc, (key, action)| {
                acc.push(Constraint::Length(key.chars().count() as u16 + 2));
                acc.push(Constraint::Length(action.chars().count() as u16 + 1));
                acc
            });
        let row_count = self.row_count_text();
        if let Some(text) = &row_count {
            constraints.push(Constraint::Length(text.chars().count() as u16 + 2));
        }
        constraints.push(Constraint::Fill(1));

        let layout = Layout::new(Direction::Horizontal, constraints).split(area);
        let base_style = if self.dimmed {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };
        let key_style = if self.dimmed {
            base_style
        } else {
            base_style.fg(self.key_fg)
        };

        for (i, (key, action)) in self.controls.iter().enumerate() {
            let j = i * 2;
            Paragraph::new(*key)
                .style(key_style.bold())
                .centered()
                .render(layout[j], buf);
            Paragraph::new(*action)
                .style(base_style.bg(self.bg))
                .render(layout[j + 1], buf);
        }

        let mut fill_start_idx = self.controls.len() * 2;
        if let Some(text) = row_count {
            Paragraph::new(text)
                .style(base_style.bg(self.bg))
                .right_aligned()
                .render(layout[fill_start_idx], buf);
            fill_start_idx += 1;
        }
        Paragraph::new("")
            .style(base_style.bg(self.bg))
            .render(layout[fill_start_idx], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_hints_and_row_count() {
        let controls = Controls::new().with_row_count(2, 3);
        let area = Rect::new(0, 0, 120, 1);
        let mut buf = Buffer::empty(area);
        (&controls).render(area, &mut buf);
        let line: String = (0..area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect();
        assert!(line.contains("Quit"));
        assert!(line.contains("Rows: 2 of 3"));
    }
}
