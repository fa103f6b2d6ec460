use color_eyre::eyre::eyre;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use log::{info, warn};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

pub mod chart_data;
pub mod chart_export;
pub mod config;
pub mod error_display;
pub mod filter;
pub mod pipeline;
pub mod pivot;
pub mod sanitize;
pub mod session;
pub mod source;
pub mod table;
pub mod widgets;

pub use config::{AppConfig, ConfigManager, Theme};
pub use crosstab_cli::{split_assignment, Args, FileFormat};
pub use pipeline::{PipelineOutput, EMPTY_RESULT_WARNING};
pub use session::{Selector, Session};
pub use table::Table;

use sanitize::ExclusionList;
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::sidebar::{SidebarFocus, SidebarState, SIDEBAR_WIDTH};

/// Application name used for config directory and other app-specific paths
pub const APP_NAME: &str = "crosstab";

/// How to read the file given on the command line or in the open prompt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpenOptions {
    pub format: Option<FileFormat>,
    pub delimiter: Option<u8>,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: FileFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }
}

impl From<&Args> for OpenOptions {
    fn from(args: &Args) -> Self {
        let mut opts = OpenOptions::new();
        if let Some(format) = args.format {
            opts = opts.with_format(format);
        }
        if let Some(delimiter) = args.delimiter {
            opts = opts.with_delimiter(delimiter);
        }
        opts
    }
}

/// Loads `path` and drops duplicate and bookkeeping columns.
pub fn open_table(path: &Path, options: &OpenOptions) -> Result<Table> {
    let raw = source::load(path, options)?;
    let clean = sanitize::sanitize(&raw, &ExclusionList::builtin());
    Table::from_raw(clean)
}

/// Applies the selector, `--filter` and `--search` arguments to a session.
pub fn apply_args(session: &mut Session, args: &Args) -> Result<()> {
    let selectors = [
        (Selector::Index, &args.index),
        (Selector::Columns, &args.columns),
        (Selector::Values, &args.values),
    ];
    for (selector, column) in selectors {
        if let Some(column) = column {
            session.set_selector(selector, column)?;
        }
    }
    for arg in &args.filter {
        let (column, values) =
            split_assignment(arg).ok_or_else(|| eyre!("Expected COL=V1,V2 but got '{}'", arg))?;
        let values: Vec<&str> = values.split(',').map(str::trim).collect();
        session.keep_values(column, &values)?;
    }
    for arg in &args.search {
        let (column, term) =
            split_assignment(arg).ok_or_else(|| eyre!("Expected COL=TERM but got '{}'", arg))?;
        session.set_search(column, term)?;
    }
    Ok(())
}

#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Open(PathBuf, OpenOptions),
    Recompute,
    ExportChart(PathBuf),
    Exit,
    Crash(String),
    Resize(u16, u16), // resized (width, height)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    OpenPrompt,
    Help,
}

#[derive(Default)]
pub struct ErrorModal {
    pub active: bool,
    pub message: String,
}

impl ErrorModal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: String) {
        self.active = true;
        self.message = message;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.message.clear();
    }
}

pub struct App {
    events: Sender<AppEvent>,
    path: Option<PathBuf>,
    options: OpenOptions,
    pending_args: Option<Args>,
    pub session: Option<Session>,
    pub output: Option<PipelineOutput>,
    pub sidebar: SidebarState,
    pub input_mode: InputMode,
    open_input: String,
    status: Option<String>,
    debug: DebugState,
    pub error_modal: ErrorModal,
    config: AppConfig,
    theme: Theme,
}

impl App {
    pub fn new(events: Sender<AppEvent>) -> App {
        Self::new_with_config(events, AppConfig::default())
    }

    pub fn new_with_config(events: Sender<AppEvent>, config: AppConfig) -> App {
        let theme = Theme::from_config(&config.theme).unwrap_or_else(|e| {
            warn!("using default theme: {}", e);
            Theme::default()
        });
        let mut debug = DebugState::default();
        debug.enabled = config.debug.enabled;
        App {
            events,
            path: None,
            options: OpenOptions::default(),
            pending_args: None,
            session: None,
            output: None,
            sidebar: SidebarState::default(),
            input_mode: InputMode::Normal,
            open_input: String::new(),
            status: None,
            debug,
            error_modal: ErrorModal::new(),
            config,
            theme,
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    /// Selector and filter arguments applied once the first file is loaded.
    pub fn set_pending_args(&mut self, args: Args) {
        self.pending_args = Some(args);
    }

    pub fn send_event(&self, event: AppEvent) -> Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    fn load(&mut self, path: &Path, options: &OpenOptions) -> Result<()> {
        let table = open_table(path, options)?;
        let mut session = Session::new(table);
        if let Some(args) = self.pending_args.take() {
            apply_args(&mut session, &args)?;
        }
        info!(
            "opened {} ({} columns after sanitizing)",
            path.display(),
            session.table().width()
        );
        self.session = Some(session);
        self.output = None;
        self.path = Some(path.to_path_buf());
        self.options = options.clone();
        self.sidebar.reset();
        self.status = None;
        Ok(())
    }

    fn recompute(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let selection = session.selection();
        let spec = session.pivot_spec();
        let (result, elapsed) = pipeline::run_timed(session.table(), &selection, spec.as_ref());
        self.debug.on_run(elapsed);
        match result {
            Ok(output) => self.output = Some(output),
            Err(e) => {
                self.output = None;
                self.error_modal.show(error_display::user_message(&e));
            }
        }
    }

    fn export_chart(&mut self, path: &Path) {
        let Some(chart) = self.output.as_ref().and_then(PipelineOutput::chart) else {
            self.error_modal.show("No chart to export.".to_string());
            return;
        };
        match chart_export::write_chart_png(path, &chart, self.config.export_size()) {
            Ok(()) => self.status = Some(format!("Chart saved to {}", path.display())),
            Err(e) => self.error_modal.show(error_display::user_message(&e)),
        }
    }

    fn key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        self.debug.on_key(event);

        // Handle error modal first - it has highest priority
        if self.error_modal.active {
            if matches!(event.code, KeyCode::Esc | KeyCode::Enter) {
                self.error_modal.hide();
            }
            return None;
        }

        match self.input_mode {
            InputMode::Help => {
                if matches!(
                    event.code,
                    KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')
                ) {
                    self.input_mode = InputMode::Normal;
                }
                return None;
            }
            InputMode::OpenPrompt => return self.open_prompt_key(event),
            InputMode::Normal => {}
        }

        if self.sidebar.is_editing() {
            let session = self.session.as_mut()?;
            return self
                .sidebar
                .handle_key(event, session)
                .then_some(AppEvent::Recompute);
        }

        match event.code {
            KeyCode::Char('q') => Some(AppEvent::Exit),
            KeyCode::Char('?') => {
                self.input_mode = InputMode::Help;
                None
            }
            KeyCode::Char('o') => {
                self.open_input = self
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.input_mode = InputMode::OpenPrompt;
                None
            }
            KeyCode::Char('e') => {
                let path = self.path.as_deref()?;
                Some(AppEvent::ExportChart(chart_export::default_export_path(
                    path,
                )))
            }
            KeyCode::Tab => {
                self.sidebar.focus = self.sidebar.focus.next();
                None
            }
            KeyCode::BackTab => {
                self.sidebar.focus = self.sidebar.focus.prev();
                None
            }
            _ => {
                let session = self.session.as_mut()?;
                self.sidebar
                    .handle_key(event, session)
                    .then_some(AppEvent::Recompute)
            }
        }
    }

    fn open_prompt_key(&mut self, event: &KeyEvent) -> Option<AppEvent> {
        match event.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                None
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let input = self.open_input.trim();
                if input.is_empty() {
                    return None;
                }
                Some(AppEvent::Open(PathBuf::from(input), self.options.clone()))
            }
            KeyCode::Backspace => {
                self.open_input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.open_input.push(c);
                None
            }
            _ => None,
        }
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Open(path, options) => match self.load(path, options) {
                Ok(()) => Some(AppEvent::Recompute),
                Err(e) => {
                    warn!("failed to open {}: {}", path.display(), e);
                    self.error_modal.show(format!(
                        "Could not open {}: {} Press o to choose another file.",
                        path.display(),
                        error_display::user_message(&e)
                    ));
                    None
                }
            },
            AppEvent::Recompute => {
                self.recompute();
                None
            }
            AppEvent::ExportChart(path) => {
                self.export_chart(path);
                None
            }
            _ => None,
        }
    }

    fn render_content(&self, area: Rect, buf: &mut Buffer) {
        let max_rows = self.config.display.max_table_rows;
        let markers = self.config.display.chart_markers;
        let Some(output) = &self.output else {
            let hint = if self.session.is_some() {
                ""
            } else {
                "Press o to open a spreadsheet"
            };
            Paragraph::new(hint)
                .style(Style::default().fg(self.theme.dimmed))
                .centered()
                .render(area, buf);
            return;
        };
        let warning = output.is_empty_result().then_some(EMPTY_RESULT_WARNING);
        let chart = output.chart();
        match output {
            PipelineOutput::NoColumns => {
                Paragraph::new("No columns left after removing bookkeeping columns.")
                    .style(Style::default().fg(self.theme.warning))
                    .centered()
                    .render(area, buf);
            }
            PipelineOutput::Distribution {
                table,
                distribution,
                ..
            } => {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([
                        Constraint::Length(1),
                        Constraint::Percentage(40),
                        Constraint::Fill(1),
                    ])
                    .split(area);
                Paragraph::new(SINGLE_COLUMN_NOTICE)
                    .style(Style::default().fg(self.theme.dimmed))
                    .render(rows[0], buf);
                widgets::pivot_table::render_data_table(rows[1], buf, table, &self.theme, max_rows);
                let cols = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Length(30), Constraint::Fill(1)])
                    .split(rows[2]);
                widgets::pivot_table::render_distribution_table(
                    cols[0],
                    buf,
                    distribution,
                    &self.theme,
                );
                widgets::chart::render_chart(
                    cols[1],
                    buf,
                    chart.as_ref(),
                    warning,
                    &self.theme,
                    markers,
                );
            }
            PipelineOutput::Pivot { pivot, .. } => {
                let rows = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Percentage(40), Constraint::Fill(1)])
                    .split(area);
                widgets::pivot_table::render_pivot_table(rows[0], buf, pivot, &self.theme, max_rows);
                widgets::chart::render_chart(
                    rows[1],
                    buf,
                    chart.as_ref(),
                    warning,
                    &self.theme,
                    markers,
                );
            }
        }
    }

    fn render_error_modal(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 70, 40);
        Clear.render(popup_area, buf);
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Error")
            .border_style(Style::default().fg(self.theme.error));
        let inner_area = block.inner(popup_area);
        block.render(popup_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(inner_area);
        Paragraph::new(self.error_modal.message.as_str())
            .style(Style::default().fg(self.theme.error))
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);
        Paragraph::new("[ OK ]")
            .centered()
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.focus_border)),
            )
            .render(chunks[1], buf);
    }

    fn render_open_prompt(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 70, 20);
        let popup_area = Rect {
            height: popup_area.height.min(3),
            ..popup_area
        };
        Clear.render(popup_area, buf);
        Paragraph::new(format!("{}_", self.open_input))
            .style(Style::default().fg(self.theme.text_primary))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Open file (Enter to load, Esc to cancel) ")
                    .border_style(Style::default().fg(self.theme.focus_border)),
            )
            .render(popup_area, buf);
    }

    fn render_help(&self, area: Rect, buf: &mut Buffer) {
        let popup_area = centered_rect(area, 60, 60);
        Clear.render(popup_area, buf);
        Paragraph::new(HELP_TEXT)
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(self.theme.text_primary))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Help (Esc to close) ")
                    .border_style(Style::default().fg(self.theme.primary)),
            )
            .render(popup_area, buf);
    }

    fn row_counts(&self) -> Option<(usize, usize)> {
        let total = self.session.as_ref()?.table().height();
        let filtered = match self.output.as_ref()? {
            PipelineOutput::NoColumns => 0,
            PipelineOutput::Distribution { table, .. } => table.height(),
            PipelineOutput::Pivot { filtered_rows, .. } => *filtered_rows,
        };
        Some((filtered, total))
    }
}

/// Shown above the table when it has a single column.
pub const SINGLE_COLUMN_NOTICE: &str =
    "Only one column: no pivot table can be built. Showing its value counts.";

const HELP_TEXT: &str = "\
Tab / Shift+Tab   Move focus: filter columns, filter values, pivot selectors
Up / Down         Move the cursor
Space / Enter     Columns: add or remove a filter column
                  Values: check or uncheck a value (first row: select all)
/                 Search the values of the current filter (Enter to finish)
a                 Toggle select all for the current filter
Left / Right      Values: switch between filters
                  Pivot: change the index, columns or values column
e                 Export the chart to <file>_chart.png
o                 Open another file
?                 Show this help
q                 Quit

A numeric values column is summed, any other column is counted.
A filter with no checked values does not filter.";

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        self.debug.num_frames += 1;

        let mut constraints = vec![Constraint::Fill(1), Constraint::Length(1)];
        if self.debug.enabled {
            constraints.push(Constraint::Length(1));
        }
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
            .split(layout[0]);

        if let Some(session) = &self.session {
            self.sidebar.render(main[0], buf, session, &self.theme);
        } else {
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.dimmed))
                .render(main[0], buf);
        }

        let mut content_area = main[1];
        if let Some(status) = &self.status {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Fill(1)])
                .split(content_area);
            Paragraph::new(status.as_str())
                .style(Style::default().fg(self.theme.secondary))
                .render(parts[0], buf);
            content_area = parts[1];
        }
        self.render_content(content_area, buf);

        let is_modal_active = self.error_modal.active || self.input_mode != InputMode::Normal;
        let mut controls = Controls::new()
            .with_colors(self.theme.controls_bg, self.theme.primary)
            .with_dimmed(is_modal_active);
        if self.sidebar.is_editing() {
            controls = controls.with_custom_controls(vec![("Enter", "Done"), ("⌫", "Delete")]);
        } else if self.sidebar.focus == SidebarFocus::Values {
            controls = controls.with_custom_controls(vec![
                ("Tab", "Focus"),
                ("␣", "Check"),
                ("a", "All"),
                ("/", "Search"),
                ("←→", "Filter"),
                ("q", "Quit"),
            ]);
        }
        if let Some((filtered, total)) = self.row_counts() {
            controls = controls.with_row_count(filtered, total);
        }
        controls.render(layout[1], buf);

        if self.debug.enabled && layout.len() > 2 {
            self.debug.render(layout[2], buf);
        }

        match self.input_mode {
            InputMode::Help => self.render_help(area, buf),
            InputMode::OpenPrompt => self.render_open_prompt(area, buf),
            InputMode::Normal => {}
        }
        if self.error_modal.active {
            self.render_error_modal(area, buf);
        }
    }
}

fn centered_rect(r: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use std::sync::mpsc::channel;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        std::io::Write::write_all(&mut file, content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn open_then_recompute_builds_pivot() {
        let file = write_csv("region,product,sales\nNorth,A,10\nSouth,B,20\nNorth,A,30\n");
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        let next = app.event(&AppEvent::Open(file.path().to_path_buf(), OpenOptions::new()));
        assert!(matches!(next, Some(AppEvent::Recompute)));
        app.event(&AppEvent::Recompute);
        assert!(matches!(app.output, Some(PipelineOutput::Pivot { .. })));
        assert_eq!(app.row_counts(), Some((3, 3)));
    }

    #[test]
    fn failed_open_keeps_previous_table() {
        let file = write_csv("region,sales\nNorth,1\n");
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&AppEvent::Open(file.path().to_path_buf(), OpenOptions::new()));
        app.event(&AppEvent::Open(PathBuf::from("missing.txt"), OpenOptions::new()));
        assert!(app.error_modal.active);
        assert!(app.session.is_some());
        app.event(&key(KeyCode::Esc));
        assert!(!app.error_modal.active);
    }

    #[test]
    fn quit_and_help_keys() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        assert!(matches!(app.event(&key(KeyCode::Char('q'))), Some(AppEvent::Exit)));
        app.event(&key(KeyCode::Char('?')));
        assert_eq!(app.input_mode, InputMode::Help);
        app.event(&key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn open_prompt_sends_open_event() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&key(KeyCode::Char('o')));
        for c in "a.csv".chars() {
            app.event(&key(KeyCode::Char(c)));
        }
        match app.event(&key(KeyCode::Enter)) {
            Some(AppEvent::Open(path, _)) => assert_eq!(path, PathBuf::from("a.csv")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn args_apply_selectors_and_filters() {
        let table = Table::from_dataframe(
            polars::prelude::df!(
                "region" => &["North", "South", "North"],
                "product" => &["A", "B", "A"],
                "sales" => &[10_i64, 20, 30],
            )
            .unwrap(),
        );
        let mut session = Session::new(table);
        let args = Args {
            values: Some("sales".to_string()),
            filter: vec!["region=North".to_string()],
            ..Default::default()
        };
        apply_args(&mut session, &args).unwrap();
        assert_eq!(session.selected(Selector::Values), Some("sales"));
        match session.run().unwrap() {
            PipelineOutput::Pivot { pivot, .. } => {
                assert_eq!(pivot.row_keys, vec!["North"]);
                assert_eq!(pivot.value("North", "A"), Some(40.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bad_filter_argument_is_an_error() {
        let table = Table::from_dataframe(polars::prelude::df!("a" => &[1_i64]).unwrap());
        let mut session = Session::new(table);
        let args = Args {
            filter: vec!["novalue".to_string()],
            ..Default::default()
        };
        assert!(apply_args(&mut session, &args).is_err());
    }

    #[test]
    fn single_column_view_shows_notice() {
        let file = write_csv("status\nopen\nclosed\nopen\n");
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        app.event(&AppEvent::Open(file.path().to_path_buf(), OpenOptions::new()));
        app.event(&AppEvent::Recompute);
        assert!(matches!(app.output, Some(PipelineOutput::Distribution { .. })));

        let area = Rect::new(0, 0, 140, 30);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|p| buf[p].symbol().to_string())
            .collect();
        assert!(text.contains("no pivot table can be built"));
    }

    #[test]
    fn renders_without_session() {
        let (tx, _rx) = channel();
        let mut app = App::new(tx);
        let area = Rect::new(0, 0, 100, 20);
        let mut buf = Buffer::empty(area);
        (&mut app).render(area, &mut buf);
        let text: String = (0..area.height)
            .flat_map(|y| (0..area.width).map(move |x| (x, y)))
            .map(|p| buf[p].symbol().to_string())
            .collect();
        assert!(text.contains("Press o to open a spreadsheet"));
    }
}
