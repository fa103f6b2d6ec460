//! Left sidebar: filter column list, the active filter panel and the three
//! pivot selectors.

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use crate::config::Theme;
use crate::session::{Selector, Session};

pub const SIDEBAR_WIDTH: u16 = 36;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SidebarFocus {
    #[default]
    Columns,
    Values,
    Selectors,
}

impl SidebarFocus {
    pub fn next(self) -> Self {
        match self {
            SidebarFocus::Columns => SidebarFocus::Values,
            SidebarFocus::Values => SidebarFocus::Selectors,
            SidebarFocus::Selectors => SidebarFocus::Columns,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            SidebarFocus::Columns => SidebarFocus::Selectors,
            SidebarFocus::Values => SidebarFocus::Columns,
            SidebarFocus::Selectors => SidebarFocus::Values,
        }
    }
}

/// Cursor positions of the sidebar. Row 0 of the value list is the
/// "select all" toggle; row `i + 1` is the i-th visible value.
#[derive(Debug, Default)]
pub struct SidebarState {
    pub focus: SidebarFocus,
    pub column_cursor: usize,
    pub active_filter: usize,
    pub value_cursor: usize,
    pub selector_cursor: usize,
    pub editing_search: bool,
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

fn move_cursor(cursor: &mut usize, len: usize, down: bool) {
    if len == 0 {
        *cursor = 0;
    } else if down {
        *cursor = (*cursor + 1).min(len - 1);
    } else {
        *cursor = cursor.saturating_sub(1);
    }
}

impl SidebarState {
    pub fn is_editing(&self) -> bool {
        self.editing_search
    }

    /// Resets cursors for a newly loaded table.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn active_column(&self, session: &Session) -> Option<String> {
        session
            .filters()
            .get(self.active_filter)
            .map(|f| f.column().to_string())
    }

    /// Handles a key for the focused part of the sidebar. Returns true when
    /// the filter selection or a selector changed.
    pub fn handle_key(&mut self, event: &KeyEvent, session: &mut Session) -> bool {
        match self.focus {
            SidebarFocus::Columns => self.columns_key(event, session),
            SidebarFocus::Values => self.values_key(event, session),
            SidebarFocus::Selectors => self.selectors_key(event, session),
        }
    }

    fn columns_key(&mut self, event: &KeyEvent, session: &mut Session) -> bool {
        let names: Vec<String> = session
            .table()
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        match event.code {
            KeyCode::Up => move_cursor(&mut self.column_cursor, names.len(), false),
            KeyCode::Down => move_cursor(&mut self.column_cursor, names.len(), true),
            KeyCode::Char(' ') | KeyCode::Enter => {
                let Some(name) = names.get(self.column_cursor) else {
                    return false;
                };
                return match session.toggle_filter_column(name) {
                    Ok(true) => {
                        self.active_filter = session.filters().len() - 1;
                        self.value_cursor = 0;
                        true
                    }
                    Ok(false) => {
                        let len = session.filters().len();
                        self.active_filter = self.active_filter.min(len.saturating_sub(1));
                        true
                    }
                    Err(e) => {
                        log::warn!("{}", e);
                        false
                    }
                };
            }
            _ => {}
        }
        false
    }

    fn values_key(&mut self, event: &KeyEvent, session: &mut Session) -> bool {
        let Some(column) = self.active_column(session) else {
            return false;
        };
        let Some(filter) = session.filter_mut(&column) else {
            return false;
        };

        if self.editing_search {
            let mut search = filter.search().to_string();
            match event.code {
                KeyCode::Char(c) => search.push(c),
                KeyCode::Backspace => {
                    search.pop();
                }
                KeyCode::Enter | KeyCode::Esc => {
                    self.editing_search = false;
                    return false;
                }
                _ => return false,
            }
            filter.set_search(search);
            self.value_cursor = 0;
            return true;
        }

        let rows = filter.visible().len() + 1;
        match event.code {
            KeyCode::Up => move_cursor(&mut self.value_cursor, rows, false),
            KeyCode::Down => move_cursor(&mut self.value_cursor, rows, true),
            KeyCode::Char('/') => self.editing_search = true,
            KeyCode::Char('a') => {
                filter.toggle_select_all();
                return true;
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.value_cursor == 0 {
                    filter.toggle_select_all();
                } else {
                    let Some(value) = filter
                        .visible()
                        .get(self.value_cursor - 1)
                        .map(|v| v.to_string())
                    else {
                        return false;
                    };
                    filter.toggle(&value);
                }
                return true;
            }
            KeyCode::Left | KeyCode::Right => {
                let n = session.filters().len();
                self.active_filter = if event.code == KeyCode::Right {
                    (self.active_filter + 1) % n
                } else {
                    (self.active_filter + n - 1) % n
                };
                self.value_cursor = 0;
            }
            _ => {}
        }
        false
    }

    fn selectors_key(&mut self, event: &KeyEvent, session: &mut Session) -> bool {
        match event.code {
            KeyCode::Up => move_cursor(&mut self.selector_cursor, Selector::ALL.len(), false),
            KeyCode::Down => move_cursor(&mut self.selector_cursor, Selector::ALL.len(), true),
            KeyCode::Left | KeyCode::Right => {
                let selector = Selector::ALL[self.selector_cursor];
                session.cycle_selector(selector, event.code == KeyCode::Right);
                return true;
            }
            _ => {}
        }
        false
    }

    pub fn render(&self, area: Rect, buf: &mut Buffer, session: &Session, theme: &Theme) {
        let n_columns = session.table().width() as u16;
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Max(n_columns + 2),
                Constraint::Min(5),
                Constraint::Length(5),
            ])
            .split(area);
        self.render_columns(layout[0], buf, session, theme);
        self.render_values(layout[1], buf, session, theme);
        self.render_selectors(layout[2], buf, session, theme);
    }

    fn block<'a>(&self, title: String, focus: SidebarFocus, theme: &Theme) -> Block<'a> {
        let color = if self.focus == focus {
            theme.focus_border
        } else {
            theme.table_border
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color))
            .title(title)
    }

    fn cursor_style(&self, focus: SidebarFocus, selected: bool, theme: &Theme) -> Style {
        if selected && self.focus == focus {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default().fg(theme.text_primary)
        }
    }

    fn render_columns(&self, area: Rect, buf: &mut Buffer, session: &Session, theme: &Theme) {
        let block = self.block(" Filter columns ".to_string(), SidebarFocus::Columns, theme);
        let inner = block.inner(area);
        block.render(area, buf);
        let names = session.table().column_names();
        let offset = scroll_offset(self.column_cursor, inner.height as usize);
        let lines: Vec<Line> = names
            .iter()
            .enumerate()
            .skip(offset)
            .map(|(i, name)| {
                let checked = session.is_filter_column(name);
                Line::from(vec![
                    Span::styled(
                        format!("{} ", checkbox(checked)),
                        Style::default().fg(theme.checked),
                    ),
                    Span::styled(
                        name.to_string(),
                        self.cursor_style(SidebarFocus::Columns, i == self.column_cursor, theme),
                    ),
                ])
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_values(&self, area: Rect, buf: &mut Buffer, session: &Session, theme: &Theme) {
        let filters = session.filters();
        let Some(filter) = filters.get(self.active_filter) else {
            let block = self.block(" Filter ".to_string(), SidebarFocus::Values, theme);
            Paragraph::new("Space on a column adds a filter")
                .style(Style::default().fg(theme.dimmed))
                .block(block)
                .render(area, buf);
            return;
        };
        let title = format!(
            " {} ({}/{}) ",
            filter.column(),
            self.active_filter + 1,
            filters.len()
        );
        let block = self.block(title, SidebarFocus::Values, theme);
        let inner = block.inner(area);
        block.render(area, buf);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Fill(1)])
            .split(inner);
        let cursor = if self.editing_search { "_" } else { "" };
        let search_style = if self.editing_search {
            Style::default().fg(theme.focus_border)
        } else {
            Style::default().fg(theme.dimmed)
        };
        Paragraph::new(format!("/ {}{}", filter.search(), cursor))
            .style(search_style)
            .render(layout[0], buf);

        let visible = filter.visible();
        let offset = scroll_offset(self.value_cursor, layout[1].height as usize);
        let rows = std::iter::once(("Select all", filter.select_all()))
            .chain(visible.iter().map(|v| (*v, filter.is_checked(v))));
        let lines: Vec<Line> = rows
            .enumerate()
            .skip(offset)
            .map(|(i, (label, checked))| {
                let mut style = self.cursor_style(SidebarFocus::Values, i == self.value_cursor, theme);
                if i == 0 {
                    style = style.add_modifier(Modifier::ITALIC);
                }
                Line::from(vec![
                    Span::styled(
                        format!("{} ", checkbox(checked)),
                        Style::default().fg(theme.checked),
                    ),
                    Span::styled(label.to_string(), style),
                ])
            })
            .collect();
        Paragraph::new(lines).render(layout[1], buf);
    }

    fn render_selectors(&self, area: Rect, buf: &mut Buffer, session: &Session, theme: &Theme) {
        let block = self.block(" Pivot ".to_string(), SidebarFocus::Selectors, theme);
        let inner = block.inner(area);
        block.render(area, buf);
        let lines: Vec<Line> = Selector::ALL
            .iter()
            .enumerate()
            .map(|(i, selector)| {
                let value = session.selected(*selector).unwrap_or("-");
                Line::from(vec![
                    Span::styled(
                        format!("{:<8}", selector.label()),
                        Style::default().fg(theme.dimmed),
                    ),
                    Span::styled(
                        format!("‹ {} ›", value),
                        self.cursor_style(SidebarFocus::Selectors, i == self.selector_cursor, theme),
                    ),
                ])
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }
}

/// First visible row so that `cursor` stays inside a window of `height` rows.
fn scroll_offset(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    cursor.saturating_sub(height - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use crossterm::event::KeyModifiers;
    use polars::prelude::*;
    use crate::session::Selector;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn session() -> Session {
        Session::new(Table::from_dataframe(
            df!(
                "region" => &["North", "South", "North"],
                "sales" => &[10_i64, 20, 30],
            )
            .unwrap(),
        ))
    }

    #[test]
    fn space_adds_filter_and_unchecks_value() {
        let mut session = session();
        let mut state = SidebarState::default();
        assert!(state.handle_key(&key(KeyCode::Char(' ')), &mut session));
        assert!(session.is_filter_column("region"));

        state.focus = SidebarFocus::Values;
        state.handle_key(&key(KeyCode::Down), &mut session);
        assert!(state.handle_key(&key(KeyCode::Char(' ')), &mut session));
        let selection = session.selection();
        let kept = selection.get("region").unwrap();
        assert_eq!(kept.len(), 1);
        assert!(kept.contains("South"));
    }

    #[test]
    fn search_editing_narrows_values() {
        let mut session = session();
        let mut state = SidebarState::default();
        state.handle_key(&key(KeyCode::Char(' ')), &mut session);
        state.focus = SidebarFocus::Values;
        state.handle_key(&key(KeyCode::Char('/')), &mut session);
        assert!(state.is_editing());
        state.handle_key(&key(KeyCode::Char('s')), &mut session);
        state.handle_key(&key(KeyCode::Enter), &mut session);
        assert!(!state.is_editing());
        assert_eq!(session.filter("region").unwrap().visible(), vec!["South"]);
    }

    #[test]
    fn selector_cycles() {
        let mut session = session();
        let mut state = SidebarState {
            focus: SidebarFocus::Selectors,
            ..Default::default()
        };
        state.handle_key(&key(KeyCode::Right), &mut session);
        assert_eq!(session.selected(Selector::Index), Some("sales"));
    }

    #[test]
    fn scroll_keeps_cursor_visible() {
        assert_eq!(scroll_offset(0, 5), 0);
        assert_eq!(scroll_offset(7, 5), 3);
        assert_eq!(scroll_offset(3, 0), 0);
    }
}
