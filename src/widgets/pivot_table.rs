//! Table views: the cross-tabulation, and the plain sanitized table with its
//! value counts for single-column sheets.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Row, Table as TableWidget, Widget},
};

use crate::config::Theme;
use crate::pivot::{format_value, Distribution, PivotTable};
use crate::table::Table;

const MIN_COLUMN_WIDTH: u16 = 6;
const MAX_COLUMN_WIDTH: u16 = 24;

fn column_width<'a>(cells: impl Iterator<Item = &'a str>) -> u16 {
    let widest = cells.map(|s| s.chars().count()).max().unwrap_or(0) as u16;
    (widest + 1).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
}

fn block<'a>(title: String, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.table_border))
        .title(title)
}

/// Cross-tabulation: one row per index key, one column per pivot key.
pub fn render_pivot_table(
    area: Rect,
    buf: &mut Buffer,
    pivot: &PivotTable,
    theme: &Theme,
    max_rows: usize,
) {
    let title = format!(
        " {} of {} by {} × {} ",
        pivot.aggregation.as_str(),
        pivot.value_label(),
        pivot.spec.index,
        pivot.spec.columns
    );
    let corner = format!("{} \\ {}", pivot.spec.index, pivot.spec.columns);
    let rows_text: Vec<Vec<String>> = pivot
        .row_keys
        .iter()
        .zip(&pivot.cells)
        .take(max_rows)
        .map(|(key, cells)| {
            std::iter::once(key.clone())
                .chain(cells.iter().map(|v| format_value(*v)))
                .collect()
        })
        .collect();

    let mut widths = vec![column_width(
        std::iter::once(corner.as_str()).chain(pivot.row_keys.iter().map(String::as_str)),
    )];
    for (col, key) in pivot.column_keys.iter().enumerate() {
        widths.push(column_width(
            std::iter::once(key.as_str()).chain(rows_text.iter().map(|r| r[col + 1].as_str())),
        ));
    }

    let header_style = Style::default()
        .fg(theme.table_header)
        .add_modifier(Modifier::BOLD);
    let header = Row::new(
        std::iter::once(corner.clone()).chain(pivot.column_keys.iter().cloned()),
    )
    .style(header_style);
    let rows = rows_text.into_iter().map(|cells| {
        let mut cells = cells.into_iter();
        let key = cells.next().unwrap_or_default();
        Row::new(
            std::iter::once(Line::from(key).style(header_style))
                .chain(cells.map(|c| Line::from(c).right_aligned())),
        )
    });
    TableWidget::new(rows, widths.into_iter().map(Constraint::Length))
        .header(header)
        .block(block(title, theme))
        .style(Style::default().fg(theme.text_primary))
        .render(area, buf);
}

/// First `max_rows` rows of a table, all values as text.
pub fn render_data_table(
    area: Rect,
    buf: &mut Buffer,
    table: &Table,
    theme: &Theme,
    max_rows: usize,
) {
    let names = table.column_names();
    let columns: Vec<Vec<String>> = names
        .iter()
        .map(|name| {
            table
                .string_values(name)
                .unwrap_or_default()
                .into_iter()
                .take(max_rows)
                .map(|v| v.unwrap_or_default())
                .collect()
        })
        .collect();
    let widths: Vec<Constraint> = names
        .iter()
        .zip(&columns)
        .map(|(name, values)| {
            Constraint::Length(column_width(
                std::iter::once(*name).chain(values.iter().map(String::as_str)),
            ))
        })
        .collect();
    let height = columns.first().map_or(0, Vec::len);
    let rows = (0..height).map(|i| Row::new(columns.iter().map(|c| c[i].clone())));
    let header = Row::new(names.iter().map(|n| n.to_string())).style(
        Style::default()
            .fg(theme.table_header)
            .add_modifier(Modifier::BOLD),
    );
    TableWidget::new(rows, widths)
        .header(header)
        .block(block(format!(" {} rows ", table.height()), theme))
        .style(Style::default().fg(theme.text_primary))
        .render(area, buf);
}

/// Value counts of the single column, next to its bar chart.
pub fn render_distribution_table(
    area: Rect,
    buf: &mut Buffer,
    distribution: &Distribution,
    theme: &Theme,
) {
    if distribution.is_empty() {
        Paragraph::new("")
            .block(block(format!(" {} ", distribution.column), theme))
            .render(area, buf);
        return;
    }
    let width = column_width(
        std::iter::once(distribution.column.as_str())
            .chain(distribution.entries.iter().map(|(v, _)| v.as_str())),
    );
    let rows = distribution
        .entries
        .iter()
        .map(|(value, count)| Row::new([value.clone(), count.to_string()]));
    TableWidget::new(rows, [Constraint::Length(width), Constraint::Length(10)])
        .header(
            Row::new([distribution.column.clone(), "count".to_string()]).style(
                Style::default()
                    .fg(theme.table_header)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(block(" Value counts ".to_string(), theme))
        .render(area, buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pivot::{Aggregation, PivotSpec};

    fn buffer_text(buf: &Buffer) -> String {
        let area = buf.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buf[(x, y)].symbol().to_string())
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn pivot_table_shows_keys_and_values() {
        let pivot = PivotTable {
            spec: PivotSpec::new("region", "product", "sales"),
            aggregation: Aggregation::Sum,
            row_keys: vec!["North".into(), "South".into()],
            column_keys: vec!["A".into(), "B".into()],
            cells: vec![vec![40.0, 0.0], vec![0.0, 20.0]],
        };
        let area = Rect::new(0, 0, 60, 8);
        let mut buf = Buffer::empty(area);
        render_pivot_table(area, &mut buf, &pivot, &Theme::default(), 100);
        let text = buffer_text(&buf);
        assert!(text.contains("North"));
        assert!(text.contains("South"));
        assert!(text.contains("40"));
        assert!(text.contains("20"));
    }
}
