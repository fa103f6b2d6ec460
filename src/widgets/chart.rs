//! Chart pane: line chart of the cross-tabulation, bar chart of a
//! distribution, or the empty-result warning.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Style, Stylize},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, LegendPosition,
        Paragraph, Widget, Wrap,
    },
};

use crate::chart_data::{BarChartData, ChartData, LineChartData};
use crate::config::Theme;
use crate::pivot::format_value;

/// Above this many index keys only the first, middle and last are labelled.
const MAX_X_LABELS: usize = 12;

pub fn render_chart(
    area: Rect,
    buf: &mut Buffer,
    chart: Option<&ChartData>,
    warning: Option<&str>,
    theme: &Theme,
    markers: bool,
) {
    match (chart, warning) {
        (_, Some(warning)) => render_warning(area, buf, warning, theme),
        (Some(ChartData::Line(line)), None) => render_line_chart(area, buf, line, theme, markers),
        (Some(ChartData::Bar(bar)), None) => render_bar_chart(area, buf, bar, theme),
        (None, None) => {}
    }
}

fn render_warning(area: Rect, buf: &mut Buffer, warning: &str, theme: &Theme) {
    Paragraph::new(warning)
        .style(Style::default().fg(theme.warning).bold())
        .centered()
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.warning)),
        )
        .render(area, buf);
}

/// Labels spread evenly along the x axis.
fn x_axis_labels(keys: &[String]) -> Vec<String> {
    if keys.len() <= MAX_X_LABELS {
        return keys.to_vec();
    }
    let last = keys.len() - 1;
    vec![keys[0].clone(), keys[last / 2].clone(), keys[last].clone()]
}

fn render_line_chart(
    area: Rect,
    buf: &mut Buffer,
    data: &LineChartData,
    theme: &Theme,
    markers: bool,
) {
    let (y_min, y_max) = data.y_bounds();
    let axis_style = Style::default().fg(theme.text_primary);

    // The first, empty dataset only carries the legend heading.
    let mut datasets = vec![Dataset::default()
        .name(format!("{}:", data.legend_title))
        .style(Style::default().fg(theme.dimmed))
        .data(&[])];
    for (i, series) in data.series.iter().enumerate() {
        let style = Style::default().fg(theme.series_color(i));
        datasets.push(
            Dataset::default()
                .name(series.name.as_str())
                .graph_type(GraphType::Line)
                .marker(symbols::Marker::Braille)
                .style(style)
                .data(&series.points),
        );
        if markers {
            datasets.push(
                Dataset::default()
                    .graph_type(GraphType::Scatter)
                    .marker(symbols::Marker::Dot)
                    .style(style)
                    .data(&series.points),
            );
        }
    }

    let x_labels: Vec<Span> = x_axis_labels(&data.x_labels)
        .into_iter()
        .map(|l| Span::styled(l, axis_style))
        .collect();
    let y_labels = vec![
        Span::styled(format_value(y_min), axis_style),
        Span::styled(format_value((y_min + y_max) / 2.0), axis_style),
        Span::styled(format_value(y_max), axis_style),
    ];
    let x_bound = if data.x_labels.len() > 1 {
        data.x_max()
    } else {
        0.5
    };

    Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.table_border))
                .title(format!(" {} ", data.title)),
        )
        .x_axis(
            Axis::default()
                .title(Line::from(data.x_label.as_str()))
                .style(axis_style)
                .bounds([0.0, x_bound])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title(Line::from(data.y_label.as_str()))
                .style(axis_style)
                .bounds([y_min, y_max])
                .labels(y_labels),
        )
        .legend_position(Some(LegendPosition::TopRight))
        .hidden_legend_constraints((
            ratatui::layout::Constraint::Percentage(50),
            ratatui::layout::Constraint::Percentage(50),
        ))
        .render(area, buf);
}

fn render_bar_chart(area: Rect, buf: &mut Buffer, data: &BarChartData, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.table_border))
        .title(format!(" {} ({}) ", data.title, data.y_label));
    let inner_width = area.width.saturating_sub(2).max(1);
    let n = data.bars.len().max(1) as u16;
    let bar_width = (inner_width / n).saturating_sub(1).clamp(1, 12);
    let bars: Vec<Bar> = data
        .bars
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .value(value.round().max(0.0) as u64)
                .label(Line::from(label.as_str()))
                .style(Style::default().fg(theme.primary))
        })
        .collect();
    BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars))
        .render(area, buf);
}
