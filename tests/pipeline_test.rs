mod common;

use crosstab::chart_data::ChartData;
use crosstab::filter::{self, FilterSelection};
use crosstab::pivot::{Aggregation, PivotSpec};
use crosstab::{pipeline, PipelineOutput, Selector, Session};

fn pivot_of(output: PipelineOutput) -> crosstab::pivot::PivotTable {
    match output {
        PipelineOutput::Pivot { pivot, .. } => pivot,
        other => panic!("expected a pivot, got {:?}", other),
    }
}

#[test]
fn test_sum_by_region_and_product() {
    let session = {
        let mut s = Session::new(common::sales_table());
        s.set_selector(Selector::Columns, "product").unwrap();
        s.set_selector(Selector::Values, "sales").unwrap();
        s
    };
    let pivot = pivot_of(session.run().unwrap());
    assert_eq!(pivot.aggregation, Aggregation::Sum);
    assert_eq!(pivot.row_keys, vec!["North", "South"]);
    assert_eq!(pivot.column_keys, vec!["A", "B"]);
    assert_eq!(pivot.value("North", "A"), Some(40.0));
    assert_eq!(pivot.value("North", "B"), Some(0.0));
    assert_eq!(pivot.value("South", "A"), Some(0.0));
    assert_eq!(pivot.value("South", "B"), Some(20.0));
}

#[test]
fn test_filter_keeps_selected_region() {
    let mut session = Session::new(common::sales_table());
    session.set_selector(Selector::Values, "sales").unwrap();
    session.keep_values("region", &["North"]).unwrap();

    let filtered = filter::apply(session.table(), &session.selection()).unwrap();
    assert_eq!(filtered.height(), 2);

    match session.run().unwrap() {
        PipelineOutput::Pivot {
            filtered_rows,
            pivot,
            ..
        } => {
            assert_eq!(filtered_rows, 2);
            assert_eq!(pivot.row_keys, vec!["North"]);
            assert_eq!(pivot.value("North", "A"), Some(40.0));
            assert_eq!(pivot.value("North", "B"), Some(0.0));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_single_column_shows_distribution() {
    let table = crosstab::Table::from_dataframe(
        polars::prelude::df!("status" => &["open", "closed", "open"]).unwrap(),
    );
    let session = Session::new(table);
    assert!(session.pivot_spec().is_none());
    let output = session.run().unwrap();
    match &output {
        PipelineOutput::Distribution { distribution, .. } => {
            assert_eq!(distribution.count("open"), Some(2));
            assert_eq!(distribution.count("closed"), Some(1));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(output.chart(), Some(ChartData::Bar(_))));
}

#[test]
fn test_empty_filter_result_has_warning_and_no_chart() {
    let mut session = Session::new(common::sales_table());
    session.set_selector(Selector::Values, "sales").unwrap();
    session.keep_values("region", &["North"]).unwrap();
    session.keep_values("product", &["B"]).unwrap();
    let output = session.run().unwrap();
    assert!(output.is_empty_result());
    assert!(output.chart().is_none());
    assert_eq!(output.to_text(), "region\n");
}

#[test]
fn test_text_measure_is_counted() {
    let table = common::inventory_table();
    let spec = PivotSpec::new("site", "kind", "status");
    let output = pipeline::run(&table, &FilterSelection::new(), Some(&spec)).unwrap();
    let pivot = pivot_of(output);
    assert_eq!(pivot.aggregation, Aggregation::Count);
    assert_eq!(pivot.total(), table.height() as f64);
}

#[test]
fn test_filtering_never_adds_rows() {
    let table = common::inventory_table();
    let mut previous = table.height();
    let mut selection = FilterSelection::new();
    let steps: [(&str, &[&str]); 3] = [
        ("site", &["site_0", "site_1", "site_2"]),
        ("kind", &["kind_0", "kind_2"]),
        ("status", &["ok"]),
    ];
    for (column, values) in steps {
        selection.insert(column, values.iter().copied());
        let height = filter::apply(&table, &selection).unwrap().height();
        assert!(height <= previous);
        previous = height;
    }
    assert!(previous > 0);
}

#[test]
fn test_empty_selection_does_not_filter() {
    let table = common::inventory_table();
    let mut selection = FilterSelection::new();
    selection.insert("site", Vec::<String>::new());
    assert_eq!(filter::apply(&table, &selection).unwrap().height(), table.height());
}

#[test]
fn test_pivot_is_dense() {
    let table = common::inventory_table();
    let spec = PivotSpec::new("site", "kind", "quantity");
    let pivot = crosstab::pivot::pivot(&table, &spec).unwrap();
    assert_eq!(pivot.cells.len(), pivot.row_keys.len());
    for row in &pivot.cells {
        assert_eq!(row.len(), pivot.column_keys.len());
    }
    let expected: i64 = (0..60).map(|i| i % 7).sum();
    assert_eq!(pivot.total(), expected as f64);
}

#[test]
fn test_line_chart_has_one_series_per_column_key() {
    let mut session = Session::new(common::sales_table());
    session.set_selector(Selector::Values, "sales").unwrap();
    match session.run().unwrap().chart() {
        Some(ChartData::Line(chart)) => {
            assert_eq!(chart.x_labels, vec!["North", "South"]);
            assert_eq!(chart.series.len(), 2);
            assert_eq!(chart.series[0].name, "A");
            assert_eq!(chart.series[0].points, vec![(0.0, 40.0), (1.0, 0.0)]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_search_narrows_candidates_only() {
    let mut session = Session::new(common::inventory_table());
    session.set_search("site", "_1").unwrap();
    let panel = session.filter("site").unwrap();
    assert_eq!(panel.visible(), vec!["site_1"]);
    assert_eq!(panel.candidates().len(), 4);
}
