use crate::aggregate::StatusTotal;
use crate::filter::FilterSpec;
use crate::month::Month;
use crate::pipeline::{CountryReport, MonthlyReport, Report};
use crate::record::RejectedRow;
use crate::validate::PipelineKind;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Pie,
    StackedBar,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: String,
    pub y: f64,
}

/// One colour group of a chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub points: Vec<Point>,
}

/// A tidy dataset plus the encoding the charting layer should apply
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_field: String,
    pub y_field: String,
    pub color_field: Option<String>,
    pub x_label: String,
    pub y_label: String,
    /// Order of the categorical axis (x for line/bar, slices for pie)
    pub category_order: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }
}

/// A summary table with display labels
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabeledTable {
    pub title: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Everything the UI shell needs to draw one dashboard
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardPayload {
    pub pipeline: PipelineKind,
    pub sheet: String,
    pub filter: FilterSpec,
    pub charts: Vec<ChartSpec>,
    pub tables: Vec<LabeledTable>,
    pub rejected: Vec<RejectedRow>,
}

pub fn build_payload(report: &Report) -> DashboardPayload {
    match report {
        Report::Monthly(r) => monthly_payload(r),
        Report::Country(r) => country_payload(r),
    }
}

pub fn monthly_payload(report: &MonthlyReport) -> DashboardPayload {
    let FilterSpec { provider, year } = &report.filter;

    let line = ChartSpec {
        kind: ChartKind::Line,
        title: format!("Monthly Variations for Provider: {} in {}", provider, year),
        x_field: "month".into(),
        y_field: "count".into(),
        color_field: Some("status".into()),
        x_label: "Month".into(),
        y_label: "Count".into(),
        category_order: Month::category_order(),
        series: group_series(&report.rows, |r| &r.status, |r| {
            (r.month.to_string(), r.count as f64)
        }),
    };

    let pie = status_pie(
        format!("Success and Failure Distribution for {} in {}", provider, year),
        &report.status_totals,
    );

    let table = LabeledTable {
        title: "Monthly Counts".into(),
        columns: labels(&["Year", "Month", "Provider", "Status", "Count"]),
        rows: report
            .rows
            .iter()
            .map(|r| {
                vec![
                    r.year.to_string(),
                    r.month.to_string(),
                    r.provider.clone(),
                    r.status.clone(),
                    r.count.to_string(),
                ]
            })
            .collect(),
    };

    DashboardPayload {
        pipeline: PipelineKind::Monthly,
        sheet: report.sheet.clone(),
        filter: report.filter.clone(),
        charts: vec![line, pie],
        tables: vec![table],
        rejected: report.rejected.clone(),
    }
}

pub fn country_payload(report: &CountryReport) -> DashboardPayload {
    let FilterSpec { provider, year } = &report.filter;

    let share_line = ChartSpec {
        kind: ChartKind::Line,
        title: format!("Monthly Status Share for Provider: {} in {}", provider, year),
        x_field: "month".into(),
        y_field: "percentage".into(),
        color_field: Some("status".into()),
        x_label: "Month".into(),
        y_label: "Percentage".into(),
        category_order: Month::category_order(),
        series: group_series(&report.shares, |r| &r.status, |r| {
            (r.month.to_string(), r.percentage)
        }),
    };

    let mut countries: Vec<String> = Vec::new();
    for row in &report.countries {
        if !countries.contains(&row.country) {
            countries.push(row.country.clone());
        }
    }

    let by_country = ChartSpec {
        kind: ChartKind::StackedBar,
        title: format!("Status by Country for {} in {}", provider, year),
        x_field: "country".into(),
        y_field: "count".into(),
        color_field: Some("status".into()),
        x_label: "Country".into(),
        y_label: "Count".into(),
        category_order: countries,
        series: group_series(&report.countries, |r| &r.status, |r| {
            (r.country.clone(), r.count as f64)
        }),
    };

    let pie = status_pie(
        format!("Success and Failure Distribution for {} in {}", provider, year),
        &report.status_totals,
    );

    let shares = LabeledTable {
        title: "Status Share by Month".into(),
        columns: labels(&[
            "Year",
            "Month",
            "Provider",
            "Status",
            "Count",
            "Total",
            "Percentage",
        ]),
        rows: report
            .shares
            .iter()
            .map(|r| {
                vec![
                    r.year.to_string(),
                    r.month.to_string(),
                    r.provider.clone(),
                    r.status.clone(),
                    r.count.to_string(),
                    r.total_count.to_string(),
                    format!("{:.2}", r.percentage),
                ]
            })
            .collect(),
    };

    let country_table = LabeledTable {
        title: "Counts by Country".into(),
        columns: labels(&["Country", "Status", "Count"]),
        rows: report
            .countries
            .iter()
            .map(|r| vec![r.country.clone(), r.status.clone(), r.count.to_string()])
            .collect(),
    };

    DashboardPayload {
        pipeline: PipelineKind::Country,
        sheet: report.sheet.clone(),
        filter: report.filter.clone(),
        charts: vec![share_line, by_country, pie],
        tables: vec![shares, country_table],
        rejected: report.rejected.clone(),
    }
}

fn status_pie(title: String, totals: &[StatusTotal]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Pie,
        title,
        x_field: "status".into(),
        y_field: "count".into(),
        color_field: Some("status".into()),
        x_label: "Status".into(),
        y_label: "Count".into(),
        category_order: totals.iter().map(|t| t.status.clone()).collect(),
        series: vec![Series {
            name: "count".into(),
            points: totals
                .iter()
                .map(|t| Point {
                    x: t.status.clone(),
                    y: t.count as f64,
                })
                .collect(),
        }],
    }
}

// Split rows into one series per colour key, keeping first-seen order
fn group_series<T, K, P>(rows: &[T], key: K, point: P) -> Vec<Series>
where
    K: Fn(&T) -> &String,
    P: Fn(&T) -> (String, f64),
{
    let mut series: Vec<Series> = Vec::new();
    for row in rows {
        let name = key(row);
        let (x, y) = point(row);
        match series.iter_mut().find(|s| &s.name == name) {
            Some(existing) => existing.points.push(Point { x, y }),
            None => series.push(Series {
                name: name.clone(),
                points: vec![Point { x, y }],
            }),
        }
    }
    series
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
