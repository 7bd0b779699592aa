//! Plain-text rendering of a [`DashboardView`].

use std::io::{self, Write};

use chrono::NaiveDate;

use crate::view::{ChartSeries, DashboardView, RegionView};

pub const TITLE: &str = "Weekly agricultural weather forecast";
pub const SOURCE_URL: &str = "https://www.cwa.gov.tw/V8/C/W/County/index.html";

const CHART_WIDTH: usize = 40;

pub fn render<W: Write>(view: &DashboardView, out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", TITLE)?;
    writeln!(out, "Source: Central Weather Administration ({})", SOURCE_URL)?;
    writeln!(out)?;

    match view {
        DashboardView::NoData => {
            writeln!(out, "No forecast data in the store yet.")?;
            writeln!(out, "Run `agriwx-crawler` to fetch the weekly forecast.")?;
        }
        DashboardView::NoMatches { region, start, end } => {
            writeln!(out, "No forecast rows for {} between {} and {}.", region, start, end)?;
            writeln!(out, "Try a wider date range or another region.")?;
        }
        DashboardView::Populated(region) => render_region(region, out)?,
    }

    Ok(())
}

fn render_region<W: Write>(view: &RegionView, out: &mut W) -> io::Result<()> {
    writeln!(out, "Region: {}  ({} to {})", view.region, view.start, view.end)?;
    writeln!(out)?;

    writeln!(out, "Latest day ({})", view.metrics.latest_date)?;
    writeln!(out, "  Max temperature: {}", fmt_temp(view.metrics.latest_max))?;
    writeln!(out, "  Min temperature: {}", fmt_temp(view.metrics.latest_min))?;
    writeln!(out)?;

    writeln!(out, "Temperature trend (L = min, H = max)")?;
    render_chart(&view.chart, out)?;
    writeln!(out)?;

    writeln!(
        out,
        "{:<10}  {:>8}  {:>8}  {}",
        "Date", "Max (℃)", "Min (℃)", "Weather"
    )?;
    for row in &view.rows {
        writeln!(
            out,
            "{:<10}  {:>8}  {:>8}  {}",
            row.date.to_string(),
            fmt_cell(row.max_temp),
            fmt_cell(row.min_temp),
            row.description.as_deref().unwrap_or("-")
        )?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "Data updated (UTC): {}",
        view.last_fetch.format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(out, "Run `agriwx-crawler` to pull a newer forecast.")?;
    Ok(())
}

fn render_chart<W: Write>(chart: &ChartSeries, out: &mut W) -> io::Result<()> {
    let Some((lo, hi)) = chart.range() else {
        writeln!(out, "  (no temperature values in range)")?;
        return Ok(());
    };

    let mut dates: Vec<_> = chart.max.iter().chain(&chart.min).map(|(d, _)| *d).collect();
    dates.sort();
    dates.dedup();

    for date in dates {
        let max = lookup(&chart.max, date);
        let min = lookup(&chart.min, date);
        let mut line = vec![' '; CHART_WIDTH + 1];

        if let (Some(min), Some(max)) = (min, max) {
            let (a, b) = ordered(column(min, lo, hi), column(max, lo, hi));
            for cell in &mut line[a..=b] {
                *cell = '=';
            }
        }
        if let Some(min) = min {
            line[column(min, lo, hi)] = 'L';
        }
        if let Some(max) = max {
            line[column(max, lo, hi)] = 'H';
        }

        writeln!(
            out,
            "  {} |{}| {} / {}",
            date.format("%m-%d"),
            line.into_iter().collect::<String>(),
            fmt_cell(min),
            fmt_cell(max)
        )?;
    }
    writeln!(out, "  {:5} {:.1}℃ .. {:.1}℃", "", lo, hi)?;
    Ok(())
}

fn lookup(series: &[(NaiveDate, f64)], date: NaiveDate) -> Option<f64> {
    series.iter().find(|(d, _)| *d == date).map(|(_, t)| *t)
}

fn column(value: f64, lo: f64, hi: f64) -> usize {
    if hi <= lo {
        return CHART_WIDTH / 2;
    }
    let scaled = (value - lo) / (hi - lo) * CHART_WIDTH as f64;
    (scaled.round() as usize).min(CHART_WIDTH)
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn fmt_temp(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |t| format!("{:.1} ℃", t))
}

fn fmt_cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |t| format!("{:.1}", t))
}
