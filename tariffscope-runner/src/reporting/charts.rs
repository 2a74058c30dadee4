//! SVG chart rendering.
//!
//! Six charts per run:
//! - trade volume time series (one line per partner and flow, period boundaries marked)
//! - trade balance time series (per partner plus total)
//! - average volume by period (grouped bars)
//! - average balance by period (grouped bars)
//! - period transition heat-map (percentage changes, `N/A` cells greyed out)
//! - change relative to the pre-tariff baseline
//!
//! Charts are plain SVG strings with fixed dimensions. Undefined values break
//! lines and leave bars empty; they are never drawn as zero.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{Datelike, NaiveDate};

use tariffscope_core::{BalanceScope, Flow, Metric, Partner, PeriodBoundaries, UndefinedReason};

use super::reports::format::{escape, fmt_pct};
use super::reports::ChartLink;
use crate::runner::AnalysisResult;

const WIDTH: f64 = 960.0;
const HEIGHT: f64 = 500.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_BOTTOM: f64 = 60.0;
const MARGIN_LEFT: f64 = 80.0;
const MARGIN_RIGHT: f64 = 190.0;

const TOTAL_COLOR: &str = "#2ca02c";
const MISSING_FILL: &str = "#d9d9d9";

/// A rendered chart ready to be written or embedded.
#[derive(Debug, Clone)]
pub struct Chart {
    pub file_name: &'static str,
    pub title: &'static str,
    pub svg: String,
}

impl Chart {
    pub fn link(&self) -> ChartLink {
        ChartLink {
            file_name: self.file_name.to_string(),
            title: self.title.to_string(),
        }
    }
}

pub fn series_color(partner: Partner, flow: Flow) -> &'static str {
    match (partner, flow) {
        (Partner::Usa, Flow::Export) => "#1f77b4",
        (Partner::Usa, Flow::Import) => "#7fb2e5",
        (Partner::China, Flow::Export) => "#d62728",
        (Partner::China, Flow::Import) => "#f08a8b",
    }
}

fn partner_color(partner: Partner) -> &'static str {
    series_color(partner, Flow::Export)
}

fn series_label(partner: Partner, flow: Flow) -> String {
    match flow {
        Flow::Export => format!("Exports to {partner}"),
        Flow::Import => format!("Imports from {partner}"),
    }
}

/// Render every chart for a run.
pub fn render_charts(result: &AnalysisResult) -> Vec<Chart> {
    vec![
        Chart {
            file_name: "trade_volume_time_series.svg",
            title: "Colombia trade volume over time",
            svg: volume_time_series(result),
        },
        Chart {
            file_name: "trade_balance_time_series.svg",
            title: "Colombia trade balance over time",
            svg: balance_time_series(result),
        },
        Chart {
            file_name: "trade_volume_by_period.svg",
            title: "Average monthly trade volume by period",
            svg: volume_by_period(result),
        },
        Chart {
            file_name: "trade_balance_by_period.svg",
            title: "Average monthly trade balance by period",
            svg: balance_by_period(result),
        },
        Chart {
            file_name: "transition_heatmap.svg",
            title: "Percentage change between periods",
            svg: transition_heatmap(result),
        },
        Chart {
            file_name: "relative_change_from_baseline.svg",
            title: "Change relative to pre-tariff average",
            svg: relative_change(result),
        },
    ]
}

// ─── Individual charts ──────────────────────────────────────────────

fn volume_time_series(result: &AnalysisResult) -> String {
    let mut sums: BTreeMap<(Partner, Flow), BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for r in &result.records {
        *sums
            .entry((r.partner, r.flow))
            .or_default()
            .entry(r.date)
            .or_insert(0.0) += r.value;
    }
    let lines: Vec<Line> = sums
        .into_iter()
        .map(|((partner, flow), points)| Line {
            label: series_label(partner, flow),
            color: series_color(partner, flow),
            points: points.into_iter().map(|(d, v)| (d, Some(v))).collect(),
        })
        .collect();
    time_series_chart(
        "Colombia trade volume over time",
        "Millions USD",
        &lines,
        &result.boundaries,
        false,
    )
}

fn balance_time_series(result: &AnalysisResult) -> String {
    let mut lines: Vec<Line> = Partner::ALL
        .iter()
        .map(|&p| Line {
            label: format!("Balance with {p}"),
            color: partner_color(p),
            points: result
                .balance_series
                .iter()
                .map(|b| (b.date, b.partner(p).value()))
                .collect(),
        })
        .collect();
    lines.push(Line {
        label: "Total balance".into(),
        color: TOTAL_COLOR,
        points: result
            .balance_series
            .iter()
            .map(|b| (b.date, b.total.value()))
            .collect(),
    });
    time_series_chart(
        "Colombia trade balance over time",
        "Millions USD (exports - imports)",
        &lines,
        &result.boundaries,
        true,
    )
}

fn volume_by_period(result: &AnalysisResult) -> String {
    let agg = &result.aggregation;
    let categories: Vec<String> = agg.periods().iter().map(|p| p.label().to_string()).collect();
    let series: Vec<BarSeries> = Partner::ALL
        .iter()
        .flat_map(|&p| Flow::ALL.iter().map(move |&f| (p, f)))
        .map(|(p, f)| BarSeries {
            label: series_label(p, f),
            color: series_color(p, f),
            values: agg.summaries.iter().map(|s| s.mean(p, f)).collect(),
        })
        .collect();
    grouped_bar_chart(
        "Average monthly trade volume by period",
        "Millions USD",
        &categories,
        &series,
    )
}

fn balance_by_period(result: &AnalysisResult) -> String {
    let agg = &result.aggregation;
    let categories: Vec<String> = agg.periods().iter().map(|p| p.label().to_string()).collect();
    let mut series: Vec<BarSeries> = Partner::ALL
        .iter()
        .map(|&p| BarSeries {
            label: format!("Balance with {p}"),
            color: partner_color(p),
            values: agg.summaries.iter().map(|s| s.balance(p).value()).collect(),
        })
        .collect();
    series.push(BarSeries {
        label: "Total balance".into(),
        color: TOTAL_COLOR,
        values: agg.summaries.iter().map(|s| s.total_balance.value()).collect(),
    });
    grouped_bar_chart(
        "Average monthly trade balance by period",
        "Millions USD (exports - imports)",
        &categories,
        &series,
    )
}

fn transition_heatmap(result: &AnalysisResult) -> String {
    let agg = &result.aggregation;
    let pairs = agg.transition_pairs();
    let columns: Vec<(String, String)> = pairs
        .iter()
        .map(|(a, b)| (a.slug().to_string(), format!("→ {}", b.slug())))
        .collect();

    let mut rows: Vec<(String, Vec<Metric>)> = Vec::new();
    for partner in Partner::ALL {
        for flow in Flow::ALL {
            let cells = pairs
                .iter()
                .map(|(from, _)| {
                    agg.transition(*from, partner, flow)
                        .map(|t| t.change)
                        .unwrap_or(Metric::Undefined(UndefinedReason::NoData))
                })
                .collect();
            rows.push((series_label(partner, flow), cells));
        }
    }
    let scopes = Partner::ALL
        .iter()
        .map(|&p| BalanceScope::Partner(p))
        .chain(std::iter::once(BalanceScope::Total));
    for scope in scopes {
        let cells = pairs
            .iter()
            .map(|(from, _)| {
                agg.balance_transition(*from, scope)
                    .map(|t| t.change)
                    .unwrap_or(Metric::Undefined(UndefinedReason::NoData))
            })
            .collect();
        let label = match scope {
            BalanceScope::Partner(p) => format!("Balance with {p}"),
            BalanceScope::Total => "Total balance".to_string(),
        };
        rows.push((label, cells));
    }

    heatmap("Percentage change between periods", &columns, &rows)
}

fn relative_change(result: &AnalysisResult) -> String {
    let mut by_key: BTreeMap<(Partner, Flow), BTreeMap<NaiveDate, Option<f64>>> = BTreeMap::new();
    for p in &result.relative_series {
        by_key
            .entry((p.partner, p.flow))
            .or_default()
            .insert(p.date, p.change_pct.value());
    }
    let lines: Vec<Line> = by_key
        .into_iter()
        .map(|((partner, flow), points)| Line {
            label: series_label(partner, flow),
            color: series_color(partner, flow),
            points: points.into_iter().collect(),
        })
        .collect();
    time_series_chart(
        "Change relative to pre-tariff average",
        "% change from baseline",
        &lines,
        &result.boundaries,
        true,
    )
}

// ─── Primitives ─────────────────────────────────────────────────────

struct Line {
    label: String,
    color: &'static str,
    points: Vec<(NaiveDate, Option<f64>)>,
}

struct BarSeries {
    label: String,
    color: &'static str,
    /// One value per category; `None` leaves a gap.
    values: Vec<Option<f64>>,
}

/// Linear map from a data domain to a pixel range.
#[derive(Debug, Clone, Copy)]
struct Scale {
    d0: f64,
    d1: f64,
    r0: f64,
    r1: f64,
}

impl Scale {
    fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            d0: domain.0,
            d1: domain.1,
            r0: range.0,
            r1: range.1,
        }
    }

    fn map(&self, v: f64) -> f64 {
        if self.d1 == self.d0 {
            return (self.r0 + self.r1) / 2.0;
        }
        self.r0 + (v - self.d0) / (self.d1 - self.d0) * (self.r1 - self.r0)
    }
}

/// Round tick values covering `[min, max]`, roughly `n` of them.
fn nice_ticks(min: f64, max: f64, n: usize) -> Vec<f64> {
    let (min, max) = if (max - min).abs() < f64::EPSILON {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.1 };
        (min - pad, max + pad)
    } else {
        (min, max)
    };
    let raw = (max - min) / n.max(1) as f64;
    if !raw.is_finite() || raw <= 0.0 {
        return vec![min.max(-f64::MAX), max.min(f64::MAX)];
    }
    let magnitude = 10f64.powf(raw.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw)
        .unwrap_or(10.0 * magnitude);

    let first = (min / step).floor() as i64;
    let last = (max / step).ceil() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn tick_label(v: f64) -> String {
    if v.abs() >= 1000.0 {
        format!("{:.0}", v)
    } else if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.1}", v)
    }
}

struct Canvas {
    svg: String,
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl Canvas {
    fn new(title: &str, margin_left: f64) -> Self {
        let mut svg = String::with_capacity(32 * 1024);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="Helvetica, Arial, sans-serif" font-size="12">"#
        );
        svg.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
        let _ = write!(
            svg,
            r#"<text x="{}" y="30" text-anchor="middle" font-size="17" font-weight="bold">{}</text>"#,
            WIDTH / 2.0,
            escape(title)
        );
        Self {
            svg,
            left: margin_left,
            top: MARGIN_TOP,
            right: WIDTH - MARGIN_RIGHT,
            bottom: HEIGHT - MARGIN_BOTTOM,
        }
    }

    fn y_axis(&mut self, y: &Scale, ticks: &[f64], label: &str) {
        for &t in ticks {
            let py = y.map(t);
            let _ = write!(
                self.svg,
                r##"<line x1="{:.1}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="#e5e5e5"/><text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"##,
                self.left,
                self.right,
                self.left - 6.0,
                py + 4.0,
                tick_label(t)
            );
        }
        let mid = (self.top + self.bottom) / 2.0;
        let _ = write!(
            self.svg,
            r#"<text x="18" y="{mid:.1}" text-anchor="middle" transform="rotate(-90 18 {mid:.1})">{}</text>"#,
            escape(label)
        );
        let _ = write!(
            self.svg,
            r##"<line x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}" stroke="#333"/><line x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}" stroke="#333"/>"##,
            l = self.left,
            t = self.top,
            b = self.bottom,
            r = self.right
        );
    }

    fn zero_line(&mut self, y: &Scale) {
        let py = y.map(0.0);
        let _ = write!(
            self.svg,
            r##"<line x1="{:.1}" y1="{py:.1}" x2="{:.1}" y2="{py:.1}" stroke="#555" stroke-dasharray="2,2"/>"##,
            self.left, self.right
        );
    }

    fn legend(&mut self, entries: &[(&str, &str)]) {
        let x = self.right + 16.0;
        for (i, (label, color)) in entries.iter().enumerate() {
            let y = self.top + 10.0 + i as f64 * 20.0;
            let _ = write!(
                self.svg,
                r#"<rect x="{x:.1}" y="{:.1}" width="12" height="12" fill="{color}"/><text x="{:.1}" y="{:.1}">{}</text>"#,
                y - 10.0,
                x + 18.0,
                y,
                escape(label)
            );
        }
    }

    fn no_data(&mut self) {
        let _ = write!(
            self.svg,
            r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" fill="#888">No data</text>"##,
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0
        );
    }

    fn finish(mut self) -> String {
        self.svg.push_str("</svg>");
        self.svg
    }
}

fn days(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn time_series_chart(
    title: &str,
    y_label: &str,
    lines: &[Line],
    boundaries: &PeriodBoundaries,
    include_zero: bool,
) -> String {
    let mut canvas = Canvas::new(title, MARGIN_LEFT);

    let dates: Vec<NaiveDate> = lines
        .iter()
        .flat_map(|l| l.points.iter().map(|(d, _)| *d))
        .collect();
    let values: Vec<f64> = lines
        .iter()
        .flat_map(|l| l.points.iter().filter_map(|(_, v)| *v))
        .collect();
    let (Some(&dmin), Some(&dmax)) = (dates.iter().min(), dates.iter().max()) else {
        canvas.no_data();
        return canvas.finish();
    };
    if values.is_empty() {
        canvas.no_data();
        return canvas.finish();
    }

    let mut vmin = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let mut vmax = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if include_zero {
        vmin = vmin.min(0.0);
        vmax = vmax.max(0.0);
    }
    let ticks = nice_ticks(vmin, vmax, 6);
    let (tmin, tmax) = (ticks[0], ticks[ticks.len() - 1]);

    let x = Scale::new((days(dmin), days(dmax)), (canvas.left, canvas.right));
    let y = Scale::new((tmin, tmax), (canvas.bottom, canvas.top));
    canvas.y_axis(&y, &ticks, y_label);
    if include_zero {
        canvas.zero_line(&y);
    }

    for year in dmin.year()..=dmax.year() {
        let Some(jan1) = NaiveDate::from_ymd_opt(year, 1, 1) else {
            continue;
        };
        if jan1 < dmin || jan1 > dmax {
            continue;
        }
        let px = x.map(days(jan1));
        let _ = write!(
            canvas.svg,
            r##"<line x1="{px:.1}" y1="{b:.1}" x2="{px:.1}" y2="{:.1}" stroke="#333"/><text x="{px:.1}" y="{:.1}" text-anchor="middle">{year}</text>"##,
            canvas.bottom + 5.0,
            canvas.bottom + 20.0,
            b = canvas.bottom
        );
    }

    for (i, (date, period)) in boundaries.markers().iter().enumerate() {
        if *date < dmin || *date > dmax {
            continue;
        }
        let px = x.map(days(*date));
        let ly = canvas.top - 14.0 + (i % 2) as f64 * 11.0;
        let _ = write!(
            canvas.svg,
            r##"<line x1="{px:.1}" y1="{:.1}" x2="{px:.1}" y2="{:.1}" stroke="#999" stroke-dasharray="5,4"/><text x="{px:.1}" y="{ly:.1}" text-anchor="middle" font-size="10" fill="#555">{}</text>"##,
            canvas.top,
            canvas.bottom,
            escape(period.label())
        );
    }

    for line in lines {
        for segment in segments(&line.points) {
            if segment.len() == 1 {
                let (d, v) = segment[0];
                let _ = write!(
                    canvas.svg,
                    r#"<circle cx="{:.1}" cy="{:.1}" r="2.5" fill="{}"/>"#,
                    x.map(days(d)),
                    y.map(v),
                    line.color
                );
                continue;
            }
            let pts: Vec<String> = segment
                .iter()
                .map(|(d, v)| format!("{:.1},{:.1}", x.map(days(*d)), y.map(*v)))
                .collect();
            let _ = write!(
                canvas.svg,
                r#"<polyline points="{}" fill="none" stroke="{}" stroke-width="2"/>"#,
                pts.join(" "),
                line.color
            );
        }
    }

    let legend: Vec<(&str, &str)> = lines.iter().map(|l| (l.label.as_str(), l.color)).collect();
    canvas.legend(&legend);
    canvas.finish()
}

/// Split a series into runs of consecutive defined points.
fn segments(points: &[(NaiveDate, Option<f64>)]) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (d, v) in points {
        match v {
            Some(v) => current.push((*d, *v)),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn grouped_bar_chart(
    title: &str,
    y_label: &str,
    categories: &[String],
    series: &[BarSeries],
) -> String {
    let mut canvas = Canvas::new(title, MARGIN_LEFT);
    let values: Vec<f64> = series
        .iter()
        .flat_map(|s| s.values.iter().filter_map(|v| *v))
        .collect();
    if categories.is_empty() || values.is_empty() {
        canvas.no_data();
        return canvas.finish();
    }

    let vmin = values.iter().cloned().fold(0.0, f64::min);
    let vmax = values.iter().cloned().fold(0.0, f64::max);
    let ticks = nice_ticks(vmin, vmax, 6);
    let y = Scale::new((ticks[0], ticks[ticks.len() - 1]), (canvas.bottom, canvas.top));
    canvas.y_axis(&y, &ticks, y_label);
    canvas.zero_line(&y);

    let group_w = (canvas.right - canvas.left) / categories.len() as f64;
    let bar_w = group_w * 0.8 / series.len().max(1) as f64;
    let zero = y.map(0.0);

    for (ci, category) in categories.iter().enumerate() {
        let gx = canvas.left + ci as f64 * group_w + group_w * 0.1;
        for (si, s) in series.iter().enumerate() {
            let bx = gx + si as f64 * bar_w;
            match s.values.get(ci).copied().flatten() {
                Some(v) => {
                    let py = y.map(v);
                    let _ = write!(
                        canvas.svg,
                        r#"<rect x="{bx:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="{}"><title>{}: {v:.2}</title></rect>"#,
                        py.min(zero),
                        (bar_w - 2.0).max(1.0),
                        (py - zero).abs(),
                        s.color,
                        escape(&s.label)
                    );
                }
                None => {
                    let _ = write!(
                        canvas.svg,
                        r##"<text x="{:.1}" y="{:.1}" text-anchor="middle" font-size="9" fill="#888">n/a</text>"##,
                        bx + bar_w / 2.0,
                        zero - 4.0
                    );
                }
            }
        }
        let _ = write!(
            canvas.svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            canvas.left + (ci as f64 + 0.5) * group_w,
            canvas.bottom + 20.0,
            escape(category)
        );
    }

    let legend: Vec<(&str, &str)> = series.iter().map(|s| (s.label.as_str(), s.color)).collect();
    canvas.legend(&legend);
    canvas.finish()
}

/// Diverging red/white/green fill for a percentage, saturating at `max_abs`.
fn heat_color(v: f64, max_abs: f64) -> String {
    let t = if max_abs > 0.0 {
        (v / max_abs).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    let (r, g, b) = if t >= 0.0 { (26.0, 152.0, 80.0) } else { (215.0, 48.0, 39.0) };
    let a = t.abs();
    let mix = |c: f64| (255.0 + (c - 255.0) * a).round() as u8;
    format!("rgb({},{},{})", mix(r), mix(g), mix(b))
}

fn heatmap(title: &str, columns: &[(String, String)], rows: &[(String, Vec<Metric>)]) -> String {
    let mut canvas = Canvas::new(title, 150.0);
    canvas.right = WIDTH - 40.0;
    if columns.is_empty() || rows.is_empty() {
        canvas.no_data();
        return canvas.finish();
    }

    let max_abs = rows
        .iter()
        .flat_map(|(_, cells)| cells.iter().filter_map(|m| m.value()))
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));

    let cell_w = (canvas.right - canvas.left) / columns.len() as f64;
    let cell_h = (canvas.bottom - canvas.top) / rows.len() as f64;

    for (ri, (label, cells)) in rows.iter().enumerate() {
        let cy = canvas.top + ri as f64 * cell_h;
        let _ = write!(
            canvas.svg,
            r#"<text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"#,
            canvas.left - 8.0,
            cy + cell_h / 2.0 + 4.0,
            escape(label)
        );
        for (ci, cell) in cells.iter().enumerate() {
            let cx = canvas.left + ci as f64 * cell_w;
            let fill = match cell.value() {
                Some(v) => heat_color(v, max_abs),
                None => MISSING_FILL.to_string(),
            };
            let _ = write!(
                canvas.svg,
                r#"<rect x="{cx:.1}" y="{cy:.1}" width="{cell_w:.1}" height="{cell_h:.1}" fill="{fill}" stroke="white"/><text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
                cx + cell_w / 2.0,
                cy + cell_h / 2.0 + 4.0,
                fmt_pct(cell)
            );
        }
    }

    for (ci, (top_line, bottom_line)) in columns.iter().enumerate() {
        let cx = canvas.left + (ci as f64 + 0.5) * cell_w;
        let _ = write!(
            canvas.svg,
            r#"<text x="{cx:.1}" y="{:.1}" text-anchor="middle" font-size="11"><tspan x="{cx:.1}">{}</tspan><tspan x="{cx:.1}" dy="14">{}</tspan></text>"#,
            canvas.bottom + 18.0,
            escape(top_line),
            escape(bottom_line)
        );
    }

    canvas.finish()
}
