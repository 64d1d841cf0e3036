//! Dashboard output
//!
//! Renders the cached/aggregated performance table as a sortable,
//! filterable terminal table. The engine makes no row-order guarantee, so
//! rows are always sorted explicitly before display. Unavailable returns
//! render as "N/A", never as zero.

use colored::Colorize;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tabled::{settings::Style, Table, Tabled};

use crate::aggregator::{PerformanceRecord, PerformanceTable};
use crate::pricing::PriceSeries;
use crate::utils::{format_currency, format_return, format_trades, format_volume};

/// Column the table can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SortKey {
    Ticker,
    Sector,
    Close,
    Volume,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    Ytd,
}

#[derive(Tabled)]
struct PerformanceRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Setor")]
    sector: String,
    #[tabled(rename = "Abertura")]
    open: String,
    #[tabled(rename = "Máxima")]
    high: String,
    #[tabled(rename = "Mínima")]
    low: String,
    #[tabled(rename = "Fechamento")]
    close: String,
    #[tabled(rename = "Volume R$")]
    volume: String,
    #[tabled(rename = "Qtd Negócios")]
    trades: String,
    #[tabled(rename = "Diário %")]
    daily: String,
    #[tabled(rename = "Semanal %")]
    weekly: String,
    #[tabled(rename = "Mensal %")]
    monthly: String,
    #[tabled(rename = "Trimestral %")]
    quarterly: String,
    #[tabled(rename = "Anual %")]
    yearly: String,
    #[tabled(rename = "YTD %")]
    ytd: String,
}

/// Render the performance table, optionally filtered to one sector and
/// sorted by the requested column (descending puts the biggest gainers on
/// top).
pub fn render_table(
    table: &PerformanceTable,
    sector_filter: Option<&str>,
    sort: SortKey,
    descending: bool,
) -> String {
    let mut records: Vec<&PerformanceRecord> = table
        .rows
        .iter()
        .filter(|r| sector_filter.map_or(true, |s| r.sector.eq_ignore_ascii_case(s)))
        .collect();

    sort_records(&mut records, sort, descending);

    if records.is_empty() {
        return "Nenhuma ação disponível para exibir".to_string();
    }

    let rows: Vec<PerformanceRow> = records.iter().map(|r| to_row(r)).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

fn to_row(record: &PerformanceRecord) -> PerformanceRow {
    let ticker = if record.suspicious {
        format!("{} ⚠", record.ticker)
    } else {
        record.ticker.clone()
    };
    PerformanceRow {
        ticker,
        sector: record.sector.clone(),
        open: optional_currency(record.open),
        high: optional_currency(record.high),
        low: optional_currency(record.low),
        close: format_currency(record.close),
        volume: format_volume(record.financial_volume),
        trades: format_trades(record.trades),
        daily: colorize_return(record.returns.daily),
        weekly: colorize_return(record.returns.weekly),
        monthly: colorize_return(record.returns.monthly),
        quarterly: colorize_return(record.returns.quarterly),
        yearly: colorize_return(record.returns.yearly),
        ytd: colorize_return(record.returns.ytd),
    }
}

fn optional_currency(value: Option<Decimal>) -> String {
    match value {
        Some(v) => format_currency(v),
        None => "N/A".to_string(),
    }
}

fn colorize_return(value: Option<Decimal>) -> String {
    let text = format_return(value);
    match value {
        Some(pct) if pct > Decimal::ZERO => text.green().to_string(),
        Some(pct) if pct < Decimal::ZERO => text.red().to_string(),
        Some(_) => text,
        None => text.dimmed().to_string(),
    }
}

fn sort_records(records: &mut [&PerformanceRecord], sort: SortKey, descending: bool) {
    let direction = |ord: std::cmp::Ordering| if descending { ord.reverse() } else { ord };
    records.sort_by(|a, b| match sort {
        SortKey::Ticker => direction(a.ticker.cmp(&b.ticker)),
        SortKey::Sector => direction(a.sector.cmp(&b.sector).then(a.ticker.cmp(&b.ticker))),
        SortKey::Close => direction(a.close.cmp(&b.close)),
        SortKey::Volume => cmp_optional(a.financial_volume, b.financial_volume, descending),
        SortKey::Daily => cmp_optional(a.returns.daily, b.returns.daily, descending),
        SortKey::Weekly => cmp_optional(a.returns.weekly, b.returns.weekly, descending),
        SortKey::Monthly => cmp_optional(a.returns.monthly, b.returns.monthly, descending),
        SortKey::Quarterly => cmp_optional(a.returns.quarterly, b.returns.quarterly, descending),
        SortKey::Yearly => cmp_optional(a.returns.yearly, b.returns.yearly, descending),
        SortKey::Ytd => cmp_optional(a.returns.ytd, b.returns.ytd, descending),
    });
}

/// Unavailable values always sort below available ones, in both directions
fn cmp_optional(a: Option<Decimal>, b: Option<Decimal>, descending: bool) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            if descending {
                b.cmp(&a)
            } else {
                a.cmp(&b)
            }
        }
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

#[derive(Tabled)]
struct ComparisonRow {
    #[tabled(rename = "Data")]
    date: String,
    #[tabled(rename = "A")]
    first: String,
    #[tabled(rename = "B")]
    second: String,
}

/// Side-by-side comparison of two close series, both normalized to 100 at
/// the first date they have in common. Dates present in only one series
/// are skipped.
pub fn render_comparison(
    ticker_a: &str,
    series_a: &PriceSeries,
    ticker_b: &str,
    series_b: &PriceSeries,
) -> String {
    let closes_b: BTreeMap<_, _> = series_b.bars().iter().map(|b| (b.date, b.close)).collect();

    let common: Vec<(chrono::NaiveDate, Decimal, Decimal)> = series_a
        .bars()
        .iter()
        .filter_map(|bar| closes_b.get(&bar.date).map(|&cb| (bar.date, bar.close, cb)))
        .collect();

    let Some(&(_, base_a, base_b)) = common.first() else {
        return format!("{} e {} não têm datas em comum", ticker_a, ticker_b);
    };
    if base_a <= Decimal::ZERO || base_b <= Decimal::ZERO {
        return format!("{} e {} não têm preços comparáveis", ticker_a, ticker_b);
    }

    let hundred = Decimal::from(100);
    // Weekly samples plus the final bar keep the table readable
    let step = 7.max(common.len() / 20);
    let rows: Vec<ComparisonRow> = common
        .iter()
        .enumerate()
        .filter(|(i, _)| i % step == 0 || *i == common.len() - 1)
        .map(|(_, &(date, ca, cb))| ComparisonRow {
            date: date.format("%d/%m/%Y").to_string(),
            first: format!("{:.2}", ca / base_a * hundred),
            second: format!("{:.2}", cb / base_b * hundred),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!(
        "Base 100 em {} — A = {}, B = {}\n{}",
        common[0].0.format("%d/%m/%Y"),
        ticker_a,
        ticker_b,
        table
    )
}
