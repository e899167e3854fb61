use crate::error::CountOverflow;
use crate::month::Month;
use crate::record::Record;
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Summed count of one (year, month, provider, status) group
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AggregateRow {
    pub year: i32,
    pub month: Month,
    pub provider: String,
    pub status: String,
    pub count: u64,
}

/// An [`AggregateRow`] joined with the total of its (year, month, provider) group
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ShareRow {
    pub year: i32,
    pub month: Month,
    pub provider: String,
    pub status: String,
    pub count: u64,
    pub total_count: u64,
    /// `100 * count / total_count`, or 0 when the group total is 0
    pub percentage: f64,
}

/// Summed count of one (country, status) group
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CountryAggregateRow {
    pub country: String,
    pub status: String,
    pub count: u64,
}

/// Summed count of one status over the whole filtered table
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusTotal {
    pub status: String,
    pub count: u64,
}

/// Rows that can be put in calendar order
pub trait MonthKeyed {
    fn month(&self) -> Month;
}

impl MonthKeyed for AggregateRow {
    fn month(&self) -> Month {
        self.month
    }
}

impl MonthKeyed for ShareRow {
    fn month(&self) -> Month {
        self.month
    }
}

impl MonthKeyed for Record {
    fn month(&self) -> Month {
        self.month
    }
}

/// Stable sort by the fixed month enumeration
pub fn sort_by_month<T: MonthKeyed>(rows: &mut [T]) {
    rows.sort_by_key(|row| row.month());
}

fn add_count(sum: &mut u64, count: u64, group: impl FnOnce() -> String) -> Result<(), CountOverflow> {
    match sum.checked_add(count) {
        Some(total) => {
            *sum = total;
            Ok(())
        }
        None => Err(CountOverflow { group: group() }),
    }
}

fn group_sum<K, F>(records: &[&Record], key: F) -> Result<BTreeMap<K, u64>, CountOverflow>
where
    K: Ord + fmt::Debug,
    F: Fn(&Record) -> K,
{
    let mut groups = BTreeMap::new();
    for record in records {
        let sum = groups.entry(key(*record)).or_insert(0);
        add_count(sum, record.count, || format!("{:?}", key(*record)))?;
    }
    Ok(groups)
}

/// Sum `count` per (month, status) within the filtered rows
///
/// Year and provider are part of the key as well, though a provider/year
/// filter leaves a single value for each. Only groups present in the input
/// produce a row. Fails when a group total does not fit in a `u64`.
pub fn aggregate_monthly(records: &[&Record]) -> Result<Vec<AggregateRow>, CountOverflow> {
    let groups = group_sum(records, |r| {
        (r.year, r.provider.clone(), r.month, r.status.clone())
    })?;

    let rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|((year, provider, month, status), count)| AggregateRow {
            year,
            month,
            provider,
            status,
            count,
        })
        .collect();

    debug!("monthly aggregation: {} rows -> {} groups", records.len(), rows.len());
    Ok(rows)
}

#[derive(Default)]
struct GroupTotals {
    total: u64,
    statuses: BTreeMap<String, u64>,
}

/// Per-status sums joined with their (year, month, provider) totals
///
/// Both sums are accumulated in one traversal of the filtered rows; the
/// group map is the join, so every status row finds exactly one total.
pub fn aggregate_shares(records: &[&Record]) -> Result<Vec<ShareRow>, CountOverflow> {
    let mut groups: BTreeMap<(i32, Month, String), GroupTotals> = BTreeMap::new();

    for record in records {
        let label = || format!("({}, {}, {:?})", record.year, record.month, record.provider);
        let group = groups
            .entry((record.year, record.month, record.provider.clone()))
            .or_default();
        add_count(&mut group.total, record.count, label)?;
        let status = group.statuses.entry(record.status.clone()).or_insert(0);
        add_count(status, record.count, label)?;
    }

    let mut rows = Vec::new();
    for ((year, month, provider), group) in groups {
        for (status, count) in group.statuses {
            rows.push(ShareRow {
                year,
                month,
                provider: provider.clone(),
                status,
                count,
                total_count: group.total,
                percentage: percentage(count, group.total),
            });
        }
    }

    debug!("share aggregation: {} rows -> {} groups", records.len(), rows.len());
    Ok(rows)
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Sum `count` per (country, status), ignoring month granularity
///
/// Records without a country are skipped.
pub fn aggregate_countries(records: &[&Record]) -> Result<Vec<CountryAggregateRow>, CountOverflow> {
    let with_country: Vec<&Record> = records
        .iter()
        .copied()
        .filter(|r| r.country.is_some())
        .collect();

    let groups = group_sum(&with_country, |r| {
        (r.country.clone().unwrap_or_default(), r.status.clone())
    })?;

    Ok(groups
        .into_iter()
        .map(|((country, status), count)| CountryAggregateRow {
            country,
            status,
            count,
        })
        .collect())
}

/// Sum `count` per status over the whole filtered table
pub fn status_totals(records: &[&Record]) -> Result<Vec<StatusTotal>, CountOverflow> {
    Ok(group_sum(records, |r| r.status.clone())?
        .into_iter()
        .map(|(status, count)| StatusTotal { status, count })
        .collect())
}
