//! Aggregates behind the dashboard: applications per status and per day.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::models::Record;

pub const NO_STATUS: &str = "(sem status)";
pub const WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    /// Most frequent first; ties keep first-seen order.
    pub by_status: Vec<(String, usize)>,
    /// One entry per day of the window ending at the latest dated record.
    pub daily: Vec<(NaiveDate, usize)>,
}

pub fn summarize(records: &[Record]) -> Summary {
    Summary {
        total: records.len(),
        by_status: status_counts(records),
        daily: daily_counts(records),
    }
}

fn status_counts(records: &[Record]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        let status = match record.status.trim() {
            "" => NO_STATUS,
            s => s,
        };
        match counts.iter_mut().find(|(s, _)| s == status) {
            Some((_, n)) => *n += 1,
            None => counts.push((status.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

fn daily_counts(records: &[Record]) -> Vec<(NaiveDate, usize)> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in records.iter().filter_map(Record::parsed_date) {
        *per_day.entry(date).or_default() += 1;
    }
    let Some(&last) = per_day.keys().next_back() else {
        return Vec::new();
    };
    let first = last
        .checked_sub_days(Days::new(WINDOW_DAYS - 1))
        .unwrap_or(NaiveDate::MIN);

    first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| (day, per_day.get(&day).copied().unwrap_or(0)))
        .collect()
}
