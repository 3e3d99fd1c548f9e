// 📊 Statistics Aggregator - descriptive summary of any record subset

use crate::record::Record;
use crate::schema::{Column, Gender};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenderCounts {
    pub male: usize,
    pub female: usize,
    /// Everything that is not exactly "Male" or "Female", blanks included
    pub other: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub gender: GenderCounts,
    pub average_age: Option<f64>,
    pub most_common_symptom: Option<String>,
    pub average_duration_days: Option<f64>,
}

impl Summary {
    /// Share of the total, in percent. None for an empty subset.
    pub fn percent(&self, count: usize) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(count as f64 * 100.0 / self.total as f64)
    }

    /// Label/value pairs as shown in the statistics window
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Patients", self.total.to_string()),
            ("Male", self.count_with_percent(self.gender.male)),
            ("Female", self.count_with_percent(self.gender.female)),
            ("Other", self.count_with_percent(self.gender.other)),
            (
                "Average Age",
                self.average_age
                    .map(|a| format!("{:.1}", a))
                    .unwrap_or_else(not_available),
            ),
            (
                "Most Common Symptom",
                self.most_common_symptom.clone().unwrap_or_else(not_available),
            ),
            (
                "Average Treatment Duration",
                self.average_duration_days
                    .map(|d| format!("{:.1} days", d))
                    .unwrap_or_else(not_available),
            ),
        ]
    }

    fn count_with_percent(&self, count: usize) -> String {
        match self.percent(count) {
            Some(p) => format!("{} ({:.1}%)", count, p),
            None => count.to_string(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.lines() {
            writeln!(f, "{:<28} {}", format!("{}:", label), value)?;
        }
        Ok(())
    }
}

fn not_available() -> String {
    "N/A".to_string()
}

// ============================================================================
// AGGREGATES
// ============================================================================

pub fn summarize<'a, I>(rows: I) -> Summary
where
    I: IntoIterator<Item = &'a Record>,
{
    let rows: Vec<&Record> = rows.into_iter().collect();
    let total = rows.len();

    let male = rows.iter().filter(|r| r.gender() == Some(Gender::Male)).count();
    let female = rows.iter().filter(|r| r.gender() == Some(Gender::Female)).count();

    Summary {
        total,
        gender: GenderCounts {
            male,
            female,
            other: total - male - female,
        },
        average_age: average_age(&rows),
        most_common_symptom: most_common(&rows, Column::Symptoms),
        average_duration_days: average_duration_days(&rows),
    }
}

/// Mean of the Age values that parse; the rest are left out
pub fn average_age(rows: &[&Record]) -> Option<f64> {
    mean(rows.iter().filter_map(|r| r.age.trim().parse::<f64>().ok()))
}

/// Mean of EndDate - StartDate over rows where both dates parse
pub fn average_duration_days(rows: &[&Record]) -> Option<f64> {
    mean(rows.iter().filter_map(|r| r.duration_days()).map(|d| d as f64))
}

/// Most frequent value, blanks counted like any other. Ties go to the value
/// seen first. None when there are no rows or blank wins.
pub fn most_common(rows: &[&Record], column: Column) -> Option<String> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for record in rows {
        let value = record.get(column).trim();
        let count = counts.entry(value).or_insert_with(|| {
            order.push(value);
            0
        });
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for value in order {
        let count = counts.get(value).copied().unwrap_or(0);
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((value, count));
        }
    }
    best.filter(|(value, _)| !value.is_empty())
        .map(|(value, _)| value.to_string())
}

fn mean<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, n) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
