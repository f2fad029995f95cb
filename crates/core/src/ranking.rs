//! Sorted and filtered broker views.
//!
//! Every function here is pure and deterministic: sorts are stable, so ties
//! keep the caller's input order.

use crate::domain::{BrokerParsed, LicenseEntry};
use std::cmp::Ordering;

// Regulators whose licences count the most towards regulation strength.
// Matched against whole ASCII tokens of the licence detail, case-insensitive.
const TIER1_AUTHORITIES: &[&str] = &[
    "FCA", "ASIC", "NFA", "CFTC", "FINMA", "BAFIN", "MAS", "JFSA", "CIRO", "IIROC",
];
const TIER2_AUTHORITIES: &[&str] = &[
    "CYSEC", "DFSA", "FSCA", "FMA", "SFC", "CONSOB", "AMF", "CNMV",
];

const TIER1_WEIGHT: u32 = 3;
const TIER2_WEIGHT: u32 = 2;
const OTHER_WEIGHT: u32 = 1;

const INACTIVE_STATUS_MARKERS: &[&str] = &[
    "revoked",
    "cancelled",
    "canceled",
    "suspended",
    "expired",
    "吊销",
    "注销",
    "撤销",
    "暂停",
    "过期",
];

/// Descending by `total_score`.
pub fn sort_by_score(brokers: &[BrokerParsed]) -> Vec<BrokerParsed> {
    let mut out = brokers.to_vec();
    out.sort_by(|a, b| cmp_score_desc(a.total_score, b.total_score));
    out
}

/// Brokers with at least one parsed licence entry, strongest regulation first.
///
/// Ties fall back to entry count, then score. A broker whose licence text does
/// not parse is left out entirely.
pub fn sort_by_regulation(brokers: &[BrokerParsed]) -> Vec<BrokerParsed> {
    let mut keyed: Vec<(u32, usize, &BrokerParsed)> = brokers
        .iter()
        .filter(|b| !b.license_entries().is_empty())
        .map(|b| (regulation_strength(b), b.license_entries().len(), b))
        .collect();

    keyed.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| cmp_score_desc(a.2.total_score, b.2.total_score))
    });

    keyed.into_iter().map(|(_, _, b)| b.clone()).collect()
}

/// Longest-operating first. Unknown tenure counts as zero.
pub fn sort_by_experience(brokers: &[BrokerParsed]) -> Vec<BrokerParsed> {
    let mut keyed: Vec<(f64, &BrokerParsed)> = brokers
        .iter()
        .map(|b| (tenure_years(b.operating_period.as_deref().unwrap_or("")), b))
        .collect();

    keyed.sort_by(|a, b| cmp_score_desc(a.0, b.0));
    keyed.into_iter().map(|(_, b)| b.clone()).collect()
}

pub fn top_n(mut view: Vec<BrokerParsed>, n: usize) -> Vec<BrokerParsed> {
    view.truncate(n);
    view
}

pub fn top_by_score(brokers: &[BrokerParsed], n: usize) -> Vec<BrokerParsed> {
    top_n(sort_by_score(brokers), n)
}

pub fn top_by_regulation(brokers: &[BrokerParsed], n: usize) -> Vec<BrokerParsed> {
    top_n(sort_by_regulation(brokers), n)
}

pub fn top_by_experience(brokers: &[BrokerParsed], n: usize) -> Vec<BrokerParsed> {
    top_n(sort_by_experience(brokers), n)
}

/// Leading numeric magnitude of a free-text duration ("3+ years" is 3).
/// Returns 0 when the text holds no number.
pub fn tenure_years(text: &str) -> f64 {
    let Some(start) = text.find(|c: char| c.is_ascii_digit()) else {
        return 0.0;
    };

    let rest = &text[start..];
    let mut end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    // Optional fractional part: "2.5 years".
    if rest[end..].starts_with('.') {
        let frac = &rest[end + 1..];
        let frac_len = frac
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(frac.len());
        if frac_len > 0 {
            end += 1 + frac_len;
        }
    }

    rest[..end]
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

pub fn regulation_strength(broker: &BrokerParsed) -> u32 {
    broker.license_entries().iter().map(entry_strength).sum()
}

fn entry_strength(entry: &LicenseEntry) -> u32 {
    let status = entry.regulatory_status.to_lowercase();
    if INACTIVE_STATUS_MARKERS.iter().any(|m| status.contains(m)) {
        return 0;
    }
    authority_weight(&entry.license_detail)
}

fn authority_weight(detail: &str) -> u32 {
    let tokens: Vec<String> = detail
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();

    let has = |list: &[&str]| tokens.iter().any(|t| list.contains(&t.as_str()));

    if has(TIER1_AUTHORITIES) {
        TIER1_WEIGHT
    } else if has(TIER2_AUTHORITIES) {
        TIER2_WEIGHT
    } else {
        OTHER_WEIGHT
    }
}

fn cmp_score_desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
