use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;

use zenpro_core::domain::BrokerParsed;
use zenpro_core::normalize::{diagnostics, DecodeDiagnostic};
use zenpro_core::ranking::sort_by_score;
use zenpro_core::risk::{RiskPolicy, RiskReason};

#[derive(Debug, Serialize)]
pub struct RiskyRow {
    pub code: String,
    pub broker: String,
    pub total_score: f64,
    pub reasons: Vec<RiskReason>,
}

#[derive(Debug, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    pub total_brokers: usize,
    pub risky_total: usize,
    pub low_score_total: usize,
    pub unlicensed_total: usize,
    pub risky: Vec<RiskyRow>,
    pub diagnostics: Vec<DecodeDiagnostic>,
}

impl AuditReport {
    pub fn build(brokers: &[BrokerParsed], policy: &RiskPolicy, limit: usize) -> Self {
        let mut risky = Vec::new();
        let mut risky_total = 0;
        let mut low_score_total = 0;
        let mut unlicensed_total = 0;

        for broker in sort_by_score(brokers) {
            let assessment = policy.classify(&broker);
            if !assessment.is_risky {
                continue;
            }

            risky_total += 1;
            if assessment.reasons.contains(&RiskReason::LowScore) {
                low_score_total += 1;
            }
            if assessment.reasons.contains(&RiskReason::Unlicensed) {
                unlicensed_total += 1;
            }
            if risky.len() < limit {
                risky.push(RiskyRow {
                    code: broker.code,
                    broker: broker.broker,
                    total_score: broker.total_score,
                    reasons: assessment.reasons,
                });
            }
        }

        Self {
            generated_at: Utc::now(),
            total_brokers: brokers.len(),
            risky_total,
            low_score_total,
            unlicensed_total,
            risky,
            diagnostics: brokers.iter().flat_map(diagnostics).collect(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "brokers:     {}", self.total_brokers);
        let _ = writeln!(
            out,
            "risky:       {} (low score {}, unlicensed {})",
            self.risky_total, self.low_score_total, self.unlicensed_total
        );
        let _ = writeln!(out, "malformed:   {}", self.diagnostics.len());

        if !self.risky.is_empty() {
            let _ = writeln!(out);
            for row in &self.risky {
                let reasons: Vec<&str> = row
                    .reasons
                    .iter()
                    .map(|r| match r {
                        RiskReason::LowScore => "low_score",
                        RiskReason::Unlicensed => "unlicensed",
                    })
                    .collect();
                let _ = writeln!(
                    out,
                    "{:>5.1}  {:<24} {:<16} {}",
                    row.total_score,
                    row.broker,
                    row.code,
                    reasons.join(",")
                );
            }
        }

        for diag in &self.diagnostics {
            let _ = writeln!(out, "warning: {diag}");
        }

        out
    }
}
