use crate::domain::BrokerParsed;
use serde::Serialize;

/// Brokers scoring below this are flagged `low_score`.
pub const LOW_SCORE_THRESHOLD: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskReason {
    LowScore,
    Unlicensed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub is_risky: bool,
    pub reasons: Vec<RiskReason>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskPolicy {
    pub low_score_threshold: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            low_score_threshold: LOW_SCORE_THRESHOLD,
        }
    }
}

impl RiskPolicy {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Ok(s) = std::env::var("RISK_LOW_SCORE_THRESHOLD") {
            if let Ok(n) = s.parse::<f64>() {
                if n.is_finite() {
                    out.low_score_threshold = n;
                }
            }
        }

        out
    }

    pub fn classify(&self, broker: &BrokerParsed) -> RiskAssessment {
        let mut reasons = Vec::with_capacity(2);
        if broker.total_score < self.low_score_threshold {
            reasons.push(RiskReason::LowScore);
        }
        if is_unlicensed(broker) {
            reasons.push(RiskReason::Unlicensed);
        }

        RiskAssessment {
            is_risky: !reasons.is_empty(),
            reasons,
        }
    }

    /// Keeps risky brokers in the order given, then truncates. Ordering is
    /// the caller's job.
    pub fn risky_brokers(&self, brokers: &[BrokerParsed], limit: usize) -> Vec<BrokerParsed> {
        brokers
            .iter()
            .filter(|b| self.classify(b).is_risky)
            .take(limit)
            .cloned()
            .collect()
    }
}

pub fn classify(broker: &BrokerParsed) -> RiskAssessment {
    RiskPolicy::default().classify(broker)
}

pub fn risky_brokers(brokers: &[BrokerParsed], limit: usize) -> Vec<BrokerParsed> {
    RiskPolicy::default().risky_brokers(brokers, limit)
}

/// Licence text that is blank or does not parse into at least one entry
/// counts as no licence at all.
pub fn is_unlicensed(broker: &BrokerParsed) -> bool {
    !broker.has_license_text() || broker.license_entries().is_empty()
}

/// Display band for a score; thresholds match the card colouring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Strong,
    Fair,
    Weak,
}

impl ScoreBand {
    pub fn for_score(score: f64) -> Self {
        if score >= 8.0 {
            Self::Strong
        } else if score >= 6.0 {
            Self::Fair
        } else {
            Self::Weak
        }
    }
}
