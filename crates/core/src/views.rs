//! View models handed to the renderer. Nothing here does IO.

use crate::domain::BrokerParsed;
use crate::ranking::{sort_by_score, top_by_experience, top_by_regulation, top_n};
use crate::risk::{RiskAssessment, RiskPolicy, ScoreBand};
use crate::slug::slugify;
use serde::Serialize;
use serde_json::Value;

const LICENSE_PREVIEW_CHARS: usize = 20;
const NO_LICENSE_LABEL: &str = "No License Info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLimits {
    pub top_rated: usize,
    pub best_regulated: usize,
    pub highest_rated: usize,
    pub most_experienced: usize,
    pub risky: usize,
}

impl Default for ViewLimits {
    fn default() -> Self {
        Self {
            top_rated: 10,
            best_regulated: 5,
            highest_rated: 5,
            most_experienced: 5,
            risky: 8,
        }
    }
}

impl ViewLimits {
    pub fn from_env() -> Self {
        let mut out = Self::default();
        let read = |key: &str, slot: &mut usize| {
            if let Ok(s) = std::env::var(key) {
                if let Ok(n) = s.parse::<usize>() {
                    *slot = n;
                }
            }
        };

        read("VIEW_TOP_RATED", &mut out.top_rated);
        read("VIEW_BEST_REGULATED", &mut out.best_regulated);
        read("VIEW_HIGHEST_RATED", &mut out.highest_rated);
        read("VIEW_MOST_EXPERIENCED", &mut out.most_experienced);
        read("VIEW_RISKY", &mut out.risky);
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerCard {
    pub code: String,
    pub broker: String,
    pub slug: String,
    pub logo: Option<String>,
    pub register_country: Option<String>,
    pub operating_period: Option<String>,
    pub official_link: Option<String>,
    pub total_score: f64,
    pub score_display: String,
    pub score_band: ScoreBand,
    pub license_display: String,
    pub risk: RiskAssessment,
}

impl BrokerCard {
    pub fn new(broker: &BrokerParsed, policy: &RiskPolicy) -> Self {
        Self {
            code: broker.code.clone(),
            broker: broker.broker.clone(),
            slug: slugify(&broker.broker),
            logo: broker.logo.clone(),
            register_country: broker.register_country.clone(),
            operating_period: broker.operating_period.clone(),
            official_link: broker.official_link.clone(),
            total_score: broker.total_score,
            score_display: format!("{:.1}", broker.total_score),
            score_band: ScoreBand::for_score(broker.total_score),
            license_display: license_display(broker),
            risk: policy.classify(broker),
        }
    }
}

pub fn cards(brokers: &[BrokerParsed], policy: &RiskPolicy) -> Vec<BrokerCard> {
    brokers.iter().map(|b| BrokerCard::new(b, policy)).collect()
}

/// Everything the home page shows, computed from one snapshot of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeViews {
    pub total_brokers: usize,
    pub top_rated: Vec<BrokerCard>,
    pub best_regulated: Vec<BrokerCard>,
    pub highest_rated: Vec<BrokerCard>,
    pub most_experienced: Vec<BrokerCard>,
    pub risky: Vec<BrokerCard>,
}

impl HomeViews {
    pub fn build(brokers: &[BrokerParsed], limits: &ViewLimits, policy: &RiskPolicy) -> Self {
        let by_score = sort_by_score(brokers);

        Self {
            total_brokers: brokers.len(),
            top_rated: cards(&top_n(by_score.clone(), limits.top_rated), policy),
            best_regulated: cards(&top_by_regulation(brokers, limits.best_regulated), policy),
            highest_rated: cards(&top_n(by_score.clone(), limits.highest_rated), policy),
            most_experienced: cards(&top_by_experience(brokers, limits.most_experienced), policy),
            // Risk filtering keeps order, so hand it the score ranking.
            risky: cards(&policy.risky_brokers(&by_score, limits.risky), policy),
        }
    }
}

/// Short licence summary for list rows.
pub fn license_display(broker: &BrokerParsed) -> String {
    let details: Vec<&str> = broker
        .license_entries()
        .iter()
        .map(|e| e.license_detail.trim())
        .filter(|d| !d.is_empty())
        .collect();
    if !details.is_empty() {
        return details.join(", ");
    }

    match broker.license_info.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => {
            if text.chars().count() > LICENSE_PREVIEW_CHARS {
                let head: String = text.chars().take(LICENSE_PREVIEW_CHARS).collect();
                format!("{head}...")
            } else {
                text.to_string()
            }
        }
        _ => NO_LICENSE_LABEL.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountField {
    pub key: String,
    pub value: String,
}

/// Visible account types and their attributes merged into one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccountSummary {
    pub account_types: Vec<String>,
    pub fields: Vec<AccountField>,
}

impl AccountSummary {
    pub fn from_broker(broker: &BrokerParsed) -> Self {
        let Some(accounts) = broker.account_info.as_option() else {
            return Self::default();
        };

        let mut out = Self::default();
        let mut merged: Vec<(String, &Value)> = Vec::new();

        for account in accounts.iter().filter(|a| a.is_visible) {
            out.account_types.push(account.account_type.clone());

            for (key, value) in &account.data {
                if !is_present(value) {
                    continue;
                }
                // Later accounts override the value but keep the first position.
                match merged.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => slot.1 = value,
                    None => merged.push((key.clone(), value)),
                }
            }
        }

        out.fields = merged
            .into_iter()
            .map(|(key, value)| AccountField {
                key,
                value: format_account_value(value),
            })
            .collect();
        out
    }

    pub fn is_empty(&self) -> bool {
        self.account_types.is_empty()
    }
}

fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty() && s != "--",
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn format_account_value(value: &Value) -> String {
    match value {
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        Value::Null => "N/A".to_string(),
        Value::String(s) if s.is_empty() || s == "--" => "N/A".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

impl PageMetadata {
    pub fn for_broker(site_name: &str, broker: &BrokerParsed) -> Self {
        let name = &broker.broker;
        Self {
            title: format!(
                "{name} Review, Forex Broker&Trading Markets, Legit or a Scam-{site_name}"
            ),
            description: format!(
                "{site_name}: {name} review, covering licenses, user reviews, forex spreads, leverage, \
                 Is {name} a scam or legit broker, Read {site_name} review before start trading."
            ),
        }
    }

    pub fn not_found() -> Self {
        Self {
            title: "Broker Not Found".to_string(),
            description: String::new(),
        }
    }
}

/// Detail page payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerDetail {
    pub slug: String,
    pub broker: BrokerParsed,
    pub score_display: String,
    pub score_band: ScoreBand,
    pub risk: RiskAssessment,
    pub license_display: String,
    pub accounts: AccountSummary,
    pub metadata: PageMetadata,
}

impl BrokerDetail {
    pub fn build(broker: BrokerParsed, policy: &RiskPolicy, site_name: &str) -> Self {
        Self {
            slug: slugify(&broker.broker),
            score_display: format!("{:.1}", broker.total_score),
            score_band: ScoreBand::for_score(broker.total_score),
            risk: policy.classify(&broker),
            license_display: license_display(&broker),
            accounts: AccountSummary::from_broker(&broker),
            metadata: PageMetadata::for_broker(site_name, &broker),
            broker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::BrokerRecord;
    use crate::normalize::normalize;
    use crate::risk::RiskReason;
    use serde_json::json;

    fn broker(code: &str, score: f64) -> BrokerRecord {
        BrokerRecord {
            code: Some(code.to_string()),
            broker: code.to_uppercase(),
            total_score: Some(score),
            ..Default::default()
        }
    }

    #[test]
    fn license_display_prefers_parsed_details() {
        let mut r = broker("a", 9.0);
        r.license_info = Some(
            r#"[{"监管状态":"Active","牌照信息":"FCA 123"},{"监管状态":"Active","牌照信息":"ASIC 9"}]"#
                .to_string(),
        );
        assert_eq!(license_display(&normalize(r)), "FCA 123, ASIC 9");
    }

    #[test]
    fn license_display_truncates_free_text() {
        let mut r = broker("b", 9.0);
        r.license_info = Some("Regulated by several offshore authorities".to_string());
        assert_eq!(license_display(&normalize(r)), "Regulated by several...");

        let mut r = broker("c", 9.0);
        r.license_info = Some("VFSC".to_string());
        assert_eq!(license_display(&normalize(r)), "VFSC");

        assert_eq!(license_display(&normalize(broker("d", 9.0))), NO_LICENSE_LABEL);
    }

    #[test]
    fn account_summary_merges_visible_accounts() {
        let mut r = broker("a", 9.0);
        r.account_info = Some(
            json!([
                {
                    "account_type": "Standard",
                    "is_visible": true,
                    "is_active": true,
                    "data": {"Minimum Deposit": "$100", "Maximum Leverage": "1:500", "Commission": "--"}
                },
                {
                    "account_type": "Hidden",
                    "is_visible": false,
                    "is_active": true,
                    "data": {"Minimum Deposit": "$1"}
                },
                {
                    "account_type": "Raw",
                    "is_visible": true,
                    "is_active": false,
                    "data": {"Minimum Deposit": "$200", "SupportedEA": true, "Products": ""}
                }
            ])
            .to_string(),
        );

        let summary = AccountSummary::from_broker(&normalize(r));
        assert_eq!(summary.account_types, vec!["Standard", "Raw"]);

        let fields: Vec<(&str, &str)> = summary
            .fields
            .iter()
            .map(|f| (f.key.as_str(), f.value.as_str()))
            .collect();
        assert_eq!(
            fields,
            vec![
                ("Minimum Deposit", "$200"),
                ("Maximum Leverage", "1:500"),
                ("SupportedEA", "Yes"),
            ]
        );
    }

    #[test]
    fn account_summary_is_empty_for_malformed_info() {
        let mut r = broker("a", 9.0);
        r.account_info = Some("[{broken".to_string());
        assert!(AccountSummary::from_broker(&normalize(r)).is_empty());
    }

    #[test]
    fn format_account_value_rules() {
        assert_eq!(format_account_value(&json!(true)), "Yes");
        assert_eq!(format_account_value(&json!(false)), "No");
        assert_eq!(format_account_value(&json!("--")), "N/A");
        assert_eq!(format_account_value(&json!("")), "N/A");
        assert_eq!(format_account_value(&json!(0.01)), "0.01");
        assert_eq!(format_account_value(&json!("USD")), "USD");
    }

    #[test]
    fn home_views_follow_limits() {
        let brokers: Vec<_> = (1..=12)
            .map(|i| normalize(broker(&format!("b{i:02}"), i as f64)))
            .collect();

        let views = HomeViews::build(&brokers, &ViewLimits::default(), &RiskPolicy::default());
        assert_eq!(views.total_brokers, 12);
        assert_eq!(views.top_rated.len(), 10);
        assert_eq!(views.top_rated[0].code, "b12");
        assert_eq!(views.highest_rated.len(), 5);
        assert!(views.best_regulated.is_empty());
        assert_eq!(views.most_experienced.len(), 5);
        // All unlicensed; risky keeps the score ranking.
        assert_eq!(views.risky.len(), 8);
        assert_eq!(views.risky[0].code, "b12");
        assert_eq!(views.risky[0].risk.reasons, vec![RiskReason::Unlicensed]);
        assert_eq!(views.risky[7].code, "b05");
    }

    #[test]
    fn home_views_on_empty_input() {
        let views = HomeViews::build(&[], &ViewLimits::default(), &RiskPolicy::default());
        assert_eq!(views.total_brokers, 0);
        assert!(views.top_rated.is_empty());
        assert!(views.risky.is_empty());
    }

    #[test]
    fn detail_carries_metadata_and_score_display() {
        let detail = BrokerDetail::build(
            normalize(broker("alpha", 9.26)),
            &RiskPolicy::default(),
            "Zenpro FX",
        );
        assert_eq!(detail.score_display, "9.3");
        assert_eq!(detail.slug, "alpha");
        assert_eq!(
            detail.metadata.title,
            "ALPHA Review, Forex Broker&Trading Markets, Legit or a Scam-Zenpro FX"
        );
        assert!(detail.metadata.description.starts_with("Zenpro FX: ALPHA review"));
        assert!(detail.risk.reasons.contains(&RiskReason::Unlicensed));
    }
}
