use crate::domain::{Blob, BrokerParsed, BrokerRecord};
use crate::slug::slugify;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Decodes every blob column of `record` independently. Never fails: a column
/// that does not decode becomes `null` without touching the others.
pub fn normalize(record: BrokerRecord) -> BrokerParsed {
    let code = record
        .code
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| slugify(&record.broker));

    let total_score = record.total_score.filter(|s| s.is_finite()).unwrap_or(0.0);

    BrokerParsed {
        code,
        total_score,
        licenses: Blob::decode(record.license_info.as_deref()),
        account_info: Blob::decode(record.account_info.as_deref()),
        whychose: Blob::decode(record.whychose.as_deref()),
        safe: Blob::decode(record.safe.as_deref()),
        pros: Blob::decode(record.pros.as_deref()),
        faq: Blob::decode(record.faq.as_deref()),
        broker: record.broker,
        register_country: record.register_country,
        operating_period: record.operating_period,
        official_link: record.official_link,
        logo: record.logo,
        license_info: record.license_info,
    }
}

/// Normalizes in input order. A record whose code repeats an earlier one is
/// dropped.
pub fn normalize_all(records: Vec<BrokerRecord>) -> Vec<BrokerParsed> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        let parsed = normalize(record);
        if !seen.insert(parsed.code.clone()) {
            tracing::warn!(code = %parsed.code, broker = %parsed.broker, "duplicate broker code; keeping first");
            continue;
        }
        out.push(parsed);
    }

    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeDiagnostic {
    pub code: String,
    pub field: &'static str,
    pub detail: String,
}

impl fmt::Display for DecodeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed blob (code={}, field={}): {}",
            self.code, self.field, self.detail
        )
    }
}

impl std::error::Error for DecodeDiagnostic {}

/// Every blob column of `broker` that held text but failed to decode.
pub fn diagnostics(broker: &BrokerParsed) -> Vec<DecodeDiagnostic> {
    let fields: [(&'static str, Option<&str>); 6] = [
        ("license_info", broker.licenses.malformed_detail()),
        ("account_info", broker.account_info.malformed_detail()),
        ("whychose", broker.whychose.malformed_detail()),
        ("safe", broker.safe.malformed_detail()),
        ("pros", broker.pros.malformed_detail()),
        ("faq", broker.faq.malformed_detail()),
    ];

    fields
        .into_iter()
        .filter_map(|(field, detail)| {
            detail.map(|d| DecodeDiagnostic {
                code: broker.code.clone(),
                field,
                detail: d.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LicenseEntry, ProsAndCons};

    fn record(code: Option<&str>, broker: &str) -> BrokerRecord {
        BrokerRecord {
            code: code.map(str::to_string),
            broker: broker.to_string(),
            total_score: Some(7.5),
            ..Default::default()
        }
    }

    #[test]
    fn malformed_pros_does_not_affect_other_fields() {
        let mut r = record(Some("a"), "Alpha");
        r.pros = Some("{invalid json".to_string());
        r.whychose = Some(r#"[{"title":"Low spreads","description":"From 0.0 pips"}]"#.to_string());
        r.license_info = Some(r#"[{"监管状态":"Active","牌照信息":"FCA"}]"#.to_string());

        let p = normalize(r);
        assert_eq!(p.pros.as_option(), None);
        assert!(matches!(p.pros, Blob::Malformed(_)));
        assert_eq!(p.whychose.as_option().map(Vec::len), Some(1));
        assert_eq!(
            p.license_entries(),
            &[LicenseEntry {
                regulatory_status: "Active".to_string(),
                license_detail: "FCA".to_string(),
            }]
        );
        assert_eq!(p.total_score, 7.5);
    }

    #[test]
    fn empty_record_keeps_scalars_and_nulls_blobs() {
        let mut r = record(Some("x"), "Xeno");
        r.register_country = Some("Cyprus".to_string());
        r.operating_period = Some("5-10 years".to_string());

        let p = normalize(r);
        assert_eq!(p.code, "x");
        assert_eq!(p.register_country.as_deref(), Some("Cyprus"));
        assert_eq!(p.operating_period.as_deref(), Some("5-10 years"));
        assert_eq!(p.licenses, Blob::Absent);
        assert_eq!(p.account_info, Blob::Absent);
        assert_eq!(p.whychose, Blob::Absent);
        assert_eq!(p.safe, Blob::Absent);
        assert_eq!(p.pros, Blob::Absent);
        assert_eq!(p.faq, Blob::Absent);
        assert!(diagnostics(&p).is_empty());
    }

    #[test]
    fn free_text_license_is_kept_verbatim() {
        let mut r = record(Some("b"), "Beta");
        r.license_info = Some("not json".to_string());

        let p = normalize(r);
        assert_eq!(p.license_info.as_deref(), Some("not json"));
        assert!(p.license_entries().is_empty());
        assert!(p.has_license_text());
    }

    #[test]
    fn missing_code_falls_back_to_slug() {
        let p = normalize(record(None, "FX Pro!! Global"));
        assert_eq!(p.code, "fx-pro-global");

        let p = normalize(record(Some("  "), "IC Markets"));
        assert_eq!(p.code, "ic-markets");
    }

    #[test]
    fn non_finite_or_missing_score_becomes_zero() {
        let mut r = record(Some("n"), "NaN Broker");
        r.total_score = Some(f64::NAN);
        assert_eq!(normalize(r).total_score, 0.0);

        let mut r = record(Some("m"), "Missing");
        r.total_score = None;
        assert_eq!(normalize(r).total_score, 0.0);
    }

    #[test]
    fn pros_object_may_omit_either_list() {
        let mut r = record(Some("p"), "Pros Only");
        r.pros = Some(r#"{"pros":["Fast execution"]}"#.to_string());

        let p = normalize(r);
        assert_eq!(
            p.pros.as_option(),
            Some(&ProsAndCons {
                pros: vec!["Fast execution".to_string()],
                cons: vec![],
            })
        );
    }

    #[test]
    fn duplicate_codes_keep_first_record() {
        let out = normalize_all(vec![
            record(Some("a"), "Alpha"),
            record(Some("a"), "Alpha Copy"),
            record(None, "Beta"),
        ]);
        let names: Vec<_> = out.iter().map(|b| b.broker.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn diagnostics_name_each_malformed_field() {
        let mut r = record(Some("d"), "Delta");
        r.faq = Some("[1, 2".to_string());
        r.account_info = Some(r#"{"not":"a list"}"#.to_string());
        r.license_info = Some("FCA regulated".to_string());

        let diags = diagnostics(&normalize(r));
        let fields: Vec<_> = diags.iter().map(|d| d.field).collect();
        assert_eq!(fields, vec!["license_info", "account_info", "faq"]);
        assert!(diags[0].to_string().contains("code=d"));
    }
}
