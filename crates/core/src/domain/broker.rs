use crate::domain::blob::Blob;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One row of `broker_data_web` as stored. Blob columns are raw text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BrokerRecord {
    #[serde(default, deserialize_with = "deserialize_code")]
    pub code: Option<String>,
    #[serde(default)]
    pub broker: String,
    #[serde(default, deserialize_with = "deserialize_score")]
    pub total_score: Option<f64>,
    #[serde(default)]
    pub register_country: Option<String>,
    #[serde(default)]
    pub operating_period: Option<String>,
    #[serde(default)]
    pub official_link: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blob_text")]
    pub license_info: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blob_text")]
    pub account_info: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blob_text")]
    pub whychose: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blob_text")]
    pub safe: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blob_text")]
    pub pros: Option<String>,
    #[serde(default, deserialize_with = "deserialize_blob_text")]
    pub faq: Option<String>,
}

/// A broker with every blob column decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrokerParsed {
    pub code: String,
    pub broker: String,
    pub total_score: f64,
    pub register_country: Option<String>,
    pub operating_period: Option<String>,
    pub official_link: Option<String>,
    pub logo: Option<String>,
    pub license_info: Option<String>,
    pub licenses: Blob<Vec<LicenseEntry>>,
    pub account_info: Blob<Vec<AccountType>>,
    pub whychose: Blob<Vec<WhyChoose>>,
    pub safe: Blob<serde_json::Value>,
    pub pros: Blob<ProsAndCons>,
    pub faq: Blob<Vec<FaqEntry>>,
}

impl BrokerParsed {
    /// Parsed licence entries, empty when the column was blank or not JSON.
    pub fn license_entries(&self) -> &[LicenseEntry] {
        self.licenses.as_option().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_license_text(&self) -> bool {
        self.license_info
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhyChoose {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProsAndCons {
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(alias = "q")]
    pub question: String,
    #[serde(alias = "a", default)]
    pub answer: String,
}

/// Upstream writes licence entries with Chinese keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseEntry {
    #[serde(
        rename(deserialize = "监管状态"),
        alias = "regulatory_status",
        default,
        deserialize_with = "deserialize_loose_text"
    )]
    pub regulatory_status: String,
    #[serde(
        rename(deserialize = "牌照信息"),
        alias = "license_detail",
        default,
        deserialize_with = "deserialize_loose_text"
    )]
    pub license_detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountType {
    pub account_type: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

// Postgres `numeric` reaches us as a JSON string through some drivers.
fn deserialize_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Score {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Score>::deserialize(deserializer)? {
        Some(Score::Number(n)) => Some(n),
        Some(Score::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

// Codes are sometimes numeric upstream.
fn deserialize_code<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

// Drivers that parse json columns hand us the value itself; keep it as text so
// decoding stays per field.
fn deserialize_blob_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

// null and non-scalar values read as empty.
fn deserialize_loose_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}
