use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};

/// A JSON-encoded text column after decoding.
///
/// `Absent` and `Malformed` both serialize as `null`; the distinction is kept
/// for diagnostics (see [`crate::normalize::diagnostics`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Blob<T> {
    Absent,
    Malformed(String),
    Parsed(T),
}

impl<T: DeserializeOwned> Blob<T> {
    /// Decodes `text` as `T`. Empty or whitespace-only text is `Absent`; any
    /// syntax or shape error is `Malformed` with the decoder message.
    pub fn decode(text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|s| !s.is_empty()) else {
            return Self::Absent;
        };

        match serde_json::from_str::<T>(text) {
            Ok(v) => Self::Parsed(v),
            Err(e) => Self::Malformed(e.to_string()),
        }
    }
}

impl<T> Blob<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Self::Parsed(v) => Some(v),
            Self::Absent | Self::Malformed(_) => None,
        }
    }

    pub fn malformed_detail(&self) -> Option<&str> {
        match self {
            Self::Malformed(detail) => Some(detail),
            _ => None,
        }
    }
}

impl<T: Serialize> Serialize for Blob<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Parsed(v) => v.serialize(serializer),
            Self::Absent | Self::Malformed(_) => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_text_is_absent() {
        assert_eq!(Blob::<Vec<String>>::decode(None), Blob::Absent);
        assert_eq!(Blob::<Vec<String>>::decode(Some("")), Blob::Absent);
        assert_eq!(Blob::<Vec<String>>::decode(Some("   \n")), Blob::Absent);
    }

    #[test]
    fn syntax_error_is_malformed() {
        let blob = Blob::<Vec<String>>::decode(Some("{invalid json"));
        assert!(blob.malformed_detail().is_some());
        assert_eq!(blob.as_option(), None);
    }

    #[test]
    fn shape_mismatch_is_malformed() {
        // Valid JSON, but an object where a list is expected.
        let blob = Blob::<Vec<String>>::decode(Some(r#"{"a": 1}"#));
        assert!(matches!(blob, Blob::Malformed(_)));
    }

    #[test]
    fn parsed_serializes_as_value_and_others_as_null() {
        let parsed = Blob::<Vec<String>>::decode(Some(r#"["x","y"]"#));
        assert_eq!(serde_json::to_value(&parsed).unwrap(), json!(["x", "y"]));

        let malformed = Blob::<Vec<String>>::decode(Some("nope"));
        assert_eq!(serde_json::to_value(&malformed).unwrap(), json!(null));
        assert_eq!(
            serde_json::to_value(Blob::<Vec<String>>::Absent).unwrap(),
            json!(null)
        );
    }
}
