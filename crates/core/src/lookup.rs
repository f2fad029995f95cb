use crate::domain::BrokerParsed;
use crate::slug::slugify;

/// Resolves a routable identifier: exact code first, then the broker name with
/// spaces as hyphens (case-insensitive), then the name slug. `None` means
/// not found.
pub fn find_broker<'a>(brokers: &'a [BrokerParsed], ident: &str) -> Option<&'a BrokerParsed> {
    let ident = ident.trim();
    if ident.is_empty() {
        return None;
    }

    if let Some(b) = brokers.iter().find(|b| b.code == ident) {
        return Some(b);
    }

    let lowered = ident.to_lowercase();
    if let Some(b) = brokers
        .iter()
        .find(|b| b.broker.replace(' ', "-").to_lowercase() == lowered)
    {
        return Some(b);
    }

    brokers.iter().find(|b| slugify(&b.broker) == lowered)
}
