/// Routable identifier derived from a display name.
///
/// Lowercase, trim, drop anything that is not an ASCII word character,
/// whitespace or `-`, then turn whitespace runs into `-` and collapse repeated
/// `-`. Applying it to its own output is a no-op.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());

    for c in lowered.trim().chars() {
        let c = if c.is_whitespace() {
            '-'
        } else if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            c
        } else {
            continue;
        };

        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_joins_words() {
        assert_eq!(slugify("FX Pro!! Global"), "fx-pro-global");
        assert_eq!(slugify("  IC Markets  "), "ic-markets");
        assert_eq!(slugify("Pepper-stone  -  UK"), "pepper-stone-uk");
        assert_eq!(slugify("XM_Group"), "xm_group");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(slugify("嘉盛 FOREX.com"), "-forexcom");
        assert_eq!(slugify("福汇"), "");
    }

    #[test]
    fn is_idempotent() {
        for name in [
            "FX Pro!! Global",
            "a !",
            " - a -- b ",
            "Ünïcode Broker & Co.",
            "already-a-slug",
            "",
        ] {
            let once = slugify(name);
            assert_eq!(slugify(&once), once, "input: {name:?}");
        }
    }
}
