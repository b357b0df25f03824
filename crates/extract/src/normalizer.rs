use regex::Regex;
use std::sync::OnceLock;

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.,!?;:'\u{2018}\u{2019}]").unwrap())
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Normalize an offense name into its identity key: lowercase, punctuation
/// stripped, whitespace collapsed. No fuzzy aliasing: "theft" and "theft of
/// electricity" are distinct offenses.
pub fn normalize_offense_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = punctuation_re().replace_all(&lowered, "");
    let collapsed = whitespace_re().replace_all(stripped.trim(), " ");
    collapsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization() {
        assert_eq!(normalize_offense_name("Robbery"), "robbery");
        assert_eq!(normalize_offense_name("Robbery!"), "robbery");
        assert_eq!(normalize_offense_name("  Robbery  "), "robbery");
        assert_eq!(
            normalize_offense_name("Criminal\tBreach   of Trust"),
            "criminal breach of trust"
        );
    }

    #[test]
    fn distinct_offenses_stay_distinct() {
        assert_ne!(
            normalize_offense_name("Theft"),
            normalize_offense_name("Theft of electricity")
        );
    }
}
