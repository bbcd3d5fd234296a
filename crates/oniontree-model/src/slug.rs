//! Service identity slugs.

/// Canonical, URL-safe identity for a service name.
///
/// Transliterates to ASCII, lower-cases, collapses every run of
/// non-alphanumeric characters into a single `-`, and trims separators
/// from both ends: `"Café Ünion"` becomes `"cafe-union"` and `"Гидра"`
/// becomes `"gidra"`. Two names that slugify identically are the same
/// service.
pub fn slugify(name: &str) -> String {
    ::slug::slugify(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SEPARATOR: char = '-';

    #[test]
    fn slugifies_display_names() {
        assert_eq!(slugify("My Service"), "my-service");
        assert_eq!(slugify("  Hidden   Wiki!! "), "hidden-wiki");
        assert_eq!(slugify("DuckDuckGo (onion)"), "duckduckgo-onion");
        assert_eq!(slugify("a--b__c"), "a-b-c");
        assert_eq!(slugify("Version 2.0"), "version-2-0");
    }

    #[test]
    fn punctuation_only_name_is_empty() {
        assert_eq!(slugify("!!! ---"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn case_variants_share_a_slug() {
        assert_eq!(slugify("The Pirate Bay"), slugify("the pirate BAY"));
    }

    #[test]
    fn accented_letters_are_transliterated() {
        assert_eq!(slugify("Café"), "cafe");
        assert_eq!(slugify("Café Ünion"), "cafe-union");
        assert_ne!(slugify("Café"), slugify("Caf"));
    }

    #[test]
    fn cyrillic_names_are_transliterated() {
        assert_eq!(slugify("Гидра"), "gidra");
        assert_eq!(slugify("Гидра Маркет"), "gidra-market");
    }

    proptest! {
        #[test]
        fn slug_is_url_safe(name in ".{0,64}") {
            let slug = slugify(&name);
            prop_assert!(slug
                .chars()
                .all(|c| c == SEPARATOR || c.is_ascii_lowercase() || c.is_ascii_digit()));
            prop_assert!(!slug.starts_with(SEPARATOR));
            prop_assert!(!slug.ends_with(SEPARATOR));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn slugify_is_idempotent(name in ".{0,64}") {
            let once = slugify(&name);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
