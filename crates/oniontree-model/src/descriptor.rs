//! Parsed service descriptors.

use crate::{derive_tag, slugify, ParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A public key listed by a service descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyEntry {
    /// Opaque source identifier; the key's natural key in the store.
    #[serde(default)]
    pub id: String,
    /// Owner reference as written in the descriptor (not a service id).
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub description: String,
    /// Key material.
    #[serde(default)]
    pub value: String,
}

/// The body of one descriptor file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub public_keys: Vec<PublicKeyEntry>,
}

impl Descriptor {
    /// Decode YAML bytes and normalize the result.
    pub fn from_yaml(bytes: &[u8]) -> Result<Self, ParseError> {
        let raw: Descriptor = serde_yaml::from_slice(bytes)?;
        raw.normalized()
    }

    /// Trims identity fields, drops blank and repeated locators/keys, and
    /// rejects descriptors that cannot carry an identity.
    pub fn normalized(self) -> Result<Self, ParseError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ParseError::MissingName);
        }

        let mut seen_urls = BTreeSet::new();
        let urls = self
            .urls
            .into_iter()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty() && seen_urls.insert(url.clone()))
            .collect();

        let mut seen_keys = BTreeSet::new();
        let mut public_keys = Vec::with_capacity(self.public_keys.len());
        for (index, mut key) in self.public_keys.into_iter().enumerate() {
            key.id = key.id.trim().to_string();
            if key.id.is_empty() {
                return Err(ParseError::MissingKeyId { index });
            }
            if seen_keys.insert(key.id.clone()) {
                public_keys.push(key);
            }
        }

        Ok(Self {
            name,
            description: self.description,
            urls,
            public_keys,
        })
    }
}

/// A descriptor ready for reconciliation: body, identity and tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEntry {
    pub source_path: PathBuf,
    pub slug: String,
    pub tag: String,
    pub descriptor: Descriptor,
}

impl ServiceEntry {
    /// Parse `bytes` read from `path`, deriving the tag relative to `root`.
    pub fn parse(root: &Path, path: &Path, bytes: &[u8]) -> Result<Self, ParseError> {
        let tag = derive_tag(root, path)?;
        let descriptor = Descriptor::from_yaml(bytes)?;
        Self::new(path.to_path_buf(), tag, descriptor)
    }

    /// Build an entry from an already decoded descriptor.
    pub fn new(source_path: PathBuf, tag: String, descriptor: Descriptor) -> Result<Self, ParseError> {
        let descriptor = descriptor.normalized()?;
        let slug = slugify(&descriptor.name);
        if slug.is_empty() {
            return Err(ParseError::EmptySlug {
                name: descriptor.name,
            });
        }
        Ok(Self {
            source_path,
            slug,
            tag,
            descriptor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: "My Service"
description: "A hidden service"
urls:
  - "http://example.onion"
  - " http://example.onion "
  - ""
public_keys:
  - id: "k1"
    user_id: "admin@example"
    fingerprint: "AAAA"
    value: "-----BEGIN PGP PUBLIC KEY BLOCK-----"
"#;

    #[test]
    fn parses_and_normalizes_descriptor() {
        let entry = ServiceEntry::parse(
            Path::new("tagged"),
            Path::new("tagged/category-a/svc1.yaml"),
            SAMPLE.as_bytes(),
        )
        .unwrap();

        assert_eq!(entry.slug, "my-service");
        assert_eq!(entry.tag, "category-a");
        assert_eq!(entry.descriptor.urls, vec!["http://example.onion".to_string()]);
        assert_eq!(entry.descriptor.public_keys.len(), 1);
        assert_eq!(entry.descriptor.public_keys[0].user_id, "admin@example");
        assert_eq!(entry.descriptor.public_keys[0].description, "");
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let descriptor = Descriptor::from_yaml(b"name: Lonely\n").unwrap();
        assert!(descriptor.urls.is_empty());
        assert!(descriptor.public_keys.is_empty());
        assert_eq!(descriptor.description, "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let descriptor = Descriptor::from_yaml(b"name: X\nmirrors: [a, b]\n").unwrap();
        assert_eq!(descriptor.name, "X");
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let err = Descriptor::from_yaml(b"name: [unterminated").unwrap_err();
        assert!(matches!(err, ParseError::Yaml(_)));

        let err = Descriptor::from_yaml(b"- just\n- a list\n").unwrap_err();
        assert!(matches!(err, ParseError::Yaml(_)));
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = Descriptor::from_yaml(b"description: nameless\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingName));
    }

    #[test]
    fn punctuation_name_is_rejected() {
        let err = ServiceEntry::parse(Path::new("t"), Path::new("t/a/b.yaml"), b"name: '???'\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::EmptySlug { .. }));
    }

    #[test]
    fn non_latin_name_gets_a_transliterated_slug() {
        let entry = ServiceEntry::parse(
            Path::new("t"),
            Path::new("t/market/hydra.yaml"),
            "name: Гидра\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(entry.slug, "gidra");
        assert_eq!(entry.descriptor.name, "Гидра");
    }

    #[test]
    fn key_without_id_is_rejected() {
        let yaml = "name: K\npublic_keys:\n  - id: a\n  - fingerprint: F\n";
        let err = Descriptor::from_yaml(yaml.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::MissingKeyId { index: 1 }));
    }

    #[test]
    fn repeated_key_ids_collapse_to_first() {
        let yaml = "name: K\npublic_keys:\n  - id: a\n    fingerprint: first\n  - id: a\n    fingerprint: second\n";
        let descriptor = Descriptor::from_yaml(yaml.as_bytes()).unwrap();
        assert_eq!(descriptor.public_keys.len(), 1);
        assert_eq!(descriptor.public_keys[0].fingerprint, "first");
    }
}
