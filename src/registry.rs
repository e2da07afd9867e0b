// Copyright (c) 2025 - Cowboy AI, Inc.
//! Function Registry
//!
//! Static table mapping a function identifier to the asset kind that tracks
//! it and a set of `key=value` options. Built once at startup and passed to
//! the dispatcher; never mutated afterwards.
//!
//! # Source Format
//!
//! Semicolon-delimited text with a header row:
//!
//! ```text
//! functionID;name;options
//! fn-cso-01;combinedsewageoverflow;tenant=default
//! fn-pump-07;sewagepumpingstation;
//! fn-lvl-12;sewer;tenant=water,zone=north
//! ```

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::functions::FunctionKind;

/// Errors that can occur while loading the registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read function registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse function registry: {0}")]
    Csv(#[from] csv::Error),
}

/// A single `key=value` option of a registry entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionOption {
    pub key: String,
    pub value: String,
}

/// A registered function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryItem {
    pub function_id: String,
    pub name: String,
    pub kind: FunctionKind,
    pub options: Vec<FunctionOption>,
}

impl RegistryItem {
    pub fn new(function_id: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            function_id: function_id.into(),
            name: kind.to_string(),
            kind,
            options: Vec::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push(FunctionOption {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the first option named `key`
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.value.as_str())
    }
}

/// Immutable lookup table of registered functions
#[derive(Debug, Clone, Default)]
pub struct Registry {
    items: BTreeMap<String, RegistryItem>,
}

impl Registry {
    /// Build a registry from items; a later item replaces an earlier one with the same id
    pub fn new(items: impl IntoIterator<Item = RegistryItem>) -> Self {
        Self {
            items: items
                .into_iter()
                .map(|item| (item.function_id.clone(), item))
                .collect(),
        }
    }

    /// Load from a semicolon-delimited source
    ///
    /// The first record is a header. Fields may be quoted. Rows naming an
    /// unknown kind or lacking a name column are skipped.
    pub fn from_reader(input: impl Read) -> Result<Self, RegistryError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(input);

        let mut items = Vec::new();
        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            match row_to_item(&record) {
                Some(item) => items.push(item),
                None => warn!(line, row = ?record, "Skipping registry row"),
            }
        }

        let registry = Self::new(items);
        info!(count = registry.len(), "Loaded functions from registry");

        Ok(registry)
    }

    /// Load from a file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Entries registered under `function_id`
    pub fn find(&self, function_id: &str) -> Vec<&RegistryItem> {
        self.items.get(function_id).into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegistryItem> {
        self.items.values()
    }
}

fn row_to_item(row: &StringRecord) -> Option<RegistryItem> {
    let function_id = row.get(0).filter(|c| !c.is_empty())?;
    let name = row.get(1).filter(|c| !c.is_empty())?;
    let kind = name.parse::<FunctionKind>().ok()?;
    let options = row.get(2).map(parse_options).unwrap_or_default();

    Some(RegistryItem {
        function_id: function_id.to_string(),
        name: name.to_string(),
        kind,
        options,
    })
}

/// Parse `k1=v1,k2=v2`; tokens without exactly one `=` are dropped
fn parse_options(s: &str) -> Vec<FunctionOption> {
    s.split(',')
        .filter_map(|token| {
            let mut kv = token.split('=');
            match (kv.next(), kv.next(), kv.next()) {
                (Some(key), Some(value), None) => Some(FunctionOption {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                }),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REGISTRY: &str = "functionID;name;options\n\
        fn-cso-01;combinedsewageoverflow;tenant=default\n\
        fn-pump-07;SewagePumpingStation;\n\
        \n\
        fn-lvl-12;sewer;tenant=water,broken,zone=north,a=b=c\n\
        fn-x;wastebin;\n\
        fn-y\n";

    #[test]
    fn test_load_registry() {
        let registry = Registry::from_reader(REGISTRY.as_bytes()).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.find("fn-pump-07")[0].kind,
            FunctionKind::SewagePumpingStation
        );
        assert!(registry.find("fn-x").is_empty());
        assert!(registry.find("fn-y").is_empty());
    }

    #[test]
    fn test_malformed_options_are_dropped() {
        let registry = Registry::from_reader(REGISTRY.as_bytes()).unwrap();
        let item = registry.find("fn-lvl-12")[0];

        assert_eq!(
            item.options,
            vec![
                FunctionOption {
                    key: "tenant".into(),
                    value: "water".into()
                },
                FunctionOption {
                    key: "zone".into(),
                    value: "north".into()
                },
            ]
        );
        assert_eq!(item.option("zone"), Some("north"));
        assert_eq!(item.option("broken"), None);
    }

    #[test]
    fn test_quoted_options_cell() {
        let source = "functionID;name;options\n\
            fn-1;sewer;\"tenant=a;b,zone=north\"\n\
            \"fn;2\";sewagepumpingstation\n";

        let registry = Registry::from_reader(source.as_bytes()).unwrap();
        let item = registry.find("fn-1")[0];

        assert_eq!(item.option("tenant"), Some("a;b"));
        assert_eq!(item.option("zone"), Some("north"));
        assert_eq!(item.options.len(), 2);
        assert_eq!(
            registry.find("fn;2")[0].kind,
            FunctionKind::SewagePumpingStation
        );
    }

    #[test]
    fn test_find_is_exact_match() {
        let registry = Registry::new([RegistryItem::new("fn-1", FunctionKind::Sewer)]);

        assert_eq!(registry.find("fn-1").len(), 1);
        assert!(registry.find("fn-").is_empty());
        assert!(registry.find("FN-1").is_empty());
    }

    #[test]
    fn test_last_duplicate_wins() {
        let registry = Registry::new([
            RegistryItem::new("fn-1", FunctionKind::Sewer),
            RegistryItem::new("fn-1", FunctionKind::CombinedSewageOverflow),
        ]);

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.find("fn-1")[0].kind,
            FunctionKind::CombinedSewageOverflow
        );
    }
}
