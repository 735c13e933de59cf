//! Column mapping model.
//!
//! An ordered source-column → destination-column correspondence. The key order
//! drives the SELECT column list and the value order drives the INSERT column
//! list, so order is preserved through (de)serialization.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnPair {
    source: String,
    destination: String,
}

/// Ordered, key-unique column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    pairs: Vec<ColumnPair>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mapping from `(source, destination)` pairs.
    pub fn from_pairs<I, S, D>(pairs: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        let mut mapping = Self::new();
        for (source, destination) in pairs {
            let source = source.into();
            if mapping.contains_source(&source) {
                return Err(AppError::Validation(format!(
                    "source column {:?} is mapped more than once",
                    source
                )));
            }
            mapping.set(source, destination)?;
        }
        Ok(mapping)
    }

    /// Maps `source` to `destination`.
    ///
    /// An existing entry for `source` is replaced in place, keeping its position.
    /// Fails if another source column already targets `destination`.
    pub fn set(&mut self, source: impl Into<String>, destination: impl Into<String>) -> AppResult<()> {
        let source = source.into();
        let destination = destination.into();
        if let Some(other) = self
            .pairs
            .iter()
            .find(|p| p.destination == destination && p.source != source)
        {
            return Err(AppError::Validation(format!(
                "destination column {:?} is already mapped from {:?}",
                destination, other.source
            )));
        }
        match self.pairs.iter_mut().find(|p| p.source == source) {
            Some(pair) => pair.destination = destination,
            None => self.pairs.push(ColumnPair { source, destination }),
        }
        Ok(())
    }

    /// Removes the entry for `source`, if any.
    pub fn unset(&mut self, source: &str) -> Option<String> {
        let idx = self.pairs.iter().position(|p| p.source == source)?;
        Some(self.pairs.remove(idx).destination)
    }

    pub fn get(&self, source: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.source == source)
            .map(|p| p.destination.as_str())
    }

    pub fn contains_source(&self, source: &str) -> bool {
        self.get(source).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Source columns in mapping order.
    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.source.as_str())
    }

    /// Destination columns in mapping order.
    pub fn destination_columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.destination.as_str())
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for pair in &self.pairs {
            map.serialize_entry(&pair.source, &pair.destination)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(MappingVisitor)
    }
}

struct MappingVisitor;

impl<'de> Visitor<'de> for MappingVisitor {
    type Value = ColumnMapping;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping source column names to destination column names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut mapping = ColumnMapping::new();
        let mut seen: Vec<String> = Vec::new();
        while let Some((source, destination)) = access.next_entry::<String, Option<String>>()? {
            if seen.contains(&source) {
                return Err(serde::de::Error::custom(format!(
                    "source column {:?} appears more than once",
                    source
                )));
            }
            seen.push(source.clone());
            // Empty destination means "not mapped".
            match destination.filter(|d| !d.is_empty()) {
                Some(destination) => mapping
                    .set(source, destination)
                    .map_err(serde::de::Error::custom)?,
                None => continue,
            }
        }
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_preserves_document_order() {
        let mapping: ColumnMapping =
            serde_json::from_str(r#"{"Name": "FullName", "Dept": "Dept", "Age": "Years"}"#).unwrap();
        let sources: Vec<_> = mapping.source_columns().collect();
        let destinations: Vec<_> = mapping.destination_columns().collect();
        assert_eq!(sources, ["Name", "Dept", "Age"]);
        assert_eq!(destinations, ["FullName", "Dept", "Years"]);
    }

    #[test]
    fn test_empty_destination_is_unmapped() {
        let mapping: ColumnMapping =
            serde_json::from_str(r#"{"Id": "", "Name": "FullName", "Dept": null}"#).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("Name"), Some("FullName"));
        assert!(!mapping.contains_source("Id"));
    }

    #[test]
    fn test_duplicate_source_rejected() {
        let result: Result<ColumnMapping, _> =
            serde_json::from_str(r#"{"Name": "A", "Name": "B"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_destination_rejected() {
        let result = ColumnMapping::from_pairs([("First", "Name"), ("Last", "Name")]);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut mapping = ColumnMapping::from_pairs([("A", "X"), ("B", "Y")]).unwrap();
        mapping.set("A", "Z").unwrap();
        let destinations: Vec<_> = mapping.destination_columns().collect();
        assert_eq!(destinations, ["Z", "Y"]);
        assert_eq!(mapping.unset("A").as_deref(), Some("Z"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_serialize_keeps_order() {
        let mapping = ColumnMapping::from_pairs([("b", "2"), ("a", "1")]).unwrap();
        assert_eq!(serde_json::to_string(&mapping).unwrap(), r#"{"b":"2","a":"1"}"#);
    }
}
