use std::collections::BTreeSet;

use crate::error::{ValidationError, require, require_file_name};
use crate::schema::{CollectorDefinition, ListingId};

/// The static collector table, validated once at load time.
///
/// Invariants:
/// - every listing id is non-empty
/// - every listing id is a plain file name (it names output files)
/// - listing ids are unique
/// - entry order is preserved (descriptor i belongs to entry i)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorTable {
    entries: Vec<CollectorDefinition>,
}

impl CollectorTable {
    pub fn new(entries: Vec<CollectorDefinition>) -> Result<Self, ValidationError> {
        let mut seen: BTreeSet<&ListingId> = BTreeSet::new();
        for def in &entries {
            require("listing_id", def.listing_id.as_str())?;
            require_file_name("listing_id", def.listing_id.as_str())?;
            if !seen.insert(&def.listing_id) {
                return Err(ValidationError::DuplicateListingId {
                    listing_id: def.listing_id.to_string(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CollectorDefinition> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a CollectorTable {
    type Item = &'a CollectorDefinition;
    type IntoIter = std::slice::Iter<'a, CollectorDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = CollectorTable::new(vec![
            CollectorDefinition::new("1", "com.foo.Bar"),
            CollectorDefinition::new("2", "com.foo.Baz"),
            CollectorDefinition::new("1", "com.foo.Qux"),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::DuplicateListingId {
                listing_id: "1".to_string()
            }
        );
    }

    #[test]
    fn test_numeric_and_text_ids_collide() {
        let err = CollectorTable::new(vec![
            CollectorDefinition::new(5u64, "com.foo.Bar"),
            CollectorDefinition::new("5", "com.foo.Baz"),
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn test_empty_id_rejected() {
        let err = CollectorTable::new(vec![CollectorDefinition::new("", "com.foo.Bar")]).unwrap_err();
        assert_eq!(err, ValidationError::empty("listing_id"));
    }

    #[test]
    fn test_path_like_ids_rejected() {
        let err = CollectorTable::new(vec![
            CollectorDefinition::new("1", "com.foo.Bar"),
            CollectorDefinition::new("/../../escaped", "com.foo.Baz"),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            ValidationError::UnsafeName {
                field: "listing_id",
                value: "/../../escaped".to_string()
            }
        );
    }

    #[test]
    fn test_order_preserved() {
        let table = CollectorTable::new(vec![
            CollectorDefinition::new("9", "a"),
            CollectorDefinition::new("3", "b"),
            CollectorDefinition::new("5", "c"),
        ])
        .unwrap();

        let ids: Vec<&str> = table.iter().map(|d| d.listing_id.as_str()).collect();
        assert_eq!(ids, ["9", "3", "5"]);
        assert_eq!(table.len(), 3);
    }
}
