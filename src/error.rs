use thiserror::Error;

/// The only failure the generator can produce.
///
/// Raised synchronously when a field required to build a descriptor is
/// missing, empty or unusable. The variant always names the offending field so the
/// provisioner can surface a precise message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required string field is empty (or whitespace only).
    #[error("required field `{field}` is empty")]
    EmptyField { field: &'static str },

    /// The same listing id appears twice in the collector table.
    #[error("listing id `{listing_id}` appears more than once in the collector table")]
    DuplicateListingId { listing_id: String },

    /// A value that ends up as an output file name is not a plain name.
    #[error("field `{field}` value `{value}` cannot be used as a file name")]
    UnsafeName { field: &'static str, value: String },

    /// The registry login needs a host but the image reference has none.
    #[error("image reference `{image_reference}` has no registry host")]
    MissingRegistryHost { image_reference: String },
}

impl ValidationError {
    pub fn empty(field: &'static str) -> Self {
        Self::EmptyField { field }
    }
}

/// Fails with `EmptyField` when `value` is blank.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::empty(field));
    }
    Ok(())
}

/// Fails with `UnsafeName` when `value` could escape an output directory.
///
/// Path separators, `..` and a leading `.` are rejected.
pub(crate) fn require_file_name(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.contains(['/', '\\']) || value.contains("..") || value.starts_with('.') {
        return Err(ValidationError::UnsafeName {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_file_name() {
        assert!(require_file_name("listing_id", "42").is_ok());
        assert!(require_file_name("listing_id", "btc-usd_1").is_ok());
        for bad in ["/../../escaped", "a/b", "a\\b", "..", ".hidden", "x..y"] {
            assert_eq!(
                require_file_name("listing_id", bad),
                Err(ValidationError::UnsafeName {
                    field: "listing_id",
                    value: bad.to_string()
                }),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_require_rejects_blank() {
        assert_eq!(require("bucket_name", ""), Err(ValidationError::empty("bucket_name")));
        assert_eq!(require("bucket_name", "   "), Err(ValidationError::empty("bucket_name")));
        assert!(require("bucket_name", "market-data-collector").is_ok());
    }

    #[test]
    fn test_message_names_field() {
        let err = ValidationError::empty("listing_id");
        assert_eq!(err.to_string(), "required field `listing_id` is empty");
    }
}
