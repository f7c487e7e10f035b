use std::borrow::Cow;
use std::fmt;

use validator::{Validate, ValidationError, ValidationErrors};

/// Rejects empty strings with the "is required" message.
pub(crate) fn required(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("required").with_message(Cow::Borrowed("is required")));
    }
    Ok(())
}

/// Every field that failed validation, with one message per field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    fields: Vec<(String, String)>,
}

impl ValidationFailure {
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

impl From<ValidationErrors> for ValidationFailure {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<(String, String)> = errors
            .field_errors()
            .into_iter()
            .filter_map(|(field, errs)| {
                let first = errs.first()?;
                let message = first
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| first.code.to_string());
                Some((field.to_string(), message))
            })
            .collect();
        fields.sort();
        Self { fields }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .fields
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}.")
    }
}

impl std::error::Error for ValidationFailure {}

/// Runs the derived rules of `value` and collects the failures.
pub fn validate<T: Validate>(value: &T) -> Result<(), ValidationFailure> {
    value.validate().map_err(ValidationFailure::from)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::schema::TodoSchema;

    fn schema(title: &str, description: &str) -> TodoSchema {
        TodoSchema {
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
        }
    }

    #[rstest]
    #[case("1", "hoge")]
    #[case(&"t".repeat(50), &"d".repeat(100))]
    #[case("日本語のタイトル", "説明")]
    #[case(&"あ".repeat(50), "hoge")]
    fn accepts_lengths_within_bounds(#[case] title: &str, #[case] description: &str) {
        assert!(validate(&schema(title, description)).is_ok());
    }

    #[rstest]
    #[case("", "hoge", "title: is required.")]
    #[case(&"t".repeat(51), "hoge", "title: size is 1～50.")]
    #[case(&"あ".repeat(51), "hoge", "title: size is 1～50.")]
    #[case("1", "", "description: is required.")]
    #[case("1", &"d".repeat(101), "description: size is 1～100.")]
    fn rejects_out_of_bounds(#[case] title: &str, #[case] description: &str, #[case] expected: &str) {
        let failure = validate(&schema(title, description)).unwrap_err();
        assert_eq!(failure.to_string(), expected);
    }

    #[test]
    fn reports_every_failing_field_sorted() {
        let failure = validate(&schema("", &"d".repeat(101))).unwrap_err();
        assert_eq!(failure.fields().len(), 2);
        assert_eq!(
            failure.to_string(),
            "description: size is 1～100; title: is required."
        );
    }
}
