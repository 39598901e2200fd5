//! Configuration-driven form validation, run before any write.
//!
//! A [`FormSpec`] enumerates the fields of an incoming form with a
//! required/optional flag and a validator function each. Checking a form
//! yields the full set of field errors at once, so callers can re-render the
//! form without partial writes.

use serde::Serialize;
use std::{borrow::Cow, collections::BTreeMap};
use thiserror::Error;

pub const REQUIRED_MESSAGE: &str = "This field is required.";

pub type Validator = fn(&str) -> Result<(), &'static str>;

#[derive(Copy, Clone, Debug)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub validate: Validator,
}

#[derive(Copy, Clone, Debug)]
pub struct FormSpec {
    pub fields: &'static [FieldRule],
}

/// String projection of a form body, field by field.
///
/// Absent and blank values are equivalent: both count as missing.
pub trait FormValues {
    fn value(&self, field: &'static str) -> Option<Cow<'_, str>>;
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Serialize, Error)]
#[serde(transparent)]
#[error("{} field(s) failed validation", .0.len())]
pub struct FieldErrors(pub BTreeMap<&'static str, String>);

impl FieldErrors {
    #[must_use]
    pub fn single(field: &'static str, message: &str) -> Self {
        Self(BTreeMap::from([(field, message.to_owned())]))
    }
}

impl FormSpec {
    pub fn validate(&self, values: &impl FormValues) -> Result<(), FieldErrors> {
        let mut errors = BTreeMap::new();

        for field in self.fields {
            let value = values
                .value(field.name)
                .filter(|value| !value.trim().is_empty());

            match value {
                None => {
                    if field.required {
                        errors.insert(field.name, REQUIRED_MESSAGE.to_owned());
                    }
                }
                Some(value) => {
                    if let Err(message) = (field.validate)(&value) {
                        errors.insert(field.name, message.to_owned());
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FieldErrors(errors))
        }
    }
}

pub const POST_FORM: FormSpec = FormSpec {
    fields: &[
        FieldRule {
            name: "text",
            required: true,
            validate: accept,
        },
        FieldRule {
            name: "group",
            required: false,
            validate: accept,
        },
        FieldRule {
            name: "image",
            required: false,
            validate: attachment_reference,
        },
    ],
};

pub const COMMENT_FORM: FormSpec = FormSpec {
    fields: &[FieldRule {
        name: "text",
        required: true,
        validate: accept,
    }],
};

fn accept(_: &str) -> Result<(), &'static str> {
    Ok(())
}

fn attachment_reference(value: &str) -> Result<(), &'static str> {
    if value.chars().any(char::is_whitespace) {
        Err("Attachment references may not contain whitespace.")
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::form::{COMMENT_FORM, POST_FORM, REQUIRED_MESSAGE, FormValues};
    use std::{borrow::Cow, collections::BTreeMap};

    struct Values(BTreeMap<&'static str, String>);

    impl FormValues for Values {
        fn value(&self, field: &'static str) -> Option<Cow<'_, str>> {
            self.0.get(field).map(|value| Cow::Borrowed(value.as_str()))
        }
    }

    #[test]
    fn missing_required_field_is_reported() {
        let errors = COMMENT_FORM.validate(&Values(BTreeMap::new())).unwrap_err();
        assert_eq!(errors.0.get("text").map(String::as_str), Some(REQUIRED_MESSAGE));
    }

    #[test]
    fn blank_required_field_counts_as_missing() {
        let values = Values(BTreeMap::from([("text", "   \n".to_owned())]));
        assert!(COMMENT_FORM.validate(&values).is_err());
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let values = Values(BTreeMap::from([("text", "hello".to_owned())]));
        assert!(POST_FORM.validate(&values).is_ok());
    }

    #[test]
    fn validator_failures_are_field_errors() {
        let values = Values(BTreeMap::from([
            ("text", "hello".to_owned()),
            ("image", "posts/a cat.gif".to_owned()),
        ]));
        let errors = POST_FORM.validate(&values).unwrap_err();
        assert!(errors.0.contains_key("image"));
        assert!(!errors.0.contains_key("text"));
    }
}
