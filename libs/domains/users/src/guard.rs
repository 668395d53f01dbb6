//! Declarative field rules for user input.
//!
//! Each input shape has a static rule table. [`check`] runs every rule of
//! every field and collects all violations into one `ValidationErrors`, so a
//! caller sees the complete list in a single response.

use std::borrow::Cow;
use validator::{ValidateEmail, ValidationError, ValidationErrors};

use crate::models::{CreateUser, LoginRequest, Role, UpdateUser};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Present and non-empty
    Required,
    /// At least `n` characters (not bytes)
    MinChars(u64),
    MaxChars(u64),
    Email,
    OneOf(&'static [&'static str]),
}

#[derive(Debug)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

pub const CREATE_USER: &[FieldRules] = &[
    FieldRules {
        field: "name",
        rules: &[Rule::Required, Rule::MinChars(2), Rule::MaxChars(100)],
    },
    FieldRules {
        field: "email",
        rules: &[Rule::Required, Rule::Email, Rule::MaxChars(100)],
    },
    FieldRules {
        field: "password",
        rules: &[Rule::Required, Rule::MinChars(6)],
    },
    FieldRules {
        field: "role",
        rules: &[Rule::OneOf(Role::VALUES)],
    },
];

pub const UPDATE_USER: &[FieldRules] = &[
    FieldRules {
        field: "name",
        rules: &[Rule::MinChars(2), Rule::MaxChars(100)],
    },
    FieldRules {
        field: "email",
        rules: &[Rule::Email, Rule::MaxChars(100)],
    },
    FieldRules {
        field: "password",
        rules: &[Rule::MinChars(6)],
    },
    FieldRules {
        field: "role",
        rules: &[Rule::OneOf(Role::VALUES)],
    },
];

pub const LOGIN: &[FieldRules] = &[
    FieldRules {
        field: "email",
        rules: &[Rule::Required, Rule::Email],
    },
    FieldRules {
        field: "password",
        rules: &[Rule::Required],
    },
];

/// Evaluates `table` against the values returned by `lookup`.
///
/// Absent and empty values only trip `Required`; the other rules apply to
/// supplied values.
pub fn check<'a, F>(table: &[FieldRules], lookup: F) -> Result<(), ValidationErrors>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut errors = ValidationErrors::new();

    for field in table {
        let value = lookup(field.field).filter(|v| !v.is_empty());
        for rule in field.rules {
            if let Some(error) = violation(*rule, value) {
                errors.add(field.field, error);
            }
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

fn violation(rule: Rule, value: Option<&str>) -> Option<ValidationError> {
    let Some(value) = value else {
        return (rule == Rule::Required).then(|| error("required", "is required".into()));
    };

    match rule {
        Rule::Required => None,
        Rule::MinChars(min) if (value.chars().count() as u64) < min => {
            let mut err = error("min_length", format!("must be at least {} characters", min));
            err.add_param(Cow::from("min"), &min);
            Some(err)
        }
        Rule::MaxChars(max) if (value.chars().count() as u64) > max => {
            let mut err = error("max_length", format!("must be at most {} characters", max));
            err.add_param(Cow::from("max"), &max);
            Some(err)
        }
        Rule::Email if !value.validate_email() => {
            Some(error("email", "must be a valid email address".into()))
        }
        Rule::OneOf(allowed) if !allowed.contains(&value) => {
            let mut err = error("one_of", format!("must be one of: {}", allowed.join(", ")));
            err.add_param(Cow::from("allowed"), &allowed);
            err.add_param(Cow::from("value"), &value);
            Some(err)
        }
        _ => None,
    }
}

fn error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Owned(message));
    err
}

impl validator::Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check(CREATE_USER, |field| match field {
            "name" => Some(self.name.as_str()),
            "email" => Some(self.email.as_str()),
            "password" => Some(self.password.as_str()),
            "role" => self.role.as_deref(),
            _ => None,
        })
    }
}

impl validator::Validate for UpdateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check(UPDATE_USER, |field| match field {
            "name" => self.name(),
            "email" => self.email(),
            "password" => self.password(),
            "role" => self.role(),
            _ => None,
        })
    }
}

impl validator::Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        check(LOGIN, |field| match field {
            "email" => Some(self.email.as_str()),
            "password" => Some(self.password.as_str()),
            _ => None,
        })
    }
}
