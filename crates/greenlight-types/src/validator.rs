use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// Field name -> error message
pub type ValidationErrors = BTreeMap<String, String>;

/// Collects field level errors for one request.
///
/// Only one message is kept per field: when several checks fail for the same
/// field, the message of the last failing check is the one reported.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    /// Records `message` under `field` if `ok` is false
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// Turns accumulated errors into `Err`, so callers can use `?`
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.valid() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

pub fn permitted<T: PartialEq + ?Sized>(value: &T, list: &[&T]) -> bool {
    list.iter().any(|v| *v == value)
}

pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}
