//! Built-in attribute validators

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};
use std::sync::Arc;

pub struct StringLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl StringLengthValidator {
    pub fn between(min: usize, max: usize) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for StringLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("string length must be between {} and {}", min, max),
            (Some(min), None) => format!("string length must be at least {}", min),
            (None, Some(max)) => format!("string length must be at most {}", max),
            (None, None) => "any string length".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::String(s) = &request.config_value.value {
            let len = s.chars().count();
            if self.min.is_some_and(|min| len < min) || self.max.is_some_and(|max| len > max) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} {}", request.path, self.description()),
                        format!("Got length {}", len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

/// Restricts a string to a fixed set of values
pub struct StringOneOfValidator {
    pub allowed: Vec<String>,
}

impl StringOneOfValidator {
    pub fn create(allowed: &[&str]) -> Arc<dyn Validator> {
        Arc::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOfValidator {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::String(s) = &request.config_value.value {
            if !self.allowed.iter().any(|allowed| allowed == s) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} {}", request.path, self.description()),
                        format!("Got \"{}\"", s),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct NumberRangeValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumberRangeValidator {
    pub fn between(min: f64, max: f64) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: Some(min),
            max: Some(max),
        })
    }
}

impl Validator for NumberRangeValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("value must be between {} and {}", min, max),
            (Some(min), None) => format!("value must be at least {}", min),
            (None, Some(max)) => format!("value must be at most {}", max),
            (None, None) => "any number".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::Number(n) = request.config_value.value {
            if self.min.is_some_and(|min| n < min) || self.max.is_some_and(|max| n > max) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} {}", request.path, self.description()),
                        format!("Got {}", n),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

pub struct ListLengthValidator {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl ListLengthValidator {
    pub fn at_most(max: usize) -> Arc<dyn Validator> {
        Arc::new(Self {
            min: None,
            max: Some(max),
        })
    }
}

impl Validator for ListLengthValidator {
    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("must have between {} and {} items", min, max),
            (Some(min), None) => format!("must have at least {} items", min),
            (None, Some(max)) => format!("must have at most {} items", max),
            (None, None) => "any number of items".to_string(),
        }
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let mut diagnostics = Vec::new();
        if let Dynamic::List(items) = &request.config_value.value {
            let len = items.len();
            if self.min.is_some_and(|min| len < min) || self.max.is_some_and(|max| len > max) {
                diagnostics.push(
                    Diagnostic::error(
                        format!("{} {}", request.path, self.description()),
                        format!("Got {} items", len),
                    )
                    .with_attribute(request.path),
                );
            }
        }
        ValidatorResponse { diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn run(validator: &Arc<dyn Validator>, value: Dynamic) -> usize {
        validator
            .validate(ValidatorRequest {
                config_value: DynamicValue::new(value),
                path: AttributePath::new("test_field"),
            })
            .diagnostics
            .len()
    }

    #[test]
    fn string_length_validator_accepts_valid_length() {
        let validator = StringLengthValidator::between(3, 10);

        assert_eq!(run(&validator, Dynamic::String("hello".to_string())), 0);
    }

    #[test]
    fn string_length_validator_rejects_too_short() {
        let validator = StringLengthValidator::between(5, 10);

        assert_eq!(run(&validator, Dynamic::String("hi".to_string())), 1);
    }

    #[test]
    fn string_length_validator_ignores_null() {
        let validator = StringLengthValidator::between(5, 10);

        assert_eq!(run(&validator, Dynamic::Null), 0);
    }

    #[test]
    fn one_of_validator_rejects_unknown_value() {
        let validator = StringOneOfValidator::create(&["ENABLED", "DISABLED"]);

        assert_eq!(run(&validator, Dynamic::String("ENABLED".to_string())), 0);
        assert_eq!(run(&validator, Dynamic::String("enabled".to_string())), 1);
    }

    #[test]
    fn number_range_validator_bounds_are_inclusive() {
        let validator = NumberRangeValidator::between(1.0, 10.0);

        assert_eq!(run(&validator, Dynamic::Number(1.0)), 0);
        assert_eq!(run(&validator, Dynamic::Number(10.0)), 0);
        assert_eq!(run(&validator, Dynamic::Number(11.0)), 1);
    }

    #[test]
    fn list_length_validator_rejects_long_list() {
        let validator = ListLengthValidator::at_most(1);

        assert_eq!(run(&validator, Dynamic::List(vec![])), 0);
        assert_eq!(run(&validator, Dynamic::List(vec![Dynamic::Bool(true)])), 0);
        assert_eq!(run(&validator, Dynamic::List(vec![Dynamic::Null, Dynamic::Null])), 1);
    }
}
