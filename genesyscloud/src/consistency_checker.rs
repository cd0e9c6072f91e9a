//! Post-write consistency checking
//!
//! After a create or update the API may briefly return stale data. A
//! [`ConsistencyCheck`] snapshots the declared configuration and, once a
//! read has set observed values, reports [`RetryOutcome::Retryable`] while
//! any declared settable attribute still differs.

use serde_json::Value;
use tfplug::schema::{AttributeType, Schema};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::{ResourceData, RetryOutcome};

/// A declared attribute whose observed value differs
#[derive(Debug, thiserror::Error)]
#[error("{resource} attribute {attribute} has not converged: expected {expected}, got {actual}")]
pub struct Mismatch {
    pub resource: String,
    pub attribute: String,
    pub expected: String,
    pub actual: String,
}

pub struct ConsistencyCheck<'a> {
    schema: &'a Schema,
    intent: Option<DynamicValue>,
    resource: String,
}

/// How values under one attribute are compared
struct Rules<'a> {
    json: bool,
    set: bool,
    nested_json: &'a [String],
}

impl<'a> ConsistencyCheck<'a> {
    /// Snapshots the declared intent; bypassing makes every check pass
    pub fn new(data: &ResourceData, schema: &'a Schema, bypass: bool) -> Self {
        let intent = if bypass {
            None
        } else {
            data.intent().cloned()
        };
        Self {
            schema,
            intent,
            resource: data.id().unwrap_or("<new>").to_string(),
        }
    }

    /// Compares observed values against the snapshot
    pub fn check(&self, observed: &ResourceData) -> RetryOutcome {
        match self.first_mismatch(observed.values()) {
            Some(mismatch) => {
                tracing::debug!("{}", mismatch);
                RetryOutcome::retryable(mismatch)
            }
            None => RetryOutcome::Done(()),
        }
    }

    fn first_mismatch(&self, observed: &DynamicValue) -> Option<Mismatch> {
        let intent = self.intent.as_ref()?;

        for attr in self.schema.settable_attributes() {
            let path = AttributePath::new(&attr.name);
            let Some(expected) = intent.get(&path) else {
                continue;
            };
            let rules = Rules {
                json: attr.json_string,
                set: matches!(attr.r#type, AttributeType::Set(_)),
                nested_json: &attr.nested_json,
            };
            if let Err((attribute, expected, actual)) =
                compare(&attr.name, expected, observed.get(&path), &rules)
            {
                return Some(Mismatch {
                    resource: self.resource.clone(),
                    attribute,
                    expected,
                    actual,
                });
            }
        }
        None
    }
}

type Difference = (String, String, String);

fn describe(value: Option<&Dynamic>) -> String {
    match value {
        None | Some(Dynamic::Null) => "null".to_string(),
        Some(v) => Value::from(v).to_string(),
    }
}

fn is_empty_collection(value: &Dynamic) -> bool {
    match value {
        Dynamic::List(items) => items.is_empty(),
        Dynamic::Map(entries) => entries.is_empty(),
        _ => false,
    }
}

fn json_equal(expected: &str, actual: &str) -> bool {
    match (
        serde_json::from_str::<Value>(expected),
        serde_json::from_str::<Value>(actual),
    ) {
        (Ok(e), Ok(a)) => e == a,
        _ => expected == actual,
    }
}

fn compare(
    path: &str,
    expected: &Dynamic,
    actual: Option<&Dynamic>,
    rules: &Rules<'_>,
) -> Result<(), Difference> {
    let mismatch = || Err((path.to_string(), describe(Some(expected)), describe(actual)));

    if matches!(expected, Dynamic::Null | Dynamic::Unknown) {
        return Ok(());
    }

    let actual_value = match actual {
        None | Some(Dynamic::Null) => {
            return if is_empty_collection(expected) {
                Ok(())
            } else {
                mismatch()
            };
        }
        Some(v) => v,
    };

    match (expected, actual_value) {
        (Dynamic::String(e), Dynamic::String(a)) if rules.json => {
            if json_equal(e, a) {
                Ok(())
            } else {
                mismatch()
            }
        }
        (Dynamic::Map(e), Dynamic::Map(a)) => {
            for (key, expected_item) in e {
                let item_path = format!("{}.{}", path, key);
                let nested_rules = Rules {
                    json: rules.nested_json.iter().any(|f| f == key),
                    set: false,
                    nested_json: rules.nested_json,
                };
                compare(&item_path, expected_item, a.get(key), &nested_rules)?;
            }
            Ok(())
        }
        (Dynamic::List(e), Dynamic::List(a)) => {
            if e.len() != a.len() {
                return mismatch();
            }
            let item_rules = Rules {
                json: rules.json,
                set: false,
                nested_json: rules.nested_json,
            };
            if rules.set {
                let all_present = e.iter().all(|expected_item| {
                    a.iter().any(|actual_item| {
                        compare(path, expected_item, Some(actual_item), &item_rules).is_ok()
                    })
                });
                return if all_present { Ok(()) } else { mismatch() };
            }
            for (idx, (expected_item, actual_item)) in e.iter().zip(a).enumerate() {
                let item_path = format!("{}.{}", path, idx);
                compare(&item_path, expected_item, Some(actual_item), &item_rules)?;
            }
            Ok(())
        }
        (Dynamic::Number(e), Dynamic::Number(a)) => {
            if (e - a).abs() <= f64::EPSILON * e.abs().max(1.0) {
                Ok(())
            } else {
                mismatch()
            }
        }
        (e, a) if e == a => Ok(()),
        _ => mismatch(),
    }
}
