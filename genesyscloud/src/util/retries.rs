//! Runner wrappers that turn retry failures into diagnostics

use std::future::Future;
use tfplug::retry::{self, RetryError, RetryOutcome, RetryPolicy};
use tfplug::types::Diagnostic;
use tfplug::{Context, ResourceData};

use crate::api::ApiError;
use crate::provider_data::RetryTimeouts;

/// An API failure while reading an object
#[derive(Debug, thiserror::Error)]
#[error("{what}: {source}")]
pub struct ReadError {
    pub what: String,
    #[source]
    pub source: ApiError,
}

impl ReadError {
    pub fn new(what: impl Into<String>, source: ApiError) -> Self {
        Self {
            what: what.into(),
            source,
        }
    }
}

/// Error diagnostic for a terminal runner failure
pub fn retry_diagnostic(summary: impl Into<String>, err: &RetryError) -> Diagnostic {
    Diagnostic::error(summary, err.to_string())
}

/// Runs `operation` under `policy`, reporting failure as a diagnostic
pub async fn with_retries<T, F, Fut>(
    ctx: &Context,
    policy: RetryPolicy,
    summary: &str,
    operation: F,
) -> Result<T, Diagnostic>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryOutcome<T>>,
{
    retry::run(ctx, policy, operation)
        .await
        .map_err(|err| retry_diagnostic(summary, &err))
}

/// Classifies a failed get during a read.
///
/// A 404 right after a write is expected while the API catches up; on a
/// plain refresh it means the object is gone.
pub fn classify_read_error<T>(
    what: impl Into<String>,
    err: ApiError,
    post_write: bool,
) -> RetryOutcome<Option<T>> {
    let what = what.into();
    if err.is_not_found() {
        if post_write {
            RetryOutcome::retryable(ReadError::new(what, err))
        } else {
            tracing::debug!("{}: object no longer exists", what);
            RetryOutcome::Done(None)
        }
    } else if err.is_transient() {
        RetryOutcome::retryable(ReadError::new(what, err))
    } else {
        RetryOutcome::fatal(ReadError::new(what, err))
    }
}

/// Runs a read under the read timeout and applies its result to `data`.
///
/// `Done(Some(observed))` replaces the working data, `Done(None)` clears the
/// id. A read that times out still seeing 404 also clears the id.
pub async fn with_retries_for_read<F, Fut>(
    ctx: &Context,
    timeouts: &RetryTimeouts,
    data: &mut ResourceData,
    kind: &str,
    operation: F,
) -> Vec<Diagnostic>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RetryOutcome<Option<ResourceData>>>,
{
    let id = data.id().unwrap_or_default().to_string();

    match retry::run(ctx, timeouts.read_policy(), operation).await {
        Ok(Some(observed)) => {
            *data = observed;
            vec![]
        }
        Ok(None) => {
            tracing::info!("{} {} not found, removing from state", kind, id);
            data.clear_id();
            vec![]
        }
        Err(err) if err.is_timeout() && last_was_not_found(&err) => {
            tracing::warn!("{} {} never appeared, removing from state", kind, id);
            data.clear_id();
            vec![Diagnostic::warning(
                format!("{} {} not found", kind, id),
                err.to_string(),
            )]
        }
        Err(err) => vec![retry_diagnostic(format!("Failed to read {} {}", kind, id), &err)],
    }
}

fn last_was_not_found(err: &RetryError) -> bool {
    err.last_error()
        .and_then(|e| e.downcast_ref::<ReadError>())
        .map(|e| e.source.is_not_found())
        .unwrap_or(false)
}

/// Polls `get` until the object is reported missing
pub async fn confirm_deleted<T, F, Fut>(
    ctx: &Context,
    timeouts: &RetryTimeouts,
    kind: &str,
    id: &str,
    mut get: F,
) -> Vec<Diagnostic>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let result = retry::run(ctx, timeouts.delete_policy(), || {
        let fetch = get();
        async move {
            match fetch.await {
                Err(e) if e.is_not_found() => RetryOutcome::Done(()),
                Err(e) => RetryOutcome::fatal(ReadError::new(
                    format!("Error deleting {} {}", kind, id),
                    e,
                )),
                Ok(_) => RetryOutcome::retryable(format!("{} {} still exists", kind, id)),
            }
        }
    })
    .await;

    match result {
        Ok(()) => {
            tracing::info!("Deleted {} {}", kind, id);
            vec![]
        }
        Err(err) => vec![retry_diagnostic(format!("Failed to delete {} {}", kind, id), &err)],
    }
}

/// Outcome of one find-by-name attempt; a miss is retried until the
/// search timeout since new objects can take time to become searchable
pub fn search_outcome<T>(
    kind: &str,
    name: &str,
    result: Result<Option<T>, ApiError>,
) -> RetryOutcome<T> {
    match result {
        Ok(Some(found)) => RetryOutcome::Done(found),
        Ok(None) => RetryOutcome::retryable(format!("no {} found with name {}", kind, name)),
        Err(e) => RetryOutcome::fatal(ReadError::new(
            format!("failed to search for {} {}", kind, name),
            e,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tfplug::DynamicValue;

    fn fast() -> RetryTimeouts {
        RetryTimeouts {
            read: Duration::from_millis(60),
            search: Duration::from_millis(60),
            delete: Duration::from_millis(60),
            backoff: Duration::from_millis(10),
        }
    }

    fn not_found() -> ApiError {
        ApiError::NotFound {
            path: "/x".to_string(),
            message: String::new(),
        }
    }

    #[test]
    fn not_found_after_write_is_retryable() {
        let outcome = classify_read_error::<()>("read", not_found(), true);

        assert!(matches!(outcome, RetryOutcome::Retryable(_)));
    }

    #[test]
    fn not_found_on_refresh_means_gone() {
        let outcome = classify_read_error::<()>("read", not_found(), false);

        assert!(matches!(outcome, RetryOutcome::Done(None)));
    }

    #[test]
    fn bad_request_is_fatal() {
        let err = ApiError::Api {
            status: 400,
            message: "bad".to_string(),
            details: None,
        };

        assert!(matches!(
            classify_read_error::<()>("read", err, true),
            RetryOutcome::Fatal(_)
        ));
    }

    #[tokio::test]
    async fn read_replaces_data_with_observed_values() {
        let mut data = ResourceData::for_read(DynamicValue::from_json(json!({ "id": "x" })));

        let diags = with_retries_for_read(&Context::new(), &fast(), &mut data, "thing", || async {
            let mut observed =
                ResourceData::for_read(DynamicValue::from_json(json!({ "id": "x" })));
            observed.set_string("name", "read back");
            RetryOutcome::Done(Some(observed))
        })
        .await;

        assert!(diags.is_empty());
        assert_eq!(data.get_string("name").as_deref(), Some("read back"));
    }

    #[tokio::test]
    async fn read_of_missing_object_clears_id() {
        let mut data = ResourceData::for_read(DynamicValue::from_json(json!({ "id": "x" })));

        let diags = with_retries_for_read(&Context::new(), &fast(), &mut data, "thing", || async {
            classify_read_error("read", not_found(), false)
        })
        .await;

        assert!(diags.is_empty());
        assert!(data.id().is_none());
    }

    #[tokio::test]
    async fn read_that_never_finds_written_object_warns() {
        let mut data = ResourceData::for_create(DynamicValue::from_json(json!({ "name": "n" })));
        data.set_id("x");

        let diags = with_retries_for_read(&Context::new(), &fast(), &mut data, "thing", || async {
            classify_read_error("read", not_found(), true)
        })
        .await;

        assert_eq!(diags.len(), 1);
        assert!(!diags[0].is_error());
        assert!(data.id().is_none());
    }

    #[tokio::test]
    async fn delete_confirmed_on_first_poll() {
        let polls = AtomicU32::new(0);

        let diags = confirm_deleted(&Context::new(), &fast(), "thing", "x", || {
            polls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(not_found()) }
        })
        .await;

        assert!(diags.is_empty());
        assert_eq!(polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn delete_that_never_completes_reports_timeout() {
        let diags = confirm_deleted(&Context::new(), &fast(), "thing", "x", || async {
            Ok::<_, ApiError>(())
        })
        .await;

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("still exists"), "{}", diags[0].detail);
    }

    #[tokio::test]
    async fn search_miss_is_retried_until_timeout() {
        let attempts = AtomicU32::new(0);

        let result: Result<String, _> = with_retries(
            &Context::new(),
            fast().search_policy(),
            "Failed to find thing",
            || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                search_outcome::<String>("thing", "missing", Ok(None))
            },
        )
        .await;

        let diag = result.unwrap_err();
        assert!(diag.detail.contains("no thing found with name missing"));
        assert!(attempts.load(Ordering::SeqCst) > 1);
    }
}
