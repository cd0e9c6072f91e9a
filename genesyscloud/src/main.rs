use genesyscloud::GenesysCloudProvider;
use std::process::ExitCode;
use tfplug::types::Diagnostic;
use tfplug::{Context, DynamicValue, Provider};
use tracing_subscriber::EnvFilter;

fn report(diag: &Diagnostic) {
    if diag.is_error() {
        tracing::error!("{}: {}", diag.summary, diag.detail);
    } else {
        tracing::warn!("{}: {}", diag.summary, diag.detail);
    }
}

/// Exports the org's objects as `.tf.json` on stdout. Arguments limit the
/// export to the named resource types.
#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the document
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let resource_types: Vec<String> = std::env::args().skip(1).collect();

    let ctx = Context::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling export");
            canceller.cancel();
        }
    });

    let mut provider = GenesysCloudProvider::new();
    let diags = provider.configure(ctx.clone(), DynamicValue::object()).await;
    diags.iter().for_each(report);
    if diags.iter().any(Diagnostic::is_error) {
        return ExitCode::FAILURE;
    }

    let document = match provider.export(&ctx, &resource_types).await {
        Ok(document) => document,
        Err(diag) => {
            report(&diag);
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&document) {
        Ok(rendered) => {
            println!("{}", rendered);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Failed to render export: {}", e);
            ExitCode::FAILURE
        }
    }
}
