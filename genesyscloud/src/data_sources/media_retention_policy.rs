//! Data source for a media retention policy selected by name

use async_trait::async_trait;
use std::sync::OnceLock;
use tfplug::schema::Schema;
use tfplug::types::Diagnostic;
use tfplug::{Context, DataSource, ResourceData, RetryOutcome};

use super::{name_lookup_schema, required_name};
use crate::api::paging::DEFAULT_PAGE_SIZE;
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{DataSourceRegistration, Registrar};
use crate::util::retries::{with_retries, ReadError};

pub const DATA_SOURCE_TYPE: &str = "genesyscloud_recording_media_retention_policy";

pub fn register(registrar: &mut Registrar) {
    registrar.register_data_source(
        DATA_SOURCE_TYPE,
        DataSourceRegistration {
            schema,
            factory: |provider_data| Box::new(MediaRetentionPolicyDataSource::new(provider_data)),
        },
    );
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        name_lookup_schema(
            "Data source for Genesys Cloud media retention policy. Select a policy by name",
            "Media retention policy name",
        )
    })
}

pub struct MediaRetentionPolicyDataSource {
    provider_data: GenesysCloudProviderData,
}

impl MediaRetentionPolicyDataSource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }
}

#[async_trait]
impl DataSource for MediaRetentionPolicyDataSource {
    fn type_name(&self) -> &str {
        DATA_SOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema().clone()
    }

    /// The name filter does the matching, so the first entity of the first
    /// page is taken
    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let name = match required_name(data) {
            Ok(name) => name,
            Err(diags) => return diags,
        };
        let api = self.provider_data.client.recording().media_retention_policies();
        let (api, name) = (&api, name.as_str());

        let found = with_retries(
            &ctx,
            self.provider_data.timeouts.search_policy(),
            &format!("Failed to find media retention policy {}", name),
            move || async move {
                match api.list_page(1, DEFAULT_PAGE_SIZE, Some(name)).await {
                    Ok(policies) => match policies.into_iter().find_map(|p| p.id) {
                        Some(id) => RetryOutcome::Done(id),
                        None => RetryOutcome::retryable(format!(
                            "No media retention policy found with name {}",
                            name
                        )),
                    },
                    Err(e) => RetryOutcome::fatal(ReadError::new(
                        format!("Error requesting media retention policy {}", name),
                        e,
                    )),
                }
            },
        )
        .await;

        match found {
            Ok(id) => {
                data.set_id(id);
                vec![]
            }
            Err(diag) => vec![diag],
        }
    }
}
