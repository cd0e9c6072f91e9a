//! Data source for an integration action selected by name

use async_trait::async_trait;
use std::sync::OnceLock;
use tfplug::schema::Schema;
use tfplug::types::Diagnostic;
use tfplug::{Context, DataSource, ResourceData};

use super::{name_lookup_schema, required_name};
use crate::api::paging::{enumerate_all, find_first, DEFAULT_PAGE_SIZE};
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{DataSourceRegistration, Registrar};
use crate::util::retries::{search_outcome, with_retries};

pub const DATA_SOURCE_TYPE: &str = "genesyscloud_integration_action";
const KIND: &str = "integration action";

pub fn register(registrar: &mut Registrar) {
    registrar.register_data_source(
        DATA_SOURCE_TYPE,
        DataSourceRegistration {
            schema,
            factory: |provider_data| Box::new(IntegrationActionDataSource::new(provider_data)),
        },
    );
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        name_lookup_schema(
            "Data source for Genesys Cloud integration action. Select an integration action by name",
            "The name of the integration action",
        )
    })
}

pub struct IntegrationActionDataSource {
    provider_data: GenesysCloudProviderData,
}

impl IntegrationActionDataSource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }
}

#[async_trait]
impl DataSource for IntegrationActionDataSource {
    fn type_name(&self) -> &str {
        DATA_SOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema().clone()
    }

    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let name = match required_name(data) {
            Ok(name) => name,
            Err(diags) => return diags,
        };
        let api = self.provider_data.client.integrations().actions();
        let (api, name) = (&api, name.as_str());

        // The listing is filtered by name server-side; the exact match is
        // still checked since the filter is not guaranteed to be exact
        let found = with_retries(
            &ctx,
            self.provider_data.timeouts.search_policy(),
            &format!("Failed to find integration action {}", name),
            move || async move {
                let actions = enumerate_all(DEFAULT_PAGE_SIZE, move |page, size| {
                    api.list_page(page, size, Some(name))
                });
                let result = find_first(actions, |a| a.name.as_deref() == Some(name)).await;
                search_outcome(KIND, name, result.map(|found| found.and_then(|a| a.id)))
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
