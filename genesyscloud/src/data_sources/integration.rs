//! Data source for an integration selected by name

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

pub const DATA_SOURCE_TYPE: &str = "genesyscloud_integration";
const KIND: &str = "integration";

pub fn register(registrar: &mut Registrar) {
    registrar.register_data_source(
        DATA_SOURCE_TYPE,
        DataSourceRegistration {
            schema,
            factory: |provider_data| Box::new(IntegrationDataSource::new(provider_data)),
        },
    );
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        name_lookup_schema(
            "Data source for Genesys Cloud integration. Select an integration by name",
            "The name of the integration",
        )
    })
}

pub struct IntegrationDataSource {
    provider_data: GenesysCloudProviderData,
}

impl IntegrationDataSource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }
}

#[async_trait]
impl DataSource for IntegrationDataSource {
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
        let api = self.provider_data.client.integrations();
        let (api, name) = (&api, name.as_str());

        let found = with_retries(
            &ctx,
            self.provider_data.timeouts.search_policy(),
            &format!("Failed to find integration {}", name),
            move || async move {
                let integrations = enumerate_all(DEFAULT_PAGE_SIZE, move |page, size| {
                    api.list_page(page, size)
                });
                let result = find_first(integrations, |i| i.name.as_deref() == Some(name)).await;
                search_outcome(KIND, name, result.map(|found| found.and_then(|i| i.id)))
            },
        )
        .await;

        match found {
            Ok(id) => {
                tracing::debug!("Found integration {} with id {}", name, id);
                data.set_id(id);
                vec![]
            }
            Err(diag) => vec![diag],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use crate::provider_data::RetryTimeouts;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use std::time::Duration;
    use tfplug::DynamicValue;

    fn data_source(url: &str) -> IntegrationDataSource {
        IntegrationDataSource::new(
            GenesysCloudProviderData::new(create_test_client(url)).with_timeouts(RetryTimeouts {
                read: Duration::from_millis(100),
                search: Duration::from_millis(100),
                delete: Duration::from_millis(100),
                backoff: Duration::from_millis(20),
            }),
        )
    }

    fn page(number: &str) -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("pageNumber".into(), number.into()),
            Matcher::UrlEncoded("pageSize".into(), "100".into()),
        ])
    }

    #[tokio::test]
    async fn hit_on_second_page_stops_paging() {
        let mut server = Server::new_async().await;
        let first = server
            .mock("GET", "/api/v2/integrations")
            .match_query(page("1"))
            .with_status(200)
            .with_body(r#"{"entities": [{"id": "a", "name": "Other"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v2/integrations")
            .match_query(page("2"))
            .with_status(200)
            .with_body(r#"{"entities": [{"id": "b", "name": "Wanted"}]}"#)
            .expect(1)
            .create_async()
            .await;
        let third = server
            .mock("GET", "/api/v2/integrations")
            .match_query(page("3"))
            .with_status(200)
            .with_body(r#"{"entities": [{"id": "c", "name": "Later"}]}"#)
            .expect(0)
            .create_async()
            .await;

        let mut data =
            ResourceData::for_data_source(DynamicValue::from_json(json!({ "name": "Wanted" })));
        let diags = data_source(&server.url()).read(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(data.id(), Some("b"));
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn exhausted_listing_is_retried_until_timeout() {
        let mut server = Server::new_async().await;
        let empty = server
            .mock("GET", "/api/v2/integrations")
            .match_query(page("1"))
            .with_status(200)
            .with_body(r#"{"entities": []}"#)
            .expect_at_least(2)
            .create_async()
            .await;

        let mut data =
            ResourceData::for_data_source(DynamicValue::from_json(json!({ "name": "Missing" })));
        let diags = data_source(&server.url()).read(Context::new(), &mut data).await;

        assert_eq!(diags.len(), 1);
        assert!(diags[0].detail.contains("no integration found with name Missing"));
        assert!(data.id().is_none());
        empty.assert_async().await;
    }
}
