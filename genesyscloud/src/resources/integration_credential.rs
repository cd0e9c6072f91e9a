//! genesyscloud_integration_credential

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::Diagnostic;
use tfplug::{Context, Resource, ResourceData};

use super::{missing_id, prepare};
use crate::api::common::DomainRef;
use crate::api::credentials::{Credential, CredentialRequest, CredentialsApi};
use crate::api::paging::{collect_all, enumerate_all, DEFAULT_PAGE_SIZE};
use crate::api::Client;
use crate::consistency_checker::ConsistencyCheck;
use crate::provider_data::GenesysCloudProviderData;
use crate::registrar::{Registrar, ResourceRegistration};
use crate::resource_exporter::{ResourceExporter, ResourceIdMetaMap, ResourceMeta};
use crate::util::retries::{classify_read_error, confirm_deleted, with_retries_for_read};

pub const RESOURCE_TYPE: &str = "genesyscloud_integration_credential";
const KIND: &str = "credential";

pub fn register(registrar: &mut Registrar) {
    registrar.register_resource(
        RESOURCE_TYPE,
        ResourceRegistration {
            schema,
            factory: |provider_data| Box::new(IntegrationCredentialResource::new(provider_data)),
        },
    );
    registrar.register_exporter(RESOURCE_TYPE, exporter());
}

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        SchemaBuilder::new()
            .description("Genesys Cloud Credential")
            .version(1)
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .optional()
                    .description("Credential name")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("credential_type_name", AttributeType::String)
                    .required()
                    .description("Credential type name, e.g. \"basicAuth\"")
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("fields", AttributeType::Map(Box::new(AttributeType::String)))
                    .optional()
                    .computed()
                    .sensitive()
                    .description("Credential fields required by the credential type")
                    .build(),
            )
            .build()
    })
}

/// Credential fields are write-only, so they are exported as variables
pub fn exporter() -> ResourceExporter {
    ResourceExporter::new(get_all_credentials).unresolvable_attributes(&["fields"])
}

fn get_all_credentials(
    _ctx: Context,
    client: Client,
) -> BoxFuture<'static, Result<ResourceIdMetaMap, Diagnostic>> {
    Box::pin(async move {
        let api = client.integrations().credentials();
        let api = &api;
        let credentials = collect_all(enumerate_all(DEFAULT_PAGE_SIZE, move |page, size| {
            api.list_page(page, size)
        }))
        .await
        .map_err(|e| Diagnostic::error("Failed to get page of credentials", e.to_string()))?;

        // A credential may have no name; those cannot be labelled
        Ok(credentials
            .into_iter()
            .filter_map(|c| Some((c.id?, ResourceMeta::new(c.name?))))
            .collect())
    })
}

pub struct IntegrationCredentialResource {
    provider_data: GenesysCloudProviderData,
}

impl IntegrationCredentialResource {
    pub fn new(provider_data: GenesysCloudProviderData) -> Self {
        Self { provider_data }
    }

    fn api(&self) -> CredentialsApi<'_> {
        self.provider_data.client.integrations().credentials()
    }
}

fn build_request(data: &ResourceData) -> Result<CredentialRequest, Vec<Diagnostic>> {
    let credential_type = data.get_string("credential_type_name").ok_or_else(|| {
        vec![Diagnostic::error(
            "Missing credential_type_name",
            "credential_type_name is required",
        )]
    })?;

    let credential_fields: BTreeMap<String, String> = data
        .get_map("fields")
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect();

    Ok(CredentialRequest {
        name: data.get_string("name"),
        credential_type: DomainRef::name(credential_type),
        credential_fields,
    })
}

/// Fields are never returned, so whatever `data` already holds is kept
fn flatten(data: &mut ResourceData, credential: &Credential) {
    data.set_optional_string("name", credential.name.clone());
    data.set_optional_string(
        "credential_type_name",
        credential
            .credential_type
            .as_ref()
            .and_then(|t| t.name.clone()),
    );
}

#[async_trait]
impl Resource for IntegrationCredentialResource {
    fn type_name(&self) -> &str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        schema().clone()
    }

    async fn create(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        if let Err(diags) = prepare(schema(), data) {
            return diags;
        }
        let request = match build_request(data) {
            Ok(request) => request,
            Err(diags) => return diags,
        };
        let name = request.name.clone().unwrap_or_default();

        let created = match self.api().create(&request).await {
            Ok(created) => created,
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to create credential {}", name),
                    e.to_string(),
                )]
            }
        };
        let Some(id) = created.id else {
            return vec![Diagnostic::error(
                format!("Failed to create credential {}", name),
                "The API response did not include an id",
            )];
        };
        data.set_id(&id);

        tracing::info!("Created credential {}, {}", name, id);
        self.read(ctx, data).await
    }

    async fn read(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };
        tracing::debug!("Reading credential {}", id);

        let check = ConsistencyCheck::new(
            data,
            schema(),
            self.provider_data.bypass_consistency_checker,
        );
        let post_write = data.intent().is_some();
        let base = data.clone();
        let api = self.api();
        let (api, check, base, id) = (&api, &check, &base, id.as_str());

        with_retries_for_read(&ctx, &self.provider_data.timeouts, data, KIND, move || async move {
            match api.get(id).await {
                Ok(credential) => {
                    let mut observed = base.clone();
                    flatten(&mut observed, &credential);
                    check.check(&observed).map(|_| Some(observed))
                }
                Err(e) => classify_read_error(
                    format!("Failed to read credential {}", id),
                    e,
                    post_write,
                ),
            }
        })
        .await
    }

    async fn update(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        if let Err(diags) = prepare(schema(), data) {
            return diags;
        }
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };

        if data.has_change("name")
            || data.has_change("credential_type_name")
            || data.has_change("fields")
        {
            let request = match build_request(data) {
                Ok(request) => request,
                Err(diags) => return diags,
            };
            tracing::info!("Updating credential {}", id);
            if let Err(e) = self.api().update(&id, &request).await {
                return vec![Diagnostic::error(
                    format!("Failed to update credential {}", id),
                    e.to_string(),
                )];
            }
        }

        tracing::info!("Updated credential {}", id);
        self.read(ctx, data).await
    }

    async fn delete(&self, ctx: Context, data: &mut ResourceData) -> Vec<Diagnostic> {
        let Some(id) = data.id().map(str::to_string) else {
            return missing_id(KIND);
        };

        match self.api().delete(&id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                return vec![Diagnostic::error(
                    format!("Failed to delete the credential {}", id),
                    e.to_string(),
                )]
            }
        }

        let api = self.api();
        let (api, id) = (&api, id.as_str());
        confirm_deleted(&ctx, &self.provider_data.timeouts, KIND, id, move || api.get(id)).await
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

    fn resource(url: &str) -> IntegrationCredentialResource {
        IntegrationCredentialResource::new(
            GenesysCloudProviderData::new(create_test_client(url)).with_timeouts(RetryTimeouts {
                read: Duration::from_millis(200),
                search: Duration::from_millis(100),
                delete: Duration::from_millis(100),
                backoff: Duration::from_millis(10),
            }),
        )
    }

    #[test]
    fn fields_are_sensitive() {
        let fields = schema().attribute("fields").unwrap();

        assert!(fields.sensitive);
        assert!(fields.optional);
        assert!(schema().attribute("credential_type_name").unwrap().required);
    }

    #[tokio::test]
    async fn create_sends_fields_and_keeps_them_in_state() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/api/v2/integrations/credentials")
            .match_body(Matcher::Json(json!({
                "name": "Basic",
                "type": { "name": "basicAuth" },
                "credentialFields": { "userName": "u", "password": "p" }
            })))
            .with_status(200)
            .with_body(r#"{"id": "cred-1"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/integrations/credentials/cred-1")
            .with_status(200)
            .with_body(r#"{"id": "cred-1", "name": "Basic", "type": {"name": "basicAuth"}}"#)
            .create_async()
            .await;

        let mut data = ResourceData::for_create(DynamicValue::from_json(json!({
            "name": "Basic",
            "credential_type_name": "basicAuth",
            "fields": { "userName": "u", "password": "p" }
        })));

        let diags = resource(&server.url()).create(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        create.assert_async().await;
        assert_eq!(data.id(), Some("cred-1"));
        assert_eq!(data.get_map("fields").len(), 2);
    }

    #[tokio::test]
    async fn read_retries_until_name_converges() {
        let mut server = Server::new_async().await;
        let stale = server
            .mock("GET", "/api/v2/integrations/credentials/cred-1")
            .with_status(200)
            .with_body(r#"{"id": "cred-1", "name": "Old", "type": {"name": "basicAuth"}}"#)
            .expect_at_least(1)
            .create_async()
            .await;

        let mut data = ResourceData::for_update(
            DynamicValue::from_json(json!({
                "id": "cred-1",
                "name": "Old",
                "credential_type_name": "basicAuth"
            })),
            DynamicValue::from_json(json!({ "name": "New", "credential_type_name": "basicAuth" })),
        );

        let diags = resource(&server.url()).read(Context::new(), &mut data).await;

        stale.assert_async().await;
        assert_eq!(diags.len(), 1);
        assert!(diags[0].is_error());
        assert!(diags[0].detail.contains("name"), "{}", diags[0].detail);
    }

    #[tokio::test]
    async fn update_puts_new_name_and_keeps_fields() {
        let mut server = Server::new_async().await;
        let put = server
            .mock("PUT", "/api/v2/integrations/credentials/cred-1")
            .match_body(Matcher::Json(json!({
                "name": "New",
                "type": { "name": "basicAuth" },
                "credentialFields": { "userName": "u" }
            })))
            .with_status(200)
            .with_body(r#"{"id": "cred-1", "name": "New", "type": {"name": "basicAuth"}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/integrations/credentials/cred-1")
            .with_status(200)
            .with_body(r#"{"id": "cred-1", "name": "New", "type": {"name": "basicAuth"}}"#)
            .create_async()
            .await;

        let mut data = ResourceData::for_update(
            DynamicValue::from_json(json!({
                "id": "cred-1",
                "name": "Old",
                "credential_type_name": "basicAuth",
                "fields": { "userName": "u" }
            })),
            DynamicValue::from_json(json!({
                "name": "New",
                "credential_type_name": "basicAuth",
                "fields": { "userName": "u" }
            })),
        );

        let diags = resource(&server.url()).update(Context::new(), &mut data).await;

        assert!(diags.is_empty(), "{:?}", diags);
        put.assert_async().await;
        assert_eq!(data.id(), Some("cred-1"));
        assert_eq!(data.get_string("name").as_deref(), Some("New"));
        assert_eq!(data.get_map("fields").len(), 1);
    }
}
