//! Provider configuration: credentials, region and API endpoints

use crate::api::Credentials;
use std::env;
use tfplug::defaults::EnvDefault;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::StringOneOfValidator;

pub const DEFAULT_REGION: &str = "us-east-1";

/// Region to platform domain
pub const REGION_DOMAINS: &[(&str, &str)] = &[
    ("us-east-1", "mypurecloud.com"),
    ("us-east-2", "use2.us-gov-pure.cloud"),
    ("us-west-2", "usw2.pure.cloud"),
    ("ca-central-1", "cac1.pure.cloud"),
    ("sa-east-1", "sae1.pure.cloud"),
    ("eu-west-1", "mypurecloud.ie"),
    ("eu-west-2", "euw2.pure.cloud"),
    ("eu-central-1", "mypurecloud.de"),
    ("ap-south-1", "aps1.pure.cloud"),
    ("ap-northeast-1", "mypurecloud.jp"),
    ("ap-northeast-2", "apne2.pure.cloud"),
    ("ap-southeast-2", "mypurecloud.com.au"),
];

pub fn domain_for_region(region: &str) -> Option<&'static str> {
    REGION_DOMAINS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(region))
        .map(|(_, domain)| *domain)
}

/// Schema of the provider block
pub fn provider_schema() -> Schema {
    let regions: Vec<&str> = REGION_DOMAINS.iter().map(|(name, _)| *name).collect();

    SchemaBuilder::new()
        .description("Genesys Cloud provider configuration")
        .attribute(
            AttributeBuilder::new("oauthclient_id", AttributeType::String)
                .description("OAuthClient ID. Can be set with GENESYSCLOUD_OAUTHCLIENT_ID.")
                .optional()
                .default(EnvDefault::create_optional("GENESYSCLOUD_OAUTHCLIENT_ID"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("oauthclient_secret", AttributeType::String)
                .description("OAuthClient secret. Can be set with GENESYSCLOUD_OAUTHCLIENT_SECRET.")
                .optional()
                .sensitive()
                .default(EnvDefault::create_optional("GENESYSCLOUD_OAUTHCLIENT_SECRET"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("aws_region", AttributeType::String)
                .description("AWS region where the org exists. Can be set with GENESYSCLOUD_REGION.")
                .optional()
                .validator(StringOneOfValidator::create(&regions))
                .default(EnvDefault::create("GENESYSCLOUD_REGION", DEFAULT_REGION))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("api_url", AttributeType::String)
                .description("Overrides the region-derived API URL. Can be set with GENESYSCLOUD_API_URL.")
                .optional()
                .default(EnvDefault::create_optional("GENESYSCLOUD_API_URL"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_token", AttributeType::String)
                .description("Pre-issued access token used instead of the client credentials. Can be set with GENESYSCLOUD_ACCESS_TOKEN.")
                .optional()
                .sensitive()
                .default(EnvDefault::create_optional("GENESYSCLOUD_ACCESS_TOKEN"))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("bypass_consistency_checker", AttributeType::Bool)
                .description("Skip comparing read-back state to configuration after writes. Can be set with GENESYSCLOUD_BYPASS_CONSISTENCY_CHECKER.")
                .optional()
                .build(),
        )
        .build()
}

/// Resolved provider settings
#[derive(Clone)]
pub struct ProviderConfig {
    pub oauthclient_id: Option<String>,
    pub oauthclient_secret: Option<String>,
    pub aws_region: String,
    pub api_url: Option<String>,
    pub access_token: Option<String>,
    pub bypass_consistency_checker: bool,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("oauthclient_id", &self.oauthclient_id)
            .field("aws_region", &self.aws_region)
            .field("api_url", &self.api_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("bypass_consistency_checker", &self.bypass_consistency_checker)
            .finish_non_exhaustive()
    }
}

impl ProviderConfig {
    /// Reads settings from a validated configuration with defaults applied
    pub fn from_config(config: &DynamicValue) -> Self {
        let string = |name: &str| {
            config
                .get_string(&AttributePath::new(name))
                .ok()
                .filter(|v| !v.is_empty())
        };

        let bypass_consistency_checker = config
            .get_bool(&AttributePath::new("bypass_consistency_checker"))
            .ok()
            .or_else(|| {
                env::var("GENESYSCLOUD_BYPASS_CONSISTENCY_CHECKER")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok())
            })
            .unwrap_or(false);

        Self {
            oauthclient_id: string("oauthclient_id"),
            oauthclient_secret: string("oauthclient_secret"),
            aws_region: string("aws_region").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            api_url: string("api_url"),
            access_token: string("access_token"),
            bypass_consistency_checker,
        }
    }

    fn domain(&self) -> Result<&'static str, Diagnostic> {
        domain_for_region(&self.aws_region).ok_or_else(|| {
            Diagnostic::error(
                "Invalid aws_region",
                format!("Unknown Genesys Cloud region \"{}\"", self.aws_region),
            )
            .with_attribute(AttributePath::new("aws_region"))
        })
    }

    pub fn base_url(&self) -> Result<String, Diagnostic> {
        match &self.api_url {
            Some(url) => Ok(url.trim_end_matches('/').to_string()),
            None => Ok(format!("https://api.{}", self.domain()?)),
        }
    }

    pub fn login_url(&self) -> Result<String, Diagnostic> {
        Ok(format!("https://login.{}", self.domain()?))
    }

    pub fn credentials(&self) -> Result<Credentials, Diagnostic> {
        if let Some(token) = &self.access_token {
            return Ok(Credentials::AccessToken(token.clone()));
        }

        match (&self.oauthclient_id, &self.oauthclient_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Credentials::ClientCredentials {
                login_url: self.login_url()?,
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            }),
            (None, _) => Err(Diagnostic::error(
                "Missing credentials",
                "oauthclient_id is required (set in provider config or GENESYSCLOUD_OAUTHCLIENT_ID env var)",
            )),
            (_, None) => Err(Diagnostic::error(
                "Missing credentials",
                "oauthclient_secret is required (set in provider config or GENESYSCLOUD_OAUTHCLIENT_SECRET env var)",
            )),
        }
    }
}
