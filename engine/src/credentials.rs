//! Credential lookup.
//!
//! The key is resolved every time a generation starts and handed to the
//! generator explicitly; nothing caches it between calls.

use std::env;

use pagesmith_types::ApiKey;

use crate::config::expand_env_vars;

/// Environment variables checked before the config file, in order.
pub const CREDENTIAL_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Environment first, then the `[api_keys] google` config value.
    Environment { configured: Option<String> },
    /// A fixed answer, for embedding and tests.
    Fixed(Option<ApiKey>),
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::Environment { configured: None }
    }
}

impl CredentialSource {
    #[must_use]
    pub fn from_config(configured: Option<&str>) -> Self {
        Self::Environment {
            configured: configured.map(str::to_string),
        }
    }

    #[must_use]
    pub fn resolve(&self) -> Option<ApiKey> {
        match self {
            Self::Environment { configured } => resolve_with(
                |name| env::var(name).ok(),
                configured.as_deref().map(expand_env_vars),
            ),
            Self::Fixed(key) => key.clone(),
        }
    }
}

fn resolve_with(
    lookup: impl Fn(&str) -> Option<String>,
    configured: Option<String>,
) -> Option<ApiKey> {
    CREDENTIAL_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .chain(configured)
        .find_map(|value| ApiKey::new(value).ok())
}
