use tracing::{info, warn};

use crate::config::{BackendSettings, Config};
use crate::models::{NewRecord, PersistedRecord};

use super::{GatewayError, RemoteStore, SheetsClient, SupabaseClient};

/// The remote store selected by configuration.
#[derive(Clone)]
pub enum RemoteBackend {
    Supabase(SupabaseClient),
    Sheets(SheetsClient),
    /// No credentials configured; every operation fails with `Unconfigured`.
    Unconfigured,
}

impl RemoteBackend {
    pub fn from_config(config: &Config) -> Self {
        let timeout = config.request_timeout();
        let backend = match config.backend() {
            BackendSettings::Supabase { url, anon_key } => {
                SupabaseClient::new(&url, &anon_key, timeout).map(RemoteBackend::Supabase)
            }
            BackendSettings::Sheets { url } => {
                SheetsClient::new(&url, timeout).map(RemoteBackend::Sheets)
            }
            BackendSettings::None => Ok(RemoteBackend::Unconfigured),
        };

        match backend {
            Ok(backend) => {
                info!(backend = backend.name(), "Remote store selected");
                backend
            }
            Err(e) => {
                warn!(error = %e, "Failed to set up remote store, records stay local");
                RemoteBackend::Unconfigured
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RemoteBackend::Supabase(_) => "supabase",
            RemoteBackend::Sheets(_) => "sheets",
            RemoteBackend::Unconfigured => "unconfigured",
        }
    }

    /// Endpoint shown in diagnostics.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            RemoteBackend::Supabase(client) => Some(client.table_url()),
            RemoteBackend::Sheets(client) => Some(client.url()),
            RemoteBackend::Unconfigured => None,
        }
    }
}

impl RemoteStore for RemoteBackend {
    async fn insert(&self, record: &NewRecord) -> Result<PersistedRecord, GatewayError> {
        match self {
            RemoteBackend::Supabase(client) => client.insert(record).await,
            RemoteBackend::Sheets(client) => client.insert(record).await,
            RemoteBackend::Unconfigured => Err(GatewayError::Unconfigured),
        }
    }

    async fn list(&self) -> Result<Vec<PersistedRecord>, GatewayError> {
        match self {
            RemoteBackend::Supabase(client) => client.list().await,
            RemoteBackend::Sheets(client) => client.list().await,
            RemoteBackend::Unconfigured => Err(GatewayError::Unconfigured),
        }
    }

    async fn clear_all(&self) -> Result<(), GatewayError> {
        match self {
            RemoteBackend::Supabase(client) => client.clear_all().await,
            RemoteBackend::Sheets(client) => client.clear_all().await,
            RemoteBackend::Unconfigured => Err(GatewayError::Unconfigured),
        }
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        match self {
            RemoteBackend::Supabase(client) => client.health_check().await,
            RemoteBackend::Sheets(client) => client.health_check().await,
            RemoteBackend::Unconfigured => Err(GatewayError::Unconfigured),
        }
    }
}
