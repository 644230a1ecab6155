//! Service context - dependency container for services
//!
//! Holds the activity store, the platform collaborators, the audit sink, and
//! the live leveling settings.

use std::sync::Arc;

use xp_common::SettingsStore;
use xp_core::traits::{ActivityStore, AuditSink, GuildDirectory, MembershipGateway};

use super::audit::TracingAuditSink;
use super::error::{ServiceError, ServiceResult};

/// Service context containing all dependencies
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct ServiceContext {
    store: Arc<dyn ActivityStore>,
    gateway: Arc<dyn MembershipGateway>,
    directory: Arc<dyn GuildDirectory>,
    audit: Arc<dyn AuditSink>,
    settings: Arc<SettingsStore>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    pub fn new(
        store: Arc<dyn ActivityStore>,
        gateway: Arc<dyn MembershipGateway>,
        directory: Arc<dyn GuildDirectory>,
        audit: Arc<dyn AuditSink>,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            store,
            gateway,
            directory,
            audit,
            settings,
        }
    }

    /// Get the activity store
    pub fn store(&self) -> &dyn ActivityStore {
        self.store.as_ref()
    }

    /// Get the membership gateway
    pub fn gateway(&self) -> &dyn MembershipGateway {
        self.gateway.as_ref()
    }

    /// Get the guild directory
    pub fn directory(&self) -> &dyn GuildDirectory {
        self.directory.as_ref()
    }

    /// Get the audit sink
    pub fn audit(&self) -> &dyn AuditSink {
        self.audit.as_ref()
    }

    /// Get the live leveling settings
    pub fn settings(&self) -> &SettingsStore {
        self.settings.as_ref()
    }

    /// Shared handle to the settings, for callers that mutate them
    pub fn settings_handle(&self) -> Arc<SettingsStore> {
        Arc::clone(&self.settings)
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("store", &"dyn ActivityStore")
            .field("gateway", &"dyn MembershipGateway")
            .field("directory", &"dyn GuildDirectory")
            .field("audit", &"dyn AuditSink")
            .field("settings", &self.settings.path())
            .finish()
    }
}

/// Builder for creating ServiceContext
///
/// The audit sink defaults to `TracingAuditSink`.
#[derive(Default)]
pub struct ServiceContextBuilder {
    store: Option<Arc<dyn ActivityStore>>,
    gateway: Option<Arc<dyn MembershipGateway>>,
    directory: Option<Arc<dyn GuildDirectory>>,
    audit: Option<Arc<dyn AuditSink>>,
    settings: Option<Arc<SettingsStore>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, store: Arc<dyn ActivityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn MembershipGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn GuildDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn settings(mut self, settings: Arc<SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Build the ServiceContext
    ///
    /// Returns an error if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            store: self
                .store
                .ok_or_else(|| ServiceError::validation("store is required"))?,
            gateway: self
                .gateway
                .ok_or_else(|| ServiceError::validation("gateway is required"))?,
            directory: self
                .directory
                .ok_or_else(|| ServiceError::validation("directory is required"))?,
            audit: self.audit.unwrap_or_else(|| Arc::new(TracingAuditSink)),
            settings: self
                .settings
                .ok_or_else(|| ServiceError::validation("settings is required"))?,
        })
    }
}
