//! # Scoped graph contexts
//!
//! A [`GraphContext`] binds one operation to a workspace, a resolved
//! dimension set and a visibility policy, and carries the authorization
//! bypass the operation runs under. It is created at the start of a single
//! read or write and consumed at its end; it is never cached or shared.

use tracing::{debug, warn};

use crate::model::{DimensionSpacePoint, ResolvedDimensionValues};
use crate::security::{AuthorizationBypass, SecurityContext};
use crate::storage::ContentBackend;
use crate::tx::{Transaction, TxMode};
use crate::Result;

/// What the engine needs to bind a context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextConfig {
    pub workspace_name: String,
    /// Fallback chains used to select visible variants.
    pub dimensions: ResolvedDimensionValues,
    /// Where writes land: the most specific value of every fallback chain.
    /// Preset keys never reach the engine.
    pub target_dimensions: DimensionSpacePoint,
    /// Show hidden (draft/disabled) content as well.
    pub invisible_content_shown: bool,
}

/// Builds adapter contexts: fixed workspace, invisible content shown,
/// authorization checks suspended.
#[derive(Debug, Clone)]
pub struct ContextFactory {
    workspace_name: String,
    security: SecurityContext,
}

impl ContextFactory {
    pub fn new(workspace_name: impl Into<String>, security: SecurityContext) -> Self {
        Self { workspace_name: workspace_name.into(), security }
    }

    pub fn workspace_name(&self) -> &str {
        &self.workspace_name
    }

    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    /// The configuration every adapter context uses.
    pub fn config_for(&self, dimensions: ResolvedDimensionValues) -> ContextConfig {
        ContextConfig {
            workspace_name: self.workspace_name.clone(),
            target_dimensions: dimensions.origin(),
            dimensions,
            invisible_content_shown: true,
        }
    }

    /// Bind a context. The engine rejects configurations it cannot serve
    /// (e.g. an unknown workspace) with `NodeContextCreationFailed`.
    pub async fn create<'b, B: ContentBackend>(
        &self,
        backend: &'b B,
        dimensions: ResolvedDimensionValues,
        mode: TxMode,
    ) -> Result<GraphContext<'b, B>> {
        let config = self.config_for(dimensions);
        GraphContext::open(backend, &self.security, config, mode).await
    }
}

/// One operation's binding to the engine.
///
/// Holding a `GraphContext` means authorization checks are suspended; the
/// bypass is released when the context is finished or dropped, whichever
/// comes first, including on error paths.
pub struct GraphContext<'b, B: ContentBackend> {
    backend: &'b B,
    tx: B::Tx,
    config: ContextConfig,
    // Declared last: released after the transaction is gone.
    bypass: AuthorizationBypass,
}

impl<'b, B: ContentBackend> GraphContext<'b, B> {
    pub async fn open(
        backend: &'b B,
        security: &SecurityContext,
        config: ContextConfig,
        mode: TxMode,
    ) -> Result<Self> {
        let bypass = security.without_authorization_checks();
        let tx = backend.begin_tx(&config, mode, &bypass).await?;
        debug!(
            tx = %tx.id(),
            workspace = %config.workspace_name,
            target = %config.target_dimensions,
            "graph context bound"
        );
        Ok(Self { backend, tx, config, bypass })
    }

    pub fn backend(&self) -> &'b B {
        self.backend
    }

    pub fn tx(&self) -> &B::Tx {
        &self.tx
    }

    pub fn tx_mut(&mut self) -> &mut B::Tx {
        &mut self.tx
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The capability this context runs under.
    pub fn bypass(&self) -> &AuthorizationBypass {
        &self.bypass
    }

    /// End the operation: commit on success, roll back on failure.
    ///
    /// Returns the operation's own error when it failed; a rollback failure
    /// is logged, never allowed to mask it.
    pub async fn finish<T>(self, outcome: Result<T>) -> Result<T> {
        let Self { backend, tx, bypass, .. } = self;
        let finished = match outcome {
            Ok(value) => backend.commit_tx(tx).await.map(|()| value),
            Err(err) => {
                if let Err(rollback_err) = backend.rollback_tx(tx).await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        };
        drop(bypass);
        finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::schema::NodeTypeManager;
    use crate::storage::MemoryBackend;
    use crate::Error;

    fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new(Arc::new(NodeTypeManager::default()));
        backend.ensure_workspace("user-admin");
        backend
    }

    #[test]
    fn test_config_shows_invisible_content() {
        let factory = ContextFactory::new("user-admin", SecurityContext::new());
        let config = factory.config_for(ResolvedDimensionValues::default());
        assert!(config.invisible_content_shown);
        assert_eq!(config.workspace_name, "user-admin");
        assert!(config.target_dimensions.is_empty());
    }

    #[test]
    fn test_config_targets_values_not_preset_keys() {
        let factory = ContextFactory::new("user-admin", SecurityContext::new());
        let resolved = ResolvedDimensionValues(std::collections::BTreeMap::from([(
            "language".to_string(),
            vec!["de".to_string(), "en".to_string()],
        )]));
        let config = factory.config_for(resolved);
        assert_eq!(config.target_dimensions, DimensionSpacePoint::new().with("language", "de"));
    }

    #[tokio::test]
    async fn test_context_holds_bypass_until_finished() {
        let backend = backend();
        let security = SecurityContext::new();
        let factory = ContextFactory::new("user-admin", security.clone());

        let ctx = factory
            .create(&backend, ResolvedDimensionValues::default(), TxMode::ReadOnly)
            .await
            .unwrap();
        assert!(security.are_authorization_checks_disabled());
        assert!(ctx.bypass().is_issued_by(&security));

        ctx.finish(Ok(())).await.unwrap();
        assert!(!security.are_authorization_checks_disabled());
    }

    #[tokio::test]
    async fn test_unknown_workspace_fails_without_leaking_bypass() {
        let backend = backend();
        let security = SecurityContext::new();
        let factory = ContextFactory::new("nobody", security.clone());

        let result = factory
            .create(&backend, ResolvedDimensionValues::default(), TxMode::ReadOnly)
            .await;
        assert!(matches!(result, Err(Error::NodeContextCreationFailed(_))));
        assert_eq!(security.active_bypass_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_operation_releases_bypass() {
        let backend = backend();
        let security = SecurityContext::new();
        let factory = ContextFactory::new("user-admin", security.clone());

        let ctx = factory
            .create(&backend, ResolvedDimensionValues::default(), TxMode::ReadWrite)
            .await
            .unwrap();
        let outcome: Result<()> = Err(Error::NodeNotFound("x".into()));
        assert!(ctx.finish(outcome).await.is_err());
        assert!(!security.are_authorization_checks_disabled());
    }
}
