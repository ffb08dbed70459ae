//! # Content Engine Trait
//!
//! This is THE contract between the access layer and the content-repository
//! engine that owns node storage, variants and workspaces. The access layer
//! only ever talks to the engine through this trait.
//!
//! ## Implementations
//!
//! | Engine | Module | Description |
//! |--------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory for testing/embedding |

pub mod memory;

use async_trait::async_trait;

use crate::context::ContextConfig;
use crate::model::*;
use crate::security::AuthorizationBypass;
use crate::tx::{Transaction, TxMode};
use crate::Result;

pub use memory::{MemoryBackend, NodeSeed};

// ============================================================================
// ContentBackend Trait
// ============================================================================

/// The content engine contract.
///
/// Every read and write happens inside a transaction that was opened for one
/// context configuration. All node lookups are relative to that context:
/// a node that has no variant visible under the context's dimensions (or is
/// hidden while invisible content is not shown) does not exist for it.
#[async_trait]
pub trait ContentBackend: Send + Sync + 'static {
    /// The transaction type for this engine.
    type Tx: Transaction;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Bind a transaction to a context configuration.
    ///
    /// Requires the authorization bypass: the adapter never touches the
    /// engine with checks enabled. Fails with `NodeContextCreationFailed`
    /// when the configuration cannot be served.
    async fn begin_tx(
        &self,
        config: &ContextConfig,
        mode: TxMode,
        bypass: &AuthorizationBypass,
    ) -> Result<Self::Tx>;

    /// Commit a transaction.
    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    /// Roll back a transaction.
    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get a node by aggregate id. Returns None if not visible in this context.
    async fn get_node(&self, tx: &Self::Tx, id: &NodeAggregateId) -> Result<Option<Node>>;

    /// Get a node by absolute path (`/sites/example`).
    async fn get_node_by_path(&self, tx: &Self::Tx, path: &str) -> Result<Option<Node>>;

    /// Visible children of `parent`, in sibling order.
    ///
    /// Fails with `NodeNotFound` if `parent` itself is not visible.
    async fn get_children(&self, tx: &Self::Tx, parent: &NodeAggregateId) -> Result<Vec<Node>>;

    /// Visible child of `parent` with the given name.
    ///
    /// Default: scans `get_children`.
    async fn get_child_by_name(
        &self,
        tx: &Self::Tx,
        parent: &NodeAggregateId,
        name: &str,
    ) -> Result<Option<Node>> {
        Ok(self
            .get_children(tx, parent)
            .await?
            .into_iter()
            .find(|child| child.name == name))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a node below `parent`, appended as last child, with a variant
    /// at the context's target dimensions.
    ///
    /// The engine creates the tethered children the node type declares
    /// (recursively) together with the node.
    async fn create_node(
        &self,
        tx: &mut Self::Tx,
        parent: &NodeAggregateId,
        id: NodeAggregateId,
        name: &str,
        node_type_name: &str,
    ) -> Result<Node>;

    /// Set a property on the target variant of a node (upsert).
    ///
    /// A node visible only through a dimension fallback gets a variant
    /// materialized at the target dimensions first.
    async fn set_node_property(
        &self,
        tx: &mut Self::Tx,
        id: &NodeAggregateId,
        key: &str,
        val: Value,
    ) -> Result<()>;

    /// Move a node so that it directly precedes `succeeding_sibling`,
    /// re-parenting it below the sibling's parent if needed.
    async fn move_before(
        &self,
        tx: &mut Self::Tx,
        id: &NodeAggregateId,
        succeeding_sibling: &NodeAggregateId,
    ) -> Result<()>;
}
