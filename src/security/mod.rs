//! # Authorization bypass as a scoped capability
//!
//! The adapter runs graph operations with authorization checks suspended.
//! Instead of flipping ambient state for "the rest of the request", the
//! suspension is an [`AuthorizationBypass`] guard:
//!
//! - only [`SecurityContext::without_authorization_checks`] can mint one;
//! - engine entry points that need elevated access take `&AuthorizationBypass`,
//!   so holding one is the proof of elevation;
//! - dropping the guard ends the elevation, on every path including `?`
//!   early returns and unwinding.
//!
//! `SecurityContext` only counts live guards so callers (and tests) can
//! observe that no elevation outlives its operation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

/// Handle on the authorization subsystem. Cheap to clone; clones share state.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    inner: Arc<SecurityState>,
}

#[derive(Debug, Default)]
struct SecurityState {
    active_bypasses: AtomicUsize,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspend authorization checks until the returned guard is dropped.
    pub fn without_authorization_checks(&self) -> AuthorizationBypass {
        let depth = self.inner.active_bypasses.fetch_add(1, Ordering::AcqRel) + 1;
        trace!(depth, "authorization checks suspended");
        AuthorizationBypass { state: Arc::clone(&self.inner) }
    }

    /// True while at least one bypass guard is alive.
    pub fn are_authorization_checks_disabled(&self) -> bool {
        self.active_bypass_count() > 0
    }

    pub fn active_bypass_count(&self) -> usize {
        self.inner.active_bypasses.load(Ordering::Acquire)
    }
}

/// Capability token: authorization checks are suspended while this lives.
///
/// Not `Clone`; it cannot be duplicated past the scope that acquired it.
#[must_use = "authorization checks resume as soon as the bypass is dropped"]
#[derive(Debug)]
pub struct AuthorizationBypass {
    state: Arc<SecurityState>,
}

impl AuthorizationBypass {
    /// Whether this token was minted by `context`.
    pub fn is_issued_by(&self, context: &SecurityContext) -> bool {
        Arc::ptr_eq(&self.state, &context.inner)
    }
}

impl Drop for AuthorizationBypass {
    fn drop(&mut self) {
        let depth = self.state.active_bypasses.fetch_sub(1, Ordering::AcqRel) - 1;
        trace!(depth, "authorization bypass released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_scopes_the_bypass() {
        let security = SecurityContext::new();
        assert!(!security.are_authorization_checks_disabled());
        {
            let bypass = security.without_authorization_checks();
            assert!(bypass.is_issued_by(&security));
            assert!(security.are_authorization_checks_disabled());
        }
        assert!(!security.are_authorization_checks_disabled());
    }

    #[test]
    fn test_nested_bypasses() {
        let security = SecurityContext::new();
        let outer = security.without_authorization_checks();
        let inner = security.without_authorization_checks();
        assert_eq!(security.active_bypass_count(), 2);
        drop(inner);
        assert!(security.are_authorization_checks_disabled());
        drop(outer);
        assert_eq!(security.active_bypass_count(), 0);
    }

    #[test]
    fn test_bypass_released_on_early_return() {
        fn failing(security: &SecurityContext) -> Result<(), &'static str> {
            let _bypass = security.without_authorization_checks();
            let outcome: Result<(), &'static str> = Err("boom");
            outcome?;
            Ok(())
        }

        let security = SecurityContext::new();
        assert!(failing(&security).is_err());
        assert!(!security.are_authorization_checks_disabled());
    }

    #[test]
    fn test_bypass_released_on_panic() {
        let security = SecurityContext::new();
        let cloned = security.clone();
        let result = std::panic::catch_unwind(move || {
            let _bypass = cloned.without_authorization_checks();
            panic!("inside elevated scope");
        });
        assert!(result.is_err());
        assert!(!security.are_authorization_checks_disabled());
    }

    #[test]
    fn test_tokens_are_bound_to_their_context() {
        let a = SecurityContext::new();
        let b = SecurityContext::new();
        let bypass = a.without_authorization_checks();
        assert!(!bypass.is_issued_by(&b));
    }
}
