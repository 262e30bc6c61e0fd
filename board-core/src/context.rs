//! Request context
//!
//! Every command and query runs on behalf of a tenant and, optionally, a
//! signed-in user. The context carries that scope plus a correlation ID for
//! tracing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Scope a command or query runs in.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use board_core::{RequestContext, UserId};
///
/// let tenant_id = Uuid::now_v7();
/// let ctx = RequestContext::new(tenant_id).with_user(UserId(1));
/// assert_eq!(ctx.user_id, Some(UserId(1)));
///
/// let anonymous = RequestContext::new(tenant_id);
/// assert!(anonymous.is_anonymous());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestContext {
    /// Tenant the request is scoped to
    pub tenant_id: Uuid,

    /// Signed-in user, if any
    pub user_id: Option<UserId>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,
}

impl RequestContext {
    /// Creates an anonymous context for `tenant_id`.
    pub fn new(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            user_id: None,
            correlation_id: None,
        }
    }

    /// Set the signed-in user.
    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Set the correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Check whether no user is signed in.
    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}
