//! Tenant domain model
//!
//! A tenant is one feedback board. Users, posts and subscriptions always belong
//! to exactly one tenant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A feedback board hosted in the multi-tenant system.
///
/// # Examples
///
/// ```
/// use board_core::Tenant;
///
/// let tenant = Tenant::new("Demo", "demo");
/// assert_eq!(tenant.subdomain, "demo");
/// assert!(tenant.is_active);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Unique identifier for the tenant
    pub id: Uuid,

    /// Human-readable board name
    pub name: String,

    /// Subdomain the board is served from (unique across the platform)
    pub subdomain: String,

    /// Whether the tenant is active
    pub is_active: bool,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a new active tenant with a UUID v7 identifier.
    ///
    /// # Arguments
    ///
    /// * `name` - The board name
    /// * `subdomain` - The board subdomain
    pub fn new(name: impl Into<String>, subdomain: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            subdomain: subdomain.into(),
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
