//! User roles
//!
//! This module defines the roles a user can hold within a tenant. Roles drive
//! implicit notification behavior: administrators follow every post of their
//! tenant for moderation purposes, members only follow what they subscribed to.

use serde::{Deserialize, Serialize};

/// User role within a tenant.
///
/// The hierarchy is: Member < Administrator
///
/// # Examples
///
/// ```
/// use board_core::UserRole;
///
/// assert!(UserRole::Administrator.is_admin());
/// assert!(!UserRole::Member.is_admin());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular user (including visitors who signed in to post or vote)
    Member = 1,

    /// Can moderate every post of the tenant
    Administrator = 2,
}

impl UserRole {
    /// Check if this role has admin privileges.
    ///
    /// # Returns
    ///
    /// `true` for the Administrator role
    pub fn is_admin(&self) -> bool {
        *self >= UserRole::Administrator
    }

    /// Parse role from string representation.
    ///
    /// Accepts `visitor` as an alias of `member` and `admin` as an alias of
    /// `administrator`.
    ///
    /// # Examples
    ///
    /// ```
    /// use board_core::UserRole;
    ///
    /// assert_eq!(UserRole::parse("admin"), Some(UserRole::Administrator));
    /// assert_eq!(UserRole::parse("Visitor"), Some(UserRole::Member));
    /// assert_eq!(UserRole::parse("owner"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "member" | "visitor" => Some(Self::Member),
            "administrator" | "admin" => Some(Self::Administrator),
            _ => None,
        }
    }

    /// Get string representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Administrator => "administrator",
        }
    }

    /// Get a human-readable display name for the role.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Administrator => "Administrator",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Member
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(UserRole::Administrator > UserRole::Member);
        assert_eq!(UserRole::default(), UserRole::Member);
    }

    #[test]
    fn test_role_discriminants_are_contiguous() {
        assert_eq!(UserRole::Member as u8, 1);
        assert_eq!(UserRole::Administrator as u8, 2);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("ADMINISTRATOR"), Some(UserRole::Administrator));
        assert_eq!(UserRole::parse("member"), Some(UserRole::Member));
        assert_eq!(UserRole::parse("collaborator"), None);
    }

    #[test]
    fn test_role_as_str_round_trips_through_parse() {
        for role in [UserRole::Member, UserRole::Administrator] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }
}
