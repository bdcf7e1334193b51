//! # Permissions
//!
//! Back-office permissions are stored per user as codenames.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request ─► CurrentUser ─► PermissionSet::allows(perm)                  │
//! │                               │                                         │
//! │                               ├── superuser? ─────────► allowed         │
//! │                               ├── inactive / not staff ► denied         │
//! │                               └── codename granted? ──► allowed/denied  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

/// A single back-office permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    HasProductsEdit,
    HasCategoriesEdit,
    HasDiscountsEdit,
    HasSuppliersEdit,
    HasKitchensEdit,
    HasUsersEdit,
    HasEmployeesEdit,
    HasNotesEdit,
    HasLogsView,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::HasProductsEdit,
        Permission::HasCategoriesEdit,
        Permission::HasDiscountsEdit,
        Permission::HasSuppliersEdit,
        Permission::HasKitchensEdit,
        Permission::HasUsersEdit,
        Permission::HasEmployeesEdit,
        Permission::HasNotesEdit,
        Permission::HasLogsView,
    ];

    pub fn codename(&self) -> &'static str {
        match self {
            Permission::HasProductsEdit => "has_products_edit",
            Permission::HasCategoriesEdit => "has_categories_edit",
            Permission::HasDiscountsEdit => "has_discounts_edit",
            Permission::HasSuppliersEdit => "has_suppliers_edit",
            Permission::HasKitchensEdit => "has_kitchens_edit",
            Permission::HasUsersEdit => "has_users_edit",
            Permission::HasEmployeesEdit => "has_employees_edit",
            Permission::HasNotesEdit => "has_notes_edit",
            Permission::HasLogsView => "has_logs_view",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codename())
    }
}

impl FromStr for Permission {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.codename() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "permission".to_string(),
                allowed: Permission::ALL.iter().map(|p| p.codename().to_string()).collect(),
            })
    }
}

/// Everything a user may do in the back office.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    is_active: bool,
    is_staff: bool,
    is_superuser: bool,
    granted: HashSet<Permission>,
}

impl PermissionSet {
    /// Builds a set from user flags and stored codenames.
    ///
    /// Unknown codenames are ignored so a stale row never locks anyone out
    /// of the permissions they still have.
    pub fn new<'a>(
        is_active: bool,
        is_staff: bool,
        is_superuser: bool,
        codenames: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        PermissionSet {
            is_active,
            is_staff,
            is_superuser,
            granted: codenames
                .into_iter()
                .filter_map(|c| c.parse().ok())
                .collect(),
        }
    }

    pub fn is_superuser(&self) -> bool {
        self.is_active && self.is_superuser
    }

    /// Active staff or superuser.
    pub fn is_staff(&self) -> bool {
        self.is_active && (self.is_staff || self.is_superuser)
    }

    pub fn allows(&self, permission: Permission) -> bool {
        if self.is_superuser() {
            return true;
        }
        self.is_staff() && self.granted.contains(&permission)
    }

    /// Granted permissions, sorted by codename.
    pub fn granted(&self) -> Vec<Permission> {
        let mut all: Vec<Permission> = if self.is_superuser() {
            Permission::ALL.to_vec()
        } else {
            self.granted.iter().copied().collect()
        };
        all.sort_by_key(|p| p.codename());
        all
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codename_roundtrip() {
        for permission in Permission::ALL {
            assert_eq!(permission.codename().parse::<Permission>().unwrap(), permission);
        }
        assert!("has_everything".parse::<Permission>().is_err());
    }

    #[test]
    fn test_superuser_allows_everything() {
        let set = PermissionSet::new(true, false, true, []);
        assert!(Permission::ALL.iter().all(|p| set.allows(*p)));
        assert_eq!(set.granted().len(), Permission::ALL.len());
    }

    #[test]
    fn test_staff_needs_grant() {
        let set = PermissionSet::new(true, true, false, ["has_products_edit", "bogus"]);
        assert!(set.allows(Permission::HasProductsEdit));
        assert!(!set.allows(Permission::HasDiscountsEdit));
        assert_eq!(set.granted(), vec![Permission::HasProductsEdit]);
    }

    #[test]
    fn test_customer_and_inactive_are_denied() {
        let customer = PermissionSet::new(true, false, false, ["has_products_edit"]);
        assert!(!customer.allows(Permission::HasProductsEdit));
        assert!(!customer.is_staff());

        let inactive = PermissionSet::new(false, true, true, []);
        assert!(!inactive.allows(Permission::HasProductsEdit));
        assert!(!inactive.is_staff());
    }
}
