//! Role-based gating of table operations.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{TableError, TableResult};

/// The three fixed permission classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// `role1`: creates tables and inserts rows.
    Creator,
    /// `role2`: lists, reads and deletes tables.
    Reader,
    /// `role3`: renames tables and columns, rewrites ages.
    Updater,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Creator, Role::Reader, Role::Updater];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Creator => "role1",
            Role::Reader => "role2",
            Role::Updater => "role3",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| TableError::InvalidName(format!("Unknown role '{s}'")))
    }
}

/// Operation categories, one role each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationCategory {
    CreateOrInsert,
    ReadOrDelete,
    Update,
}

impl OperationCategory {
    pub fn required_role(&self) -> Role {
        match self {
            OperationCategory::CreateOrInsert => Role::Creator,
            OperationCategory::ReadOrDelete => Role::Reader,
            OperationCategory::Update => Role::Updater,
        }
    }

    fn action(&self) -> &'static str {
        match self {
            OperationCategory::CreateOrInsert => "create tables and insert data",
            OperationCategory::ReadOrDelete => "view and delete tables",
            OperationCategory::Update => "update tables",
        }
    }
}

/// Username to role lookup. Built once at startup, never mutated.
///
/// Every role name resolves to itself, so the `role1`/`role2`/`role3` accounts
/// work without configuration. Other usernames need an explicit assignment.
#[derive(Debug, Clone)]
pub struct RoleDirectory {
    assignments: HashMap<String, Role>,
}

impl Default for RoleDirectory {
    fn default() -> Self {
        let assignments = Role::ALL
            .into_iter()
            .map(|role| (role.as_str().to_string(), role))
            .collect();
        Self { assignments }
    }
}

impl RoleDirectory {
    pub fn assign(mut self, username: impl Into<String>, role: Role) -> Self {
        self.assignments.insert(username.into(), role);
        self
    }

    /// Parse `alice=role1,bob=role3` on top of the default assignments.
    pub fn parse(assignments: &str) -> TableResult<Self> {
        let mut directory = Self::default();
        for pair in assignments.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (user, role) = pair.split_once('=').ok_or_else(|| {
                TableError::InvalidName(format!("Role assignment '{pair}' is not user=role"))
            })?;
            let user = user.trim();
            if user.is_empty() {
                return Err(TableError::InvalidName(format!(
                    "Role assignment '{pair}' has an empty username"
                )));
            }
            directory = directory.assign(user, role.trim().parse()?);
        }
        Ok(directory)
    }

    pub fn role_of(&self, username: &str) -> Option<Role> {
        self.assignments.get(username).copied()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AccessGuard {
    directory: RoleDirectory,
}

impl AccessGuard {
    pub fn new(directory: RoleDirectory) -> Self {
        Self { directory }
    }

    pub fn authorize(&self, category: OperationCategory, username: &str) -> TableResult<()> {
        let required = category.required_role();
        if self.directory.role_of(username) == Some(required) {
            return Ok(());
        }
        tracing::warn!(username, required = %required, "permission denied");
        Err(TableError::PermissionDenied {
            required,
            action: category.action(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATEGORIES: [OperationCategory; 3] = [
        OperationCategory::CreateOrInsert,
        OperationCategory::ReadOrDelete,
        OperationCategory::Update,
    ];

    #[test]
    fn each_category_accepts_only_its_role() {
        let guard = AccessGuard::default();
        for category in CATEGORIES {
            for role in Role::ALL {
                let allowed = guard.authorize(category, role.as_str()).is_ok();
                assert_eq!(allowed, role == category.required_role(), "{category:?} / {role}");
            }
        }
    }

    #[test]
    fn read_is_denied_for_role1() {
        let err = AccessGuard::default()
            .authorize(OperationCategory::ReadOrDelete, "role1")
            .unwrap_err();
        assert!(err.to_string().contains("role2"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let guard = AccessGuard::default();
        assert!(guard.authorize(OperationCategory::Update, "ROLE3").is_err());
        assert!(guard.authorize(OperationCategory::Update, " role3").is_err());
        assert!(guard.authorize(OperationCategory::Update, "").is_err());
    }

    #[test]
    fn assignments_decouple_names_from_roles() {
        let directory = RoleDirectory::parse("alice=role1, bob = role3").unwrap();
        let guard = AccessGuard::new(directory);
        assert!(guard.authorize(OperationCategory::CreateOrInsert, "alice").is_ok());
        assert!(guard.authorize(OperationCategory::Update, "bob").is_ok());
        assert!(guard.authorize(OperationCategory::ReadOrDelete, "bob").is_err());
        // defaults survive
        assert!(guard.authorize(OperationCategory::ReadOrDelete, "role2").is_ok());
    }

    #[test]
    fn bad_assignments_are_rejected() {
        assert!(RoleDirectory::parse("alice").is_err());
        assert!(RoleDirectory::parse("alice=admin").is_err());
        assert!(RoleDirectory::parse("=role1").is_err());
        assert!(RoleDirectory::parse("").is_ok());
    }
}
