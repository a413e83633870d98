//! Role-based navigation: which sidebar entries and quick links a portal role may see.

use crate::Result;
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Role names that carry the admin flag.
const ADMIN_ROLES: [&str; 2] = ["admin", "super_admin"];

/// A portal role, e.g. `admin`, `staff` or `owner`. Names are compared without regard to case.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Role {
    name: String,
}

impl Role {
    pub fn new(name: &str) -> Result<Self> {
        let name = name.trim().to_ascii_lowercase();
        ensure!(!name.is_empty(), "A role name cannot be empty");
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES.contains(&self.name.as_str())
    }

    fn is(&self, other: &str) -> bool {
        self.name.eq_ignore_ascii_case(other.trim())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Role::new(s)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// An entry in the portal's sidebar.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavEntry {
    pub label: &'static str,
    pub path: &'static str,
    /// Hidden from every role without the admin flag.
    pub admin_only: bool,
    /// When not empty, only these roles (and admins) see the entry.
    pub roles: &'static [&'static str],
}

impl NavEntry {
    pub fn visible_to(&self, role: &Role) -> bool {
        if role.is_admin() {
            return true;
        }
        if self.admin_only {
            return false;
        }
        self.roles.is_empty() || self.roles.iter().any(|r| role.is(r))
    }
}

const fn entry(label: &'static str, path: &'static str) -> NavEntry {
    NavEntry {
        label,
        path,
        admin_only: false,
        roles: &[],
    }
}

const fn admin(label: &'static str, path: &'static str) -> NavEntry {
    NavEntry {
        label,
        path,
        admin_only: true,
        roles: &[],
    }
}

pub const SIDEBAR: &[NavEntry] = &[
    entry("Dashboard", "/"),
    entry("Cars", "/cars"),
    entry("Clients", "/clients"),
    entry("Income & Expenses", "/income-expenses"),
    entry("Payments", "/payments"),
    entry("Turo Trips", "/turo-trips"),
    entry("Notifications", "/notifications"),
    NavEntry {
        label: "Inspection Forms",
        path: "/forms",
        admin_only: false,
        roles: &["staff", "manager"],
    },
    admin("Employees", "/admin/employees"),
    admin("Income & Expense Logs", "/admin/income-expense-logs"),
    admin("Settings", "/admin/settings"),
];

/// The sidebar entries `role` may see, in display order.
pub fn sidebar(role: &Role) -> Vec<&'static NavEntry> {
    SIDEBAR.iter().filter(|e| e.visible_to(role)).collect()
}

/// A link configured by an administrator and shown on the dashboard.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickLink {
    pub title: String,
    pub url: String,
    /// The roles the link is meant for. Empty means everyone.
    #[serde(default)]
    pub roles: Vec<String>,
}

impl QuickLink {
    pub fn visible_to(&self, role: &Role) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| role.is(r))
    }
}

/// The links of `links` that `role` may see.
pub fn quick_links_for<'a>(links: &'a [QuickLink], role: &Role) -> Vec<&'a QuickLink> {
    links.iter().filter(|l| l.visible_to(role)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(s: &str) -> Role {
        s.parse().unwrap()
    }

    fn paths(role: &Role) -> Vec<&'static str> {
        sidebar(role).iter().map(|e| e.path).collect()
    }

    #[test]
    fn test_non_admin_does_not_see_admin_entries() {
        for name in ["staff", "owner", "manager"] {
            let r = role(name);
            assert!(!r.is_admin());
            assert!(sidebar(&r).iter().all(|e| !e.admin_only), "{name}");
        }
        assert!(!paths(&role("owner")).contains(&"/admin/employees"));
    }

    #[test]
    fn test_admin_sees_everything() {
        for name in ["admin", "Super_Admin"] {
            assert_eq!(sidebar(&role(name)).len(), SIDEBAR.len(), "{name}");
        }
    }

    #[test]
    fn test_role_restricted_entry() {
        assert!(paths(&role("staff")).contains(&"/forms"));
        assert!(!paths(&role("owner")).contains(&"/forms"));
    }

    #[test]
    fn test_empty_role_rejected() {
        assert!(" ".parse::<Role>().is_err());
    }

    #[test]
    fn test_quick_links() {
        let links = vec![
            QuickLink {
                title: "Everyone".into(),
                url: "https://a.example".into(),
                roles: vec![],
            },
            QuickLink {
                title: "Owners".into(),
                url: "https://b.example".into(),
                roles: vec!["Owner".into()],
            },
        ];
        let owner: Vec<_> = quick_links_for(&links, &role("owner"))
            .iter()
            .map(|l| l.title.as_str())
            .collect();
        assert_eq!(owner, vec!["Everyone", "Owners"]);
        assert_eq!(quick_links_for(&links, &role("staff")).len(), 1);
        assert_eq!(quick_links_for(&links, &role("admin")).len(), 1);
    }
}
