use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::FolioError;

/// Identity of whoever issues a query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub username: Option<String>,
    pub roles: BTreeSet<String>,
    pub is_admin: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Default::default()
        }
    }

    pub fn admin(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            is_admin: true,
            ..Default::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Add roles from a list separated by whitespace, commas or semicolons
    pub fn with_role_list(self, list: &str) -> Self {
        self.with_roles(split_list(list))
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Split a role, owner or read list on whitespace, `,` and `;`.
pub fn split_list(list: &str) -> impl Iterator<Item = String> + '_ {
    list.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Whether query results are filtered on read authorization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityMode {
    /// Every caller sees every matching document
    Open,
    #[default]
    Restricted,
}

impl FromStr for VisibilityMode {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(VisibilityMode::Open),
            "restricted" => Ok(VisibilityMode::Restricted),
            other => Err(FolioError::Internal(format!(
                "unknown visibility mode '{}'",
                other
            ))),
        }
    }
}
