//! Per-document read authorization.

use crate::models::{Caller, IndexEntry};

/// Read-authorization predicate applied to query candidates
pub struct AccessFilter;

impl AccessFilter {
    /// Whether `caller` may see `entry` in a result list.
    ///
    /// Entries without a read list are public. An empty list hides the
    /// entry from everyone and `*` shows it to everyone. Otherwise the caller
    /// must be authenticated and be an owner, an administrator, hold a listed
    /// role, or be named in the list as `[username]`.
    pub fn is_readable(entry: &IndexEntry, caller: &Caller) -> bool {
        let Some(list) = &entry.read_access else {
            return true;
        };
        if list.is_empty() {
            return false;
        }
        if list.iter().any(|item| item == "*") {
            return true;
        }

        let Some(username) = caller.username.as_deref() else {
            return false;
        };
        if caller.is_admin || entry.owners.contains(username) {
            return true;
        }
        list.iter().any(|item| match bracketed(item) {
            Some(user) => user == username,
            None => caller.has_role(item),
        })
    }
}

fn bracketed(item: &str) -> Option<&str> {
    item.strip_prefix('[')?.strip_suffix(']')
}
