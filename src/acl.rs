//! Container ACL helpers
//!
//! Swift read/write ACLs are comma-separated referrer and user entries in
//! container metadata. These helpers are pure string manipulation; the
//! routes layer heads/posts the metadata around them.

use std::collections::BTreeMap;

use serde::Serialize;

/// Entries that make a container world-readable and listable.
pub const PUBLIC_READ_ACLS: [&str; 2] = [".r:*", ".rlistings"];

/// Per-user view of the combined read/write ACLs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AclEntry {
    pub read: bool,
    pub write: bool,
}

/// Remove duplicates from a comma-separated ACL, keeping first-seen order.
pub fn remove_duplicates(acl: &str) -> String {
    let mut seen = Vec::new();
    for entry in acl.split(',').filter(|e| !e.is_empty()) {
        if !seen.contains(&entry) {
            seen.push(entry);
        }
    }
    seen.join(",")
}

/// Whether the read ACL carries both public entries.
pub fn is_public(read_acl: &str) -> bool {
    PUBLIC_READ_ACLS
        .iter()
        .all(|required| read_acl.split(',').any(|entry| entry == *required))
}

/// Append `user` to the ACL.
pub fn grant(acl: &str, user: &str) -> String {
    if acl.is_empty() {
        user.to_string()
    } else {
        format!("{acl},{user}")
    }
}

/// Drop every entry named in `users` from the ACL.
pub fn revoke(acl: &str, users: &[&str]) -> String {
    acl.split(',')
        .filter(|entry| !entry.is_empty() && !users.contains(entry))
        .collect::<Vec<_>>()
        .join(",")
}

/// Toggle the public-read entries: strips them when present, appends them
/// otherwise. Returns the new read ACL.
pub fn toggle_public(read_acl: &str) -> String {
    if is_public(read_acl) {
        revoke(read_acl, &PUBLIC_READ_ACLS)
    } else {
        let mut acl = read_acl.to_string();
        for entry in PUBLIC_READ_ACLS {
            acl = grant(&acl, entry);
        }
        acl
    }
}

/// Merge read and write ACLs into a per-user table for display.
pub fn entries(read_acl: &str, write_acl: &str) -> BTreeMap<String, AclEntry> {
    let mut table: BTreeMap<String, AclEntry> = BTreeMap::new();
    for entry in remove_duplicates(read_acl).split(',').filter(|e| !e.is_empty()) {
        table.entry(entry.to_string()).or_default().read = true;
    }
    for entry in remove_duplicates(write_acl).split(',').filter(|e| !e.is_empty()) {
        table.entry(entry.to_string()).or_default().write = true;
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_duplicates_keeps_order() {
        assert_eq!(remove_duplicates("a,b,a,c,b"), "a,b,c");
        assert_eq!(remove_duplicates(",,a,,"), "a");
        assert_eq!(remove_duplicates(""), "");
    }

    #[test]
    fn test_is_public_requires_both_entries() {
        assert!(is_public(".r:*,.rlistings"));
        assert!(is_public("alice,.rlistings,.r:*"));
        assert!(!is_public(".r:*"));
        assert!(!is_public(".rlistings"));
        assert!(!is_public(""));
    }

    #[test]
    fn test_toggle_public_round_trip() {
        let public = toggle_public("alice");
        assert!(is_public(&public));
        let private = toggle_public(&public);
        assert!(!is_public(&private));
        assert_eq!(private, "alice");
    }

    #[test]
    fn test_revoke_multiple_users() {
        assert_eq!(revoke("alice,bob,carol", &["bob", "carol"]), "alice");
        assert_eq!(revoke("alice", &["alice"]), "");
    }

    #[test]
    fn test_entries_merges_read_and_write() {
        let table = entries("alice,bob", "bob,carol");
        assert_eq!(
            table.get("alice"),
            Some(&AclEntry {
                read: true,
                write: false
            })
        );
        assert_eq!(
            table.get("bob"),
            Some(&AclEntry {
                read: true,
                write: true
            })
        );
        assert_eq!(
            table.get("carol"),
            Some(&AclEntry {
                read: false,
                write: true
            })
        );
    }
}
