//! Pseudo-hierarchy engine
//!
//! The store's namespace is flat; folders are simulated two ways: a
//! common-prefix entry from a delimiter listing, or a zero-byte marker
//! object whose content type is a directory media type. This module turns
//! flat listings into folders and files, builds breadcrumb chains, and
//! materializes missing marker chains when restored objects imply folders
//! that never existed.

use std::collections::HashSet;

use serde::Serialize;

use crate::store::{Metadata, ListEntry, ObjectEntry, ObjectStore, StorageSession, StoreError};

/// Content type of folder marker objects created by this application.
pub const DIRECTORY_MARKER: &str = "application/directory";

/// Media types recognized as folder markers in listings. Rackspace Cloud
/// Files uses `application/directory`, Cyberduck `application/x-directory`.
pub const DIRECTORY_CONTENT_TYPES: [&str; 2] =
    ["application/directory", "application/x-directory"];

/// One breadcrumb segment of a prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixSegment {
    pub display_name: String,
    pub full_name: String,
}

/// A folder derived from a listing. `name` carries exactly one trailing
/// slash; `raw` is the entry as the store returned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PseudoFolder {
    pub name: String,
    pub raw: String,
}

/// Split a slash-delimited prefix into its breadcrumb chain.
///
/// `prefix_list(Some("a/b/c/"))` yields segments `a` (`a/`), `b` (`a/b/`),
/// `c` (`a/b/c/`). `None` and empty prefixes yield nothing.
pub fn prefix_list(prefix: Option<&str>) -> Vec<PrefixSegment> {
    let mut segments = Vec::new();
    let Some(prefix) = prefix else {
        return segments;
    };
    let mut full = String::new();
    for element in prefix.split('/').filter(|e| !e.is_empty()) {
        full.push_str(element);
        full.push('/');
        segments.push(PrefixSegment {
            display_name: element.to_string(),
            full_name: full.clone(),
        });
    }
    segments
}

/// Split a listing into pseudo-folders and plain objects.
///
/// Subdir entries and marker objects normalize to the same trailing-slash
/// form; duplicates collapse to the first occurrence, and a folder is never
/// listed as a child of itself.
pub fn partition_listing(
    entries: Vec<ListEntry>,
    prefix: Option<&str>,
) -> (Vec<PseudoFolder>, Vec<ObjectEntry>) {
    let mut folders: Vec<PseudoFolder> = Vec::new();
    let mut objects = Vec::new();
    let mut seen = HashSet::new();

    for entry in entries {
        let raw = match entry {
            ListEntry::Subdir { subdir } => subdir,
            ListEntry::Object(object) => {
                let is_marker = object
                    .content_type
                    .as_deref()
                    .is_some_and(|ct| DIRECTORY_CONTENT_TYPES.contains(&ct));
                if !is_marker {
                    objects.push(object);
                    continue;
                }
                object.name
            }
        };

        let name = format!("{}/", raw.trim_matches('/'));
        if Some(name.as_str()) == prefix {
            continue;
        }
        if seen.insert(name.clone()) {
            folders.push(PseudoFolder { name, raw });
        }
    }

    (folders, objects)
}

/// The prefix one level above an object or pseudo-folder name, in the form
/// a listing expects (trailing slash). `None` for top-level names.
pub fn parent_prefix(object_name: &str) -> Option<String> {
    let name = object_name.strip_suffix('/').unwrap_or(object_name);
    name.rsplit_once('/')
        .map(|(parent, _)| format!("{parent}/"))
}

/// Ensure every ancestor of `prefix` (and `prefix` itself) exists as a
/// marker object in `container`, parents before children.
///
/// Ancestors already listed in `already_created` are skipped; the returned
/// set is the input plus everything created by this call, so repeated
/// invocations over the members of one archive do not re-create shared
/// ancestors. Prefixes are tracked without their trailing slash.
pub async fn materialize_prefix_chain(
    store: &dyn ObjectStore,
    session: &StorageSession,
    container: &str,
    prefix: &str,
    already_created: &HashSet<String>,
) -> Result<HashSet<String>, StoreError> {
    let mut created = already_created.clone();
    for segment in prefix_list(Some(prefix)) {
        let ancestor = segment.full_name.trim_end_matches('/');
        if ancestor.is_empty() || created.contains(ancestor) {
            continue;
        }
        store
            .put_object(
                session,
                container,
                &segment.full_name,
                Vec::new(),
                Some(DIRECTORY_MARKER),
                Metadata::new(),
            )
            .await?;
        created.insert(ancestor.to_string());
    }
    Ok(created)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::MemoryStore;

    fn object(name: &str, content_type: Option<&str>) -> ListEntry {
        ListEntry::Object(ObjectEntry {
            name: name.to_string(),
            bytes: 0,
            last_modified: None,
            content_type: content_type.map(str::to_string),
            hash: None,
        })
    }

    fn subdir(name: &str) -> ListEntry {
        ListEntry::Subdir {
            subdir: name.to_string(),
        }
    }

    #[test]
    fn test_prefix_list_chain() {
        let segments = prefix_list(Some("a/b/c/"));
        assert_eq!(
            segments,
            vec![
                PrefixSegment {
                    display_name: "a".to_string(),
                    full_name: "a/".to_string()
                },
                PrefixSegment {
                    display_name: "b".to_string(),
                    full_name: "a/b/".to_string()
                },
                PrefixSegment {
                    display_name: "c".to_string(),
                    full_name: "a/b/c/".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_prefix_list_empty() {
        assert!(prefix_list(None).is_empty());
        assert!(prefix_list(Some("")).is_empty());
        assert!(prefix_list(Some("/")).is_empty());
    }

    #[test]
    fn test_partition_splits_folders_and_objects() {
        let entries = vec![
            subdir("docs/"),
            object("readme.txt", Some("text/plain")),
            object("media", Some("application/directory")),
        ];
        let (folders, objects) = partition_listing(entries, None);
        assert_eq!(
            folders.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
            vec!["docs/", "media/"]
        );
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "readme.txt");
    }

    #[test]
    fn test_partition_collapses_duplicate_folder_forms() {
        // A marker object and a common-prefix entry resolving to the same
        // folder must yield one entry, regardless of input order.
        let forward = vec![
            subdir("photos/"),
            object("photos", Some("application/x-directory")),
        ];
        let reverse = vec![
            object("photos", Some("application/x-directory")),
            subdir("photos/"),
        ];
        for entries in [forward, reverse] {
            let (folders, objects) = partition_listing(entries, None);
            assert_eq!(folders.len(), 1);
            assert_eq!(folders[0].name, "photos/");
            assert!(objects.is_empty());
        }
    }

    #[test]
    fn test_partition_drops_current_prefix() {
        let entries = vec![subdir("a/b/"), subdir("a/b/c/")];
        let (folders, _) = partition_listing(entries, Some("a/b/"));
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "a/b/c/");
    }

    #[test]
    fn test_parent_prefix() {
        assert_eq!(parent_prefix("a/b/c.txt"), Some("a/b/".to_string()));
        assert_eq!(parent_prefix("a/b/"), Some("a/".to_string()));
        assert_eq!(parent_prefix("top.txt"), None);
        assert_eq!(parent_prefix("folder/"), None);
    }

    #[tokio::test]
    async fn test_materialize_creates_every_missing_ancestor() {
        let store = Arc::new(MemoryStore::new());
        let session = store
            .authenticate("memory://auth", "test:tester", "secret", 1)
            .await
            .unwrap();
        store.put_container(&session, "docs").await.unwrap();

        let created = materialize_prefix_chain(
            store.as_ref(),
            &session,
            "docs",
            "a/b/c",
            &HashSet::new(),
        )
        .await
        .unwrap();

        assert_eq!(
            created,
            HashSet::from(["a".to_string(), "a/b".to_string(), "a/b/c".to_string()])
        );
        for marker in ["a/", "a/b/", "a/b/c/"] {
            let meta = store.head_object(&session, "docs", marker).await.unwrap();
            assert_eq!(meta.get("content-type").unwrap(), DIRECTORY_MARKER);
            assert_eq!(meta.get("content-length").unwrap(), "0");
        }
    }

    #[tokio::test]
    async fn test_materialize_skips_known_ancestors() {
        let store = Arc::new(MemoryStore::new());
        let session = store
            .authenticate("memory://auth", "test:tester", "secret", 1)
            .await
            .unwrap();
        store.put_container(&session, "docs").await.unwrap();

        let known = HashSet::from(["a".to_string(), "a/b".to_string()]);
        let created =
            materialize_prefix_chain(store.as_ref(), &session, "docs", "a/b/c", &known)
                .await
                .unwrap();

        assert!(created.contains("a/b/c"));
        // The skipped ancestors were never written.
        assert!(store
            .head_object(&session, "docs", "a/")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store.head_object(&session, "docs", "a/b/c/").await.is_ok());
    }
}
