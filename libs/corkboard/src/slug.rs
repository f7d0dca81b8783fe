//! Slug derivation and collision-free slug assignment
//!
//! A slug is written together with the rest of its document. When the store
//! rejects it because a unique index covering the slug field already holds
//! the value, the resolver looks up the highest numeric suffix in use within
//! the scope and retries with the next one. The unique index is the only
//! arbiter; the suffix scan just avoids walking the family one by one.

use std::future::Future;

use docstore::{DocumentStore, Filter, StoreResult, family_suffix};
use serde_json::Value;
use tracing::debug;

/// Documents that carry a slug
pub(crate) trait Sluggable {
    fn slug(&self) -> &str;
    fn set_slug(&mut self, slug: String);
}

/// Where a slug must be unique
#[derive(Debug, Clone)]
pub(crate) struct SlugScope<'a> {
    /// Collection holding the documents
    pub collection: &'a str,
    /// Document field holding the slug
    pub field: &'a str,
    /// Equality filter selecting the scope, e.g. the owner or the parent board
    pub filter: Filter,
    /// Separator placed between the base slug and its numeric suffix
    pub delimiter: &'a str,
}

/// Turn a display name into a slug
///
/// Letters and digits are lower-cased, every other run of characters becomes
/// a single `-`, and leading or trailing dashes are dropped. Returns
/// `fallback` when nothing is left.
pub fn slugify(name: &str, fallback: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

/// Slug to write when an entity slugged `current` is renamed to `name`
///
/// Returns `None` when `current` already belongs to the slug family of the
/// new name, in which case the existing slug stays valid and is kept.
pub(crate) fn renamed_slug(current: &str, name: &str, fallback: &str) -> Option<String> {
    let base = slugify(name, fallback);
    match family_suffix(current, &base, "-") {
        Some(_) => None,
        None => Some(base),
    }
}

/// Highest suffix already taken within the family of `base`
async fn highest_suffix(
    store: &dyn DocumentStore,
    scope: &SlugScope<'_>,
    base: &str,
) -> StoreResult<u64> {
    let filter = scope
        .filter
        .clone()
        .slug_family(scope.field, base, scope.delimiter);
    let family = store.find(scope.collection, &filter).await?;

    Ok(family
        .iter()
        .filter_map(|doc| doc.get(scope.field).and_then(Value::as_str))
        .filter_map(|slug| family_suffix(slug, base, scope.delimiter))
        .max()
        .unwrap_or(0))
}

/// Run `action` with `record`, renaming its slug until the store accepts it
///
/// The slug already set on `record` is tried first. Conflicts on indexes
/// that do not cover the slug field, and every other error, are returned
/// unchanged. Returns the slug that was finally written together with the
/// result of the successful action.
pub(crate) async fn resolve<R, T, F, Fut>(
    store: &dyn DocumentStore,
    scope: &SlugScope<'_>,
    record: &R,
    mut action: F,
) -> StoreResult<(String, T)>
where
    R: Sluggable + Clone,
    F: FnMut(R) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let base = record.slug().to_string();
    let mut candidate = base.clone();
    let mut suffix: Option<u64> = None;

    loop {
        let mut attempt = record.clone();
        attempt.set_slug(candidate.clone());

        match action(attempt).await {
            Ok(result) => return Ok((candidate, result)),
            Err(err) if err.is_conflict_on(scope.field) => {
                let last = match suffix {
                    Some(n) => n,
                    None => highest_suffix(store, scope, &base).await?,
                };
                // Every numeric suffix is taken
                let Some(next) = last.checked_add(1) else {
                    return Err(err);
                };
                suffix = Some(next);
                candidate = format!("{}{}{}", base, scope.delimiter, next);

                debug!(
                    "Slug taken in {}, retrying with {}",
                    scope.collection, candidate
                );
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docstore::{Document, IndexSpec, MemoryStore, StoreError};
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct Record {
        id: String,
        owner: String,
        email: String,
        slug: String,
    }

    impl Sluggable for Record {
        fn slug(&self) -> &str {
            &self.slug
        }

        fn set_slug(&mut self, slug: String) {
            self.slug = slug;
        }
    }

    impl Record {
        fn new(id: &str, owner: &str, slug: &str) -> Self {
            Self {
                id: id.to_string(),
                owner: owner.to_string(),
                email: format!("{}@example.com", id),
                slug: slug.to_string(),
            }
        }

        fn document(&self) -> Document {
            match json!({"id": self.id, "owner": self.owner, "email": self.email, "slug": self.slug}) {
                Value::Object(map) => map,
                _ => unreachable!(),
            }
        }
    }

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .ensure_index("things", &IndexSpec::unique(&["owner", "slug"]))
            .await
            .unwrap();
        store
            .ensure_index("things", &IndexSpec::unique(&["email"]))
            .await
            .unwrap();
        store
    }

    async fn create(store: &MemoryStore, record: Record, delimiter: &str) -> StoreResult<String> {
        let scope = SlugScope {
            collection: "things",
            field: "slug",
            filter: Filter::new().eq("owner", record.owner.clone()),
            delimiter,
        };
        let (slug, ()) = resolve(store, &scope, &record, move |attempt: Record| async move {
            store.insert("things", attempt.document()).await
        })
        .await?;
        Ok(slug)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("ZZZ KK", "board"), "zzz-kk");
        assert_eq!(slugify("  ZZZ   KK ", "board"), "zzz-kk");
        assert_eq!(slugify("Sprint #42: Backlog!", "board"), "sprint-42-backlog");
        assert_eq!(slugify("--a--b--", "board"), "a-b");
        assert_eq!(slugify("  !!! ", "list"), "list");
        assert_eq!(slugify("", "card"), "card");
    }

    #[test]
    fn test_renamed_slug_keeps_family_members() {
        assert_eq!(renamed_slug("todo-1", "TODO", "board"), None);
        assert_eq!(renamed_slug("todo", "  Todo ", "board"), None);
        assert_eq!(renamed_slug("todo-1", "Done", "board"), Some("done".to_string()));
        assert_eq!(renamed_slug("todo-list", "Todo", "board"), Some("todo".to_string()));
    }

    #[tokio::test]
    async fn test_suffixes_are_sequential() {
        let store = store().await;

        assert_eq!(create(&store, Record::new("1", "u1", "todo"), "-").await.unwrap(), "todo");
        assert_eq!(create(&store, Record::new("2", "u1", "todo"), "-").await.unwrap(), "todo-1");
        assert_eq!(create(&store, Record::new("3", "u1", "todo"), "-").await.unwrap(), "todo-2");
        assert_eq!(create(&store, Record::new("4", "u2", "todo"), "-").await.unwrap(), "todo");
    }

    #[tokio::test]
    async fn test_resumes_after_highest_suffix() {
        let store = store().await;

        create(&store, Record::new("1", "u1", "todo"), "-").await.unwrap();
        create(&store, Record::new("2", "u1", "todo-7"), "-").await.unwrap();
        create(&store, Record::new("3", "u1", "todo-list"), "-").await.unwrap();

        assert_eq!(create(&store, Record::new("4", "u1", "todo"), "-").await.unwrap(), "todo-8");
    }

    #[tokio::test]
    async fn test_saturated_suffix_is_skipped() {
        let store = store().await;

        create(&store, Record::new("1", "u1", "todo-18446744073709551615"), "-").await.unwrap();
        create(&store, Record::new("2", "u1", "todo"), "-").await.unwrap();

        assert_eq!(create(&store, Record::new("3", "u1", "todo"), "-").await.unwrap(), "todo-1");
        assert_eq!(create(&store, Record::new("4", "u1", "todo"), "-").await.unwrap(), "todo-2");
    }

    #[tokio::test]
    async fn test_exhausted_suffixes_report_the_conflict() {
        let store = store().await;

        create(&store, Record::new("1", "u1", "todo"), "-").await.unwrap();
        create(&store, Record::new("2", "u1", "todo-18446744073709551614"), "-").await.unwrap();
        create(&store, Record::new("3", "u1", "todo-18446744073709551615"), "-").await.unwrap();

        let err = create(&store, Record::new("4", "u1", "todo"), "-").await.unwrap_err();
        assert!(err.is_conflict_on("slug"));
    }

    #[tokio::test]
    async fn test_empty_delimiter() {
        let store = store().await;

        assert_eq!(create(&store, Record::new("1", "u1", "johndoe"), "").await.unwrap(), "johndoe");
        assert_eq!(create(&store, Record::new("2", "u1", "johndoe"), "").await.unwrap(), "johndoe1");
    }

    #[tokio::test]
    async fn test_other_conflicts_are_not_retried() {
        let store = store().await;
        create(&store, Record::new("1", "u1", "todo"), "-").await.unwrap();

        let mut duplicate = Record::new("2", "u1", "other");
        duplicate.email = "1@example.com".to_string();

        let err = create(&store, duplicate, "-").await.unwrap_err();
        assert!(err.is_conflict_on("email"));

        let things = store.find("things", &Filter::new()).await.unwrap();
        assert_eq!(things.len(), 1);
    }

    #[tokio::test]
    async fn test_non_conflict_errors_propagate() {
        let store = store().await;
        let scope = SlugScope {
            collection: "things",
            field: "slug",
            filter: Filter::new(),
            delimiter: "-",
        };
        let record = Record::new("1", "u1", "todo");

        let mut calls = 0;
        let result: StoreResult<(String, ())> = resolve(&store, &scope, &record, |_| {
            calls += 1;
            async { Err(StoreError::InvalidDocument("broken".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
        assert_eq!(calls, 1);
    }
}
