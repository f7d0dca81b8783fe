//! List repository

use chrono::{DateTime, Utc};
use docstore::Filter;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{LISTS, from_document, parse_id, to_document};
use crate::{
    Error, Result,
    cascade::Cascade,
    models::{List, NewList, UpdateList},
    session::Session,
    slug::{self, SlugScope, Sluggable, slugify},
};

/// Stored form of a list; carries the board owner for scoped queries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocument {
    id: Uuid,
    owner_id: Uuid,
    board_id: Uuid,
    name: String,
    slug: String,
    position: f64,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<ListDocument> for List {
    fn from(doc: ListDocument) -> Self {
        List {
            id: doc.id,
            board_id: doc.board_id,
            name: doc.name,
            slug: doc.slug,
            position: doc.position,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl Sluggable for ListDocument {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = slug;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl ListPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none() && self.position.is_none()
    }
}

impl Sluggable for ListPatch {
    fn slug(&self) -> &str {
        self.slug.as_deref().unwrap_or_default()
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = Some(slug);
    }
}

fn owner_filter(owner_id: Uuid) -> Filter {
    Filter::new().eq("ownerId", owner_id.to_string())
}

fn slug_scope(board_id: Uuid) -> SlugScope<'static> {
    SlugScope {
        collection: LISTS,
        field: "slug",
        filter: Filter::new().eq("boardId", board_id.to_string()),
        delimiter: "-",
    }
}

/// Lists on the boards of the authenticated principal
pub struct ListRepository<'a> {
    session: &'a Session,
}

impl<'a> ListRepository<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Add a list to a board of the principal
    pub async fn create(&self, board_id: &str, new_list: NewList) -> Result<List> {
        let board = self.session.boards().get(board_id).await?;
        let store = self.session.store();

        let list = ListDocument {
            id: Uuid::now_v7(),
            owner_id: board.owner_id,
            board_id: board.id,
            slug: slugify(&new_list.name, "list"),
            name: new_list.name,
            position: new_list.position,
            created_at: self.session.now(),
            updated_at: None,
        };

        let scope = slug_scope(board.id);
        let (slug, ()) = slug::resolve(store, &scope, &list, move |attempt: ListDocument| async move {
            store.insert(LISTS, to_document(&attempt)?).await
        })
        .await?;

        info!("Created list {} ({}) on board {}", list.id, slug, board.id);
        Ok(List::from(ListDocument { slug, ..list }))
    }

    /// Get a list by id
    pub async fn get(&self, id: &str) -> Result<List> {
        let owner_id = self.session.principal_id().await?;
        let id = parse_id(id).ok_or(Error::ListNotFound)?;

        let doc = self
            .session
            .store()
            .find_one(LISTS, &owner_filter(owner_id).eq("id", id.to_string()))
            .await?
            .ok_or(Error::ListNotFound)?;

        Ok(from_document::<ListDocument>(doc)?.into())
    }

    /// Lists of a board, oldest first
    ///
    /// A board that does not exist or belongs to someone else has no lists.
    pub async fn list_by_board(&self, board_id: &str) -> Result<Vec<List>> {
        let owner_id = self.session.principal_id().await?;
        let Some(board_id) = parse_id(board_id) else {
            return Ok(Vec::new());
        };

        let filter = owner_filter(owner_id).eq("boardId", board_id.to_string());
        let docs = self.session.store().find(LISTS, &filter).await?;

        docs.into_iter()
            .map(|doc| {
                from_document::<ListDocument>(doc)
                    .map(List::from)
                    .map_err(Error::from)
            })
            .collect()
    }

    /// Apply the provided fields of `update`
    ///
    /// Behaves like [`BoardRepository::update`](super::BoardRepository::update):
    /// unchanged fields are dropped and a new name may assign a new slug.
    pub async fn update(&self, id: &str, update: UpdateList) -> Result<List> {
        let current = self.get(id).await?;
        let store = self.session.store();

        let mut patch = ListPatch::default();
        if let Some(name) = update.name.filter(|name| *name != current.name) {
            patch.slug = slug::renamed_slug(&current.slug, &name, "list");
            patch.name = Some(name);
        }
        patch.position = update
            .position
            .filter(|position| *position != current.position);

        if patch.is_empty() {
            return Ok(current);
        }
        patch.updated_at = Some(self.session.now());

        let owner_id = self.session.principal_id().await?;
        let filter = owner_filter(owner_id).eq("id", current.id.to_string());
        let updated = if patch.slug.is_some() {
            let filter = &filter;
            let (_, doc) = slug::resolve(
                store,
                &slug_scope(current.board_id),
                &patch,
                move |attempt: ListPatch| async move {
                    store
                        .update_one(LISTS, filter, to_document(&attempt)?)
                        .await
                },
            )
            .await?;
            doc
        } else {
            store
                .update_one(LISTS, &filter, to_document(&patch)?)
                .await?
        };

        let doc = updated.ok_or(Error::ListNotFound)?;
        info!("Updated list {}", current.id);
        Ok(from_document::<ListDocument>(doc)?.into())
    }

    /// Delete a list together with its cards
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id(id).ok_or(Error::ListNotFound)?;
        Cascade::list(self.session, id).run().await?;

        info!("Deleted list {}", id);
        Ok(())
    }

    /// Delete every list of a board, returning how many were removed
    ///
    /// Cards are left alone; board deletion removes them separately.
    pub async fn delete_by_board(&self, board_id: Uuid) -> Result<u64> {
        let owner_id = self.session.principal_id().await?;
        let filter = owner_filter(owner_id).eq("boardId", board_id.to_string());

        Ok(self.session.store().delete_many(LISTS, &filter).await?)
    }

    /// Remove the list document alone
    pub(crate) async fn remove(&self, id: Uuid) -> Result<bool> {
        let owner_id = self.session.principal_id().await?;
        let filter = owner_filter(owner_id).eq("id", id.to_string());

        Ok(self.session.store().delete_one(LISTS, &filter).await?)
    }
}
