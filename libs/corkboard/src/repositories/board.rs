//! Board repository

use chrono::{DateTime, Utc};
use docstore::Filter;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::{BOARDS, from_document, parse_id, to_document};
use crate::{
    Error, Result,
    cascade::Cascade,
    models::{Board, NewBoard, UpdateBoard},
    session::Session,
    slug::{self, SlugScope, Sluggable, slugify},
};

impl Sluggable for Board {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = slug;
    }
}

/// Fields written by a board update
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct BoardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<Option<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl BoardPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none() && self.settings.is_none()
    }
}

impl Sluggable for BoardPatch {
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

fn slug_scope(owner_id: Uuid) -> SlugScope<'static> {
    SlugScope {
        collection: BOARDS,
        field: "slug",
        filter: owner_filter(owner_id),
        delimiter: "-",
    }
}

/// Boards of the authenticated principal
pub struct BoardRepository<'a> {
    session: &'a Session,
}

impl<'a> BoardRepository<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Create a board owned by the principal
    ///
    /// The slug is derived from the name and suffixed when the owner already
    /// has a board with the same slug.
    pub async fn create(&self, new_board: NewBoard) -> Result<Board> {
        let owner_id = self.session.principal_id().await?;
        let store = self.session.store();

        let board = Board {
            id: Uuid::now_v7(),
            owner_id,
            slug: slugify(&new_board.name, "board"),
            name: new_board.name,
            settings: new_board.settings,
            created_at: self.session.now(),
            updated_at: None,
        };

        let scope = slug_scope(owner_id);
        let (slug, ()) = slug::resolve(store, &scope, &board, move |attempt: Board| async move {
            store.insert(BOARDS, to_document(&attempt)?).await
        })
        .await?;

        info!("Created board {} ({})", board.id, slug);
        Ok(Board { slug, ..board })
    }

    /// Get a board by id
    pub async fn get(&self, id: &str) -> Result<Board> {
        let owner_id = self.session.principal_id().await?;
        let id = parse_id(id).ok_or(Error::BoardNotFound)?;

        self.find(owner_filter(owner_id).eq("id", id.to_string()))
            .await
    }

    /// Get a board by its slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Board> {
        let owner_id = self.session.principal_id().await?;

        self.find(owner_filter(owner_id).eq("slug", slug)).await
    }

    /// Get a board by id when `selector` is one, by slug otherwise
    pub async fn get_by_selector(&self, selector: &str) -> Result<Board> {
        match parse_id(selector) {
            Some(_) => self.get(selector).await,
            None => self.get_by_slug(selector).await,
        }
    }

    /// Every board of the principal, oldest first
    pub async fn list(&self) -> Result<Vec<Board>> {
        let owner_id = self.session.principal_id().await?;
        let docs = self
            .session
            .store()
            .find(BOARDS, &owner_filter(owner_id))
            .await?;

        docs.into_iter()
            .map(|doc| from_document(doc).map_err(Error::from))
            .collect()
    }

    /// Apply the provided fields of `update`
    ///
    /// Fields equal to their current value are ignored. When nothing is left
    /// the board is returned as is and `updatedAt` keeps its value. A new
    /// name assigns a new slug unless the current one already belongs to the
    /// new name's slug family.
    pub async fn update(&self, id: &str, update: UpdateBoard) -> Result<Board> {
        let current = self.get(id).await?;
        let store = self.session.store();

        let mut patch = BoardPatch::default();
        if let Some(name) = update.name.filter(|name| *name != current.name) {
            patch.slug = slug::renamed_slug(&current.slug, &name, "board");
            patch.name = Some(name);
        }
        if let Some(settings) = update
            .settings
            .into_change()
            .filter(|settings| *settings != current.settings)
        {
            patch.settings = Some(settings);
        }

        if patch.is_empty() {
            return Ok(current);
        }
        patch.updated_at = Some(self.session.now());

        let filter = owner_filter(current.owner_id).eq("id", current.id.to_string());
        let updated = if patch.slug.is_some() {
            let filter = &filter;
            let (_, doc) = slug::resolve(
                store,
                &slug_scope(current.owner_id),
                &patch,
                move |attempt: BoardPatch| async move {
                    store
                        .update_one(BOARDS, filter, to_document(&attempt)?)
                        .await
                },
            )
            .await?;
            doc
        } else {
            store
                .update_one(BOARDS, &filter, to_document(&patch)?)
                .await?
        };

        let doc = updated.ok_or(Error::BoardNotFound)?;
        info!("Updated board {}", current.id);
        Ok(from_document(doc)?)
    }

    /// Delete a board together with its lists and cards
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id(id).ok_or(Error::BoardNotFound)?;
        Cascade::board(self.session, id).run().await?;

        info!("Deleted board {}", id);
        Ok(())
    }

    /// Remove the board document alone
    pub(crate) async fn remove(&self, id: Uuid) -> Result<bool> {
        let owner_id = self.session.principal_id().await?;
        let filter = owner_filter(owner_id).eq("id", id.to_string());

        Ok(self.session.store().delete_one(BOARDS, &filter).await?)
    }

    async fn find(&self, filter: Filter) -> Result<Board> {
        let doc = self
            .session
            .store()
            .find_one(BOARDS, &filter)
            .await?
            .ok_or(Error::BoardNotFound)?;

        Ok(from_document(doc)?)
    }
}
