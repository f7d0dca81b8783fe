//! Card repository

use chrono::{DateTime, Utc};
use docstore::Filter;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{CARDS, from_document, parse_id, to_document};
use crate::{
    Error, Result,
    models::{Card, NewCard, UpdateCard},
    session::Session,
    slug::{self, SlugScope, Sluggable, slugify},
};

/// Stored form of a card
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardDocument {
    id: Uuid,
    owner_id: Uuid,
    list_id: Uuid,
    board_id: Uuid,
    name: String,
    slug: String,
    #[serde(default)]
    description: String,
    position: f64,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<CardDocument> for Card {
    fn from(doc: CardDocument) -> Self {
        Card {
            id: doc.id,
            list_id: doc.list_id,
            board_id: doc.board_id,
            name: doc.name,
            slug: doc.slug,
            description: doc.description,
            position: doc.position,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

impl Sluggable for CardDocument {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn set_slug(&mut self, slug: String) {
        self.slug = slug;
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct CardPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl CardPatch {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.slug.is_none()
            && self.description.is_none()
            && self.position.is_none()
    }
}

impl Sluggable for CardPatch {
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
        collection: CARDS,
        field: "slug",
        filter: Filter::new().eq("boardId", board_id.to_string()),
        delimiter: "-",
    }
}

/// Cards on the boards of the authenticated principal
pub struct CardRepository<'a> {
    session: &'a Session,
}

impl<'a> CardRepository<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Add a card to a list of the principal
    ///
    /// The card records the board of its list at creation time.
    pub async fn create(&self, list_id: &str, new_card: NewCard) -> Result<Card> {
        let list = self.session.lists().get(list_id).await?;
        let owner_id = self.session.principal_id().await?;
        let store = self.session.store();

        let card = CardDocument {
            id: Uuid::now_v7(),
            owner_id,
            list_id: list.id,
            board_id: list.board_id,
            slug: slugify(&new_card.name, "card"),
            name: new_card.name,
            description: new_card.description,
            position: new_card.position,
            created_at: self.session.now(),
            updated_at: None,
        };

        let scope = slug_scope(list.board_id);
        let (slug, ()) = slug::resolve(store, &scope, &card, move |attempt: CardDocument| async move {
            store.insert(CARDS, to_document(&attempt)?).await
        })
        .await?;

        info!("Created card {} ({}) in list {}", card.id, slug, list.id);
        Ok(Card::from(CardDocument { slug, ..card }))
    }

    /// Get a card by id
    pub async fn get(&self, id: &str) -> Result<Card> {
        let owner_id = self.session.principal_id().await?;
        let id = parse_id(id).ok_or(Error::CardNotFound)?;

        let doc = self
            .session
            .store()
            .find_one(CARDS, &owner_filter(owner_id).eq("id", id.to_string()))
            .await?
            .ok_or(Error::CardNotFound)?;

        Ok(from_document::<CardDocument>(doc)?.into())
    }

    /// Cards of a board, oldest first
    pub async fn list_by_board(&self, board_id: &str) -> Result<Vec<Card>> {
        self.list_by("boardId", board_id).await
    }

    /// Cards of a list, oldest first
    pub async fn list_by_list(&self, list_id: &str) -> Result<Vec<Card>> {
        self.list_by("listId", list_id).await
    }

    /// Apply the provided fields of `update`
    pub async fn update(&self, id: &str, update: UpdateCard) -> Result<Card> {
        let current = self.get(id).await?;
        let store = self.session.store();

        let mut patch = CardPatch::default();
        if let Some(name) = update.name.filter(|name| *name != current.name) {
            patch.slug = slug::renamed_slug(&current.slug, &name, "card");
            patch.name = Some(name);
        }
        patch.description = update
            .description
            .filter(|description| *description != current.description);
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
                move |attempt: CardPatch| async move {
                    store
                        .update_one(CARDS, filter, to_document(&attempt)?)
                        .await
                },
            )
            .await?;
            doc
        } else {
            store
                .update_one(CARDS, &filter, to_document(&patch)?)
                .await?
        };

        let doc = updated.ok_or(Error::CardNotFound)?;
        info!("Updated card {}", current.id);
        Ok(from_document::<CardDocument>(doc)?.into())
    }

    /// Delete a card
    pub async fn delete(&self, id: &str) -> Result<()> {
        let owner_id = self.session.principal_id().await?;
        let id = parse_id(id).ok_or(Error::CardNotFound)?;

        let filter = owner_filter(owner_id).eq("id", id.to_string());
        if !self.session.store().delete_one(CARDS, &filter).await? {
            return Err(Error::CardNotFound);
        }

        info!("Deleted card {}", id);
        Ok(())
    }

    /// Delete every card of a list, returning how many were removed
    pub async fn delete_by_list(&self, list_id: Uuid) -> Result<u64> {
        self.delete_by("listId", list_id).await
    }

    /// Delete every card of a board, returning how many were removed
    pub async fn delete_by_board(&self, board_id: Uuid) -> Result<u64> {
        self.delete_by("boardId", board_id).await
    }

    async fn list_by(&self, field: &str, parent_id: &str) -> Result<Vec<Card>> {
        let owner_id = self.session.principal_id().await?;
        let Some(parent_id) = parse_id(parent_id) else {
            return Ok(Vec::new());
        };

        let filter = owner_filter(owner_id).eq(field, parent_id.to_string());
        let docs = self.session.store().find(CARDS, &filter).await?;

        docs.into_iter()
            .map(|doc| {
                from_document::<CardDocument>(doc)
                    .map(Card::from)
                    .map_err(Error::from)
            })
            .collect()
    }

    async fn delete_by(&self, field: &str, parent_id: Uuid) -> Result<u64> {
        let owner_id = self.session.principal_id().await?;
        let filter = owner_filter(owner_id).eq(field, parent_id.to_string());

        Ok(self.session.store().delete_many(CARDS, &filter).await?)
    }
}
