//! Cascading deletion of boards and lists
//!
//! The parent is removed first, then its lists, then its cards. A failure
//! part way leaves unreachable children behind, never a parent whose
//! children are gone. Nothing is rolled back.

use std::fmt;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Error, Result, session::Session};

/// Steps of a cascading delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Authorizing,
    DeletingParent,
    DeletingLists,
    DeletingCards,
    Done,
    Aborted,
}

impl fmt::Display for CascadeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CascadeState::Authorizing => "authorizing",
            CascadeState::DeletingParent => "deleting parent",
            CascadeState::DeletingLists => "deleting lists",
            CascadeState::DeletingCards => "deleting cards",
            CascadeState::Done => "done",
            CascadeState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Board,
    List,
}

/// State following `state`; list cascades have no lists to delete
fn transition(state: CascadeState, target: Target) -> CascadeState {
    match (state, target) {
        (CascadeState::Authorizing, _) => CascadeState::DeletingParent,
        (CascadeState::DeletingParent, Target::Board) => CascadeState::DeletingLists,
        (CascadeState::DeletingParent, Target::List) => CascadeState::DeletingCards,
        (CascadeState::DeletingLists, _) => CascadeState::DeletingCards,
        (CascadeState::DeletingCards, _) => CascadeState::Done,
        (state, _) => state,
    }
}

/// A cascading delete rooted at a board or a list
pub(crate) struct Cascade<'a> {
    session: &'a Session,
    target: Target,
    id: Uuid,
    state: CascadeState,
}

impl<'a> Cascade<'a> {
    pub(crate) fn board(session: &'a Session, id: Uuid) -> Self {
        Self::new(session, Target::Board, id)
    }

    pub(crate) fn list(session: &'a Session, id: Uuid) -> Self {
        Self::new(session, Target::List, id)
    }

    fn new(session: &'a Session, target: Target, id: Uuid) -> Self {
        Self {
            session,
            target,
            id,
            state: CascadeState::Authorizing,
        }
    }

    /// Drive the cascade to completion
    ///
    /// The error of the failing step is returned as is.
    pub(crate) async fn run(mut self) -> Result<()> {
        while self.state != CascadeState::Done {
            if let Err(err) = self.step().await {
                warn!(
                    "Cascading delete of {:?} {} aborted while {}: {}",
                    self.target, self.id, self.state, err
                );
                self.state = CascadeState::Aborted;
                return Err(err);
            }
            self.state = transition(self.state, self.target);
        }

        debug!("Cascading delete of {:?} {} done", self.target, self.id);
        Ok(())
    }

    async fn step(&self) -> Result<()> {
        match self.state {
            CascadeState::Authorizing => {
                self.session.principal_id().await?;
            }
            CascadeState::DeletingParent => {
                let removed = match self.target {
                    Target::Board => self.session.boards().remove(self.id).await?,
                    Target::List => self.session.lists().remove(self.id).await?,
                };
                if !removed {
                    return Err(match self.target {
                        Target::Board => Error::BoardNotFound,
                        Target::List => Error::ListNotFound,
                    });
                }
            }
            CascadeState::DeletingLists => {
                let count = self.session.lists().delete_by_board(self.id).await?;
                debug!("Deleted {} lists of board {}", count, self.id);
            }
            CascadeState::DeletingCards => {
                let count = match self.target {
                    Target::Board => self.session.cards().delete_by_board(self.id).await?,
                    Target::List => self.session.cards().delete_by_list(self.id).await?,
                };
                debug!("Deleted {} cards of {:?} {}", count, self.target, self.id);
            }
            CascadeState::Done | CascadeState::Aborted => {}
        }

        Ok(())
    }
}
