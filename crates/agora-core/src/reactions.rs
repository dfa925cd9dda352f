//! Like/dislike toggling.
//!
//! [`decide`] is the whole rule set; [`ReactionService::toggle`] runs the
//! lookup, the decision and the resulting write while holding the database
//! connection, so two toggles by the same user never interleave.

use std::sync::Arc;

use anyhow::anyhow;
use tracing::debug;

use agora_db::Database;
use agora_db::models::ReactionRow;
use agora_db::queries::reactions as store;
use agora_types::api::ReactionResponse;
use agora_types::models::{ReactionTarget, ReactionType};

use crate::pagination::Page;
use crate::{Result, ServiceError};

/// A stored reaction with its type parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub id: i64,
    pub user_id: i64,
    pub target: ReactionTarget,
    pub reaction_type: ReactionType,
}

impl TryFrom<ReactionRow> for Reaction {
    type Error = anyhow::Error;

    fn try_from(row: ReactionRow) -> anyhow::Result<Self> {
        let target = ReactionTarget::from_ids(row.post_id, row.comment_id)
            .ok_or_else(|| anyhow!("reaction {} has no single target", row.id))?;
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            target,
            reaction_type: row.reaction_type.parse()?,
        })
    }
}

impl From<Reaction> for ReactionResponse {
    fn from(r: Reaction) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            post_id: r.target.post_id(),
            comment_id: r.target.comment_id(),
            reaction_type: r.reaction_type,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Create(ReactionType),
    Delete { id: i64 },
    Update { id: i64, reaction_type: ReactionType },
}

pub fn decide(existing: Option<&Reaction>, requested: ReactionType) -> ReactionAction {
    match existing {
        None => ReactionAction::Create(requested),
        Some(r) if r.reaction_type == requested => ReactionAction::Delete { id: r.id },
        Some(r) => ReactionAction::Update {
            id: r.id,
            reaction_type: requested,
        },
    }
}

/// What a toggle did, from the caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Created(ReactionType),
    Removed,
    Switched { from: ReactionType, to: ReactionType },
}

impl ToggleOutcome {
    pub fn state(&self) -> &'static str {
        match self {
            Self::Created(_) => "created",
            Self::Removed => "removed",
            Self::Switched { .. } => "switched",
        }
    }

    /// The user's reaction after the toggle, if any.
    pub fn current(&self) -> Option<ReactionType> {
        match self {
            Self::Created(t) => Some(*t),
            Self::Removed => None,
            Self::Switched { to, .. } => Some(*to),
        }
    }
}

pub struct ReactionService {
    db: Arc<Database>,
}

impl ReactionService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn toggle(&self, user_id: i64, target: ReactionTarget, requested: ReactionType) -> Result<ToggleOutcome> {
        let outcome = self.db.with_conn_mut(|conn| {
            if !store::target_exists(conn, target)? {
                return Ok(None);
            }

            let existing = store::find_reaction(conn, user_id, target)?
                .map(Reaction::try_from)
                .transpose()?;

            let outcome = match decide(existing.as_ref(), requested) {
                ReactionAction::Create(reaction_type) => {
                    store::insert_reaction(conn, user_id, target, reaction_type.as_str())?;
                    ToggleOutcome::Created(reaction_type)
                }
                ReactionAction::Delete { id } => {
                    store::delete_reaction(conn, id)?;
                    ToggleOutcome::Removed
                }
                ReactionAction::Update { id, reaction_type } => {
                    store::update_reaction_type(conn, id, reaction_type.as_str())?;
                    // Update is only decided when a previous reaction exists.
                    let from = existing.as_ref().map_or(reaction_type, |r| r.reaction_type);
                    ToggleOutcome::Switched { from, to: reaction_type }
                }
            };
            Ok(Some(outcome))
        })?;

        let outcome = outcome.ok_or_else(|| ServiceError::NotFound(describe(target)))?;
        debug!("User {} toggled {:?} on {:?}: {}", user_id, requested, target, outcome.state());
        Ok(outcome)
    }

    pub fn list(&self, target: ReactionTarget, page: Page) -> Result<Vec<ReactionResponse>> {
        let rows = self.db.list_reactions(target, page.limit, page.offset)?;
        let reactions = rows
            .into_iter()
            .map(|row| Reaction::try_from(row).map(ReactionResponse::from))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(reactions)
    }
}

fn describe(target: ReactionTarget) -> String {
    match target {
        ReactionTarget::Post(id) => format!("post {}", id),
        ReactionTarget::Comment(id) => format!("comment {}", id),
    }
}

#[cfg(test)]
mod tests {
    use agora_db::queries::posts::NewPost;

    use super::*;

    fn existing(reaction_type: ReactionType) -> Reaction {
        Reaction {
            id: 42,
            user_id: 1,
            target: ReactionTarget::Post(7),
            reaction_type,
        }
    }

    #[test]
    fn decide_covers_every_case() {
        use ReactionType::*;

        assert_eq!(decide(None, Like), ReactionAction::Create(Like));
        assert_eq!(decide(Some(&existing(Like)), Like), ReactionAction::Delete { id: 42 });
        assert_eq!(
            decide(Some(&existing(Like)), Dislike),
            ReactionAction::Update { id: 42, reaction_type: Dislike }
        );
        assert_eq!(
            decide(Some(&existing(Dislike)), Like),
            ReactionAction::Update { id: 42, reaction_type: Like }
        );
    }

    struct Fixture {
        service: ReactionService,
        db: Arc<Database>,
        user: i64,
        post: i64,
        comment: i64,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = db.create_user("rea", "rea@example.com", "hash", "user").unwrap();
        let post = db
            .create_post(
                NewPost { topic_id: 1, user_id: user, title: "t", content: "c", tags: &[] },
                |id| format!("/posts/{}", id),
            )
            .unwrap();
        let comment = db.insert_comment(post, user, "nice").unwrap();
        Fixture {
            service: ReactionService::new(Arc::clone(&db)),
            db,
            user,
            post,
            comment,
        }
    }

    fn current(f: &Fixture, target: ReactionTarget) -> Vec<ReactionType> {
        f.service
            .list(target, Page::new(1, 10).unwrap())
            .unwrap()
            .into_iter()
            .filter(|r| r.user_id == f.user)
            .map(|r| r.reaction_type)
            .collect()
    }

    #[test]
    fn toggle_sequence_on_a_post() {
        use ReactionType::*;
        let f = fixture();
        let target = ReactionTarget::Post(f.post);

        assert_eq!(f.service.toggle(f.user, target, Like).unwrap(), ToggleOutcome::Created(Like));
        assert_eq!(current(&f, target), vec![Like]);

        assert_eq!(f.service.toggle(f.user, target, Like).unwrap(), ToggleOutcome::Removed);
        assert!(current(&f, target).is_empty());

        assert_eq!(f.service.toggle(f.user, target, Dislike).unwrap(), ToggleOutcome::Created(Dislike));
        assert_eq!(current(&f, target), vec![Dislike]);

        assert_eq!(
            f.service.toggle(f.user, target, Like).unwrap(),
            ToggleOutcome::Switched { from: Dislike, to: Like }
        );
        assert_eq!(current(&f, target), vec![Like]);
    }

    #[test]
    fn post_and_comment_reactions_are_independent() {
        let f = fixture();
        f.service.toggle(f.user, ReactionTarget::Post(f.post), ReactionType::Like).unwrap();
        f.service
            .toggle(f.user, ReactionTarget::Comment(f.comment), ReactionType::Dislike)
            .unwrap();

        assert_eq!(current(&f, ReactionTarget::Post(f.post)), vec![ReactionType::Like]);
        assert_eq!(current(&f, ReactionTarget::Comment(f.comment)), vec![ReactionType::Dislike]);

        let counts = f.db.reaction_counts_for_posts(&[f.post]).unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].count, 1);
    }

    #[test]
    fn missing_target_is_not_found() {
        let f = fixture();
        let err = f
            .service
            .toggle(f.user, ReactionTarget::Post(f.post + 100), ReactionType::Like)
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
