//! Local vote bookkeeping for optimistic updates.
//!
//! A user holds at most one net direction per item. Voting in the direction
//! already held is a no-op; switching direction moves one count from the old
//! side to the new side in a single step.

use std::collections::HashMap;

use crate::types::{Comment, Post};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteState {
    #[default]
    None,
    Upvoted,
    Downvoted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    fn target(self) -> VoteState {
        match self {
            VoteDirection::Up => VoteState::Upvoted,
            VoteDirection::Down => VoteState::Downvoted,
        }
    }
}

/// Displayed aggregate counts of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VoteCounts {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteCounts {
    pub fn new(upvotes: i64, downvotes: i64) -> Self {
        Self { upvotes, downvotes }
    }
}

impl VoteState {
    /// The state and counts after voting `direction`, or `None` when the vote
    /// would not change anything.
    pub fn apply(self, direction: VoteDirection, counts: VoteCounts) -> Option<(VoteState, VoteCounts)> {
        let next = direction.target();
        if self == next {
            return None;
        }
        let mut counts = counts;
        match self {
            VoteState::Upvoted => counts.upvotes -= 1,
            VoteState::Downvoted => counts.downvotes -= 1,
            VoteState::None => {}
        }
        match next {
            VoteState::Upvoted => counts.upvotes += 1,
            VoteState::Downvoted => counts.downvotes += 1,
            VoteState::None => {}
        }
        Some((next, counts))
    }
}

/// Anything with displayed vote counts.
pub trait Votable {
    fn vote_id(&self) -> &str;
    fn counts(&self) -> VoteCounts;
    fn set_counts(&mut self, counts: VoteCounts);
}

impl Votable for Comment {
    fn vote_id(&self) -> &str {
        &self.id
    }

    fn counts(&self) -> VoteCounts {
        VoteCounts::new(self.upvotes, self.downvotes)
    }

    fn set_counts(&mut self, counts: VoteCounts) {
        self.upvotes = counts.upvotes;
        self.downvotes = counts.downvotes;
    }
}

impl Votable for Post {
    fn vote_id(&self) -> &str {
        &self.id
    }

    fn counts(&self) -> VoteCounts {
        VoteCounts::new(self.upvotes, self.downvotes)
    }

    fn set_counts(&mut self, counts: VoteCounts) {
        self.upvotes = counts.upvotes;
        self.downvotes = counts.downvotes;
    }
}

/// A vote applied locally and awaiting the server's answer. Holds what is
/// needed to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVote {
    pub id: String,
    pub direction: VoteDirection,
    prior_state: VoteState,
    prior_counts: VoteCounts,
}

/// Per-item vote state of the logged-in user.
#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    states: HashMap<String, VoteState>,
}

impl VoteLedger {
    /// Build from the user's record. An id in both lists counts as upvoted.
    pub fn from_lists<'a>(
        upvoted: impl IntoIterator<Item = &'a String>,
        downvoted: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let mut states = HashMap::new();
        for id in downvoted {
            states.insert(id.clone(), VoteState::Downvoted);
        }
        for id in upvoted {
            states.insert(id.clone(), VoteState::Upvoted);
        }
        Self { states }
    }

    pub fn state(&self, id: &str) -> VoteState {
        self.states.get(id).copied().unwrap_or_default()
    }

    pub fn set(&mut self, id: &str, state: VoteState) {
        match state {
            VoteState::None => {
                self.states.remove(id);
            }
            _ => {
                self.states.insert(id.to_string(), state);
            }
        }
    }

    /// Apply a vote to `items` and the ledger before the server confirms it.
    /// `None` when the item is unknown or the vote changes nothing; no request
    /// should be sent in that case.
    pub fn begin<T: Votable>(
        &mut self,
        items: &mut [T],
        id: &str,
        direction: VoteDirection,
    ) -> Option<PendingVote> {
        let item = items.iter_mut().find(|item| item.vote_id() == id)?;
        let prior_state = self.state(id);
        let prior_counts = item.counts();
        let (next_state, next_counts) = prior_state.apply(direction, prior_counts)?;
        item.set_counts(next_counts);
        self.set(id, next_state);
        Some(PendingVote {
            id: id.to_string(),
            direction,
            prior_state,
            prior_counts,
        })
    }

    /// The server accepted the vote: display the counts it reports.
    pub fn confirm<T: Votable>(&mut self, items: &mut [T], pending: &PendingVote, confirmed: VoteCounts) {
        if let Some(item) = items.iter_mut().find(|item| item.vote_id() == pending.id) {
            item.set_counts(confirmed);
        }
    }

    /// The server rejected the vote: restore counts and vote state exactly.
    pub fn revert<T: Votable>(&mut self, items: &mut [T], pending: &PendingVote) {
        if let Some(item) = items.iter_mut().find(|item| item.vote_id() == pending.id) {
            item.set_counts(pending.prior_counts);
        }
        self.set(&pending.id, pending.prior_state);
    }
}
