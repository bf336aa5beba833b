use crate::config::JudgingSettings;
use crate::core::judges::{DistanceJudge, Judge};
use crate::models::{CandidateProfile, SwipeAction, Vote};
use crate::services::word_store::WordListStore;
use std::sync::Arc;

/// Outcome of judging one profile
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub action: SwipeAction,
    pub reason: String,
    /// Votes in evaluation order, distance first
    pub votes: Vec<(&'static str, Vote)>,
}

/// Decides the swipe action for a profile from the votes of its judges
///
/// # Precedence
/// 1. Distance is a hard filter: reject means nope, review means no action.
/// 2. Otherwise the remaining judges are consulted in priority order and
///    the first one decides: approve likes, review takes no action, reject
///    and no-info both nope. Lower-priority judges still vote, which keeps
///    their review lists learning, but never override a higher one.
///
/// A judge that fails to evaluate counts as a review vote.
pub struct ProfileJudge {
    distance: DistanceJudge,
    judges: Vec<Box<dyn Judge>>,
}

impl ProfileJudge {
    /// `judges` is ordered from highest to lowest priority
    pub fn new(distance: DistanceJudge, judges: Vec<Box<dyn Judge>>) -> Self {
        Self { distance, judges }
    }

    pub fn from_settings(settings: &JudgingSettings, store: Arc<WordListStore>) -> Self {
        let judges = settings
            .judges
            .iter()
            .map(|kind| kind.build(store.clone()))
            .collect();

        Self::new(
            DistanceJudge::new(settings.too_close_km, settings.too_far_km),
            judges,
        )
    }

    pub fn like_or_nope(&self, profile: &CandidateProfile) -> SwipeAction {
        self.judge(profile).action
    }

    pub fn judge(&self, profile: &CandidateProfile) -> Verdict {
        tracing::debug!("Judging {}", profile);

        let distance_vote = cast(&self.distance, profile);
        let mut votes = vec![(self.distance.name(), distance_vote)];

        match distance_vote {
            Vote::Reject => return verdict(SwipeAction::Nope, "Too far away".to_string(), votes),
            Vote::Review => {
                return verdict(SwipeAction::NoAction, "Too close to automate".to_string(), votes)
            }
            Vote::Approve | Vote::NoInfo => {}
        }

        votes.extend(self.judges.iter().map(|j| (j.name(), cast(j.as_ref(), profile))));

        let (action, reason) = match votes.get(1) {
            Some(&(judge, Vote::Approve)) => (SwipeAction::Like, format!("Approved by {} judge", judge)),
            Some(&(judge, Vote::Reject)) => (SwipeAction::Nope, format!("Rejected by {} judge", judge)),
            Some(&(judge, Vote::NoInfo)) => (SwipeAction::Nope, format!("No {} information", judge)),
            Some(&(judge, Vote::Review)) => (SwipeAction::NoAction, format!("Unknown {} needs review", judge)),
            None => (SwipeAction::Nope, "No judges configured".to_string()),
        };

        verdict(action, reason, votes)
    }
}

fn cast(judge: &dyn Judge, profile: &CandidateProfile) -> Vote {
    match judge.vote(profile) {
        Ok(vote) => vote,
        Err(e) => {
            tracing::warn!(
                "{} judge could not evaluate profile {}: {}. Falling back to review",
                judge.name(),
                profile.id,
                e
            );
            Vote::Review
        }
    }
}

fn verdict(action: SwipeAction, reason: String, votes: Vec<(&'static str, Vote)>) -> Verdict {
    tracing::info!("Action: {}. Reason: {}", action, reason);
    Verdict {
        action,
        reason,
        votes,
    }
}
