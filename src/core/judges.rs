use crate::core::classifier::WordClassifier;
use crate::models::{CandidateProfile, Vote, WordField};
use crate::services::word_store::{WordListStore, WordStoreError};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Reasons a judge cannot evaluate a profile
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("profile has no {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    WordStore(#[from] WordStoreError),
}

/// Votes on one attribute of a candidate profile
///
/// Judges are independent of each other; combining their votes is the job
/// of [`crate::core::ProfileJudge`].
pub trait Judge: Send + Sync {
    fn name(&self) -> &'static str;

    fn vote(&self, profile: &CandidateProfile) -> Result<Vote, JudgeError>;
}

/// Word-list judges that can be listed in the configured priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeKind {
    School,
    Name,
    Bio,
}

impl JudgeKind {
    pub fn build(self, store: Arc<WordListStore>) -> Box<dyn Judge> {
        match self {
            JudgeKind::School => Box::new(SchoolJudge::new(store)),
            JudgeKind::Name => Box::new(NameJudge::new(store)),
            JudgeKind::Bio => Box::new(BioJudge::new(store)),
        }
    }
}

fn logged(info: &str, vote: Vote, reason: &str) -> Vote {
    tracing::debug!("{}. Vote: {}. Reason: {}.", info, vote, reason);
    vote
}

/// Geographic filter: close profiles go to manual review, far ones are rejected
#[derive(Debug, Clone, Copy)]
pub struct DistanceJudge {
    too_close_km: u32,
    too_far_km: u32,
}

impl DistanceJudge {
    pub fn new(too_close_km: u32, too_far_km: u32) -> Self {
        Self {
            too_close_km,
            too_far_km,
        }
    }
}

impl Default for DistanceJudge {
    fn default() -> Self {
        Self::new(20, 200)
    }
}

impl Judge for DistanceJudge {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn vote(&self, profile: &CandidateProfile) -> Result<Vote, JudgeError> {
        let distance = profile
            .distance_km()
            .ok_or(JudgeError::MissingField("distance"))?;
        let info = format!("Distance = {} km", distance);

        Ok(if distance < self.too_close_km {
            logged(&info, Vote::Review, "Close enough to check manually")
        } else if distance > self.too_far_km {
            logged(&info, Vote::Reject, "Too far away")
        } else {
            logged(&info, Vote::Approve, "Within range")
        })
    }
}

/// Judges every listed school by its name
pub struct SchoolJudge {
    classifier: WordClassifier,
}

impl SchoolJudge {
    pub fn new(store: Arc<WordListStore>) -> Self {
        Self {
            classifier: WordClassifier::new(WordField::School, store),
        }
    }

    /// Reduce per-school votes: any approve, then any review, then reject
    pub fn combine(votes: &[Vote]) -> (Vote, &'static str) {
        if votes.contains(&Vote::Approve) {
            (Vote::Approve, "At least one approved")
        } else if votes.contains(&Vote::Review) {
            (Vote::Review, "At least one unknown")
        } else if votes.is_empty() {
            (Vote::NoInfo, "Empty list")
        } else {
            (Vote::Reject, "All rejected")
        }
    }
}

impl Judge for SchoolJudge {
    fn name(&self) -> &'static str {
        "school"
    }

    fn vote(&self, profile: &CandidateProfile) -> Result<Vote, JudgeError> {
        let mut votes = Vec::with_capacity(profile.schools.len());
        for school in &profile.schools {
            let vote = match school.name.as_deref() {
                Some(name) => self.classifier.classify(name)?,
                None => {
                    // Schools are judged by name, so a nameless one is useless
                    tracing::warn!("School has no name: {:?}", school);
                    Vote::Reject
                }
            };
            votes.push(vote);
        }

        let names: Vec<&str> = profile
            .schools
            .iter()
            .filter_map(|s| s.name.as_deref())
            .collect();
        let (vote, reason) = Self::combine(&votes);
        Ok(logged(&format!("Schools = {}", names.join(", ")), vote, reason))
    }
}

/// Judges the display name, e.g. to like profiles the feed teases by name
pub struct NameJudge {
    classifier: WordClassifier,
}

impl NameJudge {
    pub fn new(store: Arc<WordListStore>) -> Self {
        Self {
            classifier: WordClassifier::new(WordField::Name, store),
        }
    }
}

impl Judge for NameJudge {
    fn name(&self) -> &'static str {
        "name"
    }

    fn vote(&self, profile: &CandidateProfile) -> Result<Vote, JudgeError> {
        let name = profile
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or(JudgeError::MissingField("name"))?;

        let vote = self.classifier.classify(name)?;
        Ok(logged(&format!("Name = {}", name), vote, "Judged by name"))
    }
}

pub struct BioJudge {
    classifier: WordClassifier,
}

impl BioJudge {
    pub fn new(store: Arc<WordListStore>) -> Self {
        Self {
            classifier: WordClassifier::new(WordField::Bio, store),
        }
    }
}

impl Judge for BioJudge {
    fn name(&self) -> &'static str {
        "bio"
    }

    fn vote(&self, profile: &CandidateProfile) -> Result<Vote, JudgeError> {
        let Some(bio) = profile.bio_text() else {
            return Ok(logged("Bio = <empty>", Vote::NoInfo, "No bio"));
        };

        let vote = self.classifier.classify(&bio)?;
        Ok(logged(&format!("Bio = {}", bio), vote, "Judged by bio"))
    }
}
