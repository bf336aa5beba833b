use crate::core::ProfileJudge;
use crate::models::{CandidateProfile, SwipeAction};
use crate::services::{ApiError, ProfileService};

/// Counters of one bot run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub batches: u32,
    /// Every like sent, matches included
    pub liked: u32,
    pub matched: u32,
    pub noped: u32,
    pub skipped: u32,
    pub failed: u32,
    pub out_of_likes: bool,
}

/// Sequential fetch, judge and swipe loop
///
/// Profiles are handled one at a time. Transient errors, on a batch fetch
/// or on a single profile, are logged and counted; running out of likes ends
/// the run normally and a fatal session error ends it with that error.
pub struct SwipeBot {
    service: ProfileService,
    judge: ProfileJudge,
    max_batches: u32,
}

impl SwipeBot {
    pub fn new(service: ProfileService, judge: ProfileJudge) -> Self {
        Self {
            service,
            judge,
            max_batches: 30,
        }
    }

    pub fn with_max_batches(mut self, max_batches: u32) -> Self {
        self.max_batches = max_batches;
        self
    }

    pub async fn run(&self) -> Result<RunSummary, ApiError> {
        tracing::info!("Swipe bot is running");
        let mut summary = RunSummary::default();

        match self.service.fetch_own_profile().await {
            Ok(Some(own)) => tracing::info!("Logged in as {}", own),
            Ok(None) => tracing::debug!("No user id stored yet, skipping own profile check"),
            Err(e) if e.is_fatal() => {
                tracing::error!("Stopping run: {}", e);
                return Err(e);
            }
            Err(e) => tracing::warn!("Failed to fetch own profile: {}", e),
        }

        'batches: for _ in 0..self.max_batches {
            let recommendations = match self.service.fetch_recommendations().await {
                Ok(recs) => recs,
                Err(e) if e.is_fatal() => {
                    tracing::error!("Stopping run: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch recommendations: {}", e);
                    summary.failed += 1;
                    continue;
                }
            };

            if recommendations.is_empty() {
                break;
            }
            summary.batches += 1;

            for entry in recommendations {
                let profile = match entry {
                    Ok(profile) => profile,
                    Err(e) => {
                        tracing::warn!("Skipping malformed profile: {}", e);
                        summary.failed += 1;
                        continue;
                    }
                };

                match self.process(&profile, &mut summary).await {
                    Ok(()) => {}
                    Err(e @ ApiError::OutOfLikes { .. }) => {
                        tracing::warn!("{}", e);
                        summary.out_of_likes = true;
                        break 'batches;
                    }
                    Err(e) if e.is_fatal() => {
                        tracing::error!("Stopping run: {}", e);
                        return Err(e);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to process profile {}: {}", profile.id, e);
                        summary.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Swipe bot is finished: {} liked ({} matches), {} noped, {} skipped, {} failed",
            summary.liked,
            summary.matched,
            summary.noped,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    async fn process(&self, profile: &CandidateProfile, summary: &mut RunSummary) -> Result<(), ApiError> {
        match self.judge.like_or_nope(profile) {
            SwipeAction::Like => {
                let matched = self.service.like(profile).await?;
                summary.liked += 1;
                if matched {
                    summary.matched += 1;
                    tracing::info!("Match with {}", profile);
                }
            }
            SwipeAction::Nope => {
                self.service.pass(profile).await?;
                summary.noped += 1;
            }
            SwipeAction::NoAction => {
                summary.skipped += 1;
            }
        }
        Ok(())
    }
}
