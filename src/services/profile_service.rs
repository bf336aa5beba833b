use crate::models::{ApiRequest, CandidateProfile, LikeResponse, RecommendationsResponse, UserResponse};
use crate::services::session::{ApiError, SessionManager};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::time::Duration;

const DEFAULT_SWIPE_TIMEOUT: Duration = Duration::from_millis(700);

/// Lazily parsed batch of recommended profiles
///
/// Entries are decoded one at a time, so a malformed entry only fails its
/// own profile. An empty batch means the feed has nothing right now.
#[derive(Debug)]
pub struct Recommendations {
    entries: std::vec::IntoIter<Value>,
}

impl Recommendations {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new().into_iter(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }
}

impl Iterator for Recommendations {
    type Item = Result<CandidateProfile, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next().map(parse_profile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for Recommendations {}

/// Typed facade over the profile API
///
/// Every call goes through `SessionManager::send`, so token expiry is
/// handled the same way for all endpoints.
pub struct ProfileService {
    session: SessionManager,
    recs_count: u32,
    swipe_timeout: Duration,
}

impl ProfileService {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session,
            recs_count: 1,
            swipe_timeout: DEFAULT_SWIPE_TIMEOUT,
        }
    }

    pub fn with_recs_count(mut self, recs_count: u32) -> Self {
        self.recs_count = recs_count.max(1);
        self
    }

    pub fn with_swipe_timeout(mut self, swipe_timeout: Duration) -> Self {
        self.swipe_timeout = swipe_timeout;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Fetch the next batch of recommendations
    pub async fn fetch_recommendations(&self) -> Result<Recommendations, ApiError> {
        let request = ApiRequest::get("/user/recs").query("count", self.recs_count);
        let value = self.session.send(&request).await?;

        let response: RecommendationsResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse recommendations: {}", e)))?;

        match response.results {
            Some(entries) => {
                tracing::debug!("Fetched {} recommendation(s)", entries.len());
                Ok(Recommendations {
                    entries: entries.into_iter(),
                })
            }
            None => {
                tracing::info!(
                    "There are no more recommendations{}",
                    response
                        .message
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                );
                Ok(Recommendations::empty())
            }
        }
    }

    pub async fn fetch_user(&self, user_id: &str) -> Result<CandidateProfile, ApiError> {
        let path = format!("/user/{}", urlencoding::encode(user_id));
        let value = self.session.send(&ApiRequest::get(path)).await?;

        let response: UserResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse user {}: {}", user_id, e)))?;
        parse_profile(response.results)
    }

    /// Fetch the logged-in user's own profile, `None` when no user id is stored yet
    pub async fn fetch_own_profile(&self) -> Result<Option<CandidateProfile>, ApiError> {
        let Some(user_id) = self.session.credentials().load()?.user_id.filter(|id| !id.is_empty()) else {
            return Ok(None);
        };
        self.fetch_user(&user_id).await.map(Some)
    }

    /// Swipe right; returns whether it is a match
    pub async fn like(&self, profile: &CandidateProfile) -> Result<bool, ApiError> {
        let path = format!("/like/{}", urlencoding::encode(&profile.id));
        let request = ApiRequest::get(path).timeout(self.swipe_timeout);
        let value = self.session.send(&request).await?;

        let response: LikeResponse = serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse like response: {}", e)))?;

        if response.likes_remaining == Some(0) {
            let until = response
                .rate_limited_until
                .and_then(DateTime::<Utc>::from_timestamp_millis);
            return Err(ApiError::OutOfLikes { until });
        }

        if let Some(remaining) = response.likes_remaining {
            tracing::info!("Liked {}. Likes remaining: {}", profile.id, remaining);
        }
        Ok(response.is_match())
    }

    /// Swipe left
    pub async fn pass(&self, profile: &CandidateProfile) -> Result<(), ApiError> {
        let path = format!("/pass/{}", urlencoding::encode(&profile.id));
        let request = ApiRequest::get(path).timeout(self.swipe_timeout);
        self.session.send(&request).await?;

        tracing::debug!("Passed {}", profile.id);
        Ok(())
    }
}

fn parse_profile(value: Value) -> Result<CandidateProfile, ApiError> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse profile: {}", e)))
}
