//! Swipe Engine - decision and session engine for an automated swipe bot
//!
//! Candidate profiles come from the remote feed through a session that
//! survives token expiry, get judged by self-training word lists and a
//! distance filter, and receive a like, a pass or no action.

pub mod bot;
pub mod config;
pub mod core;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use bot::{RunSummary, SwipeBot};
pub use crate::core::{Judge, ProfileJudge, Verdict, WordClassifier};
pub use models::{CandidateProfile, Credentials, SwipeAction, Vote};
pub use services::{ApiError, CodeProvider, ProfileService, SessionManager};
