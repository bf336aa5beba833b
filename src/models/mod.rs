// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{CandidateProfile, Credentials, Photo, School, SwipeAction, Vote, WordCategory, WordField};
pub use requests::{ApiRequest, LoginRequest, SendCodeRequest, ValidateCodeRequest};
pub use responses::{AuthEnvelope, LikeResponse, LoginResponse, RecommendationsResponse, SendCodeResponse, UserResponse, ValidateCodeResponse};
