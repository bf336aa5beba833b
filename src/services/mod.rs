// Service exports
pub mod credentials;
pub mod persist;
pub mod profile_service;
pub mod session;
pub mod word_store;

pub use credentials::{CredentialError, CredentialStore};
pub use profile_service::{ProfileService, Recommendations};
pub use session::{ApiError, CodeProvider, ConsoleCodeProvider, SessionManager, SessionState};
pub use word_store::{WordListStore, WordSet, WordStoreError};
