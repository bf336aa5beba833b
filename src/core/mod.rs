// Core decision engine exports
pub mod classifier;
pub mod judges;
pub mod profile_judge;

pub use classifier::{normalize, tokenize, WordClassifier};
pub use judges::{BioJudge, DistanceJudge, Judge, JudgeError, JudgeKind, NameJudge, SchoolJudge};
pub use profile_judge::{ProfileJudge, Verdict};
