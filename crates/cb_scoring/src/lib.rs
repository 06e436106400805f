pub mod keyword;
pub mod models;
pub mod newsletter;
pub mod scorer;

pub use models::create_model;
pub use newsletter::NewsletterComposer;
pub use scorer::{RelevanceScorer, ScoreOutcome};

pub mod prelude {
    pub use super::{create_model, NewsletterComposer, RelevanceScorer, ScoreOutcome};
    pub use cb_core::{Article, Error, RelevanceAssessment, Result, ScoringModel};
}
