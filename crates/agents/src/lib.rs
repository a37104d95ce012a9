//! Conversation and recommendation components of the course advisor.
//!
//! Each component pairs a prompt definition with a chat-completion client:
//! - [`IntakeAgent`] interviews the student and produces a refined query
//! - [`WeightsDecider`] picks field weights for weighted retrieval
//! - [`JsonRecommender`], [`TextRecommender`] and [`NarrativeResponder`]
//!   turn retrieved courses into recommendations
//! - [`AdvisorPipeline`] chains retrieval and the recommenders

pub mod conversation;
pub mod intake;
pub mod pipeline;
pub mod recommend;
pub mod session;
pub mod weights;

#[cfg(test)]
pub(crate) mod testing;

pub use conversation::Conversation;
pub use intake::{IntakeAgent, TurnOutcome};
pub use pipeline::{AdvisorPipeline, Recommendation, FALLBACK_MESSAGE};
pub use recommend::{
    parse_recommendations, JsonRecommender, NarrativeResponder, TextRecommender,
    NO_RECOMMENDATIONS_MESSAGE,
};
pub use session::SessionStore;
pub use weights::{parse_weights, WeightsDecider};
