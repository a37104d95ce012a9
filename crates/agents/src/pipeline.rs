//! Retrieval followed by JSON and text recommendations.

use crate::recommend::{parse_recommendations, JsonRecommender, NarrativeResponder, TextRecommender};
use crate::weights::WeightsDecider;
use advisor_catalog::{CourseCatalog, CourseRecord, FieldWeights, MetadataFilter};
use advisor_core::config::{AdvisorSettings, RetrievalMode};
use advisor_core::AppResult;
use advisor_llm::LlmClient;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Text returned when the recommenders fail.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't generate course recommendations at this time.";

/// Outcome of a recommendation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub query: String,

    /// Courses the model recommended
    pub courses: Vec<CourseRecord>,

    /// Point-form (or narrative) recommendation for the student
    pub text: String,

    /// Number of courses retrieved before recommending
    pub retrieved: usize,

    pub mode: RetrievalMode,

    /// Weights used in weighted mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights: Option<FieldWeights>,
}

/// Chains retrieval and the recommenders.
pub struct AdvisorPipeline {
    catalog: Arc<CourseCatalog>,
    weights: WeightsDecider,
    json: JsonRecommender,
    text: TextRecommender,
    narrative: NarrativeResponder,
    mode: RetrievalMode,
    top_k: usize,
}

impl AdvisorPipeline {
    pub fn load(
        workspace: &Path,
        catalog: Arc<CourseCatalog>,
        client: Arc<dyn LlmClient>,
        model: &str,
        settings: &AdvisorSettings,
    ) -> AppResult<Self> {
        Ok(Self {
            catalog,
            weights: WeightsDecider::load(workspace, client.clone(), model)?,
            json: JsonRecommender::load(workspace, client.clone(), model, settings)?,
            text: TextRecommender::load(workspace, client.clone(), model, settings)?,
            narrative: NarrativeResponder::load(workspace, client, model, settings)?,
            mode: settings.retrieval_mode,
            top_k: settings.top_k,
        })
    }

    pub fn with_mode(mut self, mode: RetrievalMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> RetrievalMode {
        self.mode
    }

    pub fn catalog(&self) -> &Arc<CourseCatalog> {
        &self.catalog
    }

    /// Retrieve courses for a query in the configured mode.
    pub async fn retrieve(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> AppResult<(Vec<CourseRecord>, Option<FieldWeights>)> {
        let top_k = top_k.unwrap_or(self.top_k);

        let weights = match self.mode {
            RetrievalMode::Weighted => Some(self.weights.decide(query).await),
            RetrievalMode::Document => None,
        };

        let scored = self
            .catalog
            .search(
                query,
                self.mode,
                &weights.unwrap_or_default(),
                filter,
                top_k,
            )
            .await?;

        Ok((scored.into_iter().map(|s| s.record).collect(), weights))
    }

    /// Recommend courses for a refined query.
    ///
    /// Recommender failures degrade to [`FALLBACK_MESSAGE`] with no courses;
    /// only retrieval errors are returned.
    pub async fn recommend(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> AppResult<Recommendation> {
        let (retrieved, weights) = self.retrieve(query, filter, top_k).await?;
        tracing::info!("Recommending from {} retrieved courses", retrieved.len());

        let (courses, text) = match self.recommend_from(query, &retrieved).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!("Recommendation failed: {}", e);
                (Vec::new(), FALLBACK_MESSAGE.to_string())
            }
        };

        Ok(Recommendation {
            query: query.to_string(),
            courses,
            text,
            retrieved: retrieved.len(),
            mode: self.mode,
            weights,
        })
    }

    async fn recommend_from(
        &self,
        query: &str,
        retrieved: &[CourseRecord],
    ) -> AppResult<(Vec<CourseRecord>, String)> {
        let course_json = self.json.recommend(query, retrieved).await?;
        let courses = parse_recommendations(&course_json);
        let text = self.text.recommend(&course_json).await?;
        Ok((courses, text))
    }

    /// Single prose answer over the retrieved courses.
    pub async fn narrate(
        &self,
        query: &str,
        filter: Option<&MetadataFilter>,
        top_k: Option<usize>,
    ) -> AppResult<Recommendation> {
        let (retrieved, weights) = self.retrieve(query, filter, top_k).await?;

        let text = match self.narrative.respond(query, &retrieved).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Narrative recommendation failed: {}", e);
                FALLBACK_MESSAGE.to_string()
            }
        };

        Ok(Recommendation {
            query: query.to_string(),
            retrieved: retrieved.len(),
            courses: retrieved,
            text,
            mode: self.mode,
            weights,
        })
    }
}
