use advisor_agents::{AdvisorPipeline, IntakeAgent, SessionStore};

/// Shared state of the HTTP handlers.
pub struct AppState {
    pub sessions: SessionStore,
    pub intake: IntakeAgent,

    /// Absent when no course catalog has been ingested
    pub pipeline: Option<AdvisorPipeline>,

    /// Allowed CORS origins; empty means local development origins
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(
        intake: IntakeAgent,
        pipeline: Option<AdvisorPipeline>,
        cors_origins: Vec<String>,
    ) -> Self {
        Self {
            sessions: SessionStore::new(),
            intake,
            pipeline,
            cors_origins,
        }
    }
}
