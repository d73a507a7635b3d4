mod guard;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use voyage_core::{
    build_plan_prompt, parse_trip_plan, GeoResult, MalformedResponse, SessionState, TripParameters,
    TripPlan, VoyageConfig,
};
use voyage_geo::GeoResolver;
use voyage_model::{ModelError, PlanModel};
use voyage_observability::AppMetrics;
use voyage_storage::{SessionStore, StoreError};

use guard::{InFlight, RunGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Idle,
    Resolving,
    ResolveFailed,
    Resolved,
    Planning,
    PlanFailed,
    Planned,
    Done,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no location found for \"{destination}\"")]
    GeoNotFound { destination: String },
    #[error("generative model call failed: {0}")]
    ModelFailure(#[from] ModelError),
    #[error("model reply could not be used: {0}")]
    MalformedResponse(#[from] MalformedResponse),
    #[error("a planning run is already in progress for session {0}")]
    Busy(String),
    #[error("unknown session: {0}")]
    UnknownSession(String),
    #[error("session {session_id} was removed before its plan could be saved")]
    SessionRemoved {
        session_id: String,
        stage: PipelineStage,
    },
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::GeoNotFound { .. } => "geo_not_found",
            Self::ModelFailure(_) => "model_failure",
            Self::MalformedResponse(_) => "malformed_response",
            Self::Busy(_) => "run_in_progress",
            Self::UnknownSession(_) => "unknown_session",
            Self::SessionRemoved { .. } => "session_removed",
        }
    }

    /// Stage the run stopped in.
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::GeoNotFound { .. } => PipelineStage::ResolveFailed,
            Self::ModelFailure(_) | Self::MalformedResponse(_) => PipelineStage::PlanFailed,
            Self::Busy(_) | Self::UnknownSession(_) => PipelineStage::Idle,
            Self::SessionRemoved { stage, .. } => *stage,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub poi_limit: usize,
    pub model_timeout: Duration,
}

impl PipelineSettings {
    pub fn from_config(config: &VoyageConfig) -> Self {
        Self {
            poi_limit: config.poi_limit,
            model_timeout: config.model_timeout,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&VoyageConfig::default())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub session_id: String,
    pub stages: Vec<PipelineStage>,
    pub state: SessionState,
    pub model: String,
    pub elapsed_millis: u64,
}

struct StageTrail {
    stages: Vec<PipelineStage>,
}

impl StageTrail {
    fn new() -> Self {
        Self {
            stages: vec![PipelineStage::Idle],
        }
    }

    fn advance(&mut self, stage: PipelineStage) {
        debug!(from = ?self.current(), to = ?stage, "pipeline stage");
        self.stages.push(stage);
    }

    fn current(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Idle)
    }
}

/// Geocode, prompt, model call, parse, then one atomic session write.
///
/// Any failure leaves the session exactly as it was before the run. At most
/// one run per session is in flight; a second submission gets
/// [`PipelineError::Busy`].
#[derive(Clone)]
pub struct TripPipeline {
    resolver: Arc<dyn GeoResolver>,
    model: Arc<dyn PlanModel>,
    store: Arc<dyn SessionStore>,
    metrics: Arc<AppMetrics>,
    settings: PipelineSettings,
    in_flight: InFlight,
}

impl TripPipeline {
    pub fn new(
        resolver: Arc<dyn GeoResolver>,
        model: Arc<dyn PlanModel>,
        store: Arc<dyn SessionStore>,
        metrics: Arc<AppMetrics>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            resolver,
            model,
            store,
            metrics,
            settings,
            in_flight: InFlight::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn is_running(&self, session_id: &str) -> bool {
        self.in_flight.lock().contains(session_id)
    }

    /// Ends a session unless a run is in flight for it.
    pub fn remove_session(&self, session_id: &str) -> Result<(), PipelineError> {
        let Some(_guard) = RunGuard::acquire(&self.in_flight, session_id) else {
            return Err(PipelineError::Busy(session_id.to_string()));
        };
        if self.store.remove(session_id) {
            Ok(())
        } else {
            Err(PipelineError::UnknownSession(session_id.to_string()))
        }
    }

    #[instrument(skip(self, params), fields(destination = %params.destination(), days = params.days()))]
    pub async fn run(
        &self,
        session_id: &str,
        params: TripParameters,
    ) -> Result<RunReport, PipelineError> {
        if !self.store.contains(session_id) {
            return Err(PipelineError::UnknownSession(session_id.to_string()));
        }

        let Some(_guard) = RunGuard::acquire(&self.in_flight, session_id) else {
            self.metrics.inc_busy_rejection();
            warn!(session_id, "rejected overlapping run");
            return Err(PipelineError::Busy(session_id.to_string()));
        };
        // Removal also takes the guard, so from here on the session stays.
        if !self.store.contains(session_id) {
            return Err(PipelineError::UnknownSession(session_id.to_string()));
        }

        let started = Instant::now();
        self.metrics.inc_run();

        let mut trail = StageTrail::new();
        let outcome = self.execute(session_id, &params, &mut trail).await;

        let elapsed = started.elapsed();
        self.metrics.observe_latency(elapsed);

        match outcome {
            Ok(state) => {
                self.metrics.inc_success();
                info!(
                    session_id,
                    days = state.plan.as_ref().map(TripPlan::day_count).unwrap_or_default(),
                    places = state.geo.as_ref().map(|geo| geo.places.len()).unwrap_or_default(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "trip planned"
                );
                Ok(RunReport {
                    session_id: session_id.to_string(),
                    stages: trail.stages,
                    state,
                    model: self.model.model_name().to_string(),
                    elapsed_millis: elapsed.as_millis() as u64,
                })
            }
            Err(error) => {
                match &error {
                    PipelineError::GeoNotFound { .. } => self.metrics.inc_geo_not_found(),
                    PipelineError::ModelFailure(_) => self.metrics.inc_model_failure(),
                    PipelineError::MalformedResponse(_) => self.metrics.inc_malformed_response(),
                    PipelineError::Busy(_)
                    | PipelineError::UnknownSession(_)
                    | PipelineError::SessionRemoved { .. } => {}
                }
                warn!(
                    session_id,
                    stage = ?trail.current(),
                    code = error.code(),
                    %error,
                    "trip planning failed"
                );
                Err(error)
            }
        }
    }

    async fn execute(
        &self,
        session_id: &str,
        params: &TripParameters,
        trail: &mut StageTrail,
    ) -> Result<SessionState, PipelineError> {
        trail.advance(PipelineStage::Resolving);
        let Some(geo) = self
            .resolver
            .resolve(params.destination(), self.settings.poi_limit)
            .await
        else {
            trail.advance(PipelineStage::ResolveFailed);
            return Err(PipelineError::GeoNotFound {
                destination: params.destination().to_string(),
            });
        };
        trail.advance(PipelineStage::Resolved);

        trail.advance(PipelineStage::Planning);
        let plan = match self.plan(params, &geo).await {
            Ok(plan) => plan,
            Err(error) => {
                trail.advance(PipelineStage::PlanFailed);
                return Err(error);
            }
        };
        trail.advance(PipelineStage::Planned);

        let state = self
            .store
            .replace(session_id, params.destination(), plan, geo)
            .map_err(|StoreError::UnknownSession(session_id)| PipelineError::SessionRemoved {
                session_id,
                stage: trail.current(),
            })?;
        trail.advance(PipelineStage::Done);

        Ok(state)
    }

    async fn plan(&self, params: &TripParameters, geo: &GeoResult) -> Result<TripPlan, PipelineError> {
        let prompt = build_plan_prompt(params, &geo.places);

        let raw = timeout(self.settings.model_timeout, self.model.generate(&prompt))
            .await
            .map_err(|_| ModelError::Timeout(self.settings.model_timeout))??;

        Ok(parse_trip_plan(&raw)?)
    }
}
