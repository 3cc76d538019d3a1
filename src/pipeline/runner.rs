// src/pipeline/runner.rs
use crate::dataset::Dataset;
use crate::error::Result;
use crate::input_format::{load_source, InputSource};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::report::{RunOutput, StageReport};
use crate::pipeline::stages;
use crate::store::{ArtifactStore, ARTIFACT_EXTENSION};
use chrono::{Local, NaiveDateTime};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Fixed artifact names; a rerun overwrites them
pub const ROSTER_STAGE_1: &str = "roster-stage-1";
pub const MONTHLY_STAGE_1: &str = "monthly-stage-1";
pub const ROSTER_STAGE_2: &str = "roster-stage-2";
pub const FLAGGED_FINAL: &str = "flagged-final";

/// Runs the five stages in order against one artifact store.
///
/// Every stage persists its output before the next one starts, and every
/// later stage reads its input back from the store rather than from memory.
/// A failure aborts the run; artifacts already written stay in place.
pub struct PipelineRunner<S: ArtifactStore> {
    store: S,
    config: PipelineConfig,
}

impl<S: ArtifactStore> PipelineRunner<S> {
    pub fn new(store: S, config: PipelineConfig) -> Self {
        PipelineRunner { store, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run against two files, measuring the inactivity window from the current local time
    pub fn run(&mut self, roster: &Path, monthly: &Path) -> Result<RunOutput> {
        self.run_at(roster, monthly, Local::now().naive_local())
    }

    /// Run against two files with an explicit reference time
    pub fn run_at(&mut self, roster: &Path, monthly: &Path, now: NaiveDateTime) -> Result<RunOutput> {
        self.execute(
            || load_source(&InputSource::from_path(roster)?),
            || load_source(&InputSource::from_path(monthly)?),
            now,
        )
    }

    /// Run against in-memory inputs (original filename + bytes)
    pub fn run_sources(
        &mut self,
        roster: &InputSource,
        monthly: &InputSource,
        now: NaiveDateTime,
    ) -> Result<RunOutput> {
        self.execute(|| load_source(roster), || load_source(monthly), now)
    }

    fn execute<R, M>(&mut self, load_roster: R, load_monthly: M, now: NaiveDateTime) -> Result<RunOutput>
    where
        R: FnOnce() -> Result<Dataset>,
        M: FnOnce() -> Result<Dataset>,
    {
        let started = Instant::now();
        info!(
            now = %now,
            inactivity_days = self.config.inactivity_days,
            "starting pipeline run"
        );

        let (roster_report, unparseable_logins) = self
            .inactive_logins(load_roster, now)
            .map_err(|e| e.in_stage(1))?;
        let monthly_report = self
            .qualifying_orders(load_monthly)
            .map_err(|e| e.in_stage(2))?;
        let service_report = self.without_service().map_err(|e| e.in_stage(3))?;
        let unproductive_report = self.unproductive().map_err(|e| e.in_stage(4))?;
        let receipt_report = self.active_receipts().map_err(|e| e.in_stage(5))?;

        let output = RunOutput {
            location: self.store.location(FLAGGED_FINAL),
            filename: format!("{}.{}", FLAGGED_FINAL, ARTIFACT_EXTENSION),
            now,
            stages: vec![
                roster_report,
                monthly_report,
                service_report,
                unproductive_report,
                receipt_report,
            ],
            unparseable_logins,
            elapsed: started.elapsed(),
        };

        info!(
            flagged = output.flagged(),
            location = %output.location,
            elapsed_ms = output.elapsed.as_millis() as u64,
            "pipeline run complete"
        );
        Ok(output)
    }

    fn persist(&mut self, stage: u8, artifact: &'static str, records_in: usize, out: &Dataset) -> Result<StageReport> {
        self.store.put(artifact, out)?;
        let report = StageReport {
            stage,
            artifact,
            records_in,
            records_out: out.len(),
        };
        info!(
            stage,
            artifact,
            records_in,
            records_out = report.records_out,
            "stage complete"
        );
        Ok(report)
    }

    fn inactive_logins<R>(&mut self, load_roster: R, now: NaiveDateTime) -> Result<(StageReport, usize)>
    where
        R: FnOnce() -> Result<Dataset>,
    {
        let roster = load_roster()?;
        let unparseable = stages::unparseable_logins(&roster, &self.config)?;
        let out = stages::flag_inactive_logins(&roster, &self.config, now)?;
        let report = self.persist(1, ROSTER_STAGE_1, roster.len(), &out)?;
        Ok((report, unparseable))
    }

    fn qualifying_orders<M>(&mut self, load_monthly: M) -> Result<StageReport>
    where
        M: FnOnce() -> Result<Dataset>,
    {
        let monthly = load_monthly()?;
        let out = stages::drop_excluded_orders(&monthly, &self.config)?;
        self.persist(2, MONTHLY_STAGE_1, monthly.len(), &out)
    }

    fn without_service(&mut self) -> Result<StageReport> {
        let roster = self.store.get(ROSTER_STAGE_1)?;
        let monthly = self.store.get(MONTHLY_STAGE_1)?;
        let out = stages::mark_providers_without_service(&roster, &monthly, &self.config)?;
        self.persist(3, ROSTER_STAGE_2, roster.len(), &out)
    }

    fn unproductive(&mut self) -> Result<StageReport> {
        let roster = self.store.get(ROSTER_STAGE_2)?;
        let out = stages::select_unproductive(&roster, &self.config)?;
        self.persist(4, FLAGGED_FINAL, roster.len(), &out)
    }

    fn active_receipts(&mut self) -> Result<StageReport> {
        let flagged = self.store.get(FLAGGED_FINAL)?;
        let out = stages::drop_inactive_receipts(&flagged, &self.config)?;
        self.persist(5, FLAGGED_FINAL, flagged.len(), &out)
    }
}
