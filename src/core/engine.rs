use crate::domain::model::{DeployReport, ImageRef, Stage, StageReport};
use crate::domain::ports::Pipeline;
use crate::utils::error::{DeployError, Result};
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

/// Drives the pipeline stages strictly in sequence. The first failure
/// aborts the run; there is no retry beyond the verify probe window.
pub struct DeployEngine<P: Pipeline> {
    pipeline: P,
    pipeline_name: String,
    rollback_on_failure: bool,
    skip_build: bool,
    skip_transfer: bool,
    monitor: SystemMonitor,
}

impl<P: Pipeline> DeployEngine<P> {
    pub fn new(pipeline: P, pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline,
            pipeline_name: pipeline_name.into(),
            rollback_on_failure: false,
            skip_build: false,
            skip_transfer: false,
            monitor: SystemMonitor::new(false),
        }
    }

    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn with_rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    pub fn with_skips(mut self, skip_build: bool, skip_transfer: bool) -> Self {
        self.skip_build = skip_build;
        self.skip_transfer = skip_transfer;
        self
    }

    /// Run the full deploy. On post-activation or verify failure with
    /// rollback enabled and a previous release known, the previous
    /// release is re-activated; the original error is still returned so
    /// the process exits non-zero.
    pub async fn run(&self) -> Result<DeployReport> {
        let started_at = chrono::Utc::now();
        let mut stages: Vec<StageReport> = Vec::new();

        tracing::info!("Starting deployment pipeline '{}'", self.pipeline_name);

        let image = self
            .timed(&mut stages, Stage::Build, self.build_stage())
            .await?;

        if self.skip_transfer {
            tracing::info!("Skipping transfer (--skip-transfer)");
        } else {
            self.timed(&mut stages, Stage::Transfer, async {
                self.pipeline.transfer(&image).await.map(|_| {
                    (String::from("image on target"), ())
                })
            })
            .await?;
        }

        self.timed(&mut stages, Stage::Activate, async {
            let states = self.pipeline.activate(&image).await?;
            let detail = format!("{} services running", states.len());
            Ok((detail, ()))
        })
        .await?;

        // From here on the new release is live; a failure leaves the
        // stack broken, which is what rollback compensates.
        let late_result = self.post_activate_and_verify(&mut stages).await;

        if let Err(original) = late_result {
            self.maybe_rollback(&mut stages).await;
            return Err(original);
        }

        let report = DeployReport {
            pipeline: self.pipeline_name.clone(),
            image,
            started_at,
            stages,
        };

        tracing::info!(
            "Deployment of {} completed in {:?}",
            report.image,
            report.total_duration()
        );
        self.monitor.log_final_stats();
        Ok(report)
    }

    /// Re-activate a known release tag without running the pipeline.
    pub async fn run_rollback(&self, previous: &ImageRef) -> Result<()> {
        tracing::info!("Manual rollback to {}", previous);
        self.pipeline.rollback(previous).await
    }

    async fn build_stage(&self) -> Result<(String, ImageRef)> {
        let image = if self.skip_build {
            // The image reference is still resolved; only the docker
            // build itself is assumed done.
            let image = self.pipeline.release_image();
            tracing::info!("Skipping build (--skip-build), deploying {}", image);
            image
        } else {
            self.pipeline.build().await?
        };
        Ok((image.to_string(), image))
    }

    async fn post_activate_and_verify(&self, stages: &mut Vec<StageReport>) -> Result<()> {
        self.timed(stages, Stage::PostActivate, async {
            self.pipeline.post_activate().await?;
            Ok((String::from("hooks completed"), ()))
        })
        .await?;

        self.timed(stages, Stage::Verify, async {
            let report = self.pipeline.verify().await?;
            Ok((format!("health status '{}'", report.status), ()))
        })
        .await?;

        Ok(())
    }

    async fn maybe_rollback(&self, stages: &mut Vec<StageReport>) {
        if !self.rollback_on_failure {
            tracing::error!("Deployment failed; rollback is not enabled");
            return;
        }
        let Some(previous) = self.pipeline.previous_release() else {
            tracing::error!("Deployment failed and no previous release is known to roll back to");
            return;
        };

        let result = self
            .timed(stages, Stage::Rollback, async {
                self.pipeline.rollback(&previous).await?;
                Ok((previous.to_string(), ()))
            })
            .await;

        match result {
            Ok(()) => tracing::warn!("Rolled back to {}", previous),
            Err(e) => tracing::error!("Rollback failed as well: {}", e),
        }
    }

    /// Run one stage, recording its duration and logging its outcome.
    async fn timed<T>(
        &self,
        stages: &mut Vec<StageReport>,
        stage: Stage,
        fut: impl std::future::Future<Output = Result<(String, T)>>,
    ) -> Result<T> {
        tracing::info!("▶ {}", stage);
        let start = Instant::now();

        match fut.await {
            Ok((detail, value)) => {
                let duration = start.elapsed();
                tracing::info!("✅ {} done in {:?} ({})", stage, duration, detail);
                self.monitor.log_stats(&stage.to_string());
                stages.push(StageReport {
                    stage,
                    duration,
                    detail,
                });
                Ok(value)
            }
            Err(e) => {
                tracing::error!("❌ {} failed after {:?}: {}", stage, start.elapsed(), e);
                Err(e)
            }
        }
    }
}
