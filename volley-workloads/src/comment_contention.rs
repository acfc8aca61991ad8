//! Many users editing one shared comment
//!
//! Setup seeds a single comment, every iteration PUTs new content onto it and
//! teardown deletes it. Without a seeded id the iterations do nothing.

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use volley_core::{
    BodyState, OutcomeRecorder, RecorderSpec, SuccessPolicy, Threshold, WorkloadProfile,
};
use volley_http::{tagged_metric, RequestSpec, HTTP_REQ_DURATION, HTTP_REQ_FAILED};
use volley_runner::{VuContext, Workload};

use crate::comment_burst::{cache_buster, comment_id_of};
use crate::env::WorkloadEnv;
use crate::error::WorkloadResult;
use crate::profiles::{millis, mins, scenario_pause, secs, stage, table};

pub const NAME: &str = "comment-modify-concurrency";
pub const DESCRIPTION: &str = "Every user edits the same seeded comment at once";

const MODIFY_ENDPOINT: &str = "modify";

pub fn profiles() -> BTreeMap<String, WorkloadProfile> {
    table([
        ("smoke", WorkloadProfile::constant_vus(5, secs(30))),
        (
            "load",
            WorkloadProfile::ramping_vus(
                20,
                vec![stage(mins(2), 200), stage(mins(3), 200), stage(mins(1), 0)],
            ),
        ),
        (
            "stress",
            WorkloadProfile::ramping_vus(
                100,
                vec![stage(mins(2), 400), stage(mins(3), 800), stage(mins(1), 0)],
            ),
        ),
    ])
}

pub fn build(env: WorkloadEnv) -> WorkloadResult<Arc<dyn Workload>> {
    Ok(Arc::new(CommentModifyConcurrency::new(env)?))
}

pub struct CommentModifyConcurrency {
    env: WorkloadEnv,
    project_id: u64,
    /// Id of the comment created by setup
    seed: OnceLock<String>,
    modify: OutcomeRecorder,
}

impl CommentModifyConcurrency {
    pub fn new(env: WorkloadEnv) -> WorkloadResult<Self> {
        Ok(Self {
            project_id: env.run.param_or("PROJECT_ID", 1)?,
            seed: OnceLock::new(),
            modify: OutcomeRecorder::new(
                &env.registry,
                RecorderSpec::new("shared_comment_modify").with_success(SuccessPolicy::ok_only()),
            ),
            env,
        })
    }

    /// Id of the seeded comment, once setup has created it
    pub fn seed_id(&self) -> Option<&str> {
        self.seed.get().map(String::as_str)
    }

    fn comments_path(&self) -> String {
        format!("/api/v1/projects/{}/comments", self.project_id)
    }

    fn comment_path(&self, comment_id: &str) -> String {
        format!("{}/{}", self.comments_path(), comment_id)
    }
}

#[async_trait]
impl Workload for CommentModifyConcurrency {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn profiles(&self) -> BTreeMap<String, WorkloadProfile> {
        profiles()
    }

    fn thresholds(&self, scenario: &str) -> Vec<Threshold> {
        let (failed, duration) = match scenario {
            "smoke" => ("rate<0.01", "p(95)<1000"),
            "load" => ("rate<0.02", "p(95)<1300"),
            "stress" => ("rate<0.05", "p(99)<3000"),
            _ => return Vec::new(),
        };

        vec![
            Threshold::new(tagged_metric(HTTP_REQ_FAILED, MODIFY_ENDPOINT), [failed]),
            Threshold::new(tagged_metric(HTTP_REQ_DURATION, MODIFY_ENDPOINT), [duration]),
        ]
    }

    async fn setup(&self) -> anyhow::Result<()> {
        self.env.session.authenticate().await?;

        let checks = &self.env.checks;
        let created = self
            .env
            .session
            .client()
            .request(
                RequestSpec::post(self.comments_path())
                    .query("nocache", cache_buster())
                    .json(json!({
                        "content": format!("contention seed {}", rand::thread_rng().gen::<u32>()),
                    }))
                    .no_cache()
                    .tag("prepare-upload"),
            )
            .await?;
        checks.check("setup upload 201", created.status == 201);

        let comment_id = comment_id_of(&created.envelope());
        checks.check("setup got commentId", comment_id.is_some());
        match comment_id {
            Some(id) => {
                info!("Seeded comment {} in project {}", id, self.project_id);
                let _ = self.seed.set(id);
            }
            None => debug!("Seed upload returned {} without an id", created.status),
        }
        Ok(())
    }

    async fn iteration(&self, ctx: &VuContext) -> anyhow::Result<()> {
        let Some(comment_id) = self.seed_id() else {
            return Ok(());
        };

        let response = self
            .env
            .session
            .client()
            .request(
                RequestSpec::put(self.comment_path(comment_id))
                    .query("nocache", cache_buster())
                    .json(json!({
                        "content": format!(
                            "contention edit {}-{} {}",
                            ctx.vu_id,
                            ctx.iteration,
                            rand::thread_rng().gen::<u32>()
                        ),
                    }))
                    .no_cache()
                    .tag(MODIFY_ENDPOINT),
            )
            .await?;
        self.modify
            .record(response.duration_ms(), response.status, &BodyState::Empty);
        self.env.checks.check("modify 200", response.status == 200);

        let pause = scenario_pause(&ctx.scenario, &[("smoke", secs(1)), ("load", millis(300))]);
        self.env.pacing.pause(pause).await;
        Ok(())
    }

    async fn teardown(&self) -> anyhow::Result<()> {
        let Some(comment_id) = self.seed_id() else {
            return Ok(());
        };

        let deleted = self
            .env
            .session
            .client()
            .request(
                RequestSpec::delete(self.comment_path(comment_id))
                    .query("nocache", cache_buster())
                    .no_cache()
                    .tag("cleanup-delete"),
            )
            .await?;
        self.env
            .checks
            .check("teardown delete 200", deleted.status == 200);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_cover_smoke_load_and_stress() {
        let profiles = profiles();
        assert_eq!(
            profiles.keys().map(String::as_str).collect::<Vec<_>>(),
            ["load", "smoke", "stress"]
        );
        assert_eq!(profiles["stress"].max_vus(), 800);
    }
}
