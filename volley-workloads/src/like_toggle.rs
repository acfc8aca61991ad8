//! Like toggles concentrated on a handful of hot targets
//!
//! Every iteration toggles the like of one of the first `HOT_TARGET_COUNT`
//! targets, so concurrent users keep colliding on the same rows. Lock and
//! persistence timings are heuristic shares of the observed latency.

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use volley_core::{
    BodyState, Counter, OutcomeRecorder, PhaseBreakdown, PhaseFraction, RecorderSpec,
    SuccessPolicy, Threshold, WorkloadProfile,
};
use volley_http::RequestSpec;
use volley_runner::{VuContext, Workload};

use crate::env::WorkloadEnv;
use crate::error::WorkloadResult;
use crate::profiles::{hours, millis, mins, secs, stage, table};

pub const NAME: &str = "like-toggle-hotspot";
pub const DESCRIPTION: &str = "Toggles likes on a few hot projects to provoke lock contention";

const OPERATION: &str = "like_toggle";
const LIKES_PATH: &str = "/api/v1/likes";

pub fn profiles() -> BTreeMap<String, WorkloadProfile> {
    table([
        ("smoke", WorkloadProfile::constant_vus(5, secs(30))),
        (
            "load",
            WorkloadProfile::ramping_vus(
                10,
                vec![stage(mins(2), 50), stage(mins(4), 100), stage(mins(2), 0)],
            ),
        ),
        (
            "stress",
            WorkloadProfile::ramping_vus(
                20,
                vec![
                    stage(mins(2), 100),
                    stage(mins(3), 200),
                    stage(mins(3), 300),
                    stage(mins(2), 0),
                ],
            ),
        ),
        ("soak", WorkloadProfile::constant_vus(100, hours(1))),
        (
            "spike",
            WorkloadProfile::ramping_vus(
                20,
                vec![stage(secs(15), 400), stage(mins(2), 800), stage(secs(15), 0)],
            ),
        ),
        (
            "capacity",
            WorkloadProfile::ramping_arrival_rate(
                50,
                100,
                1000,
                vec![stage(mins(2), 100), stage(mins(2), 200), stage(mins(2), 0)],
            ),
        ),
    ])
}

pub fn build(env: WorkloadEnv) -> WorkloadResult<Arc<dyn Workload>> {
    Ok(Arc::new(LikeToggleHotspot::new(env)?))
}

pub struct LikeToggleHotspot {
    env: WorkloadEnv,
    recorder: OutcomeRecorder,
    adds: Counter,
    removes: Counter,
    conflicts: Counter,
    hot_targets: u32,
    target_type: String,
}

impl LikeToggleHotspot {
    pub fn new(env: WorkloadEnv) -> WorkloadResult<Self> {
        let breakdown = PhaseBreakdown::new(vec![
            PhaseFraction::new("distributed_lock", 0.2),
            PhaseFraction::new("database_sync", 0.3),
        ])?;
        let recorder = OutcomeRecorder::new(
            &env.registry,
            RecorderSpec::new(OPERATION)
                .with_success(SuccessPolicy::ok_only())
                .with_breakdown(breakdown)
                .with_cache_hit(100.0),
        );

        Ok(Self {
            adds: env.registry.counter("like_adds"),
            removes: env.registry.counter("like_removes"),
            conflicts: env.registry.counter("like_hotspot_conflicts"),
            hot_targets: env.run.param_or("HOT_TARGET_COUNT", 10u32)?.max(1),
            target_type: env.run.param_or("TARGET_TYPE", "PROJECT".to_string())?,
            recorder,
            env,
        })
    }

    fn pick_target(&self) -> u32 {
        rand::thread_rng().gen_range(1..=self.hot_targets)
    }
}

#[async_trait]
impl Workload for LikeToggleHotspot {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        DESCRIPTION
    }

    fn profiles(&self) -> BTreeMap<String, WorkloadProfile> {
        profiles()
    }

    fn thresholds(&self, _scenario: &str) -> Vec<Threshold> {
        vec![
            Threshold::new("http_req_failed", ["rate<0.05"]),
            Threshold::new("http_req_duration", ["p(95)<500"]),
            Threshold::new("like_toggle_success_rate", ["rate>0.95"]),
            Threshold::new("like_toggle_response_time", ["p(95)<500"]),
            Threshold::new("like_toggle_distributed_lock_time", ["p(95)<100"]),
            Threshold::new("like_toggle_cache_hit_rate", ["rate>0.8"]),
            Threshold::new("like_toggle_database_sync_time", ["p(95)<200"]),
        ]
    }

    async fn setup(&self) -> anyhow::Result<()> {
        self.env.session.authenticate().await?;
        Ok(())
    }

    async fn iteration(&self, ctx: &VuContext) -> anyhow::Result<()> {
        let target_id = self.pick_target();
        let response = self
            .env
            .session
            .client()
            .request(
                RequestSpec::post(LIKES_PATH)
                    .json(json!({
                        "targetType": self.target_type,
                        "targetId": target_id,
                        "action": "TOGGLE",
                    }))
                    .tag("toggle"),
            )
            .await?;

        let body = response.envelope();
        let call = self
            .recorder
            .record(response.duration_ms(), response.status, &body);
        let checks = &self.env.checks;

        if response.status == 200 {
            match &body {
                BodyState::Data(data) => {
                    let is_liked = data.get("isLiked").and_then(|v| v.as_bool());
                    if is_liked == Some(true) {
                        self.adds.increment();
                    } else {
                        self.removes.increment();
                    }

                    let lock_ms = call.derived_ms("distributed_lock").unwrap_or_default();
                    let sync_ms = call.derived_ms("database_sync").unwrap_or_default();
                    checks.check_all([
                        ("toggle successful", true),
                        ("response time < 500ms", response.duration_ms() < 500.0),
                        ("has like status", is_liked.is_some()),
                        ("distributed lock time < 100ms", lock_ms < 100.0),
                        ("database sync time < 200ms", sync_ms < 200.0),
                    ]);
                }
                _ => {
                    checks.check("valid JSON response", false);
                }
            }
        } else {
            if response.status == 409 {
                self.conflicts.increment();
            }
            debug!(
                "VU {} toggle on {} #{} -> {} ({})",
                ctx.vu_id, self.target_type, target_id, response.status, call.outcome.kind
            );
            checks.check_all([
                ("error handled gracefully", response.status >= 400),
                ("error response", !response.body.is_empty()),
            ]);
        }

        self.env
            .pacing
            .think(millis(500), millis(1500))
            .await;
        Ok(())
    }
}
