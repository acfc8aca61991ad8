//! Bursts of edits on a freshly created comment
//!
//! Each iteration uploads a comment, modifies it `MODIFY_TIMES` times in
//! quick succession (retrying lock conflicts and transient failures) and
//! deletes it again.

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use volley_core::{
    BodyState, OutcomeRecorder, RecorderSpec, SuccessPolicy, Threshold, WorkloadProfile,
};
use volley_http::{
    tagged_metric, HttpError, HttpResponse, RequestSpec, HTTP_REQ_DURATION, HTTP_REQ_FAILED,
};
use volley_resilience::{with_retry, Retryable};
use volley_runner::{VuContext, Workload};

use crate::env::WorkloadEnv;
use crate::error::WorkloadResult;
use crate::pacing::jitter_half;
use crate::profiles::{hours, millis, mins, scenario_pause, secs, stage, table};

pub const NAME: &str = "comment-modify-burst";
pub const DESCRIPTION: &str = "Creates a comment, edits it several times in a row, then deletes it";

const MODIFY_ENDPOINT: &str = "modify";

/// Share of the requested payload size filled with padding
const PADDING_SHARE: f64 = 0.9;

pub fn profiles() -> BTreeMap<String, WorkloadProfile> {
    table([
        ("smoke", WorkloadProfile::constant_vus(5, secs(30))),
        (
            "load",
            WorkloadProfile::ramping_vus(
                10,
                vec![stage(mins(2), 120), stage(mins(6), 120), stage(mins(2), 0)],
            ),
        ),
        (
            "stress",
            WorkloadProfile::ramping_vus(
                100,
                vec![
                    stage(mins(3), 300),
                    stage(mins(4), 600),
                    stage(mins(4), 1200),
                    stage(mins(3), 0),
                ],
            ),
        ),
        ("soak", WorkloadProfile::constant_vus(200, hours(1))),
        (
            "spike",
            WorkloadProfile::ramping_vus(
                40,
                vec![stage(secs(15), 1500), stage(mins(2), 1500), stage(mins(1), 0)],
            ),
        ),
        (
            "capacity",
            WorkloadProfile::ramping_arrival_rate(
                80,
                300,
                3000,
                vec![stage(mins(2), 400), stage(mins(2), 800), stage(mins(2), 0)],
            ),
        ),
    ])
}

pub fn build(env: WorkloadEnv) -> WorkloadResult<Arc<dyn Workload>> {
    Ok(Arc::new(CommentModifyBurst::new(env)?))
}

/// Tuning knobs read from the run parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BurstSettings {
    pub project_id: u64,
    pub modify_times: u32,
    pub payload_size: usize,
    pub max_content_len: usize,
    pub modify_interval: Duration,
    pub post_wait: Duration,
    pub strict_200: bool,
    pub retries: u32,
    pub retry_base: Duration,
}

impl BurstSettings {
    pub fn from_env(env: &WorkloadEnv) -> WorkloadResult<Self> {
        let run = &env.run;
        Ok(Self {
            project_id: run.param_or("PROJECT_ID", 1)?,
            modify_times: run.param_or("MODIFY_TIMES", 3)?,
            payload_size: run.param_or("PAYLOAD_SIZE", 64)?,
            max_content_len: run.param_or("MAX_CONTENT_LEN", 220)?,
            modify_interval: env.param_ms("MODIFY_INTERVAL_MS", 100)?,
            post_wait: env.param_ms("POST_WAIT_MS", 120)?,
            strict_200: run.flag("STRICT_200")?,
            retries: run.param_or("RETRIES", 2)?,
            retry_base: env.param_ms("RETRY_BASE_MS", 40)?,
        })
    }

    fn comments_path(&self) -> String {
        format!("/api/v1/projects/{}/comments", self.project_id)
    }

    fn comment_path(&self, comment_id: &str) -> String {
        format!("{}/{}", self.comments_path(), comment_id)
    }

    fn modify_check_name(&self, round: u32) -> String {
        format!(
            "modify {}/{} {}",
            round,
            self.modify_times,
            if self.strict_200 { "200" } else { "2xx" }
        )
    }
}

pub struct CommentModifyBurst {
    env: WorkloadEnv,
    settings: BurstSettings,
    upload: OutcomeRecorder,
    modify: OutcomeRecorder,
    delete: OutcomeRecorder,
}

impl CommentModifyBurst {
    pub fn new(env: WorkloadEnv) -> WorkloadResult<Self> {
        let settings = BurstSettings::from_env(&env)?;
        let modify_policy = if settings.strict_200 {
            SuccessPolicy::ok_only()
        } else {
            SuccessPolicy::any_2xx()
        };

        Ok(Self {
            upload: OutcomeRecorder::new(
                &env.registry,
                RecorderSpec::new("comment_upload").with_success(SuccessPolicy::created()),
            ),
            modify: OutcomeRecorder::new(
                &env.registry,
                RecorderSpec::new("comment_modify").with_success(modify_policy),
            ),
            delete: OutcomeRecorder::new(
                &env.registry,
                RecorderSpec::new("comment_delete").with_success(SuccessPolicy::ok_only()),
            ),
            settings,
            env,
        })
    }

    pub fn settings(&self) -> &BurstSettings {
        &self.settings
    }

    fn content(&self, prefix: &str, want: usize) -> String {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let salt: u32 = rand::thread_rng().gen();
        build_content(prefix, now_ms, salt, want, self.settings.max_content_len)
    }

    async fn modify_once(&self, comment_id: &str, round: u32) -> Result<HttpResponse, HttpError> {
        let client = self.env.session.client();
        let spec = RequestSpec::put(self.settings.comment_path(comment_id))
            .query("nocache", cache_buster())
            .json(json!({
                "content": self.content(
                    &format!("burst modify #{}", round),
                    self.settings.payload_size,
                ),
            }))
            .no_cache()
            .tag(MODIFY_ENDPOINT);

        with_retry(
            |attempt| {
                let spec = spec.clone();
                async move {
                    let response = client.request(spec).await;
                    if let Ok(response) = &response {
                        if attempt > 1 || response.is_retryable() {
                            debug!(
                                "Modify #{} attempt {} -> {}",
                                round, attempt, response.status
                            );
                        }
                    }
                    response
                }
            },
            |response: &Result<HttpResponse, HttpError>| {
                matches!(response, Ok(r) if r.is_retryable())
            },
            self.settings.retries + 1,
            self.settings.retry_base,
        )
        .await
    }
}

#[async_trait]
impl Workload for CommentModifyBurst {
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
            "smoke" => ("rate<0.01", "p(95)<900"),
            "load" => ("rate<0.02", "p(95)<1100"),
            "stress" => ("rate<0.05", "p(99)<2200"),
            "soak" => ("rate<0.02", "avg<1400"),
            "spike" => ("rate<0.05", "p(99)<3000"),
            "capacity" => ("rate<0.05", "p(95)<3200"),
            _ => return Vec::new(),
        };

        vec![
            Threshold::new(tagged_metric(HTTP_REQ_FAILED, MODIFY_ENDPOINT), [failed]),
            Threshold::new(tagged_metric(HTTP_REQ_DURATION, MODIFY_ENDPOINT), [duration]),
        ]
    }

    async fn setup(&self) -> anyhow::Result<()> {
        self.env.session.authenticate().await?;
        Ok(())
    }

    async fn iteration(&self, ctx: &VuContext) -> anyhow::Result<()> {
        let settings = &self.settings;
        let client = self.env.session.client();
        let checks = &self.env.checks;

        let created = client
            .request(
                RequestSpec::post(settings.comments_path())
                    .query("nocache", cache_buster())
                    .json(json!({ "content": self.content("burst target", 32) }))
                    .no_cache()
                    .tag("prepare-upload"),
            )
            .await?;
        let body = created.envelope();
        self.upload
            .record(created.duration_ms(), created.status, &body);

        if !checks.check("upload 201", created.status == 201) {
            debug!("VU {} upload failed with {}", ctx.vu_id, created.status);
            return Ok(());
        }

        let comment_id = comment_id_of(&body);
        checks.check("got commentId", comment_id.is_some());
        let Some(comment_id) = comment_id else {
            return Ok(());
        };

        self.env.pacing.pause(settings.post_wait).await;

        for round in 1..=settings.modify_times {
            let response = self.modify_once(&comment_id, round).await?;
            let call = self.modify.record(
                response.duration_ms(),
                response.status,
                &BodyState::Empty,
            );
            checks.check(&settings.modify_check_name(round), call.outcome.success);

            self.env
                .pacing
                .pause(jitter_half(settings.modify_interval))
                .await;
        }

        let deleted = client
            .request(
                RequestSpec::delete(settings.comment_path(&comment_id))
                    .query("nocache", cache_buster())
                    .no_cache()
                    .tag("cleanup-delete"),
            )
            .await?;
        self.delete
            .record(deleted.duration_ms(), deleted.status, &BodyState::Empty);
        checks.check("cleanup delete 200", deleted.status == 200);

        let pause = scenario_pause(
            &ctx.scenario,
            &[("smoke", secs(1)), ("load", millis(500)), ("soak", secs(1))],
        );
        self.env.pacing.pause(pause).await;
        Ok(())
    }
}

/// Comment body of roughly `want` characters, capped at `max_len`
pub fn build_content(prefix: &str, now_ms: u128, salt: u32, want: usize, max_len: usize) -> String {
    let padding = ((want as f64 * PADDING_SHARE).floor() as usize).max(1);
    let content = format!("{} {} {} {}", prefix, now_ms, salt, "x".repeat(padding));

    if content.chars().count() > max_len {
        content.chars().take(max_len).collect()
    } else {
        content
    }
}

/// Id of a created comment from `data.commentId`, `data.id` or `data.comment.id`
pub fn comment_id_of(body: &BodyState) -> Option<String> {
    let BodyState::Data(data) = body else {
        return None;
    };

    [
        data.get("commentId"),
        data.get("id"),
        data.get("comment").and_then(|comment| comment.get("id")),
    ]
    .into_iter()
    .flatten()
    .find_map(id_string)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

pub(crate) fn cache_buster() -> u64 {
    rand::thread_rng().gen()
}
