//! Login traffic mixing legitimate users with credential-stuffing attackers
//!
//! All requests claim the same client address, so the backend's per-client
//! limiter sees one noisy source. Attackers should be throttled (429) or
//! rejected while normal users keep logging in.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;
use volley_core::{
    Counter, OutcomeRecorder, Rate, RecorderSpec, SuccessPolicy, Threshold, WorkloadProfile,
};
use volley_http::RequestSpec;
use volley_runner::{VuContext, Workload};

use crate::env::WorkloadEnv;
use crate::error::WorkloadResult;
use crate::profiles::{mins, secs, stage, table};

pub const NAME: &str = "auth-login-rate-limit";
pub const DESCRIPTION: &str = "Mixes normal logins with brute-force attempts from one client address";

const SHARED_CLIENT_IP: &str = "192.168.1.100";
const DEFAULT_EMAIL: &str = "test@example.com";
const DEFAULT_PASSWORD: &str = "password123";

const ATTACK_PASSWORDS: [&str; 10] = [
    "password", "123456", "admin", "root", "test", "qwerty", "letmein", "welcome", "secret",
    "master",
];

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
        (
            "spike",
            WorkloadProfile::ramping_vus(
                20,
                vec![stage(secs(15), 400), stage(mins(2), 800), stage(secs(15), 0)],
            ),
        ),
        (
            "capacity",
            WorkloadProfile::ramping_vus(
                10,
                vec![
                    stage(mins(2), 50),
                    stage(mins(2), 100),
                    stage(mins(2), 150),
                    stage(mins(2), 200),
                    stage(mins(2), 0),
                ],
            ),
        ),
    ])
}

pub fn build(env: WorkloadEnv) -> WorkloadResult<Arc<dyn Workload>> {
    Ok(Arc::new(AuthLoginRateLimit::new(env)?))
}

/// Credentials used for one login attempt
#[derive(Debug, Clone, PartialEq)]
pub struct LoginAttempt {
    pub email: String,
    pub password: String,
    pub is_normal: bool,
}

/// Verdicts of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginVerdict {
    /// Attackers must not get in unless they were throttled
    pub limiter_working: bool,
    /// Normal users must get in unless they were throttled
    pub normal_user_served: bool,
}

impl LoginVerdict {
    pub fn of(is_normal: bool, status: u16) -> Self {
        let success = status == 200;
        let rate_limited = status == 429;
        Self {
            limiter_working: is_normal || !success || rate_limited,
            normal_user_served: !is_normal || success || rate_limited,
        }
    }
}

pub struct AuthLoginRateLimit {
    env: WorkloadEnv,
    recorder: OutcomeRecorder,
    failure_rate: Rate,
    auth_errors: Counter,
    normal_ratio: f64,
    email: String,
    password: String,
}

impl AuthLoginRateLimit {
    pub fn new(env: WorkloadEnv) -> WorkloadResult<Self> {
        let normal_ratio: f64 = env.run.param_or("NORMAL_USER_RATIO", 0.7)?;

        Ok(Self {
            recorder: OutcomeRecorder::new(
                &env.registry,
                RecorderSpec::new("login").with_success(SuccessPolicy::ok_only()),
            ),
            failure_rate: env.registry.rate("login_failure_rate"),
            auth_errors: env.registry.counter("auth_errors"),
            normal_ratio: if normal_ratio.is_nan() {
                0.7
            } else {
                normal_ratio.clamp(0.0, 1.0)
            },
            email: env
                .target
                .email
                .clone()
                .unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
            password: env
                .target
                .password
                .clone()
                .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            env,
        })
    }

    /// Draw a normal user with probability `NORMAL_USER_RATIO`, else an attacker
    pub fn next_attempt(&self) -> LoginAttempt {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.normal_ratio) {
            return LoginAttempt {
                email: self.email.clone(),
                password: self.password.clone(),
                is_normal: true,
            };
        }

        LoginAttempt {
            email: format!("attacker{}@unknown.com", rng.gen_range(0..1000)),
            password: ATTACK_PASSWORDS
                .choose(&mut rng)
                .copied()
                .unwrap_or("password")
                .to_string(),
            is_normal: false,
        }
    }
}

#[async_trait]
impl Workload for AuthLoginRateLimit {
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
            Threshold::new("http_req_failed", ["rate<0.5"]),
            Threshold::new("http_req_duration", ["p(95)<2000"]),
            Threshold::new("login_success_rate", ["rate>0.3"]),
            Threshold::new("login_response_time", ["p(95)<2000"]),
            Threshold::new("rate_limit_errors", ["count>0"]),
        ]
    }

    async fn iteration(&self, ctx: &VuContext) -> anyhow::Result<()> {
        let attempt = self.next_attempt();
        let response = self
            .env
            .session
            .client()
            .request(
                RequestSpec::post(self.env.target.login_path.as_str())
                    .json(json!({
                        "email": attempt.email,
                        "password": attempt.password,
                    }))
                    .header("X-Forwarded-For", SHARED_CLIENT_IP)
                    .header("X-Real-IP", SHARED_CLIENT_IP)
                    .no_auth()
                    .tag("login"),
            )
            .await?;

        let status = response.status;
        let outcome = self.recorder.record_outcome(response.duration_ms(), status);
        self.failure_rate.add(!outcome.success);
        if matches!(status, 400 | 401 | 403 | 404) {
            self.auth_errors.increment();
        }

        trace!(
            "VU {} login as {} ({}) -> {}",
            ctx.vu_id,
            attempt.email,
            if attempt.is_normal { "normal" } else { "attacker" },
            status
        );

        let verdict = LoginVerdict::of(attempt.is_normal, status);
        self.env.checks.check_all([
            ("login response handled", (200..600).contains(&status)),
            (
                "response time with rate limit < 2s",
                response.duration_ms() < 2000.0,
            ),
            ("rate limiting working", verdict.limiter_working),
            ("normal user success", verdict.normal_user_served),
        ]);

        self.env.pacing.pause(secs(1)).await;
        self.env.pacing.think(secs(1), secs(3)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_for_normal_users() {
        let served = LoginVerdict::of(true, 200);
        assert!(served.limiter_working);
        assert!(served.normal_user_served);

        let throttled = LoginVerdict::of(true, 429);
        assert!(throttled.normal_user_served);

        let rejected = LoginVerdict::of(true, 401);
        assert!(!rejected.normal_user_served);
        assert!(rejected.limiter_working);
    }

    #[test]
    fn test_verdict_for_attackers() {
        let let_in = LoginVerdict::of(false, 200);
        assert!(!let_in.limiter_working);
        assert!(let_in.normal_user_served);

        assert!(LoginVerdict::of(false, 429).limiter_working);
        assert!(LoginVerdict::of(false, 401).limiter_working);
    }
}
