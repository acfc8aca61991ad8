//! Filtered, sorted and paged project search

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use volley_core::{
    BodyState, OutcomeRecorder, PhaseBreakdown, PhaseFraction, Rate, RecorderSpec, SuccessPolicy,
    Threshold, WorkloadProfile,
};
use volley_http::RequestSpec;
use volley_runner::{VuContext, Workload};

use crate::env::WorkloadEnv;
use crate::error::WorkloadResult;
use crate::profiles::{hours, mins, secs, stage, table};

pub const NAME: &str = "project-search";
pub const DESCRIPTION: &str = "Searches projects by keyword and category with random sort and page";

const SEARCH_PATH: &str = "/api/v1/projects/search";
const PAGE_SIZE: u32 = 20;
const MAX_PAGE: u32 = 10;

const QUERIES: [&str; 10] = [
    "데이터 분석",
    "머신러닝",
    "웹 개발",
    "모바일 앱",
    "AI 프로젝트",
    "데이터베이스",
    "API 개발",
    "클라우드",
    "보안",
    "자동화",
];
const CATEGORIES: [&str; 5] = ["TECHNOLOGY", "BUSINESS", "SCIENCE", "HEALTH", "EDUCATION"];
const SORTS: [&str; 4] = ["LATEST", "POPULAR", "DOWNLOAD", "RATING"];

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
    Ok(Arc::new(ProjectSearch::new(env)?))
}

/// One randomly drawn search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: &'static str,
    pub category: &'static str,
    pub sort: &'static str,
    pub page: u32,
}

impl SearchQuery {
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            query: QUERIES.choose(&mut rng).copied().unwrap_or(QUERIES[0]),
            category: CATEGORIES.choose(&mut rng).copied().unwrap_or(CATEGORIES[0]),
            sort: SORTS.choose(&mut rng).copied().unwrap_or(SORTS[0]),
            page: rng.gen_range(1..=MAX_PAGE),
        }
    }

    fn request(&self) -> RequestSpec {
        RequestSpec::get(SEARCH_PATH)
            .query("query", self.query)
            .query("category", self.category)
            .query("sort", self.sort)
            .query("page", self.page)
            .query("size", PAGE_SIZE)
            .tag("search")
    }
}

/// Quality of one result page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchVerdict {
    /// `data.content` is an array
    pub has_results: bool,
    /// Every project belongs to the requested category
    pub accurate: bool,
    /// Some project mentions the query in its title or description
    pub relevant: bool,
}

impl SearchVerdict {
    pub fn of(body: &BodyState, search: &SearchQuery) -> Self {
        let BodyState::Data(data) = body else {
            return Self {
                has_results: false,
                accurate: false,
                relevant: false,
            };
        };

        let content = data.get("content").and_then(Value::as_array);
        let projects = content.map(Vec::as_slice).unwrap_or_default();

        let accurate = projects.iter().all(|project| {
            project.get("category").and_then(Value::as_str) == Some(search.category)
        });

        let needle = search.query.to_lowercase();
        let mentions = |project: &Value, field: &str| {
            project
                .get(field)
                .and_then(Value::as_str)
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        };
        let relevant = projects.is_empty()
            || projects
                .iter()
                .any(|project| mentions(project, "title") || mentions(project, "description"));

        Self {
            has_results: content.is_some(),
            accurate,
            relevant,
        }
    }
}

pub struct ProjectSearch {
    env: WorkloadEnv,
    recorder: OutcomeRecorder,
    accuracy: Rate,
    relevance: Rate,
}

impl ProjectSearch {
    pub fn new(env: WorkloadEnv) -> WorkloadResult<Self> {
        let breakdown = PhaseBreakdown::new(vec![
            PhaseFraction::new("query_build", 0.15),
            PhaseFraction::new("elasticsearch_query", 0.5),
            PhaseFraction::new("pagination", 0.2),
            PhaseFraction::new("data_mapping", 0.15),
        ])?;

        Ok(Self {
            recorder: OutcomeRecorder::new(
                &env.registry,
                RecorderSpec::new("project_search")
                    .with_success(SuccessPolicy::ok_only())
                    .with_breakdown(breakdown)
                    .with_cache_hit(100.0),
            ),
            accuracy: env.registry.rate("project_search_accuracy"),
            relevance: env.registry.rate("project_search_relevance"),
            env,
        })
    }
}

#[async_trait]
impl Workload for ProjectSearch {
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
            Threshold::new("project_search_success_rate", ["rate>0.95"]),
            Threshold::new("project_search_response_time", ["p(95)<500"]),
            Threshold::new("project_search_cache_hit_rate", ["rate>0.7"]),
            Threshold::new("project_search_query_build_time", ["p(95)<50"]),
            Threshold::new("project_search_elasticsearch_query_time", ["p(95)<200"]),
            Threshold::new("project_search_pagination_time", ["p(95)<100"]),
            Threshold::new("project_search_data_mapping_time", ["p(95)<50"]),
            Threshold::new("project_search_accuracy", ["rate>0.9"]),
            Threshold::new("project_search_relevance", ["rate>0.85"]),
        ]
    }

    async fn setup(&self) -> anyhow::Result<()> {
        self.env.session.authenticate().await?;
        Ok(())
    }

    async fn iteration(&self, ctx: &VuContext) -> anyhow::Result<()> {
        let search = SearchQuery::random();
        let response = self.env.session.client().request(search.request()).await?;

        let body = response.envelope();
        let call = self
            .recorder
            .record(response.duration_ms(), response.status, &body);
        let checks = &self.env.checks;

        if response.status == 200 {
            let verdict = SearchVerdict::of(&body, &search);
            self.accuracy.add(verdict.accurate);
            self.relevance.add(verdict.relevant);

            let phase = |name: &str| call.derived_ms(name).unwrap_or_default();
            checks.check_all([
                ("search successful", true),
                ("response time < 500ms", response.duration_ms() < 500.0),
                ("has search results", verdict.has_results),
                ("query build time < 50ms", phase("query_build") < 50.0),
                (
                    "elasticsearch query time < 200ms",
                    phase("elasticsearch_query") < 200.0,
                ),
                ("pagination time < 100ms", phase("pagination") < 100.0),
                ("data mapping time < 50ms", phase("data_mapping") < 50.0),
                ("search accuracy", verdict.accurate),
                ("search relevance", verdict.relevant),
            ]);
        } else {
            debug!(
                "VU {} search '{}' in {} -> {}",
                ctx.vu_id, search.query, search.category, response.status
            );
            checks.check_all([
                ("error handled gracefully", response.status >= 400),
                ("error response", !response.body.is_empty()),
            ]);
        }

        self.env.pacing.think(secs(1), secs(3)).await;
        Ok(())
    }
}
