//! Registry of the built-in workloads

use std::collections::BTreeMap;
use std::sync::Arc;
use volley_core::WorkloadProfile;
use volley_runner::Workload;

use crate::env::WorkloadEnv;
use crate::error::{WorkloadError, WorkloadResult};
use crate::{auth_rate_limit, comment_burst, comment_contention, like_toggle, project_search};

/// A workload that can be listed without building it
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub profiles: fn() -> BTreeMap<String, WorkloadProfile>,
    pub build: fn(WorkloadEnv) -> WorkloadResult<Arc<dyn Workload>>,
}

static CATALOG: [CatalogEntry; 5] = [
    CatalogEntry {
        name: auth_rate_limit::NAME,
        description: auth_rate_limit::DESCRIPTION,
        profiles: auth_rate_limit::profiles,
        build: auth_rate_limit::build,
    },
    CatalogEntry {
        name: comment_burst::NAME,
        description: comment_burst::DESCRIPTION,
        profiles: comment_burst::profiles,
        build: comment_burst::build,
    },
    CatalogEntry {
        name: comment_contention::NAME,
        description: comment_contention::DESCRIPTION,
        profiles: comment_contention::profiles,
        build: comment_contention::build,
    },
    CatalogEntry {
        name: like_toggle::NAME,
        description: like_toggle::DESCRIPTION,
        profiles: like_toggle::profiles,
        build: like_toggle::build,
    },
    CatalogEntry {
        name: project_search::NAME,
        description: project_search::DESCRIPTION,
        profiles: project_search::profiles,
        build: project_search::build,
    },
];

/// All built-in workloads, sorted by name
pub fn catalog() -> &'static [CatalogEntry] {
    &CATALOG
}

/// Look up a workload by name
pub fn find(name: &str) -> WorkloadResult<&'static CatalogEntry> {
    CATALOG
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| WorkloadError::UnknownWorkload {
            requested: name.to_string(),
            available: CATALOG.iter().map(|entry| entry.name.to_string()).collect(),
        })
}
