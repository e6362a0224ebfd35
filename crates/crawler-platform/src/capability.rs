//! The fixed vocabulary an adapter advertises itself against. Grounded on `original_source/crawler_engine/platforms/base.py`'s
//! `PlatformCapability`/`SearchMethod` enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformCapability {
    JobSearch,
    JobDetails,
    CompanyInfo,
    SalaryInfo,
    CompanyReviews,
    ProfileInfo,
    ApplicationTracking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    Api,
    Scraping,
    Vision,
    Hybrid,
}
