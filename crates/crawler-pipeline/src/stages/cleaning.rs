//! Text normalization: strips HTML, collapses whitespace, decodes a fixed
//! set of entities, bounds title length, and extracts a flat skill list
//! from the description.
//!
//! Grounded on `original_source/crawler_engine/data/processors.py`'s
//! `JobDataProcessor` (`_clean_title`/`_clean_company`/`_clean_location`/
//! `_clean_description`/`_extract_skills`). Job type and experience level
//! normalization live on the adapter side as typed enums rather than here,
//! since `JobRecord` already carries them as `JobType`/`ExperienceLevel`
//! rather than free text.

use std::collections::HashMap;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

use crawler_domain::JobRecord;

use crate::stage::{PipelineStage, Processor, StageOutcome};

const MIN_TITLE_LENGTH: usize = 2;
const MAX_TITLE_LENGTH: usize = 200;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn html_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn control_char_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\x00-\x1f\x7f-\x9f]").unwrap())
}

fn company_suffix_res() -> &'static [Regex] {
    static RES: OnceLock<Vec<Regex>> = OnceLock::new();
    RES.get_or_init(|| {
        vec![
            Regex::new(r"\s*\([^)]*\)$").unwrap(),
            Regex::new(r"\s*-.*$").unwrap(),
            Regex::new(r"\s*\|.*$").unwrap(),
        ]
    })
}

fn blank_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap())
}

fn inline_space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap())
}

fn br_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<br[^>]*>").unwrap())
}

fn p_open_tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<p[^>]*>").unwrap())
}

const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&nbsp;", " "),
];

fn skill_keywords() -> &'static HashMap<&'static str, &'static [&'static str]> {
    static MAP: OnceLock<HashMap<&'static str, &'static [&'static str]>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
        m.insert(
            "programming",
            &[
                "python", "java", "javascript", "typescript", "c++", "c#", "go", "rust", "php",
                "ruby", "swift", "kotlin", "scala", "r", "matlab", "sql",
            ],
        );
        m.insert(
            "frameworks",
            &[
                "react", "angular", "vue", "django", "flask", "spring", "express", "laravel",
                "rails", "asp.net", "tensorflow", "pytorch", "keras",
            ],
        );
        m.insert(
            "tools",
            &[
                "git", "docker", "kubernetes", "jenkins", "aws", "azure", "gcp", "linux",
                "windows", "macos", "mysql", "postgresql", "mongodb", "redis",
            ],
        );
        m.insert(
            "soft_skills",
            &[
                "leadership",
                "communication",
                "teamwork",
                "problem solving",
                "analytical",
                "creative",
                "adaptable",
                "detail oriented",
            ],
        );
        m
    })
}

/// Matches a keyword on word boundaries so e.g. `"go"` doesn't fire inside
/// `"mango"`.
fn contains_keyword(haystack_lower: &str, keyword: &str) -> bool {
    let pattern = format!(r"\b{}\b", regex::escape(keyword));
    Regex::new(&pattern)
        .map(|re| re.is_match(haystack_lower))
        .unwrap_or(false)
}

fn extract_skills(description: &str) -> HashMap<&'static str, Vec<&'static str>> {
    let lower = description.to_lowercase();
    let mut found = HashMap::new();
    for (category, keywords) in skill_keywords() {
        let matched: Vec<&'static str> = keywords
            .iter()
            .copied()
            .filter(|kw| contains_keyword(&lower, kw))
            .collect();
        if !matched.is_empty() {
            found.insert(*category, matched);
        }
    }
    found
}

fn clean_title(title: &str) -> String {
    if title.trim().is_empty() {
        return String::new();
    }
    let collapsed = whitespace_re().replace_all(title.trim(), " ");
    let no_tags = html_tag_re().replace_all(&collapsed, "");
    control_char_re().replace_all(&no_tags, "").into_owned()
}

fn clean_company(company: &str) -> String {
    if company.trim().is_empty() {
        return String::new();
    }
    let collapsed = whitespace_re().replace_all(company.trim(), " ");
    let mut cleaned = html_tag_re().replace_all(&collapsed, "").into_owned();
    for suffix_re in company_suffix_res() {
        cleaned = suffix_re.replace(&cleaned, "").into_owned();
    }
    cleaned.trim().to_string()
}

fn clean_location(location: &str) -> String {
    if location.trim().is_empty() {
        return String::new();
    }
    let collapsed = whitespace_re().replace_all(location.trim(), " ");
    let no_tags = html_tag_re().replace_all(&collapsed, "");
    Regex::new(r"\s*,\s*")
        .unwrap()
        .replace_all(&no_tags, ", ")
        .into_owned()
}

fn clean_description(description: &str) -> String {
    if description.trim().is_empty() {
        return String::new();
    }
    let mut text = br_tag_re().replace_all(description, "\n").into_owned();
    text = p_open_tag_re().replace_all(&text, "\n").into_owned();
    text = text.replace("</p>", "\n");
    text = html_tag_re().replace_all(&text, "").into_owned();

    for (entity, replacement) in HTML_ENTITIES {
        text = text.replace(entity, replacement);
    }

    text = blank_line_re().replace_all(&text, "\n\n").into_owned();
    text = inline_space_re().replace_all(&text, " ").into_owned();
    text.trim().to_string()
}

pub struct CleaningStage;

impl CleaningStage {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CleaningStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Processor for CleaningStage {
    fn stage(&self) -> PipelineStage {
        PipelineStage::Cleaning
    }

    async fn process(&self, mut job: JobRecord) -> StageOutcome {
        job.title = clean_title(&job.title);
        job.company = clean_company(&job.company);
        job.location = clean_location(&job.location);
        job.description = clean_description(&job.description);

        if job.title.len() < MIN_TITLE_LENGTH || job.title.len() > MAX_TITLE_LENGTH {
            tracing::warn!(title = %job.title, length = job.title.len(), "job title length out of expected range");
        }

        let skills = extract_skills(&job.description);
        let mut flat: Vec<String> = skills.values().flatten().map(|s| s.to_string()).collect();
        flat.sort();
        flat.dedup();
        job.skills = flat;

        if let serde_json::Value::Object(ref mut map) = job.raw {
            map.insert(
                "extracted_skills".to_string(),
                serde_json::to_value(&skills).unwrap_or_default(),
            );
        } else {
            job.raw = serde_json::json!({ "extracted_skills": skills });
        }

        StageOutcome::completed(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_job() -> JobRecord {
        let mut job = JobRecord::new(
            "indeed",
            "  Senior   Engineer  ",
            "Acme Corp (formerly Acme Inc)",
            "Sydney ,  AU",
            "https://indeed.com/1",
        );
        job.description =
            "<p>We use Python and React.</p><br>Great <b>team</b>.&nbsp;Apply now!".to_string();
        job
    }

    #[tokio::test]
    async fn collapses_whitespace_and_strips_tags() {
        let outcome = CleaningStage::new().process(raw_job()).await;
        let job = outcome.data.unwrap();
        assert_eq!(job.title, "Senior Engineer");
        assert_eq!(job.company, "Acme Corp");
        assert_eq!(job.location, "Sydney, AU");
        assert!(!job.description.contains('<'));
        assert!(job.description.contains("Great team"));
    }

    #[tokio::test]
    async fn extracts_known_skills_into_flat_list_and_raw_breakdown() {
        let outcome = CleaningStage::new().process(raw_job()).await;
        let job = outcome.data.unwrap();
        assert!(job.skills.contains(&"python".to_string()));
        assert!(job.skills.contains(&"react".to_string()));
        assert!(job.raw.get("extracted_skills").is_some());
    }

    #[tokio::test]
    async fn empty_title_stays_empty_not_a_space() {
        let mut job = raw_job();
        job.title = "   ".to_string();
        let outcome = CleaningStage::new().process(job).await;
        assert_eq!(outcome.data.unwrap().title, "");
    }
}
