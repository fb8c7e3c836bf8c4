use crate::connectors::{AiProvider, ConnectorError};
use crate::models::{RawRequirement, Requirement, NO_DATABASE, UNKNOWN};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

lazy_static! {
    static ref CPU_PATTERN: Regex = Regex::new(r"(?i)(\d+)\s*cores?").unwrap();
    static ref RAM_PATTERN: Regex = Regex::new(r"(?i)(\d+)\s*gb").unwrap();
    static ref CODE_FENCE: Regex = Regex::new(r"```[A-Za-z0-9_-]*").unwrap();
}

/// Why a single raw record did not become a [`Requirement`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("missing CPU description")]
    MissingCpu,
    #[error("no '<N> cores' in CPU description {0:?}")]
    UnparseableCpu(String),
    #[error("missing RAM description")]
    MissingRam,
    #[error("no '<N>GB' in RAM description {0:?}")]
    UnparseableRam(String),
    #[error("requirement entry is not an object")]
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub raw: Value,
    pub reason: RejectionReason,
}

/// Outcome of extracting a batch: the records that survived and the ones
/// that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub requirements: Vec<Requirement>,
    pub rejections: Vec<Rejection>,
}

/// Batch level failure: the model output as a whole is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Model returned an empty response")]
    EmptyResponse,
    #[error("Invalid JSON response from model")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Invalid format in model response")]
    MissingRequirements,
    #[error("Model request failed: {0}")]
    Provider(#[from] ConnectorError),
}

fn leading_positive_int(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .filter(|n| *n > 0)
}

/// `"8 Cores @ 3.2GHz"` → 8.
pub fn parse_cpu_cores(text: &str) -> Option<u32> {
    leading_positive_int(&CPU_PATTERN, text)
}

/// `"16GB DDR4"` → 16.
pub fn parse_ram_gb(text: &str) -> Option<u32> {
    leading_positive_int(&RAM_PATTERN, text)
}

pub fn normalize(raw: &RawRequirement) -> Result<Requirement, RejectionReason> {
    let cpu_text = raw.cpu.as_deref().ok_or(RejectionReason::MissingCpu)?;
    let cpu_cores =
        parse_cpu_cores(cpu_text).ok_or_else(|| RejectionReason::UnparseableCpu(cpu_text.to_string()))?;

    let ram_text = raw.ram.as_deref().ok_or(RejectionReason::MissingRam)?;
    let ram_gb =
        parse_ram_gb(ram_text).ok_or_else(|| RejectionReason::UnparseableRam(ram_text.to_string()))?;

    Ok(Requirement {
        server_name: raw.server_name.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        cpu_cores,
        ram_gb,
        storage: raw.storage.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        database: raw.database.clone().unwrap_or_else(|| NO_DATABASE.to_string()),
    })
}

/// Normalize every record, keeping going past bad ones.
pub fn extract_all<I>(raws: I) -> Extraction
where
    I: IntoIterator<Item = RawRequirement>,
{
    let mut extraction = Extraction::default();
    for raw in raws {
        match normalize(&raw) {
            Ok(requirement) => extraction.requirements.push(requirement),
            Err(reason) => {
                let raw = serde_json::to_value(&raw).unwrap_or(Value::Null);
                extraction.reject(raw, reason);
            }
        }
    }
    extraction.log_summary();
    extraction
}

/// Same as [`extract_all`] for loosely typed JSON entries.
pub fn extract_entries(entries: Vec<Value>) -> Extraction {
    let mut extraction = Extraction::default();
    for entry in entries {
        if !entry.is_object() {
            extraction.reject(entry, RejectionReason::NotAnObject);
            continue;
        }
        let raw = match serde_json::from_value::<RawRequirement>(entry.clone()) {
            Ok(raw) => raw,
            Err(_) => {
                extraction.reject(entry, RejectionReason::NotAnObject);
                continue;
            }
        };
        match normalize(&raw) {
            Ok(requirement) => extraction.requirements.push(requirement),
            Err(reason) => extraction.reject(entry, reason),
        }
    }
    extraction.log_summary();
    extraction
}

impl Extraction {
    fn reject(&mut self, raw: Value, reason: RejectionReason) {
        tracing::warn!(record = %raw, reason = %reason, "Skipping requirement");
        self.rejections.push(Rejection { raw, reason });
    }

    fn log_summary(&self) {
        tracing::info!(
            accepted = self.requirements.len(),
            rejected = self.rejections.len(),
            "Requirements extracted"
        );
    }
}

fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").trim().to_string()
}

/// Pull the `requirements` entries out of model output.
///
/// The raw text is parsed first; if that fails Markdown fences are removed
/// and it is parsed again. A bare array is taken as the entries themselves.
pub fn parse_model_output(text: &str) -> Result<Vec<Value>, ExtractionError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }

    let parsed = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => value,
        Err(first_err) => {
            let cleaned = strip_code_fences(trimmed);
            tracing::debug!(error = %first_err, "Retrying model output without code fences");
            serde_json::from_str::<Value>(&cleaned).map_err(ExtractionError::InvalidJson)?
        }
    };

    match parsed {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut map) => match map.remove("requirements") {
            Some(Value::Array(entries)) => Ok(entries),
            _ => Err(ExtractionError::MissingRequirements),
        },
        _ => Err(ExtractionError::MissingRequirements),
    }
}

const EXTRACTION_SYSTEM_PROMPT: &str = "\
You convert server sizing requests into JSON. You never add prose, \
explanations or Markdown. You only output one JSON object.";

/// `(system, prompt)` asking the model for the requirement document.
pub fn build_extraction_prompt(query: &str) -> (String, String) {
    let prompt = format!(
        "Read the request below and list every server it describes.\n\
         Answer with a single JSON object of this exact shape:\n\
         {{\"requirements\": [{{\"Server Name\": \"...\", \"CPU\": \"<N> Cores\", \
         \"RAM\": \"<N>GB\", \"Storage\": \"<size><GB|TB> <SSD|HDD|NVMe> [+ ...]\", \
         \"Database\": \"MySQL|PostgreSQL|Microsoft SQL Server|Oracle Database|Redis|None\"}}]}}\n\
         Request: \"{}\"",
        query
    );
    (EXTRACTION_SYSTEM_PROMPT.to_string(), prompt)
}

/// Turns a natural-language query into requirements through the model.
pub struct RequirementExtractor {
    ai: Arc<dyn AiProvider>,
}

impl RequirementExtractor {
    pub fn new(ai: Arc<dyn AiProvider>) -> Self {
        Self { ai }
    }

    #[tracing::instrument(name = "Extract requirements.", skip(self), fields(provider = self.ai.name()))]
    pub async fn extract(&self, query: &str) -> Result<Extraction, ExtractionError> {
        let (system, prompt) = build_extraction_prompt(query);
        let output = self.ai.complete(&prompt, &system).await?;

        let entries = parse_model_output(&output).map_err(|err| {
            tracing::error!(error = %err, raw = %output, "Unusable model output");
            err
        })?;

        Ok(extract_entries(entries))
    }
}
