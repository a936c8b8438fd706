//! Thought log and report store used by the agents
//!
//! Everything here is best-effort from the cycle's point of view: callers log
//! failures and carry on.

use crate::ai::{ToolCall, ToolResponse};
use crate::db::Database;
use crate::orchestration::AgentName;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Words of three or more letters/digits count as search keywords
static KEYWORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]{3,}").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "what", "were", "was", "are", "from", "about",
    "have", "has", "did", "past", "any",
];

/// One decision step worth remembering
#[derive(Debug, Clone, Serialize)]
pub struct Thought {
    pub agent: AgentName,
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReport {
    pub id: i64,
    pub content: String,
    pub created_at: String,
}

pub trait AgentMemory: Send + Sync {
    fn save_thought(&self, thought: &Thought) -> Result<(), String>;

    /// Persist a synthesized report, returning its id
    fn store_report(&self, report: &str) -> Result<i64, String>;

    /// Reports relevant to `question`, newest first
    fn retrieve_reports(&self, question: &str, limit: usize) -> Result<Vec<StoredReport>, String>;
}

/// Save a thought, logging instead of failing
pub fn save_thought_best_effort(memory: &dyn AgentMemory, thought: &Thought) {
    if let Err(e) = memory.save_thought(thought) {
        log::warn!("[MEMORY] Failed to save {} thought: {}", thought.agent, e);
    }
}

/// Lowercased, deduplicated search keywords from a free-text question
pub fn extract_keywords(question: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for m in KEYWORD_PATTERN.find_iter(question) {
        let word = m.as_str().to_lowercase();
        if !STOPWORDS.contains(&word.as_str()) && !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

impl AgentMemory for Database {
    fn save_thought(&self, thought: &Thought) -> Result<(), String> {
        let tool_calls = serde_json::to_string(&thought.tool_calls).map_err(|e| e.to_string())?;
        let tool_results = serde_json::to_string(&thought.tool_results).map_err(|e| e.to_string())?;
        self.insert_agent_thought(thought.agent.as_str(), &thought.text, &tool_calls, &tool_results)
            .map(|_| ())
            .map_err(|e| format!("Failed to insert thought: {}", e))
    }

    fn store_report(&self, report: &str) -> Result<i64, String> {
        let id = self
            .insert_report(report)
            .map_err(|e| format!("Failed to insert report: {}", e))?;
        log::info!("[MEMORY] Stored report #{}", id);
        Ok(id)
    }

    fn retrieve_reports(&self, question: &str, limit: usize) -> Result<Vec<StoredReport>, String> {
        let keywords = extract_keywords(question);
        let result = if keywords.is_empty() {
            self.recent_reports(limit)
        } else {
            log::debug!("[MEMORY] Searching reports for keywords: {:?}", keywords);
            self.search_reports(&keywords, limit)
        };
        result.map_err(|e| format!("Failed to query reports: {}", e))
    }
}
