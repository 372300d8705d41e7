use serde::{Deserialize, Serialize};

/// One card in a search-results page, as harvested from the listing pane.
/// Transient: lives just long enough to decide skip vs. enqueue.
#[derive(Debug, Clone)]
pub struct JobCard {
    pub job_id: Option<String>,
    pub text: String,
    pub already_applied: bool,
}

/// One row of the append-only results log. Every job we opened gets exactly
/// one of these, whether or not the application went through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub timestamp: String,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub attempted: bool,
    pub submitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedJob {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub submitted: bool,
    pub applied_at: String,
}
