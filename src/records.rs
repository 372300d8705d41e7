use anyhow::{Context, Result};
use chrono::Local;
use regex::Regex;
use std::fs::OpenOptions;
use std::path::PathBuf;

use crate::models::ApplicationRecord;

/// Append-only CSV of every job we opened. Never rewritten: a crash loses
/// at most the in-flight row.
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &ApplicationRecord) -> Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }
}

pub fn new_record(
    job_id: &str,
    title: &str,
    company: &str,
    attempted: bool,
    submitted: bool,
) -> ApplicationRecord {
    ApplicationRecord {
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        job_id: job_id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        attempted,
        submitted,
    }
}

/// Written only on confirmed submission: a human-readable description plus
/// the direct listing URL, for quick follow-up.
pub struct ApplicationsSent {
    path: PathBuf,
}

impl ApplicationsSent {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, job_id: &str, title: &str, company: &str) -> Result<()> {
        let description = format!(
            "{} - {} at {}",
            Local::now().format("%Y-%m-%d"),
            title,
            company
        );
        let url = crate::search::job_view_url(job_id);
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([description.as_str(), url.as_str()])?;
        writer.flush()?;
        Ok(())
    }
}

/// The browser window title on a job page looks like
/// "(3) Senior Rust Engineer | Initech | LinkedIn"; pull out the job title
/// and company, dropping the notification-count prefix.
pub fn parse_window_title(title: &str) -> (String, String) {
    let mut parts = title.split(" | ");
    let job = parts.next().map(strip_decorations).unwrap_or_default();
    let company = parts.next().map(strip_decorations).unwrap_or_default();
    (job, company)
}

fn strip_decorations(part: &str) -> String {
    Regex::new(r"\(?\d*\)?\s*(\w.*)")
        .ok()
        .and_then(|re| re.captures(part))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| part.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_log_appends_without_rewriting() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResultsLog::new(dir.path().join("output.csv"));
        log.append(&new_record("1", "Engineer", "Initech", true, true))
            .unwrap();
        log.append(&new_record("2", "Analyst", "Globex", true, false))
            .unwrap();

        let text = std::fs::read_to_string(dir.path().join("output.csv")).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(",1,Engineer,Initech,true,true"));
        assert!(lines[1].contains(",2,Analyst,Globex,true,false"));
    }

    #[test]
    fn sent_file_carries_listing_url() {
        let dir = tempfile::tempdir().unwrap();
        let sent = ApplicationsSent::new(dir.path().join("applications.csv"));
        sent.append("4026789101", "Engineer", "Initech").unwrap();
        let text = std::fs::read_to_string(dir.path().join("applications.csv")).unwrap();
        assert!(text.contains("Engineer at Initech"));
        assert!(text.contains("https://www.linkedin.com/jobs/view/4026789101"));
    }

    #[test]
    fn window_title_parsing() {
        let (job, company) = parse_window_title("(3) Senior Rust Engineer | Initech | LinkedIn");
        assert_eq!(job, "Senior Rust Engineer");
        assert_eq!(company, "Initech");

        let (job, company) = parse_window_title("Backend Developer | Globex");
        assert_eq!(job, "Backend Developer");
        assert_eq!(company, "Globex");

        let (job, company) = parse_window_title("Untitled");
        assert_eq!(job, "Untitled");
        assert_eq!(company, "");
    }
}
