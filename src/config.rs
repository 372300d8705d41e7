use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime configuration, loaded once from a YAML file before the browser
/// session opens. Validation failures abort startup with a descriptive
/// error so a bad config never causes side effects.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub positions: Vec<String>,
    pub locations: Vec<String>,
    pub profile: Profile,

    /// Site experience-level filter codes, 1 (Entry level) .. 6 (Internship).
    #[serde(default)]
    pub experience_levels: Vec<u8>,
    #[serde(default)]
    pub posting_age: PostingAge,

    /// Case-insensitive substrings; a job card containing any of these is skipped.
    #[serde(default)]
    pub company_blacklist: Vec<String>,
    #[serde(default)]
    pub title_blacklist: Vec<String>,

    #[serde(default)]
    pub uploads: Uploads,

    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default = "default_answer_bank_file")]
    pub answer_bank_file: PathBuf,
    #[serde(default = "default_applications_file")]
    pub applications_file: PathBuf,

    /// Per position/location pair search budget.
    #[serde(default = "default_max_search_minutes")]
    pub max_search_minutes: u64,

    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,
}

/// Everything about the person applying. Constructed once from the config
/// and read-only for the rest of the run.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub zip: String,
    pub phone: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub portfolio: String,

    pub salary: String,
    pub hourly_rate: String,

    // Self-identification answers, used verbatim on demographic questions.
    #[serde(default = "decline_to_answer")]
    pub gender: String,
    #[serde(default = "decline_to_answer")]
    pub race: String,
    #[serde(default = "decline_to_answer")]
    pub veteran: String,
    #[serde(default = "decline_to_answer")]
    pub disability: String,
    #[serde(default = "decline_to_answer")]
    pub lgbtq: String,

    pub account: Account,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Uploads {
    pub resume: Option<PathBuf>,
    pub cover_letter: Option<PathBuf>,
}

/// How recently a job must have been posted to show up in search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostingAge {
    #[default]
    Any,
    PastDay,
    PastWeek,
    PastMonth,
}

impl PostingAge {
    pub fn url_param(self) -> &'static str {
        match self {
            PostingAge::Any => "",
            PostingAge::PastDay => "&f_TPR=r86400",
            PostingAge::PastWeek => "&f_TPR=r604800",
            PostingAge::PastMonth => "&f_TPR=r2592000",
        }
    }
}

const EXPERIENCE_LEVELS: [(u8, &str); 6] = [
    (1, "Entry level"),
    (2, "Associate"),
    (3, "Mid-Senior level"),
    (4, "Director"),
    (5, "Executive"),
    (6, "Internship"),
];

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Config = serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        // Tolerate empty/whitespace list entries the way the YAML tends to grow them.
        config.positions.retain(|p| !p.trim().is_empty());
        config.locations.retain(|l| !l.trim().is_empty());

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.positions.is_empty() {
            bail!("There are no positions to be searched. Check the config file.");
        }
        if self.locations.is_empty() {
            bail!("There are no locations to be searched. Check the config file.");
        }
        if self.profile.account.username.trim().is_empty() {
            bail!("No account username provided. Check the config file.");
        }
        if self.profile.account.password.trim().is_empty() {
            bail!("No account password provided. Check the config file.");
        }
        if self.profile.phone.trim().is_empty() {
            bail!("No phone number provided. Check the config file.");
        }
        for level in &self.experience_levels {
            if !(1..=6).contains(level) {
                bail!("Experience level {} is out of range (expected 1-6).", level);
            }
        }
        for (label, path) in [
            ("resume", &self.uploads.resume),
            ("cover_letter", &self.uploads.cover_letter),
        ] {
            if let Some(p) = path {
                if !p.is_file() {
                    bail!("Upload '{}' does not point to a file: {}", label, p.display());
                }
            }
        }
        Ok(())
    }

    /// Human-readable names of the configured experience-level filters,
    /// or every level when no filter is set.
    pub fn experience_level_names(&self) -> Vec<&'static str> {
        EXPERIENCE_LEVELS
            .iter()
            .filter(|(code, _)| {
                self.experience_levels.is_empty() || self.experience_levels.contains(code)
            })
            .map(|(_, name)| *name)
            .collect()
    }
}

fn decline_to_answer() -> String {
    "Prefer not to say".to_string()
}

fn default_output_file() -> PathBuf {
    PathBuf::from("output.csv")
}

fn default_answer_bank_file() -> PathBuf {
    PathBuf::from("qa.csv")
}

fn default_applications_file() -> PathBuf {
    PathBuf::from("applications.csv")
}

fn default_max_search_minutes() -> u64 {
    20
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
