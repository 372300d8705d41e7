use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Profile;

/// Placeholder written for questions no rule can answer. Cheap to spot when
/// reviewing the bank file by hand.
pub const FALLBACK_ANSWER: &str = "2";

/// Durable question -> answer store. Two-column CSV with a `Question,Answer`
/// header, appended to as new questions are resolved. The first answer
/// recorded for a question sticks for this run and all later runs.
pub struct AnswerBank {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl AnswerBank {
    /// Load the store if it exists and parses; any read problem is logged
    /// and we fall back to a fresh empty store rather than failing the run.
    pub fn load(path: &Path) -> Self {
        match read_entries(path) {
            Ok(Some(entries)) => {
                info!("Loaded {} answers from {}", entries.len(), path.display());
                return Self {
                    path: path.to_path_buf(),
                    entries,
                };
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    "Could not read answer bank {}: {:#}. Starting fresh.",
                    path.display(),
                    e
                );
            }
        }
        if let Err(e) = write_header(path) {
            warn!("Could not initialize answer bank {}: {:#}", path.display(), e);
        }
        Self {
            path: path.to_path_buf(),
            entries: HashMap::new(),
        }
    }

    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.entries.get(question).map(String::as_str)
    }

    /// First-write-wins: recording an already-known question is a no-op.
    /// The durable append never rewrites prior rows, so a crash can only
    /// ever lose the latest unflushed row.
    pub fn record(&mut self, question: &str, answer: &str) -> Result<()> {
        if self.entries.contains_key(question) {
            return Ok(());
        }
        append_row(&self.path, question, answer)?;
        self.entries
            .insert(question.to_string(), answer.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by question, for stable listings.
    pub fn sorted_entries(&self) -> Vec<(&str, &str)> {
        let mut rows: Vec<_> = self
            .entries
            .iter()
            .map(|(q, a)| (q.as_str(), a.as_str()))
            .collect();
        rows.sort_by_key(|(q, _)| *q);
        rows
    }
}

fn read_entries(path: &Path) -> Result<Option<HashMap<String, String>>> {
    if !path.is_file() {
        return Ok(None);
    }
    if std::fs::metadata(path)?.len() == 0 {
        return Ok(None);
    }
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut entries = HashMap::new();
    for record in reader.records() {
        let record = record.context("Malformed answer bank row")?;
        if record.len() >= 2 {
            entries.insert(record[0].to_string(), record[1].to_string());
        }
    }
    Ok(Some(entries))
}

fn write_header(path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(["Question", "Answer"])?;
    writer.flush()?;
    Ok(())
}

fn append_row(path: &Path, question: &str, answer: &str) -> Result<()> {
    if !path.is_file() {
        write_header(path)?;
    }
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for append", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    writer.write_record([question, answer])?;
    writer.flush()?;
    Ok(())
}

/// A resolved answer. `auto` is false when only the placeholder applied,
/// which callers use to pause for manual intervention in attended runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub answer: String,
    pub auto: bool,
}

fn auto(answer: impl Into<String>) -> Resolved {
    Resolved {
        answer: answer.into(),
        auto: true,
    }
}

fn manual() -> Resolved {
    Resolved {
        answer: FALLBACK_ANSWER.to_string(),
        auto: false,
    }
}

pub fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Map a form question to an answer. Total: every input gets a non-empty
/// answer, the placeholder at worst.
///
/// The rules are an ordered chain and the order is load-bearing: the late
/// generic affirmatives ("do you", "are you", ...) would otherwise swallow
/// questions the earlier, specific rules answer better.
pub fn resolve(
    question: &str,
    profile: &Profile,
    today: NaiveDate,
    rng: &mut impl Rng,
) -> Resolved {
    let q = normalize(question);
    let has = |needle: &str| q.contains(needle);

    // Language proficiency.
    if has("english") {
        if has("speak") || has("communicate") {
            return auto("Yes");
        }
        if has("proficiency") || has("level") {
            return auto("Native");
        }
        return manual();
    }

    // Quantitative experience: pick a plausible year count.
    if has("how many") || has("how much") || has("enter a decimal number") {
        let years = ["6", "5", "4", "3"];
        return auto(*years.choose(rng).unwrap_or(&"4"));
    }
    if has("rate") && (has("yourself") || has("proficient") || has("proficiency")) {
        return auto("10");
    }
    if has("hourly") && (has("rate") || has("salary") || has("what")) {
        return auto(profile.hourly_rate.clone());
    }
    if has("do you") && has("experience") {
        return auto("Yes");
    }
    if has("how did you hear") {
        return auto("Other");
    }
    if has("refer") {
        return auto("N/A");
    }
    if has("why") && (has("position") || has("role")) {
        return auto("Good glassdoor reviews and the workers I talked to love their jobs");
    }

    // Work authorization and clearances.
    if has("sponsor") {
        return auto("No");
    }
    if has("work") && (has("authorization") || has("authorized")) {
        if has("usc") {
            return auto("USC: 0");
        }
        if has("status") {
            return auto("U.S. Citizen");
        }
        return auto("Yes");
    }
    if has("w2") {
        return auto("Yes");
    }
    if (has("eligible") || has("able")) && has("clearance") {
        return auto("Yes");
    }
    if (has("have") || has("obtain")) && has("clearance") {
        return auto("Yes");
    }
    if (has("u.s.") || has("green")) && (has("citizen") || has("card")) {
        return auto("Yes");
    }
    if has("privacy policy") {
        return auto("I agree");
    }

    if has("date") && (has("earliest") || has("start") || has("mm/dd/yyyy") || has("format")) {
        return auto(today.format("%m/%d/%Y").to_string());
    }

    // Identity fields, verbatim from the profile.
    if has("city") || has("address") {
        return auto(profile.city.clone());
    }
    if has("zip") || has("area code") || has("postal") {
        return auto(profile.zip.clone());
    }
    if has("first") {
        return auto(profile.first_name.clone());
    }
    if has("last") {
        return auto(profile.last_name.clone());
    }
    if has("your name") {
        return auto(profile.full_name());
    }
    if has("github") {
        return auto(profile.github.clone());
    }
    if has("linkedin") {
        return auto(profile.linkedin.clone());
    }
    if has("portfolio") || has("personal website") {
        return auto(profile.portfolio.clone());
    }

    // Self-identification, verbatim from the profile.
    if has("disability") {
        return auto(profile.disability.clone());
    }
    if has("drug test") {
        if has("positive") {
            return auto("No");
        }
        if has("can you") {
            return auto("Yes");
        }
        return manual();
    }
    if has("can you") && has("commute") {
        return auto("Yes");
    }
    if has("criminal") || has("felon") || has("charged") {
        return auto("No");
    }
    if has("currently reside") {
        return auto("Yes");
    }
    if has("salary") {
        return auto(profile.salary.clone());
    }
    if has("hourly") {
        return auto("40");
    }
    if has("gender") {
        return auto(profile.gender.clone());
    }
    if has("race") || has("ethnicity") || has("nationality") {
        return auto(profile.race.clone());
    }
    if has("lgbtq") {
        return auto(profile.lgbtq.clone());
    }
    if has("government") || has("veteran") {
        return auto(profile.veteran.clone());
    }
    if has("are you legally") {
        return auto("Yes");
    }
    if has("phone") && (has("mobile") || has("number")) {
        return auto(profile.phone.clone());
    }

    // Generic affirmative catch-all.
    if has("do you") || has("did you") || has("have you") || has("are you") {
        return auto("Yes");
    }

    manual()
}

/// Ties the bank and the rule chain together. The bank is consulted first
/// so that randomly-chosen answers stay sticky within and across runs.
pub struct AnswerEngine {
    bank: AnswerBank,
    profile: Profile,
    rng: StdRng,
}

impl AnswerEngine {
    pub fn new(bank: AnswerBank, profile: Profile) -> Self {
        Self::with_rng(bank, profile, StdRng::from_entropy())
    }

    pub fn with_rng(bank: AnswerBank, profile: Profile, rng: StdRng) -> Self {
        Self { bank, profile, rng }
    }

    pub fn answer(&mut self, question: &str) -> Resolved {
        let key = normalize(question);
        if let Some(known) = self.bank.lookup(&key) {
            return auto(known);
        }
        let today = Local::now().date_naive();
        let resolved = resolve(&key, &self.profile, today, &mut self.rng);
        if resolved.auto {
            info!("Answering '{}' with '{}'", key, resolved.answer);
        } else {
            info!("Could not auto-answer '{}'; using placeholder", key);
        }
        if let Err(e) = self.bank.record(&key, &resolved.answer) {
            warn!("Failed to persist answer for '{}': {:#}", key, e);
        }
        resolved
    }

    pub fn bank(&self) -> &AnswerBank {
        &self.bank
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Account;

    fn test_profile() -> Profile {
        Profile {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            street: "12 Analytical Way".into(),
            city: "London".into(),
            state: "".into(),
            zip: "10001".into(),
            phone: "555-0100".into(),
            github: "https://github.com/ada".into(),
            linkedin: "https://linkedin.com/in/ada".into(),
            portfolio: "https://ada.dev".into(),
            salary: "95000".into(),
            hourly_rate: "45".into(),
            gender: "Female".into(),
            race: "Prefer not to say".into(),
            veteran: "I am not".into(),
            disability: "No".into(),
            lgbtq: "Prefer not to say".into(),
            account: Account {
                username: "ada@example.com".into(),
                password: "hunter2".into(),
            },
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn answer(question: &str) -> Resolved {
        resolve(question, &test_profile(), today(), &mut rng())
    }

    #[test]
    fn specific_rule_beats_generic_affirmative() {
        // Contains both "english" and "do you"; the earlier rule must win.
        let r = answer("Do you speak English?");
        assert_eq!(r.answer, "Yes");
        assert!(r.auto);
        assert_eq!(answer("What is your English proficiency level?").answer, "Native");
    }

    #[test]
    fn resolution_is_total() {
        let r = answer("");
        assert_eq!(r.answer, FALLBACK_ANSWER);
        assert!(!r.auto);
        assert_eq!(answer("describe your ideal workplace").answer, FALLBACK_ANSWER);
    }

    #[test]
    fn quantitative_answers_are_seed_deterministic() {
        let a = answer("How many years of Rust experience do you have?");
        let b = answer("How many years of Rust experience do you have?");
        assert_eq!(a, b);
        assert!(["6", "5", "4", "3"].contains(&a.answer.as_str()));
    }

    #[test]
    fn compensation_rules_use_profile() {
        assert_eq!(answer("What is your hourly rate?").answer, "45");
        assert_eq!(answer("What are your salary expectations?").answer, "95000");
    }

    #[test]
    fn identity_rules_use_profile() {
        assert_eq!(answer("What city do you live in?").answer, "London");
        assert_eq!(answer("GitHub profile URL").answer, "https://github.com/ada");
        assert_eq!(answer("What gender do you identify as?").answer, "Female");
        assert_eq!(answer("Are you a veteran?").answer, "I am not");
    }

    #[test]
    fn start_date_uses_injected_day() {
        let r = answer("What is the earliest start date? (mm/dd/yyyy)");
        assert_eq!(r.answer, "01/15/2025");
    }

    #[test]
    fn sponsorship_is_declined_and_authorization_affirmed() {
        assert_eq!(answer("Will you require sponsorship?").answer, "No");
        assert_eq!(
            answer("Are you legally authorized to work in the United States?").answer,
            "Yes"
        );
    }

    #[test]
    fn bank_append_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        let mut bank = AnswerBank::load(&path);
        bank.record("how many years", "5").unwrap();
        bank.record("how many years", "6").unwrap();
        assert_eq!(bank.lookup("how many years"), Some("5"));

        let text = std::fs::read_to_string(&path).unwrap();
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(rows.len(), 2, "header plus exactly one data row: {text:?}");
        assert_eq!(rows[0], "Question,Answer");
    }

    #[test]
    fn bank_survives_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        let mut bank = AnswerBank::load(&path);
        bank.record("do you like rust", "Yes").unwrap();
        drop(bank);

        let bank = AnswerBank::load(&path);
        assert_eq!(bank.lookup("do you like rust"), Some("Yes"));
        assert_eq!(bank.len(), 1);
    }

    #[test]
    fn bank_load_is_fail_soft() {
        // Unwritable location: the bank still works in memory.
        let path = Path::new("/nonexistent-dir/deeper/qa.csv");
        let bank = AnswerBank::load(path);
        assert!(bank.is_empty());
        assert_eq!(bank.lookup("anything"), None);
    }

    #[test]
    fn engine_answers_are_sticky_and_persist_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        let bank = AnswerBank::load(&path);
        let mut engine = AnswerEngine::with_rng(bank, test_profile(), StdRng::seed_from_u64(99));

        let first = engine.answer("How many years of experience with Go?");
        let second = engine.answer("how many years of experience with go?  ");
        assert_eq!(first.answer, second.answer);

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2, "header plus one row: {text:?}");
    }

    #[test]
    fn engine_prefers_recorded_answer_over_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.csv");
        let mut bank = AnswerBank::load(&path);
        bank.record("do you speak english?", "Fluently").unwrap();
        let mut engine = AnswerEngine::with_rng(bank, test_profile(), StdRng::seed_from_u64(1));
        assert_eq!(engine.answer("Do you speak English?").answer, "Fluently");
    }
}
