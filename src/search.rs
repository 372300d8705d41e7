use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::debug;

use crate::config::PostingAge;
use crate::models::JobCard;

/// Runaway guard: never try more position/location combinations than this,
/// no matter how large the configured cross-product is.
pub const MAX_COMBOS: usize = 500;

/// The full position x location cross-product in randomized order, capped.
pub fn search_combos(
    positions: &[String],
    locations: &[String],
    rng: &mut impl Rng,
) -> Vec<(String, String)> {
    let mut combos = Vec::with_capacity(positions.len() * locations.len());
    for position in positions {
        for location in locations {
            combos.push((position.clone(), location.clone()));
        }
    }
    combos.shuffle(rng);
    combos.truncate(MAX_COMBOS);
    combos
}

/// Results-page URL: Easy-Apply filter always on, pagination via `start`,
/// plus the optional experience-level and posting-age filters.
pub fn build_search_url(
    position: &str,
    location: &str,
    start: usize,
    experience_levels: &[u8],
    posting_age: PostingAge,
) -> String {
    let mut url = format!(
        "https://www.linkedin.com/jobs/search/?f_LF=f_AL&keywords={}&location={}&start={}",
        position, location, start
    );
    if !experience_levels.is_empty() {
        let codes = experience_levels
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");
        url.push_str("&f_E=");
        url.push_str(&codes);
    }
    url.push_str(posting_age.url_param());
    url
}

/// Direct URL of one job listing.
pub fn job_view_url(job_id: &str) -> String {
    format!("https://www.linkedin.com/jobs/view/{}", job_id)
}

/// Genuine listings carry a numeric identifier; promoted/sponsored cards
/// carry something else and are never worth opening.
pub fn is_job_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// Filter one page of cards down to the unique, unvisited job IDs worth
/// applying to. Blacklists match case-insensitively anywhere in the card
/// text, so they catch both company names and title keywords.
pub fn harvest_ids(
    cards: &[JobCard],
    company_blacklist: &[String],
    title_blacklist: &[String],
    visited: &HashSet<String>,
) -> Vec<String> {
    let mut ids = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for card in cards {
        if card.already_applied {
            debug!("Skipping already-applied card");
            continue;
        }
        if let Some(word) = banned_word(&card.text, company_blacklist)
            .or_else(|| banned_word(&card.text, title_blacklist))
        {
            debug!("Card contains blacklisted word '{}'", word);
            continue;
        }
        let Some(id) = card.job_id.as_deref() else {
            continue;
        };
        if !is_job_id(id) {
            debug!("Non-numeric job id '{}'; likely a promoted card", id);
            continue;
        }
        if visited.contains(id) {
            continue;
        }
        if seen.insert(id) {
            ids.push(id.to_string());
        }
    }
    ids
}

fn banned_word<'a>(text: &str, words: &'a [String]) -> Option<&'a str> {
    let lower = text.to_lowercase();
    words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .find(|w| lower.contains(&w.to_lowercase()))
        .map(String::as_str)
}
