use anyhow::{Context, Result};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use thirtyfour::Key;
use thirtyfour::error::WebDriverError;
use thirtyfour::prelude::*;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::answers::AnswerEngine;
use crate::apply::{self, SystemClock};
use crate::config::{Config, Uploads};
use crate::db::History;
use crate::form::{self, ControlProbe, FieldKind, Pick};
use crate::models::JobCard;
use crate::records::{self, ApplicationsSent, ResultsLog};
use crate::search;

/// Page locators, kept together so selector churn on the site stays a
/// one-file fix.
mod locator {
    pub const LOGIN_URL: &str =
        "https://www.linkedin.com/login?trk=guest_homepage-basic_nav-header-signin";
    pub const LOGIN_SUBMIT: &str = "//button[normalize-space(text())='Sign in']";
    pub const SECURITY_CHECK: &str = "//h1[contains(., 'security check')]";

    pub const SEARCH_RESULTS: &str = "jobs-search-results-list";
    pub const JOB_CARDS: &str = "//div[@data-job-id]";
    pub const CARD_APPLIED: &str = ".//div/ul/li[contains(@class, 'job-card-container__footer-job-state') and normalize-space(.)='Applied']";
    pub const CARD_DISMISS: &str = ".//button[starts-with(@aria-label, 'Dismiss')]";
    pub const EASY_APPLY: &str = "//button[contains(@class, 'jobs-apply-button')]";

    pub const NEXT: &str = "button[aria-label='Continue to next step']";
    pub const REVIEW: &str = "button[aria-label='Review your application']";
    pub const SUBMIT: &str = "button[aria-label='Submit application']";
    pub const CONTINUE_APPLYING: &str = "//button[contains(., 'Continue applying')]";
    pub const FOLLOW: &str = "label[for='follow-company-checkbox']";
    pub const ERROR_FEEDBACK: &str = "artdeco-inline-feedback__message";

    pub const FIELD_GROUPS: &str = "jobs-easy-apply-form-section__grouping";
    pub const RADIO: &str = ".//input[starts-with(@id, 'urn:li:fsd_formElement:urn:li:jobs_applyformcommon_easyApplyFormElement:') and @type='radio']";
    pub const MULTI_SELECT: &str = ".//select[starts-with(@id, 'text-entity-list-form-component-formElement-urn-li-jobs-applyformcommon-easyApplyFormElement-') and @required='']";
    pub const TEXT_INPUT: &str = ".//input[starts-with(@id, 'single-line-text-form-component-formElement-urn-li-jobs-applyformcommon-easyApplyFormElement-') and @type='text']";
    pub const FIELDSET_INPUTS: &str = ".//input[@type='checkbox' or @type='radio']";
    pub const AUTOCOMPLETE: &str = ".//input[@aria-autocomplete='list']";
    pub const TEXT_AREA: &str = ".//textarea";
    pub const DATE_INPUT: &str = ".//input[@placeholder='mm/dd/yyyy']";
    pub const TODAY_BUTTON: &str = ".//button[contains(@aria-label, 'This is today')]";
    pub const OPTION_ATTR: &str = "data-test-text-selectable-option__input";

    pub const UPLOAD_RESUME: &str = "//input[starts-with(@id, 'jobs-document-upload-file-input-upload-resume') and @type='file']";
    pub const UPLOAD_COVER: &str =
        "//*[contains(@id, 'jobs-document-upload-file-input-upload-cover-letter')]";
}

const SUCCESS_SIGNAL: &str = "application was sent";
const ALREADY_APPLIED_SIGNAL: &str = "You applied on";
const RESULTS_PAGE_SIZE: usize = 25;

pub struct Bot {
    driver: WebDriver,
    config: Config,
    engine: AnswerEngine,
    history: History,
    results: ResultsLog,
    sent: ApplicationsSent,
    visited: HashSet<String>,
    rng: StdRng,
}

impl Bot {
    pub async fn connect(config: Config, engine: AnswerEngine, history: History) -> Result<Self> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in [
            "--start-maximized",
            "--ignore-certificate-errors",
            "--no-sandbox",
            "--disable-extensions",
            "--disable-blink-features",
            "--disable-blink-features=AutomationControlled",
        ] {
            caps.add_arg(arg)?;
        }
        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .context("Failed to reach the WebDriver endpoint. Is chromedriver running?")?;

        let visited = history.applied_ids()?;
        info!("Loaded {} previously-processed jobs", visited.len());

        let results = ResultsLog::new(config.output_file.clone());
        let sent = ApplicationsSent::new(config.applications_file.clone());

        Ok(Self {
            driver,
            config,
            engine,
            history,
            results,
            sent,
            visited,
            rng: StdRng::from_entropy(),
        })
    }

    pub async fn login(&self) -> Result<()> {
        info!("Logging in... please wait");
        self.driver.goto(locator::LOGIN_URL).await?;
        sleep(Duration::from_secs(10)).await;

        let user_field = self
            .driver
            .find(By::Id("username"))
            .await
            .context("Login page did not present a username field")?;
        let pw_field = self
            .driver
            .find(By::Id("password"))
            .await
            .context("Login page did not present a password field")?;

        user_field
            .send_keys(&self.config.profile.account.username)
            .await?;
        sleep(Duration::from_millis(500)).await;
        pw_field
            .send_keys(&self.config.profile.account.password)
            .await?;
        sleep(Duration::from_secs(1)).await;

        match self.driver.find(By::XPath(locator::LOGIN_SUBMIT)).await {
            Ok(button) => button.click().await?,
            Err(_) => warn!("Sign-in button not found; assuming an existing session"),
        }

        // Grace window for manual 2FA / CAPTCHA approval.
        sleep(Duration::from_secs(20)).await;

        if self.is_present(By::XPath(locator::SECURITY_CHECK)).await {
            warn!("Security checkpoint detected; resolve it in the browser before continuing");
        }
        Ok(())
    }

    /// Work through the randomized position/location combinations until
    /// every budget is spent.
    pub async fn run(&mut self) -> Result<()> {
        let combos = search::search_combos(
            &self.config.positions,
            &self.config.locations,
            &mut self.rng,
        );
        info!("Trying {} position/location combinations", combos.len());

        // Park the window out of the way until a search starts.
        self.driver.minimize_window().await.ok();

        for (position, location) in combos {
            info!("Applying to '{}' in '{}'", position, location);
            if let Err(e) = self.search_pair(&position, &location).await {
                warn!("Search '{}' / '{}' failed: {:#}", position, location, e);
            }
        }
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.driver.quit().await?;
        Ok(())
    }

    async fn search_pair(&mut self, position: &str, location: &str) -> Result<()> {
        let budget = Duration::from_secs(self.config.max_search_minutes * 60);
        let started = Instant::now();
        let mut offset = 0usize;

        self.driver.maximize_window().await.ok();

        while started.elapsed() < budget {
            let remaining = budget.saturating_sub(started.elapsed());
            info!("{} minutes left in this search", remaining.as_secs() / 60);

            let url = search::build_search_url(
                position,
                location,
                offset,
                &self.config.experience_levels,
                self.config.posting_age,
            );
            // One bad page never ends the search.
            if let Err(e) = self.process_results_page(&url).await {
                warn!("Results page failed: {:#}; moving to the next page", e);
            }
            offset += RESULTS_PAGE_SIZE;

            let pause = Duration::from_secs_f64(self.rng.gen_range(1.5..2.9));
            debug!("Sleeping for {:.1}s", pause.as_secs_f64());
            sleep(pause).await;
        }
        info!("Search budget spent for '{}' in '{}'", position, location);
        Ok(())
    }

    async fn process_results_page(&mut self, url: &str) -> Result<()> {
        self.driver.goto(url).await?;
        self.scroll_page().await;
        self.scroll_results_pane().await;

        let cards = self.collect_cards().await?;
        let ids = search::harvest_ids(
            &cards,
            &self.config.company_blacklist,
            &self.config.title_blacklist,
            &self.visited,
        );
        if ids.is_empty() {
            debug!("No new jobs on this page");
            return Ok(());
        }
        info!("Found {} new jobs on this page", ids.len());
        for id in ids {
            match self.apply_to_job(&id).await {
                Ok(true) => info!("Applied to {}", id),
                Ok(false) => info!("Did not apply to {}", id),
                Err(e) => warn!("Applying to {} failed: {:#}", id, e),
            }
        }
        Ok(())
    }

    /// Open one listing and try to push an application through. Exactly one
    /// results-log row per job id, whatever happens.
    async fn apply_to_job(&mut self, job_id: &str) -> Result<bool> {
        if !self.visited.insert(job_id.to_string()) {
            debug!("Job {} already processed this run", job_id);
            return Ok(false);
        }

        self.driver.goto(&search::job_view_url(job_id)).await?;
        sleep(Duration::from_secs(1)).await;
        self.scroll_page().await;

        let window_title = self.driver.title().await.unwrap_or_default();
        let (job_title, company) = records::parse_window_title(&window_title);

        let mut attempted = false;
        let mut submitted = false;

        if contains_banned(&window_title, &self.config.title_blacklist) {
            info!("Skipping {}: blacklisted keyword in the job title", job_id);
        } else if let Some(button) = self.find_easy_apply().await {
            attempted = true;
            button
                .click()
                .await
                .context("Easy Apply button rejected the click")?;
            sleep(Duration::from_secs(1)).await;

            self.fill_phone_prepass().await;

            let mut flow = LiveFlow {
                driver: &self.driver,
                engine: &mut self.engine,
                rng: &mut self.rng,
                uploads: &self.config.uploads,
                follow_dismissed: false,
                uploads_staged: false,
            };
            submitted = match apply::drive(&mut flow, &SystemClock).await {
                Ok(outcome) => outcome.submitted(),
                Err(e) => {
                    warn!("Cannot apply to this job: {:#}", e);
                    false
                }
            };
        } else if self.page_contains(ALREADY_APPLIED_SIGNAL).await {
            info!("Already applied to {}", job_id);
        } else {
            info!("Job {} has no Easy Apply button", job_id);
        }

        let record = records::new_record(job_id, &job_title, &company, attempted, submitted);
        if let Err(e) = self.results.append(&record) {
            warn!("Failed to append results row: {:#}", e);
        }
        if let Err(e) = self
            .history
            .record(job_id, Some(&job_title), Some(&company), submitted)
        {
            warn!("Failed to record applied history: {:#}", e);
        }
        if submitted {
            if let Err(e) = self.sent.append(job_id, &job_title, &company) {
                warn!("Failed to append applications-sent row: {:#}", e);
            }
        }
        Ok(submitted)
    }

    async fn find_easy_apply(&self) -> Option<WebElement> {
        let buttons = self
            .driver
            .find_all(By::XPath(locator::EASY_APPLY))
            .await
            .ok()?;
        for button in buttons {
            let text = button.text().await.unwrap_or_default();
            if text.contains("Easy Apply") || text.contains("Continue applying") {
                return Some(button);
            }
        }
        None
    }

    /// The phone field is on nearly every first screen; fill it up front so
    /// single-screen applications submit without a dispatcher pass.
    async fn fill_phone_prepass(&self) {
        let Ok(groups) = self
            .driver
            .find_all(By::ClassName(locator::FIELD_GROUPS))
            .await
        else {
            return;
        };
        for group in groups {
            let text = group.text().await.unwrap_or_default();
            if text.contains("Mobile phone number") {
                if let Ok(input) = group.find(By::Tag("input")).await {
                    let _ = input.clear().await;
                    let _ = input.send_keys(&self.config.profile.phone).await;
                }
            }
        }
    }

    async fn collect_cards(&self) -> Result<Vec<JobCard>> {
        let elements = self.driver.find_all(By::XPath(locator::JOB_CARDS)).await?;
        let mut cards = Vec::with_capacity(elements.len());
        for element in elements {
            let job_id = element.attr("data-job-id").await.ok().flatten();
            let text = element.text().await.unwrap_or_default();
            let already_applied = element
                .find_all(By::XPath(locator::CARD_APPLIED))
                .await
                .map(|found| !found.is_empty())
                .unwrap_or(false);
            if already_applied {
                // Clear it from the list so later scroll passes surface new cards.
                if let Ok(dismiss) = element.find(By::XPath(locator::CARD_DISMISS)).await {
                    let _ = dismiss.click().await;
                }
            }
            cards.push(JobCard {
                job_id,
                text,
                already_applied,
            });
        }
        Ok(cards)
    }

    /// Walk the window down the page so lazy content renders, then return
    /// to the top.
    async fn scroll_page(&self) {
        for y in (0..4000).step_by(500) {
            let script = format!("window.scrollTo(0, {});", y);
            if self.driver.execute(&script, Vec::new()).await.is_err() {
                break;
            }
            sleep(Duration::from_millis(500)).await;
        }
        let _ = self.driver.execute("window.scrollTo(0, 0);", Vec::new()).await;
    }

    /// The results list is its own scroll container; walk it so every card
    /// on the page materializes.
    async fn scroll_results_pane(&self) {
        let Ok(panes) = self
            .driver
            .find_all(By::ClassName(locator::SEARCH_RESULTS))
            .await
        else {
            return;
        };
        let Some(pane) = panes.first() else {
            return;
        };
        for y in (300..5000).step_by(100) {
            let Ok(arg) = pane.to_json() else {
                return;
            };
            let script = format!("arguments[0].scrollTo(0, {});", y);
            if self.driver.execute(&script, vec![arg]).await.is_err() {
                break;
            }
            sleep(Duration::from_millis(500)).await;
        }
    }

    async fn is_present(&self, by: By) -> bool {
        self.driver
            .find_all(by)
            .await
            .map(|found| !found.is_empty())
            .unwrap_or(false)
    }

    async fn page_contains(&self, needle: &str) -> bool {
        self.driver
            .source()
            .await
            .map(|source| source.contains(needle))
            .unwrap_or(false)
    }
}

/// Live implementation of the screen surface the submission state machine
/// drives. Every probe treats element-not-found as "this screen does not
/// offer that action".
struct LiveFlow<'a> {
    driver: &'a WebDriver,
    engine: &'a mut AnswerEngine,
    rng: &'a mut StdRng,
    uploads: &'a Uploads,
    follow_dismissed: bool,
    uploads_staged: bool,
}

impl apply::ApplyFlow for LiveFlow<'_> {
    async fn stage_uploads(&mut self) -> Result<()> {
        if self.uploads_staged {
            return Ok(());
        }
        for (label, path, loc) in [
            ("resume", &self.uploads.resume, locator::UPLOAD_RESUME),
            ("cover letter", &self.uploads.cover_letter, locator::UPLOAD_COVER),
        ] {
            let Some(path) = path else { continue };
            let Ok(inputs) = self.driver.find_all(By::XPath(loc)).await else {
                continue;
            };
            let Some(input) = inputs.into_iter().next() else {
                continue;
            };
            let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            match input.send_keys(absolute.to_string_lossy().as_ref()).await {
                Ok(()) => {
                    info!("Attached {}", label);
                    self.uploads_staged = true;
                }
                Err(e) => warn!("Failed to attach {}: {}", label, e),
            }
        }
        Ok(())
    }

    async fn dismiss_follow_prompt(&mut self) -> Result<bool> {
        // The label stays in the DOM after the click, so only unfollow once
        // per application.
        if self.follow_dismissed {
            return Ok(false);
        }
        let Ok(labels) = self.driver.find_all(By::Css(locator::FOLLOW)).await else {
            return Ok(false);
        };
        if labels.is_empty() {
            return Ok(false);
        }
        for label in labels {
            if !click_element(self.driver, &label).await {
                warn!("Could not toggle the follow-company checkbox");
            }
        }
        info!("Unfollowed the company");
        self.follow_dismissed = true;
        Ok(true)
    }

    async fn try_submit(&mut self) -> Result<bool> {
        let Ok(buttons) = self.driver.find_all(By::Css(locator::SUBMIT)).await else {
            return Ok(false);
        };
        let Some(button) = buttons.into_iter().next() else {
            return Ok(false);
        };
        if !click_element(self.driver, &button).await {
            return Ok(false);
        }
        Ok(true)
    }

    async fn validation_error_present(&mut self) -> Result<bool> {
        Ok(self
            .driver
            .find_all(By::ClassName(locator::ERROR_FEEDBACK))
            .await
            .map(|found| !found.is_empty())
            .unwrap_or(false))
    }

    async fn submission_confirmed(&mut self) -> Result<bool> {
        Ok(self
            .driver
            .source()
            .await
            .map(|source| source.contains(SUCCESS_SIGNAL))
            .unwrap_or(false))
    }

    async fn reentry_offered(&mut self) -> Result<bool> {
        Ok(self
            .driver
            .find_all(By::XPath(locator::EASY_APPLY))
            .await
            .map(|found| !found.is_empty())
            .unwrap_or(false))
    }

    async fn answer_visible_fields(&mut self) -> Result<()> {
        sleep(Duration::from_secs(3)).await;

        let count = self
            .driver
            .find_all(By::ClassName(locator::FIELD_GROUPS))
            .await
            .map(|found| found.len())
            .unwrap_or(0);
        debug!("{} question groups on this screen", count);

        // Clearing pass: radios often come pre-selected and must be
        // explicitly overridden before the answering pass.
        for index in 0..count {
            if let Some(field) = self.field_at(index).await {
                if let Err(e) = clear_radios(self.driver, &field).await {
                    debug!("Could not clear radio group {}: {}", index, e);
                }
            }
        }
        sleep(Duration::from_secs(1)).await;

        for index in 0..count {
            // Re-fetch on every iteration; controls go stale after clicks.
            let Some(field) = self.field_at(index).await else {
                continue;
            };
            let question = match field.text().await {
                Ok(text) => text,
                Err(e) if is_stale(&e) => {
                    debug!("Field {} went stale; it will be retried next pass", index);
                    continue;
                }
                Err(e) => {
                    warn!("Could not read field {}: {}", index, e);
                    continue;
                }
            };

            let resolved = self.engine.answer(&question);
            if !resolved.auto {
                // Attended runs get a window to intervene by hand.
                sleep(Duration::from_secs(5)).await;
            }

            field.scroll_into_view().await.ok();

            let kind = form::classify(probe_controls(&field).await);
            debug!("Dispatching field {} as {:?}", index, kind);

            let outcome = match kind {
                FieldKind::Radio => self.fill_radio(&field, &resolved.answer).await,
                FieldKind::MultiSelect => self.fill_dropdown(&field, &resolved.answer).await,
                FieldKind::Text => {
                    self.fill_text(&field, By::XPath(locator::TEXT_INPUT), &resolved.answer)
                        .await
                }
                FieldKind::Autocomplete => self.fill_autocomplete(&field, &resolved.answer).await,
                FieldKind::TextArea => {
                    self.fill_text(&field, By::XPath(locator::TEXT_AREA), &resolved.answer)
                        .await
                }
                FieldKind::Fieldset => self.fill_fieldset(&field, &resolved.answer).await,
                FieldKind::Date => self.fill_date(&field, &resolved.answer).await,
                FieldKind::Unknown => {
                    info!("Unable to determine control type; leaving field unanswered");
                    Ok(())
                }
            };
            if let Err(e) = outcome {
                // Best effort: an unanswered field resurfaces as a
                // validation error and gets another pass.
                warn!("Failed to fill field {}: {:#}", index, e);
            }
        }
        Ok(())
    }

    async fn advance(&mut self) -> Result<bool> {
        for by in [
            By::Css(locator::NEXT),
            By::XPath(locator::CONTINUE_APPLYING),
            By::Css(locator::REVIEW),
        ] {
            let Ok(buttons) = self.driver.find_all(by).await else {
                continue;
            };
            let Some(button) = buttons.into_iter().next() else {
                continue;
            };
            if click_element(self.driver, &button).await {
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn settle(&mut self) {
        sleep(Duration::from_secs(2)).await;
    }
}

impl LiveFlow<'_> {
    async fn field_at(&self, index: usize) -> Option<WebElement> {
        self.driver
            .find_all(By::ClassName(locator::FIELD_GROUPS))
            .await
            .ok()?
            .into_iter()
            .nth(index)
    }

    async fn fill_radio(&mut self, field: &WebElement, answer: &str) -> Result<()> {
        let radios = field.find_all(By::XPath(locator::RADIO)).await?;
        if radios.is_empty() {
            return Ok(());
        }
        let mut values = Vec::with_capacity(radios.len());
        for radio in &radios {
            values.push(radio.attr("value").await.ok().flatten().unwrap_or_default());
        }
        let Some(pick) = form::pick_option(&values, answer, self.rng) else {
            return Ok(());
        };
        match pick {
            Pick::Exact(i) => info!("Radio selected: {}", values[i]),
            Pick::Contains(i) => info!("Closest radio selected: {}", values[i]),
            Pick::Random(i) => warn!("No suitable radio; picked at random: {}", values[i]),
        }
        js_click(self.driver, &radios[pick.index()]).await
    }

    async fn fill_dropdown(&mut self, field: &WebElement, answer: &str) -> Result<()> {
        const MAX_RETRIES: u32 = 5;
        for attempt in 1..=MAX_RETRIES {
            match self.try_fill_dropdown(field, answer).await {
                Ok(()) => return Ok(()),
                Err(e) if is_stale_error(&e) && attempt < MAX_RETRIES => {
                    warn!(
                        "Stale dropdown, retrying ({}/{})",
                        attempt, MAX_RETRIES
                    );
                    sleep(Duration::from_millis(500)).await;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    async fn try_fill_dropdown(&mut self, field: &WebElement, answer: &str) -> Result<()> {
        let select = field.find(By::XPath(locator::MULTI_SELECT)).await?;
        let options = select.find_all(By::Tag("option")).await?;
        if options.is_empty() {
            return Ok(());
        }
        let mut texts = Vec::with_capacity(options.len());
        for option in &options {
            texts.push(option.text().await.unwrap_or_default());
        }
        let index = form::pick_dropdown_option(&texts, answer).min(options.len() - 1);
        options[index].click().await?;
        info!("Option selected: {}", texts[index]);
        Ok(())
    }

    async fn fill_text(&self, field: &WebElement, by: By, answer: &str) -> Result<()> {
        let input = field.find(by).await?;
        input.clear().await?;
        sleep(Duration::from_millis(500)).await;
        input.send_keys(answer).await?;
        Ok(())
    }

    async fn fill_autocomplete(&self, field: &WebElement, answer: &str) -> Result<()> {
        let input = field.find(By::XPath(locator::AUTOCOMPLETE)).await?;
        input.clear().await?;
        input.send_keys(answer).await?;
        // Let the suggestion list populate, then take the top entry.
        sleep(Duration::from_secs(5)).await;
        input.send_keys(Key::Down + "").await?;
        input.send_keys(Key::Enter + "").await?;
        Ok(())
    }

    async fn fill_fieldset(&mut self, field: &WebElement, answer: &str) -> Result<()> {
        let inputs = field.find_all(By::XPath(locator::FIELDSET_INPUTS)).await?;
        if inputs.is_empty() {
            return Ok(());
        }
        let mut labels = Vec::with_capacity(inputs.len());
        for input in &inputs {
            labels.push(
                input
                    .attr(locator::OPTION_ATTR)
                    .await
                    .ok()
                    .flatten()
                    .unwrap_or_default(),
            );
        }
        let Some(pick) = form::pick_option(&labels, answer, self.rng) else {
            return Ok(());
        };
        let chosen = &inputs[pick.index()];
        // Prefer the native interaction; fall back to a synthetic click for
        // controls the driver refuses to touch.
        if let Err(e) = chosen.click().await {
            debug!("Native click rejected ({}); forcing a synthetic click", e);
            js_click(self.driver, chosen).await?;
        }
        info!("Fieldset option selected: {}", labels[pick.index()]);
        Ok(())
    }

    async fn fill_date(&self, field: &WebElement, answer: &str) -> Result<()> {
        let input = field.find(By::XPath(locator::DATE_INPUT)).await?;
        input.clear().await?;
        input.send_keys(answer).await?;
        sleep(Duration::from_secs(1)).await;
        input.click().await.ok();
        sleep(Duration::from_secs(1)).await;
        // A same-day quick-select sometimes pops up; confirm through it.
        if let Ok(button) = field.find(By::XPath(locator::TODAY_BUTTON)).await {
            button.click().await.ok();
        }
        Ok(())
    }
}

async fn probe_controls(field: &WebElement) -> ControlProbe {
    ControlProbe {
        radio: has_child(field, By::XPath(locator::RADIO)).await,
        multi_select: has_child(field, By::XPath(locator::MULTI_SELECT)).await,
        text_input: has_child(field, By::XPath(locator::TEXT_INPUT)).await,
        autocomplete: has_child(field, By::XPath(locator::AUTOCOMPLETE)).await,
        text_area: has_child(field, By::XPath(locator::TEXT_AREA)).await,
        fieldset: has_child(field, By::XPath(locator::FIELDSET_INPUTS)).await,
        date_input: has_child(field, By::XPath(locator::DATE_INPUT)).await,
    }
}

async fn has_child(field: &WebElement, by: By) -> bool {
    field
        .find_all(by)
        .await
        .map(|found| !found.is_empty())
        .unwrap_or(false)
}

async fn clear_radios(driver: &WebDriver, field: &WebElement) -> Result<()> {
    for radio in field.find_all(By::XPath(locator::RADIO)).await? {
        let arg = radio.to_json()?;
        driver
            .execute(
                "arguments[0].checked = false; arguments[0].dispatchEvent(new Event('change'));",
                vec![arg],
            )
            .await?;
    }
    Ok(())
}

async fn js_click(driver: &WebDriver, element: &WebElement) -> Result<()> {
    let arg = element.to_json()?;
    driver
        .execute(
            "arguments[0].click(); arguments[0].dispatchEvent(new Event('change'));",
            vec![arg],
        )
        .await?;
    Ok(())
}

async fn click_element(driver: &WebDriver, element: &WebElement) -> bool {
    if element.click().await.is_ok() {
        return true;
    }
    js_click(driver, element).await.is_ok()
}

fn is_stale(err: &WebDriverError) -> bool {
    matches!(err, WebDriverError::StaleElementReference(_))
}

fn is_stale_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<WebDriverError>()
        .map(is_stale)
        .unwrap_or(false)
}

fn contains_banned(text: &str, words: &[String]) -> bool {
    let lower = text.to_lowercase();
    words
        .iter()
        .filter(|w| !w.trim().is_empty())
        .any(|w| lower.contains(&w.to_lowercase()))
}
