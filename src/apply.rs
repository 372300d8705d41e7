use anyhow::Result;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Wall-clock budget for one application, measured from state-machine entry
/// and independent of which screen we are stuck on.
pub const SUBMIT_BUDGET: Duration = Duration::from_secs(300);

pub trait Clock {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Submitted,
    Aborted(AbortReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The 5-minute budget elapsed without a terminal screen.
    Timeout,
    /// The apply entry point reappeared: the flow reset out from under us.
    FlowReset,
}

impl Outcome {
    pub fn submitted(self) -> bool {
        matches!(self, Outcome::Submitted)
    }
}

/// The surface one application screen offers the state machine. Absence of
/// a control is the normal branching signal here, so every probe is a bool
/// and never an error; implementations swallow element-not-found.
pub trait ApplyFlow {
    /// Attach configured documents to any upload inputs on this screen.
    async fn stage_uploads(&mut self) -> Result<()>;
    /// Dismiss the follow-company prompt if present. Actively opts out of
    /// following rather than accepting the pre-checked default.
    async fn dismiss_follow_prompt(&mut self) -> Result<bool>;
    /// Activate the submit control if present; true when clicked.
    async fn try_submit(&mut self) -> Result<bool>;
    async fn validation_error_present(&mut self) -> Result<bool>;
    /// Page-level signal that the application already went through.
    async fn submission_confirmed(&mut self) -> Result<bool>;
    /// The "open a new application" entry point is visible again.
    async fn reentry_offered(&mut self) -> Result<bool>;
    /// One dispatcher pass over every currently-visible question.
    async fn answer_visible_fields(&mut self) -> Result<()>;
    /// Activate the first of next / continue-applying / review, in that
    /// priority order; true when one was clicked.
    async fn advance(&mut self) -> Result<bool>;
    /// Fixed settle delay between iterations.
    async fn settle(&mut self);
}

/// Drive the multi-screen flow to a terminal state. Screen order is
/// unknown in advance; each iteration re-reads the page and takes the
/// highest-priority action present.
pub async fn drive<F: ApplyFlow>(flow: &mut F, clock: &impl Clock) -> Result<Outcome> {
    let start = clock.now();

    loop {
        if clock.now().duration_since(start) >= SUBMIT_BUDGET {
            info!("Submission budget elapsed; abandoning this application");
            return Ok(Outcome::Aborted(AbortReason::Timeout));
        }

        flow.settle().await;
        flow.stage_uploads().await?;

        if flow.dismiss_follow_prompt().await? {
            continue;
        }

        if flow.try_submit().await? {
            info!("Application submitted");
            return Ok(Outcome::Submitted);
        }

        if flow.validation_error_present().await? {
            if flow.submission_confirmed().await? {
                info!("Application submitted");
                return Ok(Outcome::Submitted);
            }
            // Unanswered or rejected questions: keep re-running the field
            // pass until the page confirms, the flow resets, or the budget
            // runs out.
            loop {
                if clock.now().duration_since(start) >= SUBMIT_BUDGET {
                    info!("Submission budget elapsed while resolving questions");
                    return Ok(Outcome::Aborted(AbortReason::Timeout));
                }
                flow.answer_visible_fields().await?;
                if flow.submission_confirmed().await? {
                    info!("Application submitted");
                    return Ok(Outcome::Submitted);
                }
                if flow.reentry_offered().await? {
                    return Ok(Outcome::Aborted(AbortReason::FlowReset));
                }
                flow.settle().await;
            }
        }

        if !flow.advance().await? {
            debug!("No actionable control on this screen yet");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Screen {
        Follow,
        Next,
        Review,
        SubmitReady,
        Error { resolvable: bool },
    }

    #[derive(Clone)]
    struct FakeClock {
        base: Instant,
        offset: Rc<Cell<Duration>>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Rc::new(Cell::new(Duration::ZERO)),
            }
        }

        fn tick(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + self.offset.get()
        }
    }

    struct ScriptedFlow {
        script: Vec<Screen>,
        pos: usize,
        fill_passes: u32,
        follows_dismissed: u32,
        reset_after_fill: bool,
        clock: FakeClock,
        tick: Duration,
    }

    impl ScriptedFlow {
        fn new(script: Vec<Screen>, clock: FakeClock) -> Self {
            Self {
                script,
                pos: 0,
                fill_passes: 0,
                follows_dismissed: 0,
                reset_after_fill: false,
                clock,
                tick: Duration::from_secs(10),
            }
        }

        fn current(&self) -> Option<Screen> {
            self.script.get(self.pos).copied()
        }
    }

    impl ApplyFlow for ScriptedFlow {
        async fn stage_uploads(&mut self) -> Result<()> {
            Ok(())
        }

        async fn dismiss_follow_prompt(&mut self) -> Result<bool> {
            if self.current() == Some(Screen::Follow) {
                self.follows_dismissed += 1;
                self.pos += 1;
                return Ok(true);
            }
            Ok(false)
        }

        async fn try_submit(&mut self) -> Result<bool> {
            Ok(self.current() == Some(Screen::SubmitReady))
        }

        async fn validation_error_present(&mut self) -> Result<bool> {
            Ok(matches!(self.current(), Some(Screen::Error { .. })))
        }

        async fn submission_confirmed(&mut self) -> Result<bool> {
            Ok(matches!(
                self.current(),
                Some(Screen::Error { resolvable: true })
            ) && self.fill_passes > 0)
        }

        async fn reentry_offered(&mut self) -> Result<bool> {
            Ok(self.reset_after_fill && self.fill_passes > 0)
        }

        async fn answer_visible_fields(&mut self) -> Result<()> {
            self.fill_passes += 1;
            Ok(())
        }

        async fn advance(&mut self) -> Result<bool> {
            match self.current() {
                Some(Screen::Next | Screen::Review) => {
                    self.pos += 1;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn settle(&mut self) {
            self.clock.tick(self.tick);
        }
    }

    #[tokio::test]
    async fn converges_through_next_and_resolvable_error() {
        let clock = FakeClock::new();
        let script = vec![
            Screen::Next,
            Screen::Next,
            Screen::Error { resolvable: true },
            Screen::SubmitReady,
        ];
        let mut flow = ScriptedFlow::new(script, clock.clone());
        let outcome = drive(&mut flow, &clock).await.unwrap();
        assert_eq!(outcome, Outcome::Submitted);
        assert!(flow.fill_passes >= 1);
    }

    #[tokio::test]
    async fn submits_directly_when_ready() {
        let clock = FakeClock::new();
        let mut flow = ScriptedFlow::new(vec![Screen::Review, Screen::SubmitReady], clock.clone());
        let outcome = drive(&mut flow, &clock).await.unwrap();
        assert!(outcome.submitted());
    }

    #[tokio::test]
    async fn unfollows_company_before_submitting() {
        let clock = FakeClock::new();
        let mut flow = ScriptedFlow::new(vec![Screen::Follow, Screen::SubmitReady], clock.clone());
        let outcome = drive(&mut flow, &clock).await.unwrap();
        assert_eq!(outcome, Outcome::Submitted);
        assert_eq!(flow.follows_dismissed, 1);
    }

    #[tokio::test]
    async fn unresolvable_error_aborts_on_budget() {
        let clock = FakeClock::new();
        let script = vec![Screen::Error { resolvable: false }];
        let mut flow = ScriptedFlow::new(script, clock.clone());
        let outcome = drive(&mut flow, &clock).await.unwrap();
        assert_eq!(outcome, Outcome::Aborted(AbortReason::Timeout));
        assert!(!outcome.submitted());
        assert!(flow.fill_passes > 1, "kept retrying until the budget ran out");
    }

    #[tokio::test]
    async fn flow_reset_aborts_without_waiting_for_budget() {
        let clock = FakeClock::new();
        let script = vec![Screen::Error { resolvable: false }];
        let mut flow = ScriptedFlow::new(script, clock.clone());
        flow.reset_after_fill = true;
        let outcome = drive(&mut flow, &clock).await.unwrap();
        assert_eq!(outcome, Outcome::Aborted(AbortReason::FlowReset));
        assert_eq!(flow.fill_passes, 1);
    }

    #[tokio::test]
    async fn empty_screen_times_out_instead_of_hanging() {
        let clock = FakeClock::new();
        let mut flow = ScriptedFlow::new(vec![], clock.clone());
        let outcome = drive(&mut flow, &clock).await.unwrap();
        assert_eq!(outcome, Outcome::Aborted(AbortReason::Timeout));
    }
}
