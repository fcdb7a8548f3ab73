//! Resume-or-restart decision for a freshly opened media item.
//!
//! Pure state machine: the caller supplies the clock, the machine only says
//! where playback should start and when.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeState {
    NotStarted,
    /// Paused, waiting for the user. Resumes at `saved` once `deadline` passes.
    Prompting { saved: u64, deadline: Instant },
    Resumed(u64),
    Restarted,
    AutoResumedByTimeout(u64),
}

impl ResumeState {
    /// Position playback started from, once a decision exists.
    pub fn start_position(&self) -> Option<u64> {
        match *self {
            ResumeState::Resumed(pos) | ResumeState::AutoResumedByTimeout(pos) => Some(pos),
            ResumeState::Restarted => Some(0),
            ResumeState::NotStarted | ResumeState::Prompting { .. } => None,
        }
    }

    pub fn is_prompting(&self) -> bool {
        matches!(self, ResumeState::Prompting { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResumeState::NotStarted => "not started",
            ResumeState::Prompting { .. } => "waiting",
            ResumeState::Resumed(_) => "resumed",
            ResumeState::Restarted => "restarted",
            ResumeState::AutoResumedByTimeout(_) => "auto-resumed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeChoice {
    Resume,
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opening {
    /// Start right away at this position.
    StartAt(u64),
    /// Hold playback and ask.
    Prompt { saved: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumePolicy {
    pub threshold: Duration,
    pub prompt_timeout: Duration,
}

impl Default for ResumePolicy {
    fn default() -> Self {
        Self {
            threshold: Duration::from_secs(10),
            prompt_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
pub struct ResumeMachine {
    policy: ResumePolicy,
    state: ResumeState,
}

impl ResumeMachine {
    pub fn new(policy: ResumePolicy) -> Self {
        Self {
            policy,
            state: ResumeState::NotStarted,
        }
    }

    pub fn state(&self) -> ResumeState {
        self.state
    }

    pub fn policy(&self) -> ResumePolicy {
        self.policy
    }

    pub fn is_prompting(&self) -> bool {
        self.state.is_prompting()
    }

    /// Time left before an unanswered prompt resumes on its own.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.state {
            ResumeState::Prompting { deadline, .. } => Some(deadline.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Starts a new decision for `saved` seconds of prior progress.
    pub fn open(&mut self, saved: u64, now: Instant) -> Opening {
        if saved <= self.policy.threshold.as_secs() {
            self.state = ResumeState::Resumed(0);
            return Opening::StartAt(0);
        }
        self.state = ResumeState::Prompting {
            saved,
            deadline: now + self.policy.prompt_timeout,
        };
        Opening::Prompt { saved }
    }

    /// Applies the user's answer. Returns the start position, or `None` when
    /// no prompt is pending.
    pub fn choose(&mut self, choice: ResumeChoice) -> Option<u64> {
        let ResumeState::Prompting { saved, .. } = self.state else {
            return None;
        };
        self.state = match choice {
            ResumeChoice::Resume => ResumeState::Resumed(saved),
            ResumeChoice::Restart => ResumeState::Restarted,
        };
        self.state.start_position()
    }

    /// Fires the default once the prompt deadline has passed.
    pub fn poll_timeout(&mut self, now: Instant) -> Option<u64> {
        match self.state {
            ResumeState::Prompting { saved, deadline } if now >= deadline => {
                self.state = ResumeState::AutoResumedByTimeout(saved);
                Some(saved)
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = ResumeState::NotStarted;
    }
}
