//! Form submission state machine
//!
//! `Editing -> Submitting -> Succeeded`, with a failure returning to
//! `Editing` carrying a message. While submitting the draft is frozen and a
//! second submit is refused.

/// Where a form is in its submit cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitPhase {
    Editing { error: Option<String> },
    Submitting,
    Succeeded,
}

/// Draft plus submit phase for one form instance
#[derive(Debug, Clone)]
pub struct FormFlow<D> {
    draft: D,
    defaults: D,
    phase: SubmitPhase,
}

impl<D: Clone> FormFlow<D> {
    pub fn new(defaults: D) -> Self {
        Self {
            draft: defaults.clone(),
            defaults,
            phase: SubmitPhase::Editing { error: None },
        }
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    /// Mutable access for editing. `None` while a submission is in flight.
    ///
    /// Touching the draft clears a previous failure message.
    pub fn draft_mut(&mut self) -> Option<&mut D> {
        match self.phase {
            SubmitPhase::Submitting => None,
            SubmitPhase::Editing { .. } | SubmitPhase::Succeeded => {
                self.phase = SubmitPhase::Editing { error: None };
                Some(&mut self.draft)
            }
        }
    }

    /// Enter `Submitting` and hand out the values to send.
    ///
    /// Returns `None` if a submission is already in flight.
    pub fn begin_submit(&mut self) -> Option<D> {
        if self.is_submitting() {
            return None;
        }
        self.phase = SubmitPhase::Submitting;
        Some(self.draft.clone())
    }

    /// Remote call returned 2xx
    pub fn succeed(&mut self, reset_draft: bool) {
        if reset_draft {
            self.draft = self.defaults.clone();
        }
        self.phase = SubmitPhase::Succeeded;
    }

    /// Remote call failed; the draft is kept as it was
    pub fn fail(&mut self, message: String) {
        self.phase = SubmitPhase::Editing {
            error: Some(message),
        };
    }

    pub fn phase(&self) -> &SubmitPhase {
        &self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == SubmitPhase::Submitting
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            SubmitPhase::Editing { error } => error.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewExpenditure;

    fn filled() -> FormFlow<NewExpenditure> {
        let mut flow = FormFlow::new(NewExpenditure::default());
        let draft = flow.draft_mut().unwrap();
        draft.amount = "150.50".to_string();
        draft.description = "Cement".to_string();
        flow
    }

    #[test]
    fn test_second_submit_is_a_no_op() {
        let mut flow = filled();
        let sent = flow.begin_submit().unwrap();
        assert_eq!(sent.amount, "150.50");
        assert!(flow.begin_submit().is_none());
        assert!(flow.is_submitting());
    }

    #[test]
    fn test_draft_frozen_while_submitting() {
        let mut flow = filled();
        flow.begin_submit();
        assert!(flow.draft_mut().is_none());
    }

    #[test]
    fn test_failure_preserves_draft_exactly() {
        let mut flow = filled();
        let before = flow.draft().clone();
        flow.begin_submit();
        flow.fail("The amount must be at least 1.".to_string());

        assert_eq!(flow.draft(), &before);
        assert_eq!(flow.error(), Some("The amount must be at least 1."));
        assert!(!flow.is_submitting());

        // Editing again clears the message; resubmitting is allowed
        flow.draft_mut().unwrap().description.push('!');
        assert_eq!(flow.error(), None);
        assert!(flow.begin_submit().is_some());
    }

    #[test]
    fn test_success_can_reset_to_defaults() {
        let mut flow = filled();
        flow.begin_submit();
        flow.succeed(true);
        assert_eq!(flow.phase(), &SubmitPhase::Succeeded);
        assert_eq!(flow.draft(), &NewExpenditure::default());

        let mut kept = filled();
        kept.begin_submit();
        kept.succeed(false);
        assert_eq!(kept.draft().description, "Cement");
    }
}
