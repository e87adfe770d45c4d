//! # Command Outcome
//!
//! What a command handler hands back to the host: events to raise before
//! the result, at most one result, and events to raise after it. The host
//! dispatches them in exactly that order.

/// Outcome of one `handle_command` call.
///
/// Built by the handler and moved into the host; never mutated after.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutcome<R, E> {
    pre_events: Vec<E>,
    result: Option<R>,
    post_events: Vec<E>,
}

impl<R, E> Default for CommandOutcome<R, E> {
    fn default() -> Self {
        Self {
            pre_events: Vec::new(),
            result: None,
            post_events: Vec::new(),
        }
    }
}

impl<R, E> CommandOutcome<R, E> {
    /// Outcome with nothing to dispatch.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Outcome carrying only a result.
    #[must_use]
    pub fn result(result: R) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    /// Builds an outcome from all three parts.
    #[must_use]
    pub fn new(pre_events: Vec<E>, result: Option<R>, post_events: Vec<E>) -> Self {
        Self {
            pre_events,
            result,
            post_events,
        }
    }

    /// Sets the result.
    #[must_use]
    pub fn with_result(mut self, result: R) -> Self {
        self.result = Some(result);
        self
    }

    /// Appends an event raised before the result.
    #[must_use]
    pub fn with_pre_event(mut self, event: E) -> Self {
        self.pre_events.push(event);
        self
    }

    /// Appends an event raised after the result.
    #[must_use]
    pub fn with_post_event(mut self, event: E) -> Self {
        self.post_events.push(event);
        self
    }

    /// Events before the result.
    #[must_use]
    pub fn pre_events(&self) -> &[E] {
        &self.pre_events
    }

    /// The result, if any.
    #[must_use]
    pub fn result_ref(&self) -> Option<&R> {
        self.result.as_ref()
    }

    /// Events after the result.
    #[must_use]
    pub fn post_events(&self) -> &[E] {
        &self.post_events
    }

    /// True if there is nothing to dispatch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre_events.is_empty() && self.result.is_none() && self.post_events.is_empty()
    }

    /// Splits into `(pre_events, result, post_events)`.
    #[must_use]
    pub fn into_parts(self) -> (Vec<E>, Option<R>, Vec<E>) {
        (self.pre_events, self.result, self.post_events)
    }
}
