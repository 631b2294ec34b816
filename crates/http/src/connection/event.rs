use crate::protocol::HttpError;

/// What a call to `consume_input` did.
#[derive(Debug)]
pub enum InputEvent<M> {
    /// Nothing to report, wait for the next read readiness
    Idle,
    /// A message head has been received; a body, if any, can now be read
    MessageReceived(M),
    /// Body bytes are available to the active decoder
    InputReady,
    /// The peer closed the channel between messages
    Closed,
    Error(HttpError),
}

/// What a call to `produce_output` did.
#[derive(Debug)]
pub enum OutputEvent {
    /// Buffered output is still waiting for the channel
    Pending,
    /// The body encoder is active and there is room for more body bytes
    OutputReady,
    /// Nothing in flight, the next message may be submitted
    ReadyForMessage,
    /// All output is flushed and the session has been closed
    Closed,
    Error(HttpError),
}

impl<M> InputEvent<M> {
    pub fn is_error(&self) -> bool {
        matches!(self, InputEvent::Error(_))
    }
}

impl OutputEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, OutputEvent::Error(_))
    }
}
