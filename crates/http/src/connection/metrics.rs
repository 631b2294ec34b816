use crate::connection::role::MessageKind;

/// Transport and message counters of one connection. All counters only grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionMetrics {
    bytes_received: u64,
    bytes_sent: u64,
    requests: u64,
    responses: u64,
}

impl ConnectionMetrics {
    /// Bytes read from the channel.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }

    /// Bytes written to the channel.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Requests received by a server or submitted by a client.
    pub fn request_count(&self) -> u64 {
        self.requests
    }

    /// Responses submitted by a server or received by a client.
    pub fn response_count(&self) -> u64 {
        self.responses
    }

    pub(crate) fn record_message(&mut self, kind: MessageKind) {
        match kind {
            MessageKind::Request => self.requests += 1,
            MessageKind::Response => self.responses += 1,
        }
    }

    pub(crate) fn with_transport(mut self, bytes_received: u64, bytes_sent: u64) -> Self {
        self.bytes_received = bytes_received;
        self.bytes_sent = bytes_sent;
        self
    }
}
