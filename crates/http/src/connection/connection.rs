use std::fmt;
use std::io::{ErrorKind, Read, Write};
use std::mem;

use bytes::{Buf, Bytes};
use http::HeaderMap;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace};

use crate::buffer::{Fill, SessionInputBuffer, SessionOutputBuffer};
use crate::codec::body::{PayloadDecoder, PayloadEncoder};
use crate::codec::head::{MessageParser, MessageWriter};
use crate::config::ConnectionConfig;
use crate::connection::event::{InputEvent, OutputEvent};
use crate::connection::metrics::ConnectionMetrics;
use crate::connection::role::{ClientRole, Role, ServerRole};
use crate::ensure;
use crate::protocol::{HttpError, ParseError, PayloadItem, RequestHeader, ResponseHead, SendError, StateError, TransferCoding};
use crate::session::{EventMask, Session};

pub type ServerConnection<S> = Connection<S, ServerRole>;
pub type ClientConnection<S> = Connection<S, ClientRole>;

/// Lifecycle of a connection, it only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Active,
    /// Closed once the buffered output has been flushed
    Closing,
    Closed,
}

#[derive(Debug)]
enum InputState {
    AwaitingMessage,
    StreamingBody(PayloadDecoder),
}

#[derive(Debug)]
enum OutputState {
    Idle,
    StreamingBody(PayloadEncoder),
}

/// A non-blocking HTTP/1.1 connection bound to a [`Session`].
///
/// The connection never waits for I/O. The reactor calls
/// [`consume_input`](Self::consume_input) when the session is readable and
/// [`produce_output`](Self::produce_output) when it is writable; both return
/// an event describing what happened, and the caller decides what to do
/// next: read the body, submit a message, write a body, close.
///
/// Incoming messages are strictly sequenced. The next head is not parsed
/// before the body of the current one has been read to its end.
pub struct Connection<S: Session, R: Role> {
    session: S,
    role: R,
    config: ConnectionConfig,
    input: SessionInputBuffer,
    output: SessionOutputBuffer,
    parser: MessageParser<R::Parser>,
    writer: MessageWriter<R::Formatter>,
    input_state: InputState,
    output_state: OutputState,
    status: ConnectionStatus,
    metrics: ConnectionMetrics,
    footers: Option<HeaderMap>,
}

impl<S: Session, R: Role + Default> Connection<S, R> {
    pub fn new(session: S, config: ConnectionConfig) -> Self {
        Self::with_role(session, R::default(), config)
    }
}

impl<S: Session, R: Role> Connection<S, R> {
    pub fn with_role(mut session: S, role: R, config: ConnectionConfig) -> Self {
        session.set_event(EventMask::READ);
        Self {
            session,
            role,
            config,
            input: SessionInputBuffer::with_capacity(config.input_buffer_size()),
            output: SessionOutputBuffer::with_capacity(config.output_buffer_size()),
            parser: MessageParser::new(<R::Parser as Default>::default(), config.constraints()),
            writer: MessageWriter::new(<R::Formatter as Default>::default()),
            input_state: InputState::AwaitingMessage,
            output_state: OutputState::Idle,
            status: ConnectionStatus::Active,
            metrics: ConnectionMetrics::default(),
            footers: None,
        }
    }

    /// Handles read readiness.
    ///
    /// Between messages, reads and parses until a whole head is available
    /// or the channel has nothing more to offer. While a body is being
    /// received it only fills the input buffer and reports
    /// [`InputEvent::InputReady`]; the body itself is pulled with
    /// [`read_body`](Self::read_body).
    ///
    /// Protocol errors discard the partially parsed message, I/O errors
    /// leave the parse state alone.
    pub fn consume_input(&mut self) -> InputEvent<R::Incoming> {
        if self.status != ConnectionStatus::Active {
            self.session.clear_event(EventMask::READ);
            return InputEvent::Idle;
        }

        if let InputState::StreamingBody(decoder) = &self.input_state {
            // the end of the body is still to be read
            if decoder.is_completed() {
                return InputEvent::InputReady;
            }
            return match self.input.fill(self.session.channel()) {
                Ok(Fill::Read(0)) if !self.input.has_data() => InputEvent::Idle,
                Ok(_) => InputEvent::InputReady,
                Err(e) => {
                    error!(cause = %e, "failed to read message body");
                    InputEvent::Error(ParseError::io(e).into())
                }
            };
        }

        match self.receive_message() {
            Ok(Some(head)) => InputEvent::MessageReceived(head),
            Ok(None) if self.input.is_eof() => {
                debug!("peer closed the connection");
                self.close();
                InputEvent::Closed
            }
            Ok(None) => InputEvent::Idle,
            Err(e) => {
                if !e.is_io() {
                    self.reset_input();
                }
                error!(cause = %e, kind = R::INCOMING.as_str(), "failed to receive message");
                InputEvent::Error(e)
            }
        }
    }

    fn receive_message(&mut self) -> Result<Option<R::Incoming>, HttpError> {
        let head = loop {
            if self.input.is_eof() {
                break self.parser.decode_eof(self.input.buffer_mut())?;
            }

            if let Some(head) = self.parser.decode(self.input.buffer_mut())? {
                break Some(head);
            }

            if let Fill::Read(0) = self.input.fill(self.session.channel()).map_err(ParseError::io)? {
                break None;
            }
        };

        let Some(head) = head else {
            return Ok(None);
        };

        self.metrics.record_message(R::INCOMING);
        match self.prepare_decoder(&head)? {
            Some(decoder) => {
                debug!(kind = R::INCOMING.as_str(), coding = ?decoder.coding(), "received message head");
                self.input_state = InputState::StreamingBody(decoder);
            }
            None => {
                debug!(kind = R::INCOMING.as_str(), "received message without body");
                self.reset_input();
            }
        }
        Ok(Some(head))
    }

    /// Pulls the next piece of the incoming body, buffered bytes first, then
    /// from the channel.
    ///
    /// Returns `Ok(None)` when no bytes are available right now. The end of
    /// the body is reported as [`PayloadItem::Eof`], after which the
    /// connection awaits the next message.
    pub fn read_body(&mut self) -> Result<Option<PayloadItem>, HttpError> {
        let InputState::StreamingBody(decoder) = &mut self.input_state else {
            return Err(StateError::NoBodyInProgress.into());
        };

        let result = decode_body(decoder, &mut self.input, &mut self.session);
        match &result {
            Ok(Some(PayloadItem::Eof)) => {
                self.footers = decoder.take_footers();
                trace!(kind = R::INCOMING.as_str(), "received message body");
                self.reset_input();
            }
            Err(ParseError::Io { .. }) => {}
            Err(e) => {
                error!(cause = %e, "failed to read message body");
                self.reset_input();
            }
            Ok(_) => {}
        }
        result.map_err(HttpError::from)
    }

    /// Copies the incoming body into `dst` for as long as bytes are
    /// available, returning the number of bytes copied by this call.
    pub fn transfer_body_to<W: Write + ?Sized>(&mut self, dst: &mut W) -> Result<u64, HttpError> {
        let mut transferred = 0;
        while let Some(PayloadItem::Chunk(bytes)) = self.read_body()? {
            dst.write_all(&bytes).map_err(ParseError::io)?;
            transferred += bytes.len() as u64;
        }
        Ok(transferred)
    }

    /// Handles write readiness: flushes buffered output and reports what
    /// may happen next.
    ///
    /// [`OutputEvent::ReadyForMessage`] is only reported with no body in
    /// flight and nothing left in the buffer.
    pub fn produce_output(&mut self) -> OutputEvent {
        if self.status == ConnectionStatus::Closed {
            self.session.clear_event(EventMask::WRITE);
            return OutputEvent::Closed;
        }

        if let Err(e) = self.output.flush(self.session.channel()) {
            error!(cause = %e, "failed to flush output");
            return OutputEvent::Error(SendError::io(e).into());
        }

        if self.output.has_data() {
            self.session.set_event(EventMask::WRITE);
            return OutputEvent::Pending;
        }

        if self.status == ConnectionStatus::Closing {
            self.session.clear_event(EventMask::WRITE);
            self.session.close();
            self.status = ConnectionStatus::Closed;
            self.reset_output();
            debug!("output flushed, connection closed");
            return OutputEvent::Closed;
        }

        match self.output_state {
            OutputState::StreamingBody(_) => OutputEvent::OutputReady,
            OutputState::Idle => {
                self.session.clear_event(EventMask::WRITE);
                OutputEvent::ReadyForMessage
            }
        }
    }

    fn submit(&mut self, head: &R::Outgoing) -> Result<(), HttpError> {
        ensure!(self.status == ConnectionStatus::Active, StateError::NotActive.into());
        ensure!(
            matches!(self.output_state, OutputState::Idle),
            StateError::AlreadySubmitted(R::OUTGOING.as_str()).into()
        );

        let encoder = self.prepare_encoder(head)?;
        self.writer.encode(head, self.output.buffer_mut())?;
        self.metrics.record_message(R::OUTGOING);

        match encoder {
            Some(encoder) => {
                debug!(kind = R::OUTGOING.as_str(), coding = ?encoder.coding(), "submitted message head");
                self.output_state = OutputState::StreamingBody(encoder);
            }
            None => debug!(kind = R::OUTGOING.as_str(), "submitted message without body"),
        }

        self.session.set_event(EventMask::WRITE);
        Ok(())
    }

    /// Encodes as much of `src` as the body encoder and the free output
    /// space allow, returning the number of bytes taken from `src`.
    ///
    /// A length-delimited body completes on its own once its last byte has
    /// been written.
    pub fn write_body<B: Buf>(&mut self, src: &mut B) -> Result<usize, HttpError> {
        ensure!(self.status == ConnectionStatus::Active, StateError::NotActive.into());
        let OutputState::StreamingBody(encoder) = &mut self.output_state else {
            return Err(StateError::NoBodyInProgress.into());
        };

        self.output.flush(self.session.channel()).map_err(SendError::io)?;

        let len = encoder.writable(self.output.available()).min(src.remaining());
        if len > 0 {
            encoder.encode(PayloadItem::Chunk(Buf::take(&mut *src, len)), self.output.buffer_mut())?;
        }
        let completed = encoder.is_completed().then(|| encoder.coding());

        self.output.flush(self.session.channel()).map_err(SendError::io)?;
        self.session.set_event(EventMask::WRITE);
        trace!(len, buffered = self.output.len(), "wrote body bytes");

        if let Some(coding) = completed {
            self.body_sent(coding);
        }
        Ok(len)
    }

    /// Ends the outgoing body.
    ///
    /// # Errors
    ///
    /// [`SendError::InvalidBody`] if a declared content length has not been
    /// written in full.
    pub fn complete_body(&mut self) -> Result<(), HttpError> {
        ensure!(self.status == ConnectionStatus::Active, StateError::NotActive.into());
        let OutputState::StreamingBody(encoder) = &mut self.output_state else {
            return Err(StateError::NoBodyInProgress.into());
        };

        encoder.encode(PayloadItem::<Bytes>::Eof, self.output.buffer_mut())?;
        let coding = encoder.coding();

        self.session.set_event(EventMask::WRITE);
        self.body_sent(coding);
        Ok(())
    }

    /// Reads from `src` straight into the outgoing body until the source is
    /// exhausted or would block, or the output buffer is full.
    ///
    /// Returns the number of bytes transferred by this call. The body is not
    /// completed when the source is exhausted, unless it is
    /// length-delimited and the declared length has been reached.
    pub fn transfer_body_from<Rd: Read + ?Sized>(&mut self, src: &mut Rd) -> Result<u64, HttpError> {
        ensure!(matches!(self.output_state, OutputState::StreamingBody(_)), StateError::NoBodyInProgress.into());

        let mut chunk = vec![0; self.output.capacity()];
        let mut transferred = 0;

        while let OutputState::StreamingBody(encoder) = &self.output_state {
            self.output.flush(self.session.channel()).map_err(SendError::io)?;

            let len = encoder.writable(self.output.available()).min(chunk.len());
            if len == 0 {
                break;
            }

            let read = match src.read(&mut chunk[..len]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(SendError::io(e).into()),
            };

            transferred += self.write_body(&mut &chunk[..read])? as u64;
        }

        Ok(transferred)
    }

    fn body_sent(&mut self, coding: TransferCoding) {
        trace!(kind = R::OUTGOING.as_str(), "sent message body");
        self.reset_output();
        if coding.is_identity() {
            // the body is delimited by the end of the connection
            self.close();
        }
    }

    /// Framing of a received message.
    pub fn prepare_decoder(&mut self, head: &R::Incoming) -> Result<Option<PayloadDecoder>, ParseError> {
        let coding = self.role.incoming_coding(head)?;
        Ok(coding.map(|coding| PayloadDecoder::new(coding, self.config.constraints())))
    }

    /// Framing of a message about to be sent.
    pub fn prepare_encoder(&mut self, head: &R::Outgoing) -> Result<Option<PayloadEncoder>, SendError> {
        Ok(self.role.outgoing_coding(head)?.map(PayloadEncoder::new))
    }

    /// Drops the incoming message in progress; buffered bytes are kept.
    pub fn reset_input(&mut self) {
        self.parser.reset();
        self.input_state = InputState::AwaitingMessage;
    }

    /// Drops the outgoing message in progress; buffered bytes are kept.
    pub fn reset_output(&mut self) {
        self.writer.reset();
        self.output_state = OutputState::Idle;
    }

    /// Graceful close. The session is closed right away if there is no
    /// buffered output, otherwise once [`produce_output`](Self::produce_output)
    /// has flushed it.
    pub fn close(&mut self) {
        if self.status != ConnectionStatus::Active {
            return;
        }

        if self.output.has_data() {
            self.status = ConnectionStatus::Closing;
            self.session.set_event(EventMask::WRITE);
            debug!(buffered = self.output.len(), "closing connection after flush");
        } else {
            self.session.close();
            self.status = ConnectionStatus::Closed;
            debug!("connection closed");
        }
    }

    /// Immediate close, buffered output is discarded.
    pub fn shutdown(&mut self) {
        if self.status == ConnectionStatus::Closed && self.session.is_closed() {
            return;
        }
        self.status = ConnectionStatus::Closed;
        self.input.clear();
        self.output.clear();
        self.session.shutdown();
        debug!("connection shut down");
    }

    /// Moves the connection to another session, everything else is kept.
    /// Returns the previous session.
    pub fn bind(&mut self, mut session: S) -> S {
        session.set_event(self.session.event_mask());
        mem::replace(&mut self.session, session)
    }

    pub fn has_buffered_input(&self) -> bool {
        self.input.has_data()
    }

    pub fn has_buffered_output(&self) -> bool {
        self.output.has_data()
    }

    pub fn is_receiving_body(&self) -> bool {
        matches!(self.input_state, InputState::StreamingBody(_))
    }

    pub fn is_sending_body(&self) -> bool {
        matches!(self.output_state, OutputState::StreamingBody(_))
    }

    /// Trailer fields of the last chunked body received.
    pub fn footers(&self) -> Option<&HeaderMap> {
        self.footers.as_ref()
    }

    pub fn metrics(&self) -> ConnectionMetrics {
        self.metrics.with_transport(self.input.transferred(), self.output.transferred())
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: Session, R: Role> fmt::Debug for Connection<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .field("input_state", &self.input_state)
            .field("output_state", &self.output_state)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("events", &self.session.event_mask())
            .finish_non_exhaustive()
    }
}

impl<S: Session> Connection<S, ServerRole> {
    /// Starts sending a response. A body, if the response encloses one, is
    /// then written with [`write_body`](Self::write_body).
    pub fn submit_response(&mut self, head: &ResponseHead) -> Result<(), HttpError> {
        self.submit(head)
    }
}

impl<S: Session> Connection<S, ClientRole> {
    /// Starts sending a request. A body, if the request encloses one, is
    /// then written with [`write_body`](Self::write_body).
    pub fn submit_request(&mut self, head: &RequestHeader) -> Result<(), HttpError> {
        self.submit(head)
    }
}

fn decode_body<S: Session>(
    decoder: &mut PayloadDecoder,
    input: &mut SessionInputBuffer,
    session: &mut S,
) -> Result<Option<PayloadItem>, ParseError> {
    loop {
        if input.is_eof() {
            return decoder.decode_eof(input.buffer_mut());
        }

        if let Some(item) = decoder.decode(input.buffer_mut())? {
            return Ok(Some(item));
        }

        if let Fill::Read(0) = input.fill(session.channel())? {
            return Ok(None);
        }
    }
}
