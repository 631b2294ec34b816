//! A tokio-backed driver for connections.
//!
//! [`TcpSession`] implements [`Session`] over a tokio [`TcpStream`] using its
//! non-blocking `try_read`/`try_write`, and [`drive`] waits for the readiness
//! the session asks for, feeds it to the connection and hands the resulting
//! events to a [`Handler`].
//!
//! This is a plain adapter: it makes no keep-alive, routing or pooling
//! decisions of its own.

use std::io;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::Duration;

use http::Extensions;
use tokio::io::Interest;
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, error, warn};

use crate::config::ConnectionConfig;
use crate::connection::{Connection, ConnectionStatus, InputEvent, OutputEvent, Role};
use crate::protocol::HttpError;
use crate::session::{EventMask, Session};

/// Non-blocking byte channel over a tokio TCP stream.
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
}

impl Read for TcpChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.try_read(buf)
    }
}

impl Write for TcpChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.try_write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct TcpSession {
    channel: TcpChannel,
    events: EventMask,
    attributes: Extensions,
    timeout: Option<Duration>,
    closed: bool,
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
}

impl TcpSession {
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        let local_addr = stream.local_addr().ok();
        let remote_addr = stream.peer_addr().ok();

        Ok(Self {
            channel: TcpChannel { stream },
            events: EventMask::NONE,
            attributes: Extensions::new(),
            timeout: None,
            closed: false,
            local_addr,
            remote_addr,
        })
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn interest(&self) -> Interest {
        match (self.events.contains(EventMask::READ), self.events.contains(EventMask::WRITE)) {
            (true, true) => Interest::READABLE | Interest::WRITABLE,
            (false, true) => Interest::WRITABLE,
            // an idle session still watches for the peer going away
            (_, false) => Interest::READABLE,
        }
    }
}

impl Session for TcpSession {
    type Channel = TcpChannel;

    fn channel(&mut self) -> &mut TcpChannel {
        &mut self.channel
    }

    fn event_mask(&self) -> EventMask {
        self.events
    }

    fn set_event(&mut self, event: EventMask) {
        self.events.insert(event);
    }

    fn clear_event(&mut self, event: EventMask) {
        self.events.remove(event);
    }

    fn attributes(&mut self) -> &mut Extensions {
        &mut self.attributes
    }

    fn socket_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn set_socket_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// The stream itself is released when [`drive`] returns.
    fn close(&mut self) {
        self.closed = true;
        self.events = EventMask::NONE;
    }

    fn shutdown(&mut self) {
        self.close();
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// Callbacks invoked by [`drive`] for the events a connection reports.
///
/// Only [`message_received`](Handler::message_received) is required. A
/// handler that leaves an announced body unread, or ignores
/// [`output_ready`](Handler::output_ready) while a body is open, keeps the
/// connection busy spinning on readiness.
pub trait Handler<R: Role> {
    fn connected(&mut self, _connection: &mut Connection<TcpSession, R>) {}

    /// A message head has been received. Its body, if any, is read with
    /// [`Connection::read_body`] here or from [`input_ready`](Handler::input_ready).
    fn message_received(&mut self, connection: &mut Connection<TcpSession, R>, head: R::Incoming);

    fn input_ready(&mut self, _connection: &mut Connection<TcpSession, R>) {}

    fn output_ready(&mut self, _connection: &mut Connection<TcpSession, R>) {}

    fn ready_for_message(&mut self, _connection: &mut Connection<TcpSession, R>) {}

    /// Channel failures and misuse shut the connection down, anything else
    /// closes it gracefully.
    fn exception(&mut self, connection: &mut Connection<TcpSession, R>, error: &HttpError) {
        if error.is_io() || error.is_usage() {
            connection.shutdown();
        } else {
            connection.close();
        }
    }

    fn timeout(&mut self, connection: &mut Connection<TcpSession, R>) {
        connection.close();
    }

    fn closed(&mut self, _connection: &mut Connection<TcpSession, R>) {}
}

/// Runs a connection over `session` until it is closed.
///
/// [`Handler::closed`] is always called last, also when waiting for
/// readiness failed, in which case the error is returned.
pub async fn drive<R, H>(session: TcpSession, config: ConnectionConfig, handler: &mut H) -> io::Result<()>
where
    R: Role + Default,
    H: Handler<R>,
{
    let remote_addr = session.remote_addr();
    let mut connection = Connection::<TcpSession, R>::new(session, config);
    debug!(?remote_addr, kind = R::INCOMING.as_str(), "connection established");
    handler.connected(&mut connection);

    let result = run(&mut connection, handler).await;
    if let Err(e) = &result {
        error!(cause = %e, ?remote_addr, "connection failed");
        connection.shutdown();
    }

    handler.closed(&mut connection);
    debug!(?remote_addr, metrics = ?connection.metrics(), "connection finished");
    result
}

async fn run<R, H>(connection: &mut Connection<TcpSession, R>, handler: &mut H) -> io::Result<()>
where
    R: Role,
    H: Handler<R>,
{
    while connection.status() != ConnectionStatus::Closed {
        let session = connection.session();
        let ready = session.channel.stream.ready(session.interest());

        let ready = match session.socket_timeout() {
            Some(timeout) => {
                let result = time::timeout(timeout, ready).await;
                match result {
                    Ok(ready) => ready?,
                    Err(_) => {
                        warn!(?timeout, "socket timeout");
                        handler.timeout(connection);
                        continue;
                    }
                }
            }
            None => ready.await?,
        };

        if ready.is_readable() || ready.is_read_closed() {
            dispatch_input(connection, handler);
        }

        if ready.is_writable() && connection.status() != ConnectionStatus::Closed {
            dispatch_output(connection, handler);
        }
    }

    Ok(())
}

fn dispatch_input<R: Role, H: Handler<R>>(connection: &mut Connection<TcpSession, R>, handler: &mut H) {
    loop {
        match connection.consume_input() {
            InputEvent::MessageReceived(head) => handler.message_received(connection, head),
            InputEvent::InputReady => handler.input_ready(connection),
            InputEvent::Idle | InputEvent::Closed => return,
            InputEvent::Error(e) => {
                handler.exception(connection, &e);
                return;
            }
        }

        // pipelined messages already buffered get no further read readiness
        let next_buffered = connection.status() == ConnectionStatus::Active
            && !connection.is_receiving_body()
            && connection.has_buffered_input();
        if !next_buffered {
            return;
        }
    }
}

fn dispatch_output<R: Role, H: Handler<R>>(connection: &mut Connection<TcpSession, R>, handler: &mut H) {
    match connection.produce_output() {
        OutputEvent::Pending | OutputEvent::Closed => {}
        OutputEvent::OutputReady => handler.output_ready(connection),
        OutputEvent::ReadyForMessage => handler.ready_for_message(connection),
        OutputEvent::Error(e) => handler.exception(connection, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ClientRole, ServerRole};
    use crate::protocol::{PayloadItem, RequestHeader, ResponseHead};
    use bytes::{Buf, Bytes};
    use http::{header, Method, Request, Response, StatusCode};
    use tokio::net::TcpListener;

    /// Answers every request with its own body.
    #[derive(Debug, Default)]
    struct Echo {
        body: Vec<u8>,
        pending: Option<Bytes>,
        requests: usize,
        closed: bool,
    }

    impl Echo {
        fn pump_input(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
            loop {
                match connection.read_body() {
                    Ok(Some(PayloadItem::Chunk(bytes))) => self.body.extend_from_slice(&bytes),
                    Ok(Some(PayloadItem::Eof)) => return self.respond(connection),
                    Ok(None) => return,
                    Err(e) => return self.exception(connection, &e),
                }
            }
        }

        fn respond(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
            let body = Bytes::from(std::mem::take(&mut self.body));
            let head = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, body.len())
                .body(())
                .unwrap();
            connection.submit_response(&head).unwrap();

            if !body.is_empty() {
                self.pending = Some(body);
                self.pump_output(connection);
            }
        }

        fn pump_output(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
            if let Some(pending) = self.pending.as_mut() {
                connection.write_body(pending).unwrap();
                if !pending.has_remaining() {
                    self.pending = None;
                }
            }
        }
    }

    impl Handler<ServerRole> for Echo {
        fn message_received(&mut self, connection: &mut Connection<TcpSession, ServerRole>, _head: RequestHeader) {
            self.requests += 1;
            if connection.is_receiving_body() {
                self.pump_input(connection);
            } else {
                self.respond(connection);
            }
        }

        fn input_ready(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
            self.pump_input(connection);
        }

        fn output_ready(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
            self.pump_output(connection);
        }

        fn closed(&mut self, _connection: &mut Connection<TcpSession, ServerRole>) {
            self.closed = true;
        }
    }

    /// Sends one request, collects the response, then closes.
    #[derive(Debug, Default)]
    struct Fetch {
        request_body: &'static [u8],
        status: Option<StatusCode>,
        body: Vec<u8>,
    }

    impl Fetch {
        fn pump_input(&mut self, connection: &mut Connection<TcpSession, ClientRole>) {
            while let Some(item) = connection.read_body().unwrap() {
                match item {
                    PayloadItem::Chunk(bytes) => self.body.extend_from_slice(&bytes),
                    PayloadItem::Eof => return connection.close(),
                }
            }
        }
    }

    impl Handler<ClientRole> for Fetch {
        fn connected(&mut self, connection: &mut Connection<TcpSession, ClientRole>) {
            let head = Request::builder()
                .method(Method::POST)
                .uri("/echo")
                .header(header::HOST, "localhost")
                .header(header::TRANSFER_ENCODING, "chunked")
                .body(())
                .unwrap();
            connection.submit_request(&RequestHeader::from(head)).unwrap();

            for piece in self.request_body.chunks(4) {
                connection.write_body(&mut &piece[..]).unwrap();
            }
            connection.complete_body().unwrap();
        }

        fn message_received(&mut self, connection: &mut Connection<TcpSession, ClientRole>, head: ResponseHead) {
            self.status = Some(head.status());
            if connection.is_receiving_body() {
                self.pump_input(connection);
            } else {
                connection.close();
            }
        }

        fn input_ready(&mut self, connection: &mut Connection<TcpSession, ClientRole>) {
            self.pump_input(connection);
        }
    }

    #[tokio::test]
    async fn echo_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut echo = Echo::default();
            drive::<ServerRole, _>(TcpSession::new(stream).unwrap(), ConnectionConfig::default(), &mut echo)
                .await
                .unwrap();
            echo
        });

        let mut fetch = Fetch { request_body: b"a lot of various stuff", ..Fetch::default() };
        let stream = TcpStream::connect(addr).await.unwrap();
        let client = drive::<ClientRole, _>(TcpSession::new(stream).unwrap(), ConnectionConfig::default(), &mut fetch);
        time::timeout(Duration::from_secs(5), client).await.unwrap().unwrap();

        assert_eq!(fetch.status, Some(StatusCode::OK));
        assert_eq!(&fetch.body[..], b"a lot of various stuff");

        let echo = time::timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert_eq!(echo.requests, 1);
        assert!(echo.closed);
    }

    #[derive(Debug, Default)]
    struct Idle {
        timeouts: usize,
    }

    impl Handler<ServerRole> for Idle {
        fn message_received(&mut self, connection: &mut Connection<TcpSession, ServerRole>, _head: RequestHeader) {
            connection.shutdown();
        }

        fn timeout(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
            self.timeouts += 1;
            connection.close();
        }
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _peer = TcpStream::connect(addr).await.unwrap();

        let (stream, _) = listener.accept().await.unwrap();
        let session = TcpSession::new(stream).unwrap().with_socket_timeout(Duration::from_millis(50));
        assert!(session.remote_addr().is_some());

        let mut idle = Idle::default();
        let run = drive::<ServerRole, _>(session, ConnectionConfig::default(), &mut idle);
        time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();

        assert_eq!(idle.timeouts, 1);
    }
}
