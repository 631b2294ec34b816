//! Echoes every request body back to the client.
//!
//! ```sh
//! cargo run --example echo_server
//! curl -v -H "Transfer-Encoding: chunked" -d "hello" http://127.0.0.1:8080/
//! ```

use bytes::{Buf, Bytes, BytesMut};
use http::{header, Response, StatusCode};
use nio_http::config::ConnectionConfig;
use nio_http::connection::{Connection, ServerRole};
use nio_http::protocol::{HttpError, PayloadItem, RequestHeader};
use nio_http::reactor::{drive, Handler, TcpSession};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Default)]
struct Echo {
    body: BytesMut,
    pending: Bytes,
}

impl Echo {
    fn read(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
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
        self.pending = self.body.split().freeze();
        let response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_LENGTH, self.pending.len())
            .body(())
            .expect("valid response head");

        if let Err(e) = connection.submit_response(&response) {
            return self.exception(connection, &e);
        }
        self.write(connection);
    }

    fn write(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
        if !self.pending.has_remaining() || !connection.is_sending_body() {
            return;
        }
        if let Err(e) = connection.write_body(&mut self.pending) {
            self.exception(connection, &e);
        }
    }
}

impl Handler<ServerRole> for Echo {
    fn message_received(&mut self, connection: &mut Connection<TcpSession, ServerRole>, head: RequestHeader) {
        info!(method = %head.method(), uri = %head.uri(), "request received");
        if connection.is_receiving_body() {
            self.read(connection);
        } else {
            self.respond(connection);
        }
    }

    fn input_ready(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
        self.read(connection);
    }

    fn output_ready(&mut self, connection: &mut Connection<TcpSession, ServerRole>) {
        self.write(connection);
    }

    fn exception(&mut self, connection: &mut Connection<TcpSession, ServerRole>, error: &HttpError) {
        warn!(cause = %error, "exchange failed, closing connection");
        connection.close();
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        tokio::spawn(async move {
            let session = match TcpSession::new(tcp_stream) {
                Ok(session) => session.with_socket_timeout(Duration::from_secs(30)),
                Err(e) => {
                    error!(cause = %e, "failed to set up session");
                    return;
                }
            };

            match drive::<ServerRole, _>(session, ConnectionConfig::default(), &mut Echo::default()).await {
                Ok(()) => info!(%remote_addr, "connection closed"),
                Err(e) => error!(cause = %e, %remote_addr, "connection failed"),
            }
        });
    }
}
