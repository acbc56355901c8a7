// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Server`]-related things

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, Stream, StreamExt};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::select;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, info_span, warn, Instrument};

use turbo_stream::response::GenericResponse;

/// How long an overloaded server spends telling a client to go away.
const TURN_AWAY_TIMEOUT: Duration = Duration::from_secs(1);

/// Serves HTTP/1 connections with a connection limit and graceful shutdown.
pub struct Server {
    max_connections: usize,
    concurrent_connections: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Connections beyond `max_connections` get a minimal 503 and are closed.
    pub fn new(max_connections: usize) -> Self {
        let concurrent_connections = Arc::new(Semaphore::new(max_connections));
        let (shutdown, _) = watch::channel(false);
        Self {
            max_connections,
            concurrent_connections,
            shutdown,
        }
    }

    /// Serve incoming `connections` with `responder`, one task per connection.
    ///
    /// Resolves once [`graceful_shutdown`](Self::graceful_shutdown) has been called (or
    /// `connections` is exhausted) and every connection it accepted has finished.
    /// Dropping the returned future aborts its connections.
    pub async fn serve<P, C, R, F>(&self, connections: P, responder: R)
    where
        P: Stream<Item = std::io::Result<(C, SocketAddr)>>,
        C: AsyncRead + AsyncWrite + Send + Unpin + 'static,
        R: Fn(Request<Incoming>, SocketAddr) -> F + Clone + Send + Sync + 'static,
        F: Future<Output = GenericResponse> + Send + 'static,
    {
        let respond = move |request: Request<Incoming>, peer_addr: SocketAddr| {
            let respond = responder.clone();
            async move {
                info!("Request: {} {}", request.method(), request.uri());
                let response = respond(request, peer_addr).await;
                info!("Response: {}", response.status());
                response
            }
        };

        // Held until we return so graceful_shutdown waits for us.
        let mut shutdown_receiver = self.shutdown.subscribe();
        let mut tasks = JoinSet::new();
        info!("Started serving");

        // scope is only to force `connections` to be dropped
        {
            let mut connections = pin!(connections);
            loop {
                let accepted = select! {
                    biased;
                    _ = shutdown_receiver.wait_for(|&done| done) => break,
                    accepted = connections.next() => accepted,
                };
                let Some(accepted) = accepted else { break };
                let (connection, peer_addr) = match accepted {
                    Ok(a) => a,
                    Err(err) => {
                        error!("Couldn't accept connection: {err}");
                        continue;
                    }
                };

                let connection_span = info_span!("connection", addr=%peer_addr);
                let Ok(permit) = self.concurrent_connections.clone().try_acquire_owned() else {
                    let turn_away = turn_away(connection, self.max_connections);
                    if let Err(err) = turn_away.instrument(connection_span).await {
                        warn!(
                            addr=%peer_addr,
                            "Couldn't send 503 to overloaded connection: {err}"
                        );
                    }
                    continue;
                };

                let respond = respond.clone();
                let service = service_fn(move |r| respond(r, peer_addr).map(Ok::<_, Infallible>));
                let mut shutdown_receiver = self.shutdown.subscribe();
                let connection_task = async move {
                    let _permit = permit;
                    info!("Connected.");
                    let http_connection = http1::Builder::new()
                        .half_close(true)
                        .serve_connection(TokioIo::new(connection), service);
                    let mut http_connection = pin!(http_connection);
                    let mut closing = false;
                    let result = loop {
                        select! {
                            result = http_connection.as_mut() => break result,
                            _ = shutdown_receiver.wait_for(|&done| done), if !closing => {
                                closing = true;
                                http_connection.as_mut().graceful_shutdown();
                            }
                        }
                    };
                    if let Err(err) = result {
                        error!("Error serving: {err}");
                    }
                    info!("Disconnected.");
                };
                tasks.spawn(connection_task.instrument(connection_span));
                while tasks.try_join_next().is_some() {}
            }
        }

        while tasks.join_next().await.is_some() {}
        info!("Stopped serving");
    }

    /// Stop accepting connections and end each one after its current request.
    ///
    /// Resolves once every [`serve`](Self::serve) call has returned.
    pub async fn graceful_shutdown(&self) {
        self.shutdown.send_replace(true);
        self.shutdown.closed().await;
    }
}

/// Answers an HTTP/1 connection with a 503 naming the connection limit, without reading
/// the request.
async fn turn_away(
    mut connection: impl AsyncWrite + Unpin,
    max_connections: usize,
) -> std::io::Result<()> {
    warn!("Too overloaded; sending minimal 503.");
    let body = format!("Too many connections (limit {max_connections})\n");
    let response = format!(
        "HTTP/1.1 503 Service Unavailable\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {body}",
        body.len()
    );
    let write_response = async {
        connection.write_all(response.as_bytes()).await?;
        connection.shutdown().await
    };
    timeout(TURN_AWAY_TIMEOUT, write_response)
        .await
        .unwrap_or_else(|_| Err(std::io::ErrorKind::TimedOut.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use http_body_util::BodyExt;
    use tokio::io::AsyncReadExt;
    use turbo_stream::response::{self, StatusCode};

    fn address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 8080))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn echoes_a_request() {
        let (mut client, server_conn) = tokio::io::duplex(1024);
        let connections = futures::stream::once(async { Ok((server_conn, address())) });

        let server = Server::new(2);
        let run = server.serve(connections, |request, _| async move {
            let body = request.into_body().collect().await.unwrap().to_bytes();
            response::text(StatusCode::OK, String::from_utf8_lossy(&body))
        });

        let test = async {
            let msg = b"POST / HTTP/1.1\r\nHost: foo.com\r\nContent-Length: 13\r\n\r\nHello, world!";
            client.write_all(msg).await.unwrap();
            client.shutdown().await.unwrap();
            let mut response = String::new();
            client.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 200 "));
            assert!(response.ends_with("\r\n\r\nHello, world!"));
        };

        tokio::join!(run, test);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn shutdown_servers_do_not_accept_connections() {
        let mut connection_accepted = false;
        let connections = futures::stream::once(async {
            connection_accepted = true;
            Ok((Cursor::new(vec![]), address()))
        });

        let server = Server::new(2);
        server.graceful_shutdown().await;

        server
            .serve(connections, |_, _| async { unimplemented!() })
            .await;
        assert!(!connection_accepted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn overloaded_servers_respond_with_503() {
        let (c0, s0) = tokio::io::duplex(1024);
        let (mut c1, s1) = tokio::io::duplex(1024);
        let connections = futures::stream::iter([s0, s1].map(|c| Ok((c, address()))));

        let tests = async {
            let mut response = String::new();
            c1.read_to_string(&mut response).await.unwrap();
            assert!(response.starts_with("HTTP/1.1 503"), "{response}");
            assert!(response.ends_with("\r\n\r\nToo many connections (limit 1)\n"));
            drop(c0);
        };

        let server = Server::new(1);
        select! {
            _ = server.serve(connections, |_, _| futures::future::pending()) => {}
            _ = tests => {}
        }
    }

    #[tokio::test]
    async fn turn_away_reports_write_failures() {
        let (client, server_conn) = tokio::io::duplex(1024);
        drop(client);
        assert!(turn_away(server_conn, 1).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn accept_errors_shouldnt_panic() {
        type Connection = Cursor<Vec<u8>>;
        let connections = futures::stream::once(async {
            Err::<(Connection, _), _>(std::io::ErrorKind::ConnectionAborted.into())
        });

        let server = Server::new(2);
        server
            .serve(connections, |_, _| futures::future::pending())
            .await;
    }
}
