//! Dual-channel log delivery.
//!
//! A log request returns a [`LogStream`] immediately. A background producer
//! fills two channels:
//!
//! - `logs` yields entries in arrival order, then closes;
//! - `errors` yields at most one terminal failure, then closes.
//!
//! Both channels close on every path, so draining either one, or both
//! concurrently, always terminates. The log channel is unbounded: the
//! producer never waits on the caller, so the error channel completes even
//! when nobody reads `logs` yet.

use std::sync::Arc;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::clock::SharedClock;
use crate::error::{ApiError, ErrorResponse, Result};
use crate::transport::{ApiRequest, Transport};
use crate::types::{LogEntry, ResourceKind};

/// Query parameter carrying the entry limit.
pub const LINES_PARAM: &str = "lines";

/// Receiving side of one log request.
#[derive(Debug)]
pub struct LogStream {
    /// Log entries, in arrival order.
    pub logs: mpsc::UnboundedReceiver<LogEntry>,
    /// At most one terminal failure.
    pub errors: mpsc::Receiver<ApiError>,
}

impl LogStream {
    /// A stream that has already ended with `error` and no entries.
    #[must_use]
    pub fn failed(error: ApiError) -> Self {
        let (log_tx, logs) = mpsc::unbounded_channel();
        let (error_tx, errors) = mpsc::channel(1);
        drop(log_tx);
        // Fresh channel with capacity 1 and a live receiver: cannot fail.
        let _ = error_tx.try_send(error);
        Self { logs, errors }
    }

    /// A stream that has already delivered `entries` and ended cleanly.
    #[must_use]
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        let (log_tx, logs) = mpsc::unbounded_channel();
        let (_, errors) = mpsc::channel(1);
        for entry in entries {
            let _ = log_tx.send(entry);
        }
        Self { logs, errors }
    }

    /// Drains both channels concurrently.
    ///
    /// Returns every entry received and the terminal failure, if any.
    pub async fn collect(self) -> (Vec<LogEntry>, Option<ApiError>) {
        let Self {
            mut logs,
            mut errors,
        } = self;

        let entries = async move {
            let mut entries = Vec::new();
            while let Some(entry) = logs.recv().await {
                entries.push(entry);
            }
            entries
        };
        tokio::join!(entries, errors.recv())
    }

    /// Drains both channels, failing if the producer reported an error.
    ///
    /// # Errors
    ///
    /// Returns the terminal failure; entries received before it are dropped.
    pub async fn try_collect(self) -> Result<Vec<LogEntry>> {
        match self.collect().await {
            (_, Some(error)) => Err(error),
            (entries, None) => Ok(entries),
        }
    }

    /// Merges both channels into one stream: every entry, then at most one
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = Result<LogEntry>> + Send + 'static {
        let Self { logs, errors } = self;
        let entries = stream::unfold(logs, |mut rx| async move {
            rx.recv().await.map(|entry| (Ok(entry), rx))
        });
        let failure = stream::unfold(errors, |mut rx| async move {
            rx.recv().await.map(|error| (Err(error), rx))
        });
        entries.chain(failure)
    }
}

/// The project, service and app a log request is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogScope {
    /// Project name.
    pub project: String,
    /// Service id, for service and app scopes.
    pub service: Option<String>,
    /// App id, for app scopes.
    pub app: Option<String>,
}

impl LogScope {
    /// Scope covering a whole project.
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    /// Scope covering one service.
    pub fn service(project: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            service: Some(service.into()),
            app: None,
        }
    }

    /// Scope covering one app.
    pub fn app(project: impl Into<String>, service: impl Into<String>, app: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            service: Some(service.into()),
            app: Some(app.into()),
        }
    }

    /// The identifying path, for validation.
    #[must_use]
    pub fn path(&self) -> Vec<(ResourceKind, &str)> {
        let mut path = vec![(ResourceKind::Project, self.project.as_str())];
        if let Some(service) = &self.service {
            path.push((ResourceKind::Service, service.as_str()));
        }
        if let Some(app) = &self.app {
            path.push((ResourceKind::App, app.as_str()));
        }
        path
    }

    /// Path segments of the logs resource for this scope.
    #[must_use]
    pub fn segments(&self) -> Vec<String> {
        let mut segments = vec!["projects".to_string(), self.project.clone()];
        if let Some(service) = &self.service {
            segments.push("services".to_string());
            segments.push(service.clone());
        }
        if let Some(app) = &self.app {
            segments.push("apps".to_string());
            segments.push(app.clone());
        }
        segments.push("logs".to_string());
        segments
    }
}

/// Settings for one producer.
#[derive(Debug, Clone)]
pub(crate) struct ProducerOptions {
    pub limit: usize,
    pub idle_timeout: Duration,
    pub clock: SharedClock,
}

/// Spawns a producer that fetches `request` and fills a [`LogStream`].
///
/// Without a tokio runtime no task can be spawned; the returned stream then
/// holds a single transport failure.
pub(crate) fn spawn<T: Transport>(
    transport: Arc<T>,
    request: ApiRequest,
    scope: LogScope,
    options: ProducerOptions,
) -> LogStream {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(project = %scope.project, "log request outside a tokio runtime");
        return LogStream::failed(ApiError::Transport(
            "log streaming requires a tokio runtime".into(),
        ));
    };

    let (log_tx, logs) = mpsc::unbounded_channel();
    let (error_tx, errors) = mpsc::channel(1);

    runtime.spawn(async move {
        let path = request.path();
        debug!(%path, limit = options.limit, "log producer started");

        match produce(transport.as_ref(), request, &scope, &options, &log_tx).await {
            Ok(sent) => debug!(%path, sent, "log producer finished"),
            Err(error) => {
                debug!(%path, %error, "log producer failed");
                drop(log_tx);
                if error_tx.try_send(error).is_err() {
                    trace!(%path, "error receiver dropped");
                }
            }
        }
    });

    LogStream { logs, errors }
}

async fn produce<T: Transport>(
    transport: &T,
    request: ApiRequest,
    scope: &LogScope,
    options: &ProducerOptions,
    log_tx: &mpsc::UnboundedSender<LogEntry>,
) -> Result<usize> {
    let response = transport.open_stream(request).await?;
    if !response.status.is_success() {
        let raw = response.into_raw().await?;
        return Err(ErrorResponse::from_body(raw.status, &raw.body).into());
    }

    pump(response.body, scope, options, log_tx).await
}

/// Forwards decoded entries from `body` until it ends, `limit` is reached or
/// the receiver goes away. Returns how many entries were sent.
pub(crate) async fn pump(
    mut body: BoxStream<'static, Result<Bytes>>,
    scope: &LogScope,
    options: &ProducerOptions,
    log_tx: &mpsc::UnboundedSender<LogEntry>,
) -> Result<usize> {
    let mut lines = LineBuffer::default();
    let mut sent = 0usize;

    loop {
        let next = tokio::time::timeout(options.idle_timeout, body.next())
            .await
            .map_err(|_| {
                ApiError::Transport(format!(
                    "log stream idle for {}s",
                    options.idle_timeout.as_secs()
                ))
            })?;

        let finished = match next {
            Some(chunk) => {
                lines.extend(&chunk?);
                false
            }
            None => true,
        };

        let mut ready = Vec::new();
        while let Some(line) = lines.next_line() {
            ready.push(line);
        }
        if finished {
            ready.extend(lines.finish());
        }

        for line in ready {
            let Some(entry) = decode_line(&line, scope, options.clock.now())? else {
                continue;
            };
            if log_tx.send(entry).is_err() {
                debug!(sent, "log receiver dropped");
                return Ok(sent);
            }
            sent += 1;
            if options.limit > 0 && sent >= options.limit {
                return Ok(sent);
            }
        }

        if finished {
            return Ok(sent);
        }
    }
}

/// Splits a byte stream into newline-terminated lines.
#[derive(Debug, Default)]
struct LineBuffer {
    buffer: BytesMut,
}

impl LineBuffer {
    fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    fn next_line(&mut self) -> Option<Bytes> {
        let newline = self.buffer.iter().position(|b| *b == b'\n')?;
        let line = self.buffer.split_to(newline).freeze();
        self.buffer.advance(1);
        Some(line)
    }

    fn finish(&mut self) -> Option<Bytes> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split().freeze())
        }
    }
}

/// Wire shape of an entry; scope fields and timestamp may be omitted.
#[derive(Debug, Deserialize)]
struct WireLogEntry {
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    app: Option<String>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    log: String,
}

/// Decodes one NDJSON line. Blank lines yield `None`.
fn decode_line(line: &[u8], scope: &LogScope, now: DateTime<Utc>) -> Result<Option<LogEntry>> {
    if line.trim_ascii().is_empty() {
        return Ok(None);
    }

    let wire: WireLogEntry = serde_json::from_slice(line)?;
    Ok(Some(LogEntry {
        project: wire.project.unwrap_or_else(|| scope.project.clone()),
        service: wire
            .service
            .or_else(|| scope.service.clone())
            .unwrap_or_default(),
        app: wire.app.or_else(|| scope.app.clone()).unwrap_or_default(),
        created_at: wire.created_at.unwrap_or(now),
        log: wire.log,
    }))
}
