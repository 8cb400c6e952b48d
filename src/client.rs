use crate::config::{ClientConfig, CloseBehavior};
use crate::error::ClientError;
use crate::payload::to_data;
use crate::record::{Data, ExceptionInfo, LogLevel, LogRecord};
use crate::shipper::{ClientStats, Counters, Endpoints, Shipper};
use crate::transport::HttpTransport;
use crate::worker::{BatchWorker, Command};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Buffered client that ships [`LogRecord`]s for one log name.
///
/// With batching enabled (see [`ClientConfig::batching_enabled`]) every call
/// only enqueues the record for a background worker, so logging never waits
/// on the network. Otherwise each record is POSTed as soon as it is logged.
///
/// Delivery is best effort: transmission failures are counted in
/// [`LogClient::stats`] and dropped, never retried and never returned.
///
/// Cloning is cheap; all clones share the same queue, context and worker.
#[derive(Clone)]
pub struct LogClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    log_name: String,
    config: Arc<ClientConfig>,
    shipper: Arc<Shipper>,
    context: RwLock<Arc<Data>>,
    batcher: Option<Batcher>,
    runtime: Option<Handle>,
    counters: Arc<Counters>,
    closed: AtomicBool,
}

struct Batcher {
    sender: mpsc::UnboundedSender<Command>,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LogClient {
    /// Create a client for `log_name`.
    ///
    /// **Parameters**
    /// - `log_name`: non-empty name used in the endpoint path.
    /// - `config`: configuration snapshot, fixed for the client's lifetime.
    /// - `transport`: capability used for every request.
    ///
    /// **Returns**
    /// - A ready-to-use client. When batching is enabled a worker task has
    ///   been spawned on the current Tokio runtime, with its flush timer
    ///   running if `batch_interval` is positive.
    /// - `Err(..)` for an empty log name, an invalid configuration, or a
    ///   batching configuration outside of a Tokio runtime.
    pub fn new(
        log_name: impl Into<String>,
        config: impl Into<Arc<ClientConfig>>,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, ClientError> {
        let log_name = log_name.into();
        if log_name.trim().is_empty() {
            return Err(ClientError::EmptyLogName);
        }
        let config = config.into();
        config.validate()?;

        let runtime = Handle::try_current().ok();
        let counters = Arc::new(Counters::default());
        let endpoints = Endpoints::new(&config, &log_name);
        let shipper = Arc::new(Shipper::new(
            transport,
            Arc::clone(&config),
            endpoints,
            Arc::clone(&counters),
        ));

        let batcher = if config.batching_enabled() {
            let handle = runtime.as_ref().ok_or(ClientError::NoRuntime)?;
            let (tx, rx) = mpsc::unbounded_channel();
            let pending = Arc::new(AtomicUsize::new(0));
            let worker = BatchWorker::new(
                Arc::clone(&shipper),
                rx,
                config.batch_size,
                config.batch_interval,
                Arc::clone(&pending),
                Arc::clone(&counters),
            );
            let join = handle.spawn(worker.run());
            tracing::debug!(
                log_name = %log_name,
                batch_size = config.batch_size,
                interval_ms = config.batch_interval.as_millis() as u64,
                "started log batch worker"
            );
            Some(Batcher {
                sender: tx,
                pending,
                worker: Mutex::new(Some(join)),
            })
        } else {
            None
        };

        Ok(LogClient {
            inner: Arc::new(ClientInner {
                log_name,
                config,
                shipper,
                context: RwLock::new(Arc::new(Data::new())),
                batcher,
                runtime,
                counters,
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn log_name(&self) -> &str {
        &self.inner.log_name
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        self.inner.shipper.endpoints()
    }

    pub fn is_batching(&self) -> bool {
        self.inner.batcher.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Records enqueued and not yet drained into a batch.
    pub fn pending(&self) -> usize {
        self.inner
            .batcher
            .as_ref()
            .map_or(0, |b| b.pending.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> ClientStats {
        self.inner.counters.snapshot()
    }

    /// Replace the context merged into every record.
    ///
    /// The new mapping is swapped in as a whole, so a concurrent call sees
    /// either the old or the new context, never a mix.
    pub fn set_context(&self, context: Data) {
        let mut guard = self
            .inner
            .context
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(context);
    }

    /// Current context snapshot.
    pub fn context(&self) -> Arc<Data> {
        let guard = self
            .inner
            .context
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Log one record.
    ///
    /// An empty `message` without `exception` is ignored. With batching the
    /// returned future resolves once the record is queued; without it, once
    /// the POST has been attempted. Transmission failures are never
    /// reported.
    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        exception: Option<ExceptionInfo>,
        data: Option<Data>,
    ) {
        let Some(record) = self.build_record(level, message.into(), exception, data) else {
            return;
        };

        match &self.inner.batcher {
            Some(batcher) => self.enqueue(batcher, record),
            None => {
                if self.is_closed() {
                    Counters::bump(&self.inner.counters.dropped, 1);
                    return;
                }
                self.inner.shipper.send_one(record).await;
            }
        }
    }

    /// Non-async sibling of [`LogClient::log`] for callers that cannot await,
    /// such as logging-framework hooks.
    ///
    /// With batching the record is queued. Without it the POST is spawned on
    /// the runtime the client was created on (or the current one); if there
    /// is none the record is dropped.
    pub fn submit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        exception: Option<ExceptionInfo>,
        data: Option<Data>,
    ) {
        let Some(record) = self.build_record(level, message.into(), exception, data) else {
            return;
        };

        if let Some(batcher) = &self.inner.batcher {
            self.enqueue(batcher, record);
            return;
        }

        if self.is_closed() {
            Counters::bump(&self.inner.counters.dropped, 1);
            return;
        }

        let runtime = self
            .inner
            .runtime
            .clone()
            .or_else(|| Handle::try_current().ok());
        match runtime {
            Some(handle) => {
                let shipper = Arc::clone(&self.inner.shipper);
                handle.spawn(async move { shipper.send_one(record).await });
            }
            None => {
                Counters::bump(&self.inner.counters.dropped, 1);
                if self.inner.config.debug {
                    eprintln!("no Tokio runtime available, dropping log record");
                }
            }
        }
    }

    /// Log a record whose data is built from an arbitrary serializable value.
    ///
    /// Objects become the data mapping; anything else ends up under a single
    /// `data` key.
    pub async fn log_serializable<T>(&self, level: LogLevel, message: impl Into<String>, payload: &T)
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.log(level, message, None, Some(to_data(payload))).await
    }

    pub async fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message, None, None).await
    }

    pub async fn debug_with(&self, message: impl Into<String>, data: Data) {
        self.log(LogLevel::Debug, message, None, Some(data)).await
    }

    pub async fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message, None, None).await
    }

    pub async fn info_with(&self, message: impl Into<String>, data: Data) {
        self.log(LogLevel::Info, message, None, Some(data)).await
    }

    pub async fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message, None, None).await
    }

    pub async fn warning_with(&self, message: impl Into<String>, data: Data) {
        self.log(LogLevel::Warning, message, None, Some(data)).await
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message, None, None).await
    }

    pub async fn error_with(&self, message: impl Into<String>, data: Data) {
        self.log(LogLevel::Error, message, None, Some(data)).await
    }

    pub async fn error_with_exception<E>(&self, message: impl Into<String>, error: &E, data: Option<Data>)
    where
        E: Error + ?Sized,
    {
        let exception = ExceptionInfo::from_error(error);
        self.log(LogLevel::Error, message, Some(exception), data).await
    }

    pub async fn fatal(&self, message: impl Into<String>) {
        self.log(LogLevel::Fatal, message, None, None).await
    }

    pub async fn fatal_with(&self, message: impl Into<String>, data: Data) {
        self.log(LogLevel::Fatal, message, None, Some(data)).await
    }

    pub async fn fatal_with_exception<E>(&self, message: impl Into<String>, error: &E, data: Option<Data>)
    where
        E: Error + ?Sized,
    {
        let exception = ExceptionInfo::from_error(error);
        self.log(LogLevel::Fatal, message, Some(exception), data).await
    }

    /// Send one batch of pending records now and wait for the attempt.
    ///
    /// No-op when batching is disabled or nothing is pending. If a batch is
    /// already in flight, this waits for it and then sends what remains.
    pub async fn flush(&self) {
        let Some(batcher) = &self.inner.batcher else {
            return;
        };
        if batcher.pending.load(Ordering::Acquire) == 0 {
            return;
        }
        let (ack, done) = oneshot::channel();
        if batcher.sender.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Stop the batch worker and its timer.
    ///
    /// With [`CloseBehavior::Discard`] (the default) pending records are
    /// dropped and their count is returned; call [`LogClient::flush`] first
    /// to keep them. With [`CloseBehavior::Drain`] everything pending is sent
    /// before the worker stops and `0` is returned. A send already in flight
    /// is allowed to finish. Records logged after close are dropped.
    pub async fn close(&self) -> usize {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let Some(batcher) = &self.inner.batcher else {
            return 0;
        };

        let drain = self.inner.config.close_behavior == CloseBehavior::Drain;
        let (done, discarded) = oneshot::channel();
        let discarded = if batcher.sender.send(Command::Close { drain, done }).is_ok() {
            discarded.await.unwrap_or(0)
        } else {
            0
        };

        let worker = batcher
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }

        tracing::debug!(log_name = %self.inner.log_name, discarded, "closed log client");
        discarded
    }

    fn build_record(
        &self,
        level: LogLevel,
        message: String,
        exception: Option<ExceptionInfo>,
        data: Option<Data>,
    ) -> Option<LogRecord> {
        Counters::bump(&self.inner.counters.submitted, 1);
        if message.is_empty() && exception.is_none() {
            Counters::bump(&self.inner.counters.rejected, 1);
            return None;
        }

        let mut merged = data.unwrap_or_default();
        let context = self.context();
        for (key, value) in context.iter() {
            if !merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }

        Some(LogRecord::new(level, message, merged, exception))
    }

    fn enqueue(&self, batcher: &Batcher, record: LogRecord) {
        if self.is_closed() {
            Counters::bump(&self.inner.counters.dropped, 1);
            return;
        }

        let max_pending = self.inner.config.max_pending;
        let admitted = batcher
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match max_pending {
                Some(max) if n >= max => None,
                _ => Some(n + 1),
            })
            .is_ok();
        if !admitted {
            Counters::bump(&self.inner.counters.dropped, 1);
            if self.inner.config.debug {
                eprintln!("log queue full, dropping log record");
            }
            return;
        }

        if batcher.sender.send(Command::Record(record)).is_ok() {
            Counters::bump(&self.inner.counters.enqueued, 1);
        } else {
            batcher.pending.fetch_sub(1, Ordering::AcqRel);
            Counters::bump(&self.inner.counters.dropped, 1);
        }
    }
}

impl fmt::Debug for LogClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogClient")
            .field("log_name", &self.inner.log_name)
            .field("batching", &self.is_batching())
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
