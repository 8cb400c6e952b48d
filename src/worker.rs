use crate::record::LogRecord;
use crate::shipper::{Counters, Shipper};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Duration, Instant, Interval, MissedTickBehavior};

/// Messages from a client to its batch worker.
pub(crate) enum Command {
    Record(LogRecord),
    /// Send one batch now and acknowledge once the attempt has finished.
    Flush(oneshot::Sender<()>),
    /// Stop the worker, optionally sending everything still pending first.
    /// Replies with the number of records discarded.
    Close { drain: bool, done: oneshot::Sender<usize> },
}

/// Task that exclusively owns the pending buffer of one client.
///
/// Records arrive over an unbounded channel, so producers never wait. A batch
/// goes out when the buffer reaches `batch_size`, on every timer tick, and on
/// explicit flush. Sends run inline, so at most one batch is in flight and
/// triggers that arrive meanwhile are handled once it completes.
pub(crate) struct BatchWorker {
    shipper: Arc<Shipper>,
    rx: mpsc::UnboundedReceiver<Command>,
    buffer: VecDeque<LogRecord>,
    batch_size: usize,
    flush_interval: Duration,
    pending: Arc<AtomicUsize>,
    counters: Arc<Counters>,
}

impl BatchWorker {
    pub fn new(
        shipper: Arc<Shipper>,
        rx: mpsc::UnboundedReceiver<Command>,
        batch_size: usize,
        flush_interval: Duration,
        pending: Arc<AtomicUsize>,
        counters: Arc<Counters>,
    ) -> Self {
        BatchWorker {
            shipper,
            rx,
            buffer: VecDeque::with_capacity(batch_size),
            batch_size: batch_size.max(1),
            flush_interval,
            pending,
            counters,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = if self.flush_interval.is_zero() {
            None
        } else {
            let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticker)
        };

        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(Command::Record(record)) => {
                        self.buffer.push_back(record);
                        if self.buffer.len() >= self.batch_size {
                            self.send_next_batch().await;
                        }
                    }
                    Some(Command::Flush(ack)) => {
                        self.send_next_batch().await;
                        let _ = ack.send(());
                    }
                    Some(Command::Close { drain, done }) => {
                        let discarded = self.shutdown(drain).await;
                        let _ = done.send(discarded);
                        return;
                    }
                    None => {
                        // Every client handle is gone.
                        let discarded = self.shutdown(false).await;
                        if discarded > 0 {
                            tracing::debug!(discarded, "log client dropped with pending records");
                        }
                        return;
                    }
                },
                _ = tick(&mut ticker) => {
                    self.send_next_batch().await;
                }
            }
        }
    }

    async fn send_next_batch(&mut self) {
        let take = self.buffer.len().min(self.batch_size);
        if take == 0 {
            return;
        }
        let batch: Vec<LogRecord> = self.buffer.drain(..take).collect();
        self.pending.fetch_sub(batch.len(), Ordering::AcqRel);
        self.shipper.send_batch(batch).await;
    }

    /// Refuse further commands and settle what is left. Returns the number of
    /// records discarded.
    async fn shutdown(&mut self, drain: bool) -> usize {
        self.rx.close();
        while let Ok(cmd) = self.rx.try_recv() {
            match cmd {
                Command::Record(record) => self.buffer.push_back(record),
                Command::Flush(ack) => {
                    let _ = ack.send(());
                }
                Command::Close { done, .. } => {
                    let _ = done.send(0);
                }
            }
        }

        if drain {
            while !self.buffer.is_empty() {
                self.send_next_batch().await;
            }
            return 0;
        }

        let discarded = self.buffer.len();
        self.buffer.clear();
        self.pending.fetch_sub(discarded, Ordering::AcqRel);
        Counters::bump(&self.counters.dropped, discarded);
        discarded
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
