//! Event pipeline -- input readers, worker pool and output writer.
//!
//! # Data flow
//!
//! ```text
//! input[0] ─┐                      ┌─ worker 0 ─┐
//! input[1] ─┼─ source_id % workers ┼─ worker 1 ─┼─> writer ─> stdout
//! input[n] ─┘                      └─ worker k ─┘
//!                   maintenance ticker ─> Antispammer::maintenance
//! ```
//!
//! Every input is a source whose id is its index in `pipeline.inputs`.
//! All events of a source land on the same worker, so per-source order
//! is kept. Workers run on blocking threads and own their scratches.
//!
//! The pipeline ends when all inputs are exhausted or when the shutdown
//! broadcast fires; queued events are still drained to the output.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use logship_antispam::Antispammer;
use logship_core::config::LogshipConfig;
use logship_core::error::{LogshipError, PipelineError};
use logship_core::metrics as m;
use logship_doif::{FieldPath, FieldScratch};

use crate::action::{Action, Verdict};

/// Input path that reads standard input.
pub const STDIN_INPUT: &str = "-";

/// Metadata key carrying the input path, visible to antispam `meta_key` rules.
pub const META_PATH: &str = "path";

/// One input as seen by antispam and the actions.
#[derive(Debug)]
pub struct Source {
    /// Index in `pipeline.inputs`
    pub id: u64,
    /// Input path (`-` for stdin)
    pub name: String,
    /// Per-source metadata
    pub meta: HashMap<String, String>,
}

impl Source {
    /// Creates the source for the input at `id`.
    pub fn new(id: u64, name: &str) -> Self {
        let mut meta = HashMap::new();
        meta.insert(META_PATH.to_owned(), name.to_owned());
        Self {
            id,
            name: name.to_owned(),
            meta,
        }
    }
}

/// A raw line read from a source.
#[derive(Debug)]
pub struct RawEvent {
    pub source: Arc<Source>,
    /// Set on the first event read from the source
    pub is_new_source: bool,
    pub data: Vec<u8>,
}

/// Result of processing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Compact JSON to write, without the trailing newline
    Emit(Vec<u8>),
    /// Dropped by antispam
    Spam,
    /// Dropped by a discard action
    Discarded,
    /// Not a JSON document
    Malformed,
}

/// Per-worker mutable state.
#[derive(Debug)]
pub struct WorkerState {
    scratches: Vec<Option<FieldScratch>>,
}

/// Stateless part of event processing shared by all workers.
#[derive(Debug)]
pub struct Processor {
    antispam: Arc<Antispammer>,
    actions: Vec<Action>,
    time_field: FieldPath,
}

impl Processor {
    /// Compiles the antispam guard and every action.
    pub fn from_config(config: &LogshipConfig) -> Result<Self, LogshipError> {
        let antispam = Antispammer::from_core(&config.antispam)?;
        let actions = config
            .pipeline
            .actions
            .iter()
            .map(Action::from_config)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            antispam: Arc::new(antispam),
            actions,
            time_field: FieldPath::parse(&config.pipeline.time_field),
        })
    }

    /// Shared antispam guard
    pub fn antispam(&self) -> &Arc<Antispammer> {
        &self.antispam
    }

    /// Fresh scratches for one worker.
    pub fn worker_state(&self) -> WorkerState {
        WorkerState {
            scratches: self.actions.iter().map(Action::new_scratch).collect(),
        }
    }

    /// Runs antispam and then the actions in order.
    pub fn process(&self, event: &RawEvent, state: &mut WorkerState) -> Outcome {
        let mut doc: Value = match serde_json::from_slice(&event.data) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(source = %event.source.name, error = %e, "dropping malformed line");
                return Outcome::Malformed;
            }
        };

        let time = self.event_time(&doc);
        if self.antispam.is_spam(
            event.source.id,
            &event.source.name,
            event.is_new_source,
            &event.data,
            time,
            &event.source.meta,
        ) {
            return Outcome::Spam;
        }

        for (action, scratch) in self.actions.iter().zip(state.scratches.iter_mut()) {
            if action.apply(&mut doc, scratch.as_mut()) == Verdict::Drop {
                return Outcome::Discarded;
            }
        }

        match serde_json::to_vec(&doc) {
            Ok(bytes) => Outcome::Emit(bytes),
            Err(e) => {
                tracing::warn!(source = %event.source.name, error = %e, "failed to encode event");
                Outcome::Malformed
            }
        }
    }

    fn event_time(&self, doc: &Value) -> DateTime<Utc> {
        self.time_field
            .dig(doc)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(Utc::now)
    }
}

/// Event totals of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub read: u64,
    pub written: u64,
    pub spam: u64,
    pub discarded: u64,
    pub malformed: u64,
}

#[derive(Debug, Default)]
struct Counters {
    read: AtomicU64,
    written: AtomicU64,
    spam: AtomicU64,
    discarded: AtomicU64,
    malformed: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            read: self.read.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            spam: self.spam.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

type LineReader = Box<dyn AsyncBufRead + Unpin + Send>;

/// The assembled daemon pipeline.
pub struct Pipeline {
    inputs: Vec<String>,
    workers: usize,
    channel_capacity: usize,
    maintenance_interval: Duration,
    processor: Arc<Processor>,
}

impl Pipeline {
    /// Builds the pipeline. Fails on invalid settings or on any condition
    /// tree that does not compile.
    pub fn from_config(config: &LogshipConfig) -> Result<Self, LogshipError> {
        config.validate()?;
        Ok(Self {
            inputs: config.pipeline.inputs.clone(),
            workers: config.pipeline.workers,
            channel_capacity: config.pipeline.channel_capacity,
            maintenance_interval: Duration::from_secs(config.antispam.maintenance_interval_secs),
            processor: Arc::new(Processor::from_config(config)?),
        })
    }

    /// Shared antispam guard
    pub fn antispam(&self) -> &Arc<Antispammer> {
        self.processor.antispam()
    }

    /// Runs until every input is exhausted or `shutdown` fires.
    ///
    /// Inputs are opened before anything is spawned; a missing file fails
    /// the whole run. Readers subscribe when the run starts, so a signal
    /// sent earlier is not observed. Dropping every sender also stops them.
    pub async fn run<W>(
        self,
        output: W,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<PipelineStats, LogshipError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut readers = Vec::with_capacity(self.inputs.len());
        for (idx, path) in self.inputs.iter().enumerate() {
            readers.push((Arc::new(Source::new(idx as u64, path)), open_input(path).await?));
        }

        let counters = Arc::new(Counters::default());
        let (out_tx, out_rx) = mpsc::channel::<Vec<u8>>(self.channel_capacity);
        let writer = spawn_writer(output, out_rx, Arc::clone(&counters));

        let mut worker_txs = Vec::with_capacity(self.workers);
        let mut workers = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let (tx, rx) = mpsc::channel::<RawEvent>(self.channel_capacity);
            worker_txs.push(tx);
            workers.push(spawn_worker(
                worker_id,
                Arc::clone(&self.processor),
                rx,
                out_tx.clone(),
                Arc::clone(&counters),
            ));
        }
        drop(out_tx);

        let maintenance = (!self.antispam().is_disabled()).then(|| {
            spawn_maintenance(Arc::clone(self.antispam()), self.maintenance_interval)
        });

        tracing::info!(
            inputs = self.inputs.len(),
            workers = self.workers,
            antispam = maintenance.is_some(),
            "pipeline started"
        );

        let reader_tasks: Vec<_> = readers
            .into_iter()
            .map(|(source, reader)| {
                let tx = worker_txs[source.id as usize % worker_txs.len()].clone();
                spawn_reader(source, reader, tx, shutdown.resubscribe(), Arc::clone(&counters))
            })
            .collect();
        drop(worker_txs);

        for task in reader_tasks {
            task.await
                .map_err(|e| PipelineError::TaskFailed(format!("input reader: {e}")))?;
        }
        for task in workers {
            task.await
                .map_err(|e| PipelineError::TaskFailed(format!("worker: {e}")))?;
        }
        writer
            .await
            .map_err(|e| PipelineError::TaskFailed(format!("writer: {e}")))??;

        if let Some(task) = maintenance {
            task.abort();
        }

        let stats = counters.snapshot();
        tracing::info!(
            read = stats.read,
            written = stats.written,
            spam = stats.spam,
            discarded = stats.discarded,
            malformed = stats.malformed,
            "pipeline finished"
        );
        Ok(stats)
    }
}

async fn open_input(path: &str) -> Result<LineReader, LogshipError> {
    if path == STDIN_INPUT {
        return Ok(Box::new(BufReader::new(tokio::io::stdin())));
    }

    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| PipelineError::Input {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
    Ok(Box::new(BufReader::new(file)))
}

fn spawn_reader(
    source: Arc<Source>,
    reader: LineReader,
    tx: mpsc::Sender<RawEvent>,
    mut shutdown: broadcast::Receiver<()>,
    counters: Arc<Counters>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = reader.split(b'\n');
        let mut is_new_source = true;

        loop {
            let segment = tokio::select! {
                segment = lines.next_segment() => segment,
                _ = shutdown.recv() => {
                    tracing::debug!(source = %source.name, "input reader shutting down");
                    break;
                }
            };

            let mut data = match segment {
                Ok(Some(data)) => data,
                Ok(None) => {
                    tracing::debug!(source = %source.name, "input exhausted");
                    break;
                }
                Err(e) => {
                    tracing::warn!(source = %source.name, error = %e, "input read failed");
                    break;
                }
            };
            if data.last() == Some(&b'\r') {
                data.pop();
            }
            if data.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            counters.read.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(m::PIPELINE_EVENTS_IN_TOTAL).increment(1);

            let event = RawEvent {
                source: Arc::clone(&source),
                is_new_source,
                data,
            };
            is_new_source = false;

            if tx.send(event).await.is_err() {
                tracing::warn!(source = %source.name, "worker channel closed");
                break;
            }
        }
    })
}

fn spawn_worker(
    worker_id: usize,
    processor: Arc<Processor>,
    mut rx: mpsc::Receiver<RawEvent>,
    out_tx: mpsc::Sender<Vec<u8>>,
    counters: Arc<Counters>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut state = processor.worker_state();

        while let Some(event) = rx.blocking_recv() {
            let start = Instant::now();
            let outcome = processor.process(&event, &mut state);
            metrics::histogram!(m::PIPELINE_PROCESSING_DURATION_SECONDS)
                .record(start.elapsed().as_secs_f64());

            match outcome {
                Outcome::Emit(bytes) => {
                    if out_tx.blocking_send(bytes).is_err() {
                        tracing::warn!(worker_id, "output channel closed");
                        break;
                    }
                }
                Outcome::Spam => {
                    counters.spam.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(m::PIPELINE_EVENTS_DISCARDED_TOTAL, m::LABEL_REASON => "antispam")
                        .increment(1);
                }
                Outcome::Discarded => {
                    counters.discarded.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(m::PIPELINE_EVENTS_DISCARDED_TOTAL, m::LABEL_REASON => "discard")
                        .increment(1);
                }
                Outcome::Malformed => {
                    counters.malformed.fetch_add(1, Ordering::Relaxed);
                    metrics::counter!(m::PIPELINE_PARSE_ERRORS_TOTAL).increment(1);
                }
            }
        }

        tracing::debug!(worker_id, "worker finished");
    })
}

fn spawn_writer<W>(
    output: W,
    mut rx: mpsc::Receiver<Vec<u8>>,
    counters: Arc<Counters>,
) -> JoinHandle<Result<(), LogshipError>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut out = BufWriter::new(output);

        while let Some(line) = rx.recv().await {
            write_line(&mut out, &line, &counters).await?;
            // flush once the queue is drained
            while let Ok(line) = rx.try_recv() {
                write_line(&mut out, &line, &counters).await?;
            }
            out.flush().await?;
        }

        out.flush().await?;
        Ok(())
    })
}

async fn write_line<W>(
    out: &mut BufWriter<W>,
    line: &[u8],
    counters: &Counters,
) -> Result<(), LogshipError>
where
    W: AsyncWrite + Unpin,
{
    out.write_all(line).await?;
    out.write_all(b"\n").await?;
    counters.written.fetch_add(1, Ordering::Relaxed);
    metrics::counter!(m::PIPELINE_EVENTS_OUT_TOTAL).increment(1);
    Ok(())
}

fn spawn_maintenance(antispam: Arc<Antispammer>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            antispam.maintenance();
        }
    })
}
