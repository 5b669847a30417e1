//! Single-threaded stdin/stdout dispatch loop (`spec.md` §5/§8), grounded
//! on `exercise_analyzer_server.py::run_server`: print a readiness
//! banner, read one line at a time, route it through [`crate::wire`] and
//! the [`AnalyzerRegistry`], and write exactly one response line per
//! non-blank input line. Generic over the reader/writer so tests can run
//! it against an in-memory buffer instead of real stdio.

use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::analyzers::AnalyzerRegistry;
use crate::errors::Failure;
use crate::wire::{self, AnalysisResponse, CommandResponse, ErrorResponse, IncomingMessage};

const EXIT_SENTINEL: &str = "EXIT";
const READY_BANNER: &str = r#"{"status":"ready","message":"Exercise Analyzer Server started"}"#;
const RESET_COUNTER_COMMAND: &str = "reset_counter";

pub struct Worker<R, W> {
    reader: BufReader<R>,
    writer: W,
    registry: AnalyzerRegistry,
}

impl<R, W> Worker<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, registry: AnalyzerRegistry) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
            registry,
        }
    }

    /// Exposes the underlying writer for integration tests that drive the
    /// loop against an in-memory buffer and need to inspect what was
    /// written, mirroring the teacher's test-only constructors elsewhere
    /// in this crate (e.g. each analyzer's `with_classifier`).
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Emits the readiness banner, then processes lines until `EXIT`,
    /// EOF, or `shutdown` resolves (a `tokio::signal` future wired up by
    /// the caller). Every non-blank line that isn't the sentinel
    /// produces exactly one response line.
    pub async fn run(&mut self, mut shutdown: impl std::future::Future<Output = ()> + Unpin) -> anyhow::Result<()> {
        self.writer.write_all(READY_BANNER.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = tokio::select! {
                result = self.reader.read_line(&mut line) => result?,
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, exiting");
                    break;
                }
            };
            if bytes_read == 0 {
                tracing::info!("stdin closed, exiting");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed == EXIT_SENTINEL {
                tracing::info!("received EXIT sentinel");
                break;
            }

            let response = self.handle_line(trimmed);
            self.writer.write_all(response.as_bytes()).await?;
            self.writer.write_all(b"\n").await?;
            self.writer.flush().await?;
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> String {
        let start = Instant::now();
        let rendered = match wire::parse_line(line) {
            Ok(IncomingMessage::Analyze(request)) => {
                let analyzer = self.registry.get_or_create(request.exercise_kind);
                match analyzer.analyze(&request.frame) {
                    Ok(result) => serde_json::to_string(&AnalysisResponse::new(
                        request.request_id,
                        start.elapsed().as_secs_f64(),
                        result,
                    )),
                    Err(failure) => {
                        tracing::error!("analysis failed for {}: {}", request.exercise_kind.as_wire_str(), failure);
                        serde_json::to_string(&ErrorResponse::new(request.request_id, &failure))
                    }
                }
            }
            Ok(IncomingMessage::Command(request)) if request.command == RESET_COUNTER_COMMAND => {
                self.registry.get_or_create(request.exercise_kind);
                self.registry.reset(request.exercise_kind);
                tracing::info!("reset counter for {}", request.exercise_kind.as_wire_str());
                serde_json::to_string(&CommandResponse::reset_counter_ack(
                    request.request_id,
                    request.exercise_kind,
                    start.elapsed().as_secs_f64(),
                ))
            }
            Ok(IncomingMessage::Command(request)) => {
                let failure = Failure::CommandError(format!("unknown command: {}", request.command));
                tracing::warn!("unknown command: {}", request.command);
                serde_json::to_string(&ErrorResponse::new(request.request_id, &failure))
            }
            Err(parse_failure) => {
                tracing::error!("request parse failed: {}", parse_failure.failure);
                serde_json::to_string(&ErrorResponse::from_parse_failure(&parse_failure))
            }
        };

        rendered.unwrap_or_else(|e| {
            tracing::error!("failed to serialize response: {}", e);
            r#"{"success":false,"requestId":"unknown","type":"error_response","error":{"type":"ANALYSIS_ERROR","severity":"error","message":"internal serialization failure"}}"#.to_string()
        })
    }
}
