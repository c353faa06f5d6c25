use crate::cursor::{CursorStore, SyncCursor};
use crate::transmit::{AttemptState, IngestEndpoint, TransmitOptions, Transmitter, plan_batches};
use crate::{Error, Result};
use logship_parser::{ParseOutcome, SourceFile, SourceParser, discover_sources, read_lines_from};
use logship_types::CanonicalMessage;
use std::path::Path;

/// Progress events emitted while a sync run executes. The CLI renders
/// these; library callers can ignore them with a no-op closure.
#[derive(Debug)]
pub enum SyncProgress {
    ScanStarted {
        sources: usize,
    },
    SourceStarted {
        source_id: String,
        pending_lines: usize,
    },
    BatchDelivered {
        source_id: String,
        processed: u64,
        skipped: u64,
    },
    SourceStalled {
        source_id: String,
        reason: String,
    },
    SourceCompleted {
        source_id: String,
        messages_sent: usize,
        lines_skipped: u64,
    },
}

/// Totals for one sync run.
#[derive(Debug, Default)]
pub struct SyncSummary {
    pub sources_scanned: usize,
    pub sources_stalled: usize,
    pub messages_sent: usize,
    pub messages_duplicate: u64,
    pub lines_skipped: u64,
    pub batches_delivered: usize,
}

/// End-to-end sync pipeline: discover sources, parse past each cursor,
/// batch and deliver, then advance cursors over the acknowledged prefix.
pub struct SyncService<'a, E: IngestEndpoint> {
    endpoint: &'a E,
    options: TransmitOptions,
    cursors: CursorStore,
}

impl<'a, E: IngestEndpoint> SyncService<'a, E> {
    pub fn new(endpoint: &'a E, options: TransmitOptions, cursors: CursorStore) -> Self {
        Self {
            endpoint,
            options,
            cursors,
        }
    }

    pub fn cursors(&self) -> &CursorStore {
        &self.cursors
    }

    /// Sync every discovered source under `log_root`.
    ///
    /// Per-source failures stall that source and move on; only a rejected
    /// batch (bad credentials, malformed payload) aborts the whole run,
    /// since it would repeat identically for every remaining source.
    pub fn sync_all(
        &mut self,
        log_root: &Path,
        progress: &mut dyn FnMut(SyncProgress),
    ) -> Result<SyncSummary> {
        let sources = discover_sources(log_root)?;
        progress(SyncProgress::ScanStarted {
            sources: sources.len(),
        });

        let mut summary = SyncSummary::default();
        for source in &sources {
            summary.sources_scanned += 1;
            match self.sync_source(source, &mut summary, progress) {
                Ok(()) => {}
                Err(Error::Delivery(err)) => return Err(Error::Delivery(err)),
                Err(err) => {
                    summary.sources_stalled += 1;
                    progress(SyncProgress::SourceStalled {
                        source_id: source.source_id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(summary)
    }

    fn sync_source(
        &mut self,
        source: &SourceFile,
        summary: &mut SyncSummary,
        progress: &mut dyn FnMut(SyncProgress),
    ) -> Result<()> {
        let cursor = self.cursors.resolve_start_point(&source.source_id);
        let lines = read_lines_from(&source.path, cursor.last_line)?;
        if lines.is_empty() {
            return Ok(());
        }
        progress(SyncProgress::SourceStarted {
            source_id: source.source_id.clone(),
            pending_lines: lines.len(),
        });

        let mut parser = SourceParser::with_session_hint(source.source_id.clone());
        // Messages paired with the line they came from, so cursor
        // advancement can map an acknowledged prefix back to lines.
        let mut parsed: Vec<(usize, CanonicalMessage)> = Vec::new();
        let mut last_line_read = cursor.last_line;
        for (line_idx, line) in &lines {
            last_line_read = *line_idx;
            match parser.parse_line(line) {
                Some(ParseOutcome::Message(message)) => parsed.push((*line_idx, *message)),
                Some(ParseOutcome::Skip(_)) | None => {}
            }
        }
        summary.lines_skipped += parser.total_skipped();

        let project_path = source
            .project_path
            .clone()
            .unwrap_or_else(|| source.path.display().to_string());

        let messages: Vec<CanonicalMessage> = parsed.iter().map(|(_, m)| m.clone()).collect();
        let transmitter = Transmitter::new(self.endpoint, self.options.clone());
        let batches = plan_batches(&messages, &self.options);

        // How many messages (across all batches, in order) are confirmed.
        let mut acked_messages = 0usize;
        let mut stalled: Option<String> = None;
        let mut rejected: Option<crate::transmit::DeliveryError> = None;

        for batch_indices in &batches {
            let slice: Vec<CanonicalMessage> = batch_indices
                .iter()
                .map(|&i| messages[i].clone())
                .collect();
            let outcome = transmitter.send_batch(&project_path, &slice);
            summary.batches_delivered += 1;
            summary.messages_duplicate += outcome.report.skipped;
            acked_messages += outcome.acknowledged_prefix;
            progress(SyncProgress::BatchDelivered {
                source_id: source.source_id.clone(),
                processed: outcome.report.processed,
                skipped: outcome.report.skipped,
            });
            match outcome.state {
                AttemptState::Done => {}
                AttemptState::PartiallyAcked | AttemptState::ExhaustedRetries => {
                    stalled = Some(format!("delivery stalled ({:?})", outcome.state));
                    break;
                }
                AttemptState::Rejected(reason) => {
                    rejected = Some(crate::transmit::DeliveryError::Rejected(reason));
                    break;
                }
            }
        }

        summary.messages_sent += acked_messages;
        self.advance_cursor(source, &parsed, acked_messages, last_line_read)?;

        if let Some(err) = rejected {
            return Err(Error::Delivery(err));
        }
        if let Some(reason) = stalled {
            summary.sources_stalled += 1;
            progress(SyncProgress::SourceStalled {
                source_id: source.source_id.clone(),
                reason,
            });
            return Ok(());
        }

        progress(SyncProgress::SourceCompleted {
            source_id: source.source_id.clone(),
            messages_sent: acked_messages,
            lines_skipped: parser.total_skipped(),
        });
        Ok(())
    }

    /// Move the cursor past the acknowledged prefix.
    ///
    /// With every message confirmed the cursor jumps past trailing
    /// skip-only lines too; otherwise it stops after the last confirmed
    /// message, so the unconfirmed tail is re-read next run (dedup on the
    /// server absorbs the overlap).
    fn advance_cursor(
        &mut self,
        source: &SourceFile,
        parsed: &[(usize, CanonicalMessage)],
        acked_messages: usize,
        last_line_read: usize,
    ) -> Result<()> {
        let (next_line, last_id) = if acked_messages >= parsed.len() {
            (
                last_line_read + 1,
                parsed.last().map(|(_, m)| m.id.clone()),
            )
        } else if acked_messages > 0 {
            let (line_idx, message) = &parsed[acked_messages - 1];
            (line_idx + 1, Some(message.id.clone()))
        } else {
            // Nothing confirmed this run; leave the cursor untouched.
            return Ok(());
        };

        self.cursors.record_progress(
            &source.source_id,
            SyncCursor {
                source_path: source.path.display().to_string(),
                last_line: next_line,
                last_synced_id: last_id,
                last_synced_at: Some(chrono::Utc::now().to_rfc3339()),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transmit::DeliveryError;
    use logship_types::{IngestBatch, IngestReport};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::io::Write;
    use tempfile::TempDir;

    /// Accepts everything, deduplicates by message id like the real server.
    struct AcceptingEndpoint {
        seen: RefCell<HashSet<String>>,
        batches: RefCell<usize>,
    }

    impl AcceptingEndpoint {
        fn new() -> Self {
            Self {
                seen: RefCell::new(HashSet::new()),
                batches: RefCell::new(0),
            }
        }
    }

    impl IngestEndpoint for AcceptingEndpoint {
        fn submit(&self, batch: &IngestBatch) -> std::result::Result<IngestReport, DeliveryError> {
            *self.batches.borrow_mut() += 1;
            let mut report = IngestReport::default();
            let mut seen = self.seen.borrow_mut();
            for message in &batch.messages {
                if seen.insert(message.id.clone()) {
                    report.processed += 1;
                } else {
                    report.skipped += 1;
                }
            }
            Ok(report)
        }
    }

    /// Fails every submission with a transient error.
    struct UnreachableEndpoint;

    impl IngestEndpoint for UnreachableEndpoint {
        fn submit(&self, _batch: &IngestBatch) -> std::result::Result<IngestReport, DeliveryError> {
            Err(DeliveryError::Transient("connection refused".to_string()))
        }
    }

    fn user_line(id: &str, session: &str, ts: &str, text: &str) -> String {
        format!(
            r#"{{"type":"user","uuid":"{}","sessionId":"{}","timestamp":"{}","message":{{"role":"user","content":"{}"}}}}"#,
            id, session, ts, text
        )
    }

    fn write_source(dir: &Path, project: &str, name: &str, lines: &[String]) {
        let project_dir = dir.join(project);
        std::fs::create_dir_all(&project_dir).unwrap();
        let mut file = std::fs::File::create(project_dir.join(name)).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    fn service<'a, E: IngestEndpoint>(endpoint: &'a E, state_dir: &Path) -> SyncService<'a, E> {
        let cursors = CursorStore::load(&state_dir.join("cursors.toml")).unwrap();
        SyncService::new(endpoint, TransmitOptions::default(), cursors)
    }

    #[test]
    fn test_full_sync_then_incremental_noop() {
        let logs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        write_source(
            logs.path(),
            "proj-a",
            "s-1.jsonl",
            &[
                user_line("u-1", "s-1", "2025-01-01T00:00:00Z", "one"),
                user_line("u-2", "s-1", "2025-01-01T00:00:01Z", "two"),
            ],
        );

        let endpoint = AcceptingEndpoint::new();
        let mut service = service(&endpoint, state.path());
        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 2);
        assert_eq!(summary.batches_delivered, 1);

        // A second run finds nothing past the cursor.
        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 0);
        assert_eq!(summary.batches_delivered, 0);
    }

    #[test]
    fn test_appended_lines_sync_incrementally() {
        let logs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        write_source(
            logs.path(),
            "proj-a",
            "s-1.jsonl",
            &[user_line("u-1", "s-1", "2025-01-01T00:00:00Z", "one")],
        );

        let endpoint = AcceptingEndpoint::new();
        let mut service = service(&endpoint, state.path());
        service.sync_all(logs.path(), &mut |_| {}).unwrap();

        // Append two lines, keeping the original contents.
        let path = logs.path().join("proj-a").join("s-1.jsonl");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            file,
            "{}",
            user_line("u-2", "s-1", "2025-01-01T00:01:00Z", "two")
        )
        .unwrap();
        writeln!(
            file,
            "{}",
            user_line("u-3", "s-1", "2025-01-01T00:02:00Z", "three")
        )
        .unwrap();

        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 2);
        assert_eq!(endpoint.seen.borrow().len(), 3);
    }

    #[test]
    fn test_cursor_does_not_advance_when_delivery_fails() {
        let logs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        write_source(
            logs.path(),
            "proj-a",
            "s-1.jsonl",
            &[user_line("u-1", "s-1", "2025-01-01T00:00:00Z", "one")],
        );

        let endpoint = UnreachableEndpoint;
        let cursors = CursorStore::load(&state.path().join("cursors.toml")).unwrap();
        let options = TransmitOptions {
            max_attempts: 1,
            ..Default::default()
        };
        let mut service = SyncService::new(&endpoint, options, cursors);

        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 0);
        assert_eq!(summary.sources_stalled, 1);

        // Recovery: the same lines deliver once the endpoint is back.
        let good = AcceptingEndpoint::new();
        let cursors = CursorStore::load(&state.path().join("cursors.toml")).unwrap();
        let mut service = SyncService::new(&good, TransmitOptions::default(), cursors);
        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 1);
    }

    #[test]
    fn test_skip_lines_consumed_with_following_message() {
        let logs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        write_source(
            logs.path(),
            "proj-a",
            "s-1.jsonl",
            &[
                user_line("u-1", "s-1", "2025-01-01T00:00:00Z", "one"),
                "{not json".to_string(),
                user_line("u-2", "s-1", "2025-01-01T00:00:01Z", "two"),
            ],
        );

        let endpoint = AcceptingEndpoint::new();
        let mut service = service(&endpoint, state.path());
        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 2);
        assert_eq!(summary.lines_skipped, 1);

        // Cursor sits past the whole file; no re-parse of the bad line.
        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.lines_skipped, 0);
    }

    #[test]
    fn test_large_source_splits_into_batches() {
        let logs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        let lines: Vec<String> = (0..5)
            .map(|i| {
                user_line(
                    &format!("u-{}", i),
                    "s-1",
                    "2025-01-01T00:00:00Z",
                    "msg",
                )
            })
            .collect();
        write_source(logs.path(), "proj-a", "s-1.jsonl", &lines);

        let endpoint = AcceptingEndpoint::new();
        let cursors = CursorStore::load(&state.path().join("cursors.toml")).unwrap();
        let options = TransmitOptions {
            max_messages: 2,
            ..Default::default()
        };
        let mut service = SyncService::new(&endpoint, options, cursors);

        let summary = service.sync_all(logs.path(), &mut |_| {}).unwrap();
        assert_eq!(summary.messages_sent, 5);
        assert_eq!(summary.batches_delivered, 3);
    }

    #[test]
    fn test_rejection_aborts_run() {
        struct RejectingEndpoint;
        impl IngestEndpoint for RejectingEndpoint {
            fn submit(&self, _batch: &IngestBatch) -> std::result::Result<IngestReport, DeliveryError> {
                Err(DeliveryError::Rejected("invalid token".to_string()))
            }
        }

        let logs = TempDir::new().unwrap();
        let state = TempDir::new().unwrap();
        write_source(
            logs.path(),
            "proj-a",
            "s-1.jsonl",
            &[user_line("u-1", "s-1", "2025-01-01T00:00:00Z", "one")],
        );

        let endpoint = RejectingEndpoint;
        let mut service = service(&endpoint, state.path());
        let err = service.sync_all(logs.path(), &mut |_| {}).unwrap_err();
        assert!(matches!(err, Error::Delivery(DeliveryError::Rejected(_))));
    }
}
