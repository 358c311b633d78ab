//! The fetch → condense → frame → send run.
//!
//! ```text
//! provider ─► RawEvent ─► condense ─► calendar-condensed.json
//!                                          │
//!                     (--skip-fetch reads) ┘
//!                                          ▼
//!                                   Frame (LEN:<n>)
//!                                          │
//!                     discover ─► Transmitter ─► display
//! ```
//!
//! [`Pipeline::prepare`] produces the frame, [`Pipeline::deliver`] puts it on
//! the air. The two halves are split so the radio is only opened once there
//! is something to send.

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, Utc};
use inkcal_ble::{Progress, Radio, Transfer, TransferMode, Transmitter, discover};
use inkcal_core::{CondensedEvent, TimeWindow};
use inkcal_protocol::Frame;
use inkcal_providers::{CalendarProvider, FileProvider, condense_events};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::{EventSource, GraphSettings, PipelineConfig};
use crate::error::{ClientError, ClientResult};

/// Builds the provider for `source`; `None` when nothing is fetched.
pub fn provider_for(
    source: &EventSource,
    graph: Option<&GraphSettings>,
) -> ClientResult<Option<Box<dyn CalendarProvider>>> {
    match source {
        EventSource::Skip => Ok(None),
        EventSource::File(path) => Ok(Some(Box::new(FileProvider::new(path)))),
        EventSource::Graph => graph_provider(graph).map(Some),
    }
}

#[cfg(feature = "graph")]
fn graph_provider(graph: Option<&GraphSettings>) -> ClientResult<Box<dyn CalendarProvider>> {
    let settings = graph.ok_or_else(|| {
        ClientError::Config(
            "no [graph] section in the configuration; add one or pass --events-file".to_string(),
        )
    })?;
    let provider = inkcal_providers::graph::GraphProvider::new(settings.to_provider_config()?)?;
    Ok(Box::new(provider))
}

#[cfg(not(feature = "graph"))]
fn graph_provider(_graph: Option<&GraphSettings>) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(ClientError::Config(
        "built without Microsoft Graph support; pass --events-file".to_string(),
    ))
}

/// Opens the first Bluetooth adapter.
#[cfg(feature = "btleplug")]
pub async fn open_radio() -> ClientResult<Box<dyn Radio>> {
    let radio = inkcal_ble::BtleRadio::first_adapter().await?;
    Ok(Box::new(radio))
}

#[cfg(not(feature = "btleplug"))]
pub async fn open_radio() -> ClientResult<Box<dyn Radio>> {
    Err(ClientError::Config(
        "built without Bluetooth support; use --no-send".to_string(),
    ))
}

/// One run of the pipeline.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    shutdown: watch::Receiver<bool>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self { config, shutdown }
    }

    /// Returns true if [`Pipeline::deliver`] has work to do.
    pub fn sends(&self) -> bool {
        self.config.send
    }

    /// Fetches, condenses and writes the calendar, then frames it.
    ///
    /// Returns `None` when nothing will be sent, or only the time.
    pub async fn prepare(
        &self,
        provider: Option<&dyn CalendarProvider>,
        now: DateTime<Utc>,
    ) -> ClientResult<Option<Frame>> {
        if self.config.time_only {
            return Ok(None);
        }

        let events = match (&self.config.source, provider) {
            (EventSource::Skip, _) => {
                let events = read_condensed(&self.config.output)?;
                println!(
                    "Loaded {} events from {}",
                    events.len(),
                    self.config.output.display()
                );
                events
            }
            (_, Some(provider)) => {
                let events = self.fetch_and_condense(provider, now).await?;
                write_condensed(&self.config.output, &events)?;
                println!(
                    "Wrote {} events to {}",
                    events.len(),
                    self.config.output.display()
                );
                print_summary(&events);
                events
            }
            (source, None) => {
                return Err(ClientError::Config(format!(
                    "no calendar provider for {:?}",
                    source
                )));
            }
        };

        if !self.config.send {
            return Ok(None);
        }
        let frame = Frame::encode(&events, self.config.max_payload)?;
        debug!(
            body = frame.body_len(),
            total = frame.total_len(),
            "framed payload"
        );
        Ok(Some(frame))
    }

    /// Fetches the configured window and condenses it.
    pub async fn fetch_and_condense(
        &self,
        provider: &dyn CalendarProvider,
        now: DateTime<Utc>,
    ) -> ClientResult<Vec<CondensedEvent>> {
        let window = TimeWindow::calendar_view(
            now,
            &self.config.zone,
            self.config.lookback_days,
            self.config.days,
        );
        info!(
            provider = provider.name(),
            start = %window.start_param(),
            end = %window.end_param(),
            "fetching events"
        );

        let raw = self.interruptible(provider.fetch_events(window)).await??;
        info!(count = raw.len(), "fetched events");
        Ok(condense_events(&raw, &self.config.zone)?)
    }

    /// Locates the display and sends `frame`, or only the time.
    ///
    /// `epoch` is the value of the `TIME:` line when one is sent.
    pub async fn deliver(
        &self,
        radio: &dyn Radio,
        frame: Option<&Frame>,
        epoch: i64,
    ) -> ClientResult<()> {
        let transfer = match frame {
            _ if self.config.time_only => Transfer::TimeOnly(epoch),
            Some(frame) => Transfer::Frame {
                frame,
                time: self.config.send_time.then_some(epoch),
            },
            None => return Err(ClientError::Config("nothing to send".to_string())),
        };

        let display = self
            .interruptible(discover(radio, &self.config.discovery))
            .await??;
        println!("Found display: {}", display);

        let transmitter = Transmitter::new(self.config.transfer)
            .with_shutdown(self.shutdown.clone())
            .with_progress(print_progress);
        let report = transmitter
            .send(radio, &display, &self.config.target, transfer)
            .await?;

        match report.mode {
            None => println!("Time sent ({} bytes)", report.bytes),
            Some(TransferMode::Combined) => {
                println!("Calendar sent in a single write ({} bytes)", report.bytes)
            }
            Some(TransferMode::Split) => println!(
                "Calendar sent in {} writes ({} bytes)",
                report.writes, report.bytes
            ),
        }
        Ok(())
    }

    /// Runs `future` unless shutdown is requested first.
    async fn interruptible<F: Future>(&self, future: F) -> ClientResult<F::Output> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(ClientError::Interrupted);
        }
        tokio::select! {
            output = future => Ok(output),
            Ok(_) = shutdown.wait_for(|stop| *stop) => Err(ClientError::Interrupted),
        }
    }
}

/// Writes `events` as a 2-space indented JSON array, non-ASCII kept as is.
pub fn write_condensed(path: &Path, events: &[CondensedEvent]) -> ClientResult<()> {
    let json = serde_json::to_string_pretty(events).map_err(|e| ClientError::json(path, e))?;
    std::fs::write(path, json).map_err(|e| ClientError::io(path, e))
}

/// Reads a previously written condensed file.
pub fn read_condensed(path: &Path) -> ClientResult<Vec<CondensedEvent>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ClientError::MissingCondensedFile(path.to_path_buf()));
        }
        Err(e) => return Err(ClientError::io(path, e)),
    };
    serde_json::from_str(&content).map_err(|e| ClientError::json(path, e))
}

/// Prints one line per event.
pub fn print_summary(events: &[CondensedEvent]) {
    for event in events {
        println!("  {}", event.summary_line());
    }
}

fn print_progress(progress: Progress) {
    println!(
        "Sent {}/{} bytes ({}%)",
        progress.sent,
        progress.total,
        progress.percent()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use chrono::TimeZone;
    use inkcal_ble::{
        BleError, BleResult, BoxFuture, GattTarget, Link, PeripheralHandle, WriteMode,
    };
    use inkcal_protocol::FrameAssembler;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    const EVENTS: &str = r#"{"value": [
        {
            "subject": "Sprint Review",
            "start": {"dateTime": "2025-09-11T11:00:00.0000000", "timeZone": "UTC"},
            "end": {"dateTime": "2025-09-11T11:30:00.0000000", "timeZone": "UTC"},
            "location": {"displayName": "Microsoft Teams Meeting Raum 5"},
            "attendees": [
                {"type": "required", "status": {"response": "accepted"}},
                {"type": "optional", "status": {"response": "none"}}
            ]
        },
        {"subject": "Mittagessen"}
    ]}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 11, 6, 0, 0).unwrap()
    }

    fn config(dir: &Path, args: &[&str]) -> PipelineConfig {
        use clap::Parser;
        let cli = crate::cli::Cli::try_parse_from(
            std::iter::once("inkcal").chain(args.iter().copied()),
        )
        .unwrap();
        let mut config = PipelineConfig::resolve(&cli, &ClientConfig::default()).unwrap();
        config.output = dir.join("calendar-condensed.json");
        config.discovery.scan_timeout = Duration::from_millis(10);
        config
    }

    fn never() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    fn events_file(dir: &Path) -> PathBuf {
        let path = dir.join("events.json");
        std::fs::write(&path, EVENTS).unwrap();
        path
    }

    #[derive(Default)]
    struct Recording {
        writes: Vec<(Vec<u8>, WriteMode)>,
        disconnected: bool,
    }

    #[derive(Default)]
    struct RecordingRadio {
        peripherals: Vec<PeripheralHandle>,
        log: Arc<Mutex<Recording>>,
    }

    impl RecordingRadio {
        fn with_display() -> Self {
            Self {
                peripherals: vec![PeripheralHandle {
                    address: "C0:FF:EE:00:00:01".to_string(),
                    name: Some("InkCal-01".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }
        }

        fn bytes(&self) -> Vec<u8> {
            let log = self.log.lock().unwrap();
            log.writes.iter().flat_map(|(data, _)| data.clone()).collect()
        }
    }

    struct RecordingLink(Arc<Mutex<Recording>>);

    impl Radio for RecordingRadio {
        fn scan(&self, _window: Duration) -> BoxFuture<'_, BleResult<Vec<PeripheralHandle>>> {
            Box::pin(async move { Ok(self.peripherals.clone()) })
        }

        fn connect<'a>(
            &'a self,
            _peripheral: &'a PeripheralHandle,
            _target: &'a GattTarget,
        ) -> BoxFuture<'a, BleResult<Box<dyn Link>>> {
            Box::pin(async move { Ok(Box::new(RecordingLink(self.log.clone())) as Box<dyn Link>) })
        }
    }

    impl Link for RecordingLink {
        fn write<'a>(&'a mut self, data: &'a [u8], mode: WriteMode) -> BoxFuture<'a, BleResult<()>> {
            Box::pin(async move {
                self.0.lock().unwrap().writes.push((data.to_vec(), mode));
                Ok(())
            })
        }

        fn disconnect(&mut self) -> BoxFuture<'_, BleResult<()>> {
            Box::pin(async move {
                self.0.lock().unwrap().disconnected = true;
                Ok(())
            })
        }
    }

    mod prepare {
        use super::*;

        #[tokio::test]
        async fn writes_pretty_file_and_frames_compact() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &[]);
            let provider = FileProvider::new(events_file(dir.path()));
            let pipeline = Pipeline::new(&config, never());

            let frame = pipeline
                .prepare(Some(&provider), now())
                .await
                .unwrap()
                .unwrap();

            let written = std::fs::read_to_string(&config.output).unwrap();
            assert!(written.starts_with("[\n  {\n    \"date\": \"2025-09-11\""));
            assert!(written.contains("\"location\": \"Raum 5\""));

            let events: Vec<CondensedEvent> = inkcal_protocol::decode_frame(&frame.to_bytes()).unwrap();
            assert_eq!(events.len(), 2);
            assert_eq!(events[0].start.as_deref(), Some("2025-09-11T13:00:00+0200"));
            assert_eq!(events[0].num_of.not_responded, 1);
            assert_eq!(events[1].date, "");
            assert!(!frame.body().contains(&b'\n'));
        }

        #[tokio::test]
        async fn no_send_skips_framing() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--no-send"]);
            let provider = FileProvider::new(events_file(dir.path()));
            let pipeline = Pipeline::new(&config, never());

            assert!(!pipeline.sends());
            assert!(pipeline.prepare(Some(&provider), now()).await.unwrap().is_none());
            assert!(config.output.exists());
        }

        #[tokio::test]
        async fn skip_fetch_reads_existing_file() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--skip-fetch"]);
            let stored = CondensedEvent {
                date: "2025-09-12".to_string(),
                subject: Some("Übergabe".to_string()),
                ..Default::default()
            };
            write_condensed(&config.output, std::slice::from_ref(&stored)).unwrap();
            let pipeline = Pipeline::new(&config, never());

            let frame = pipeline.prepare(None, now()).await.unwrap().unwrap();
            assert!(frame.body().starts_with("[{\"date\":\"2025-09-12\",".as_bytes()));
            let events: Vec<CondensedEvent> = inkcal_protocol::decode_frame(&frame.to_bytes()).unwrap();
            assert_eq!(events, vec![stored]);
        }

        #[tokio::test]
        async fn skip_fetch_unreadable_file() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--skip-fetch"]);
            std::fs::write(&config.output, "{not json").unwrap();
            let pipeline = Pipeline::new(&config, never());

            let err = pipeline.prepare(None, now()).await.unwrap_err();
            assert!(matches!(err, ClientError::Json { .. }));
            assert_eq!(err.exit_code(), 1);
        }

        #[tokio::test]
        async fn skip_fetch_missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--skip-fetch"]);
            let pipeline = Pipeline::new(&config, never());

            let err = pipeline.prepare(None, now()).await.unwrap_err();
            assert!(matches!(err, ClientError::MissingCondensedFile(_)));
            assert_eq!(err.exit_code(), 2);
        }

        #[tokio::test]
        async fn oversize_payload_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--max-payload", "64"]);
            let provider = FileProvider::new(events_file(dir.path()));
            let pipeline = Pipeline::new(&config, never());

            let err = pipeline.prepare(Some(&provider), now()).await.unwrap_err();
            assert!(matches!(
                err,
                ClientError::Protocol(inkcal_protocol::ProtocolError::PayloadTooLarge { max: 64, .. })
            ));
        }

        #[tokio::test]
        async fn malformed_timestamp_aborts() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &[]);
            let path = dir.path().join("events.json");
            std::fs::write(&path, r#"[{"start": {"dateTime": "yesterday"}}]"#).unwrap();
            let pipeline = Pipeline::new(&config, never());

            let err = pipeline
                .prepare(Some(&FileProvider::new(path)), now())
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::Condense(_)));
            assert!(!config.output.exists());
        }

        #[tokio::test]
        async fn interrupted_before_fetch() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &[]);
            let (tx, rx) = watch::channel(false);
            tx.send(true).unwrap();
            let pipeline = Pipeline::new(&config, rx);

            let provider = FileProvider::new(events_file(dir.path()));
            let err = pipeline.prepare(Some(&provider), now()).await.unwrap_err();
            assert_eq!(err.exit_code(), 130);
        }
    }

    mod deliver {
        use super::*;

        #[tokio::test]
        async fn sends_time_then_frame() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--send-time"]);
            let provider = FileProvider::new(events_file(dir.path()));
            let pipeline = Pipeline::new(&config, never());
            let frame = pipeline.prepare(Some(&provider), now()).await.unwrap();

            let radio = RecordingRadio::with_display();
            pipeline
                .deliver(&radio, frame.as_ref(), 1_757_577_600)
                .await
                .unwrap();

            let bytes = radio.bytes();
            assert!(bytes.starts_with(b"TIME:1757577600\nLEN:"));

            let mut assembler = FrameAssembler::new(config.max_payload);
            assembler.push(&bytes).unwrap();
            assert_eq!(assembler.time(), Some(1_757_577_600));
            let events: Vec<CondensedEvent> = assembler.decode().unwrap();
            assert_eq!(events.len(), 2);
            assert!(radio.log.lock().unwrap().disconnected);
        }

        #[tokio::test]
        async fn time_only() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--time-only"]);
            let pipeline = Pipeline::new(&config, never());
            assert!(pipeline.prepare(None, now()).await.unwrap().is_none());

            let radio = RecordingRadio::with_display();
            pipeline.deliver(&radio, None, 42).await.unwrap();

            let log = radio.log.lock().unwrap();
            assert_eq!(log.writes, vec![(b"TIME:42\n".to_vec(), WriteMode::WithResponse)]);
        }

        #[tokio::test]
        async fn no_display_found() {
            let dir = tempfile::tempdir().unwrap();
            let config = config(dir.path(), &["--time-only"]);
            let pipeline = Pipeline::new(&config, never());

            let radio = RecordingRadio {
                peripherals: vec![PeripheralHandle {
                    address: "11:22:33:44:55:66".to_string(),
                    name: Some("Pixel 8".to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            };
            let err = pipeline.deliver(&radio, None, 42).await.unwrap_err();
            let message = format!("error: {}", err);
            assert!(message.contains("Pixel 8 (11:22:33:44:55:66)"), "{}", message);
            match err {
                ClientError::Ble(BleError::DiscoveryFailed { observed }) => {
                    assert_eq!(observed.len(), 1);
                    assert_eq!(observed[0].address, "11:22:33:44:55:66");
                }
                other => panic!("unexpected error: {:?}", other),
            }
            assert!(radio.log.lock().unwrap().writes.is_empty());
        }
    }

    #[test]
    fn provider_for_sources() {
        assert!(provider_for(&EventSource::Skip, None).unwrap().is_none());

        let provider = provider_for(&EventSource::File("events.json".into()), None)
            .unwrap()
            .unwrap();
        assert_eq!(provider.name(), "file");

        let err = provider_for(&EventSource::Graph, None).err().unwrap();
        assert!(matches!(err, ClientError::Config(_)));
    }
}
