pub mod config;
pub mod error;
pub mod framing;

use crate::ingestor::config::FeedConfig;
use crate::ingestor::error::IngestError;
use crate::ingestor::framing::ReportFramer;
use crate::pipeline::PipelineQueue;
use crate::thread_manager::SteppableTask;
use crate::types::RawReport;

use std::io::Read;

const READ_BUFFER_BYTES: usize = 16 * 1024;

/// Longest a single step sleeps while waiting out a reconnect delay.
const RETRY_POLL: std::time::Duration = std::time::Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Retrying { until: std::time::Instant },
    Failed,
}

/// Reads the aircraft feed and hands every recovered report to the pipeline.
///
/// The connection is re-established after `reconnect_interval` whenever it
/// closes or cannot be opened. Once more than `max_reconnect_attempts`
/// consecutive closes happen without a successful connect in between, the
/// ingestor moves to [`ConnectionState::Failed`], reports
/// [`IngestError::RetriesExhausted`] on the fatal channel and stops.
pub struct FeedIngestor {
    config: FeedConfig,
    queue: PipelineQueue,
    fatal: crossbeam_channel::Sender<IngestError>,
    state: ConnectionState,
    stream: Option<std::net::TcpStream>,
    framer: ReportFramer,
    retries: u32,
    buffer: Vec<u8>,
}

impl FeedIngestor {
    #[must_use]
    pub fn new(
        config: &FeedConfig,
        queue: PipelineQueue,
        fatal: crossbeam_channel::Sender<IngestError>,
    ) -> Self {
        FeedIngestor {
            config: config.clone(),
            queue,
            fatal,
            state: ConnectionState::Disconnected,
            stream: None,
            framer: ReportFramer::default(),
            retries: 0,
            buffer: vec![0; READ_BUFFER_BYTES],
        }
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub fn retries(&self) -> u32 {
        self.retries
    }

    fn open(&self) -> Result<std::net::TcpStream, IngestError> {
        let stream = std::net::TcpStream::connect((self.config.host.as_str(), self.config.port))?;
        stream.set_read_timeout(Some(self.config.read_timeout()))?;
        Ok(stream)
    }

    fn connect(&mut self) -> bool {
        self.state = ConnectionState::Connecting;
        log::info!("Ingestor: connecting to {}", self.config.address());

        match self.open() {
            Ok(stream) => {
                log::info!("Ingestor: connected to {}", self.config.address());
                self.stream = Some(stream);
                self.framer.reset();
                self.retries = 0;
                self.state = ConnectionState::Connected;
                true
            }
            Err(e) => {
                log::error!("Ingestor: could not connect to {}: {e}", self.config.address());
                self.on_close()
            }
        }
    }

    /// Returns false once reconnecting has been given up.
    fn on_close(&mut self) -> bool {
        self.stream = None;
        self.state = ConnectionState::Disconnected;
        self.retries += 1;

        if self.retries > self.config.max_reconnect_attempts {
            self.state = ConnectionState::Failed;
            let error = IngestError::RetriesExhausted {
                address: self.config.address(),
                attempts: self.config.max_reconnect_attempts,
            };
            log::error!("Ingestor: {error}");
            let _ = self.fatal.send(error);
            return false;
        }

        log::info!(
            "Ingestor: reconnecting in {:?} (attempt {} of {})",
            self.config.reconnect_interval(),
            self.retries,
            self.config.max_reconnect_attempts
        );
        self.state = ConnectionState::Retrying {
            until: std::time::Instant::now() + self.config.reconnect_interval(),
        };
        true
    }

    fn read(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return self.on_close();
        };

        match stream.read(&mut self.buffer) {
            Ok(0) => {
                log::warn!("Ingestor: feed closed the connection");
                self.on_close()
            }
            Ok(bytes_read) => {
                let objects = self.framer.push(&self.buffer[..bytes_read]);
                self.forward(objects)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock
                        | std::io::ErrorKind::TimedOut
                        | std::io::ErrorKind::Interrupted
                ) =>
            {
                true
            }
            Err(e) => {
                log::error!("Ingestor: read failed: {e}");
                self.on_close()
            }
        }
    }

    fn forward(&self, objects: Vec<serde_json::Value>) -> bool {
        for object in objects {
            let report = match RawReport::from_value(object) {
                Ok(report) => report,
                Err(e) => {
                    log::error!("Ingestor: dropping unusable report: {e}");
                    continue;
                }
            };
            if let Err(e) = self.queue.enqueue(report) {
                log::error!("Ingestor: {e}");
                let _ = self.fatal.send(IngestError::QueueClosed);
                return false;
            }
        }
        true
    }
}

impl SteppableTask for FeedIngestor {
    fn step(&mut self) -> bool {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Connecting => self.connect(),
            ConnectionState::Retrying { until } => {
                let now = std::time::Instant::now();
                if now >= until {
                    self.connect()
                } else {
                    std::thread::sleep((until - now).min(RETRY_POLL));
                    true
                }
            }
            ConnectionState::Connected => self.read(),
            ConnectionState::Failed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::config::FeedConfig;
    use super::error::IngestError;
    use super::{ConnectionState, FeedIngestor};
    use crate::pipeline::queue;
    use crate::thread_manager::SteppableTask;
    use crate::types::RawReport;

    use std::io::Write;

    fn feed_config(port: u16, max_reconnect_attempts: u32) -> FeedConfig {
        FeedConfig {
            host: String::from("127.0.0.1"),
            port,
            reconnect_interval_ms: 10,
            max_reconnect_attempts,
            read_timeout_ms: 50,
        }
    }

    struct Fixture {
        ingestor: FeedIngestor,
        reports: crossbeam_channel::Receiver<RawReport>,
        fatal: crossbeam_channel::Receiver<IngestError>,
    }

    fn fixture(port: u16, max_reconnect_attempts: u32) -> Fixture {
        let (events, _) = crossbeam_channel::unbounded();
        let (queue, reports) = queue(events);
        let (fatal_sender, fatal) = crossbeam_channel::unbounded();
        Fixture {
            ingestor: FeedIngestor::new(
                &feed_config(port, max_reconnect_attempts),
                queue,
                fatal_sender,
            ),
            reports,
            fatal,
        }
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        listener.local_addr().expect("local address").port()
    }

    fn run_until_stopped(ingestor: &mut FeedIngestor) {
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        while ingestor.step() {
            assert!(std::time::Instant::now() < deadline, "ingestor never stopped");
        }
    }

    #[test]
    fn when_feed_sends_split_chunks_then_reports_are_enqueued_in_order() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local address").port();
        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("accept");
            socket
                .write_all(br#"[{"hex":"a1b2c3","flight":"UAL123 "},{"hex":"abc123","flight":"N123AB"#)
                .expect("write");
            socket.flush().expect("flush");
            std::thread::sleep(std::time::Duration::from_millis(100));
            socket.write_all(br#""}]{"hex":"d4e5f6","r":"N100DL"}"#).expect("write");
        });

        let mut fixture = fixture(port, 0);
        run_until_stopped(&mut fixture.ingestor);
        server.join().expect("server finished");

        let identities: Vec<String> = fixture
            .reports
            .try_iter()
            .map(|report| report.identity())
            .collect();
        assert_eq!(identities, vec!["UAL123", "N123AB", "N100DL"]);
    }

    #[test]
    fn when_feed_is_unreachable_then_retries_are_exhausted() {
        let mut fixture = fixture(closed_port(), 2);

        run_until_stopped(&mut fixture.ingestor);

        assert_eq!(fixture.ingestor.state(), ConnectionState::Failed);
        assert_eq!(fixture.ingestor.retries(), 3);
        assert!(matches!(
            fixture.fatal.try_recv(),
            Ok(IngestError::RetriesExhausted { attempts: 2, .. })
        ));
        assert!(!fixture.ingestor.step());
    }

    #[test]
    fn when_connection_reestablished_then_retry_counter_resets() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local address").port();
        let (release_sender, release) = crossbeam_channel::bounded::<()>(1);
        let server = std::thread::spawn(move || {
            let (first, _) = listener.accept().expect("accept first");
            drop(first);
            let (mut second, _) = listener.accept().expect("accept second");
            second.write_all(br#"{"hex":"a1b2c3","flight":"UAL123"}"#).expect("write");
            let _ = release.recv();
        });

        let mut fixture = fixture(port, 1);
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);

        while fixture.reports.is_empty() {
            assert!(fixture.ingestor.step(), "ingestor stopped early");
            assert!(std::time::Instant::now() < deadline, "no report arrived");
        }

        assert_eq!(fixture.ingestor.state(), ConnectionState::Connected);
        assert_eq!(fixture.ingestor.retries(), 0);
        assert!(fixture.fatal.is_empty());

        release_sender.send(()).expect("release server");
        server.join().expect("server finished");
    }

    #[test]
    fn when_pipeline_is_gone_then_ingestor_stops() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local address").port();
        let server = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().expect("accept");
            socket.write_all(br#"{"hex":"a1b2c3"}"#).expect("write");
            std::thread::sleep(std::time::Duration::from_millis(200));
        });

        let Fixture {
            mut ingestor,
            reports,
            fatal,
        } = fixture(port, 5);
        drop(reports);

        run_until_stopped(&mut ingestor);
        assert_eq!(ingestor.state(), ConnectionState::Connected);
        assert!(matches!(fatal.try_recv(), Ok(IngestError::QueueClosed)));
        server.join().expect("server finished");
    }
}
