//! Accept-loop integration tests
//!
//! End-to-end: real TCP connects against bound trap ports, with
//! recording fakes behind the reporter/notifier seams.
//!
//! Run with: cargo test --test accept_loop

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use snared::bootstrap::{ReportWorker, Shutdown};
use snared::config::ListenerConfig;
use snared::dedup::DedupCache;
use snared::listener::{ConnectionEvent, Listeners};
use snared::report::{AbuseReporter, Notifier, ReportError, ReportOutcome};

#[derive(Default)]
struct RecordingReporter {
    calls: Mutex<Vec<ConnectionEvent>>,
    rate_limited: bool,
}

impl RecordingReporter {
    fn calls(&self) -> Vec<ConnectionEvent> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AbuseReporter for RecordingReporter {
    async fn report(&self, event: &ConnectionEvent) -> Result<ReportOutcome, ReportError> {
        self.calls.lock().unwrap().push(*event);
        if self.rate_limited {
            Ok(ReportOutcome::RateLimited)
        } else {
            Ok(ReportOutcome::Accepted)
        }
    }
}

#[derive(Default)]
struct RecordingNotifier {
    calls: Mutex<Vec<ConnectionEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &ConnectionEvent) -> Result<(), ReportError> {
        self.calls.lock().unwrap().push(*event);
        Ok(())
    }
}

/// Test fixture: bound ephemeral trap ports wired to recording fakes.
struct TestTrap {
    addrs: Vec<std::net::SocketAddr>,
    reporter: Arc<RecordingReporter>,
    notifier: Arc<RecordingNotifier>,
    shutdown: Arc<Shutdown>,
    worker: tokio::task::JoinHandle<()>,
}

impl TestTrap {
    async fn start(num_ports: usize, with_notifier: bool, rate_limited: bool) -> Self {
        let config = ListenerConfig {
            bind: "127.0.0.1".parse().unwrap(),
            ports: vec![0; num_ports],
            backlog: 16,
        };

        let listeners = Listeners::bind(&config).expect("bind failed");
        let addrs = listeners.local_addrs();

        let reporter = Arc::new(RecordingReporter {
            calls: Mutex::new(Vec::new()),
            rate_limited,
        });
        let notifier = Arc::new(RecordingNotifier::default());

        let worker = ReportWorker::new(
            DedupCache::new(50, Duration::from_secs(900)),
            reporter.clone(),
            with_notifier.then(|| notifier.clone() as Arc<dyn Notifier>),
        );

        let shutdown = Arc::new(Shutdown::new());
        let events = listeners.start(shutdown.clone());
        let handle = tokio::spawn(worker.run(events, shutdown.subscribe()));

        Self {
            addrs,
            reporter,
            notifier,
            shutdown,
            worker: handle,
        }
    }

    /// Open and immediately drop a connection to the nth trap port.
    async fn connect(&self, idx: usize) {
        let stream = TcpStream::connect(self.addrs[idx]).await.expect("connect failed");
        drop(stream);
    }

    /// Poll until the reporter has seen `count` calls.
    async fn wait_for_reports(&self, count: usize) {
        wait_until(|| self.reporter.calls().len() >= count).await;
    }

    async fn stop(self) {
        self.shutdown.trigger();
        let _ = self.worker.await;
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn test_first_connection_reported_repeat_suppressed() {
    let trap = TestTrap::start(1, false, false).await;

    trap.connect(0).await;
    trap.wait_for_reports(1).await;

    // Same source IP again within the window: no second report.
    trap.connect(0).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let calls = trap.reporter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].peer.to_string(), "127.0.0.1");
    assert_eq!(calls[0].port, trap.addrs[0].port());

    trap.stop().await;
}

#[tokio::test]
async fn test_report_references_the_port_that_was_hit() {
    let trap = TestTrap::start(2, false, false).await;

    trap.connect(1).await;
    trap.wait_for_reports(1).await;

    let calls = trap.reporter.calls();
    assert_eq!(calls[0].port, trap.addrs[1].port());
    assert_ne!(trap.addrs[0].port(), trap.addrs[1].port());

    trap.stop().await;
}

#[tokio::test]
async fn test_rate_limited_report_suppresses_retries() {
    let trap = TestTrap::start(1, false, true).await;

    trap.connect(0).await;
    trap.wait_for_reports(1).await;

    trap.connect(0).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(trap.reporter.calls().len(), 1);

    trap.stop().await;
}

#[tokio::test]
async fn test_notifications_fire_on_every_connection() {
    let trap = TestTrap::start(1, true, false).await;

    trap.connect(0).await;
    trap.connect(0).await;
    wait_until(|| trap.notifier.calls.lock().unwrap().len() >= 2).await;

    // One report, two notifications.
    assert_eq!(trap.reporter.calls().len(), 1);
    assert_eq!(trap.notifier.calls.lock().unwrap().len(), 2);

    trap.stop().await;
}

#[tokio::test]
async fn test_no_notifications_when_unconfigured() {
    let trap = TestTrap::start(1, false, false).await;

    trap.connect(0).await;
    trap.wait_for_reports(1).await;

    assert!(trap.notifier.calls.lock().unwrap().is_empty());

    trap.stop().await;
}

#[tokio::test]
async fn test_nothing_is_written_to_the_connection() {
    use tokio::io::AsyncReadExt;

    let trap = TestTrap::start(1, false, false).await;

    let mut stream = TcpStream::connect(trap.addrs[0]).await.unwrap();
    let mut buf = [0u8; 64];

    // No banner, no handshake: the trap closes without sending a byte.
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0);

    trap.wait_for_reports(1).await;
    trap.stop().await;
}

#[tokio::test]
async fn test_bind_is_all_or_nothing() {
    // Occupy a port, then ask for it alongside a free one.
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let taken_port = occupied.local_addr().unwrap().port();

    let config = ListenerConfig {
        bind: "127.0.0.1".parse().unwrap(),
        ports: vec![0, taken_port],
        backlog: 16,
    };

    assert!(Listeners::bind(&config).is_err());
}
