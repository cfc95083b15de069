use super::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// --- mocks ---

#[derive(Default)]
struct CountingCredentials {
    clears: AtomicUsize,
}

#[async_trait]
impl CredentialStore for CountingCredentials {
    fn location(&self) -> String {
        "memory://session".to_string()
    }

    async fn exists(&self) -> bool {
        true
    }

    async fn clear(&self) -> Result<(), BlackskyError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct NullSession {
    disconnects: AtomicUsize,
}

#[async_trait]
impl Session for NullSession {
    async fn send_text(&self, _chat_id: &str, _text: &str) -> Result<(), BlackskyError> {
        Ok(())
    }

    async fn logout(&self) -> Result<(), BlackskyError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BlackskyError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

enum Script {
    Refuse,
    Events(Vec<TransportEvent>),
}

/// Transport that plays one script per connect. Connections stay open once
/// their script runs out; an exhausted script list refuses to connect.
#[derive(Default)]
struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    connects: AtomicUsize,
    session: Arc<NullSession>,
    open: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
}

impl ScriptedTransport {
    fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Default::default()
        }
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(
        &self,
        _credentials: &dyn CredentialStore,
    ) -> Result<Connection, BlackskyError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            Some(Script::Events(events)) => {
                let (tx, rx) = mpsc::channel(16);
                for event in events {
                    tx.try_send(event).unwrap();
                }
                self.open.lock().unwrap().push(tx);
                Ok(Connection {
                    session: self.session.clone(),
                    events: rx,
                })
            }
            Some(Script::Refuse) | None => Err(BlackskyError::Transport("refused".into())),
        }
    }
}

fn fast_policy(max_retries: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    }
}

fn gateway(
    transport: Arc<ScriptedTransport>,
    credentials: Arc<CountingCredentials>,
    policy: ReconnectPolicy,
) -> Arc<SessionGateway> {
    let gateway = SessionGateway::new(transport, credentials, policy).with_qr_rendering(false);
    Arc::new(gateway)
}

fn logged_out() -> CloseInfo {
    CloseInfo::new(Some(401), "stream errored: conflict")
}

// --- policy ---

#[test]
fn test_classify_by_code() {
    let kind = |code| DisconnectKind::classify(&CloseInfo::new(Some(code), ""));
    assert_eq!(kind(401), DisconnectKind::LoggedOut);
    assert_eq!(kind(429), DisconnectKind::RateLimited);
    for code in [408, 428, 440, 500, 503, 515] {
        assert_eq!(kind(code), DisconnectKind::Transient, "code {code}");
    }
    assert_eq!(kind(403), DisconnectKind::Unknown);
}

#[test]
fn test_classify_by_reason_when_no_code() {
    let kind = |reason| DisconnectKind::classify(&CloseInfo::new(None, reason));
    assert_eq!(kind("Logged Out by phone"), DisconnectKind::LoggedOut);
    assert_eq!(kind("rate-overlimit"), DisconnectKind::RateLimited);
    assert_eq!(kind("keepalive timed out"), DisconnectKind::Transient);
    assert_eq!(kind("connection closed"), DisconnectKind::Transient);
    assert_eq!(kind("restart required"), DisconnectKind::Transient);
    assert_eq!(kind("bad session"), DisconnectKind::Unknown);
    // Code wins over text.
    assert_eq!(
        DisconnectKind::classify(&CloseInfo::new(Some(515), "logged out")),
        DisconnectKind::Transient
    );
}

#[test]
fn test_backoff_doubles_and_caps() {
    let policy = ReconnectPolicy::default();
    let ms: Vec<u128> = (0..6).map(|r| policy.backoff(r).as_millis()).collect();
    assert_eq!(ms, vec![1000, 2000, 4000, 8000, 10000, 10000]);
    assert_eq!(policy.backoff(40), Duration::from_millis(10000));
}

#[test]
fn test_decide_counts_retries_then_gives_up() {
    let policy = ReconnectPolicy::default();
    let mut retries = 0;
    for expected in 1..=5 {
        assert!(matches!(
            policy.decide(DisconnectKind::Transient, &mut retries),
            Decision::Reconnect {
                clear_credentials: false,
                ..
            }
        ));
        assert_eq!(retries, expected);
    }
    assert_eq!(
        policy.decide(DisconnectKind::Unknown, &mut retries),
        Decision::GiveUp
    );
}

#[test]
fn test_logged_out_resets_and_reconnects_immediately() {
    let policy = ReconnectPolicy::default();
    let mut retries = 5;
    assert_eq!(
        policy.decide(DisconnectKind::LoggedOut, &mut retries),
        Decision::Reconnect {
            delay: Duration::ZERO,
            clear_credentials: true,
        }
    );
    assert_eq!(retries, 0);
}

// --- gateway ---

#[tokio::test]
async fn test_logged_out_close_clears_credentials_once() {
    let creds = Arc::new(CountingCredentials::default());
    let gw = gateway(
        Arc::new(ScriptedTransport::default()),
        creds.clone(),
        ReconnectPolicy::default(),
    );

    for _ in 0..3 {
        gw.on_close(&CloseInfo::new(Some(503), "service unavailable"))
            .await;
    }
    assert_eq!(gw.state().retry_count, 3);
    assert_eq!(creds.clears.load(Ordering::SeqCst), 0);

    let decision = gw.on_close(&logged_out()).await;
    assert_eq!(
        decision,
        Decision::Reconnect {
            delay: Duration::ZERO,
            clear_credentials: true,
        }
    );
    assert_eq!(creds.clears.load(Ordering::SeqCst), 1);
    let state = gw.state();
    assert_eq!(state.retry_count, 0);
    assert_eq!(state.status, SessionStatus::Disconnected);
    assert!(state
        .last_disconnect_reason
        .unwrap()
        .starts_with("logged_out (401"));
}

#[tokio::test]
async fn test_run_recovers_from_logout() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Script::Events(vec![
            TransportEvent::Connected,
            TransportEvent::Closed(logged_out()),
        ]),
        Script::Events(vec![
            TransportEvent::Qr("2@ref,key".into()),
            TransportEvent::Connected,
        ]),
    ]));
    let creds = Arc::new(CountingCredentials::default());
    let gw = gateway(transport.clone(), creds.clone(), ReconnectPolicy::default());
    let mut ready = gw.ready();

    let (tx, _rx) = mpsc::channel(8);
    let runner = gw.clone();
    let task = tokio::spawn(async move { runner.run(tx).await });

    tokio::time::timeout(Duration::from_secs(2), ready.wait_for(|n| *n >= 2))
        .await
        .expect("gateway did not reconnect")
        .unwrap();

    assert_eq!(transport.connects(), 2);
    assert_eq!(creds.clears.load(Ordering::SeqCst), 1);
    let state = gw.state();
    assert_eq!(state.status, SessionStatus::Connected);
    assert_eq!(state.retry_count, 0);
    assert_eq!(transport.session.disconnects.load(Ordering::SeqCst), 1);
    task.abort();
}

#[tokio::test]
async fn test_run_gives_up_after_max_retries() {
    let transport = Arc::new(ScriptedTransport::new(vec![]));
    let gw = gateway(
        transport.clone(),
        Arc::new(CountingCredentials::default()),
        fast_policy(3),
    );
    let (tx, _rx) = mpsc::channel(8);

    let result = tokio::time::timeout(Duration::from_secs(2), gw.run(tx))
        .await
        .expect("gateway kept retrying");
    assert!(result.is_err());
    assert_eq!(transport.connects(), 4);
    let state = gw.state();
    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(state.retry_count, 3);
    assert!(state
        .last_disconnect_reason
        .unwrap()
        .contains("connect failed"));
}

#[tokio::test]
async fn test_connect_resets_retry_count() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Script::Refuse,
        Script::Refuse,
        Script::Events(vec![TransportEvent::Connected]),
    ]));
    let gw = gateway(
        transport.clone(),
        Arc::new(CountingCredentials::default()),
        fast_policy(5),
    );
    let mut ready = gw.ready();
    let (tx, _rx) = mpsc::channel(8);
    let runner = gw.clone();
    let task = tokio::spawn(async move { runner.run(tx).await });

    tokio::time::timeout(Duration::from_secs(2), ready.wait_for(|n| *n >= 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(transport.connects(), 3);
    assert_eq!(gw.state().retry_count, 0);
    task.abort();
}

#[tokio::test]
async fn test_messages_forwarded_with_session() {
    let msg = InboundMessage::new(
        "scripted",
        "chat@s.whatsapp.net",
        "u1",
        Some(".ping".into()),
    );
    let transport = Arc::new(ScriptedTransport::new(vec![Script::Events(vec![
        TransportEvent::Connected,
        TransportEvent::Message(msg.clone()),
    ])]));
    let gw = gateway(
        transport,
        Arc::new(CountingCredentials::default()),
        ReconnectPolicy::default(),
    );
    let (tx, mut rx) = mpsc::channel(8);
    let runner = gw.clone();
    let task = tokio::spawn(async move { runner.run(tx).await });

    let (session, received) = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(received.id, msg.id);
    assert!(session.send_text("chat", "pong").await.is_ok());
    task.abort();
}

#[tokio::test]
async fn test_run_stops_when_dispatcher_is_gone() {
    let transport = Arc::new(ScriptedTransport::new(vec![Script::Events(vec![
        TransportEvent::Connected,
        TransportEvent::Message(InboundMessage::new("scripted", "c", "u", None)),
    ])]));
    let gw = gateway(
        transport.clone(),
        Arc::new(CountingCredentials::default()),
        ReconnectPolicy::default(),
    );
    let (tx, rx) = mpsc::channel(8);
    drop(rx);

    let result = tokio::time::timeout(Duration::from_secs(2), gw.run(tx))
        .await
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(gw.state().status, SessionStatus::Disconnected);
    assert_eq!(transport.session.disconnects.load(Ordering::SeqCst), 1);
}

// --- timer ---

#[tokio::test]
async fn test_timer_keeps_only_latest_reconnect() {
    let timer = ReconnectTimer::new();
    let (tx, mut rx) = mpsc::channel(4);
    timer.schedule(Duration::from_secs(30), tx.clone());
    assert!(timer.is_pending());
    timer.schedule(Duration::from_millis(10), tx);

    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    // The replaced timer was aborted and its sender dropped.
    assert!(matches!(second, Ok(None)));
}

#[tokio::test]
async fn test_timer_cancel() {
    let timer = ReconnectTimer::new();
    let (tx, mut rx) = mpsc::channel(1);
    timer.schedule(Duration::from_millis(10), tx);
    timer.cancel();
    assert!(!timer.is_pending());
    let fired = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(matches!(fired, Ok(None)));
}
