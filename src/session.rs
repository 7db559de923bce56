//! Session Orchestrator
//!
//! Owns one bridged session end to end: connects the upstream engine,
//! attaches the channels it negotiated, starts the downstream viewer
//! server, runs both protocol loops concurrently and tears both down
//! together. There is no mode in which one side outlives the other.
//!
//! Lifecycle:
//!
//! ```text
//! Idle -> Connecting -> Running -> Draining -> Closed
//!            |                        ^
//!            +-- connect/start failure jumps straight to Closed
//! ```
//!
//! The upstream connects first; a viewer server that fails to start
//! tears the already-connected upstream down before the error is
//! returned.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::bridge::DisplayBridge;
use crate::clipboard::ClipboardChannel;
use crate::config::{AuthPolicy, Config, ConfigError, Mode};
use crate::damage::DisplayControl;

// ============================================================================
// Engine traits
// ============================================================================

/// Channel handles the upstream peer agreed to during connect
#[derive(Default)]
pub struct NegotiatedChannels {
    /// Dynamic display layout channel, when negotiated
    pub display_control: Option<Arc<dyn DisplayControl>>,
    /// Clipboard redirection channel, when negotiated
    pub clipboard: Option<Arc<dyn ClipboardChannel>>,
}

/// The upstream protocol engine (connects out to the remote desktop and
/// renders into the bridge)
#[async_trait]
pub trait UpstreamSession: Send + Sync {
    /// Establish the session and negotiate optional channels
    async fn connect(&self) -> anyhow::Result<NegotiatedChannels>;

    /// Drive the protocol until the session ends
    async fn run(&self) -> anyhow::Result<()>;

    /// Ask the engine to end its session
    async fn shutdown(&self);
}

/// The downstream protocol engine (serves the bridge's framebuffer to
/// viewers and injects their input)
#[async_trait]
pub trait ViewerServer: Send + Sync {
    /// Bind (listen mode) or connect out (reverse mode); fatal on failure
    async fn start(&self, auth: AuthPolicy, mode: Mode) -> anyhow::Result<()>;

    /// Serve viewers until the server ends
    async fn serve(&self) -> anyhow::Result<()>;

    /// Ask the engine to stop serving
    async fn shutdown(&self);
}

// ============================================================================
// Errors and phases
// ============================================================================

/// Where in its lifecycle a session currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Constructed, not yet run
    Idle,
    /// Upstream connect in progress
    Connecting,
    /// Both protocol loops active
    Running,
    /// One side ended, the other being torn down
    Draining,
    /// Torn down
    Closed,
}

/// Session lifecycle failures
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The upstream engine could not establish its session
    #[error("upstream connect failed: {source}")]
    UpstreamConnect {
        /// Engine-reported cause
        #[source]
        source: anyhow::Error,
    },

    /// The viewer server could not bind or connect
    #[error("viewer server failed to start: {source}")]
    ViewerStart {
        /// Engine-reported cause
        #[source]
        source: anyhow::Error,
    },

    /// A protocol loop failed while the session was up
    #[error("session failed while {phase:?}: {source}")]
    Runtime {
        /// Phase at the time of failure
        phase: SessionPhase,
        /// Engine-reported cause
        #[source]
        source: anyhow::Error,
    },

    /// The configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// Orchestrator
// ============================================================================

/// One bridged session: an upstream engine, a viewer server and the
/// bridge between them
pub struct Session {
    config: Config,
    bridge: Arc<DisplayBridge>,
    upstream: Arc<dyn UpstreamSession>,
    viewer: Arc<dyn ViewerServer>,
    phase: Mutex<SessionPhase>,
}

impl Session {
    /// Build a session over validated configuration
    pub fn new(
        config: Config,
        bridge: Arc<DisplayBridge>,
        upstream: Arc<dyn UpstreamSession>,
        viewer: Arc<dyn ViewerServer>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            config,
            bridge,
            upstream,
            viewer,
            phase: Mutex::new(SessionPhase::Idle),
        })
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock()
    }

    /// The bridge both engines operate on
    pub fn bridge(&self) -> &Arc<DisplayBridge> {
        &self.bridge
    }

    fn set_phase(&self, phase: SessionPhase) {
        debug!(?phase, "session phase");
        *self.phase.lock() = phase;
    }

    /// Run the session to completion.
    ///
    /// Returns once both sides are down; the first failure is returned,
    /// a clean end on either side yields `Ok`.
    pub async fn run(&self) -> Result<(), SessionError> {
        let result = self.run_inner().await;
        self.bridge.detach();
        self.set_phase(SessionPhase::Closed);
        match &result {
            Ok(()) => info!("session closed"),
            Err(err) => error!(%err, "session failed"),
        }
        result
    }

    async fn run_inner(&self) -> Result<(), SessionError> {
        self.set_phase(SessionPhase::Connecting);
        info!(address = %self.config.address, mode = ?self.config.mode, "connecting upstream");

        let channels = self
            .upstream
            .connect()
            .await
            .map_err(|source| SessionError::UpstreamConnect { source })?;
        self.bridge
            .attach_channels(channels.display_control, channels.clipboard);

        // Auth is resolved before the listener exists so no viewer is
        // ever accepted under an unconfigured policy
        let auth = match self.config.auth_policy() {
            Ok(auth) => auth,
            Err(err) => {
                self.upstream.shutdown().await;
                return Err(err.into());
            }
        };
        if let Err(source) = self.viewer.start(auth, self.config.mode).await {
            self.upstream.shutdown().await;
            return Err(SessionError::ViewerStart { source });
        }

        self.set_phase(SessionPhase::Running);
        info!(desktop = %self.config.desktop_name, "session running");

        let outcome = tokio::select! {
            result = self.upstream.run() => SideOutcome {
                side: "upstream",
                result,
            },
            result = self.viewer.serve() => SideOutcome {
                side: "viewer",
                result,
            },
        };

        self.set_phase(SessionPhase::Draining);
        debug!(side = outcome.side, "loop ended, draining peer");
        self.upstream.shutdown().await;
        self.viewer.shutdown().await;

        outcome.result.map_err(|source| SessionError::Runtime {
            phase: SessionPhase::Running,
            source,
        })
    }
}

struct SideOutcome {
    side: &'static str,
    result: anyhow::Result<()>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::Notify;

    struct MockUpstream {
        connect_ok: bool,
        run_result: Mutex<Option<anyhow::Result<()>>>,
        stop: Notify,
        shutdown_called: AtomicBool,
    }

    impl MockUpstream {
        fn healthy() -> Arc<Self> {
            Arc::new(Self {
                connect_ok: true,
                run_result: Mutex::new(None),
                stop: Notify::new(),
                shutdown_called: AtomicBool::new(false),
            })
        }

        fn refusing() -> Arc<Self> {
            Arc::new(Self {
                connect_ok: false,
                run_result: Mutex::new(None),
                stop: Notify::new(),
                shutdown_called: AtomicBool::new(false),
            })
        }

        fn failing_run() -> Arc<Self> {
            Arc::new(Self {
                connect_ok: true,
                run_result: Mutex::new(Some(Err(anyhow!("decode error")))),
                stop: Notify::new(),
                shutdown_called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl UpstreamSession for MockUpstream {
        async fn connect(&self) -> anyhow::Result<NegotiatedChannels> {
            if self.connect_ok {
                Ok(NegotiatedChannels::default())
            } else {
                Err(anyhow!("connection refused"))
            }
        }

        async fn run(&self) -> anyhow::Result<()> {
            if let Some(result) = self.run_result.lock().take() {
                return result;
            }
            self.stop.notified().await;
            Ok(())
        }

        async fn shutdown(&self) {
            self.shutdown_called.store(true, Ordering::SeqCst);
            self.stop.notify_one();
        }
    }

    struct MockViewer {
        start_ok: bool,
        serve_ends: bool,
        started: AtomicBool,
        stop: Notify,
        shutdown_called: AtomicBool,
    }

    impl MockViewer {
        fn new(start_ok: bool, serve_ends: bool) -> Arc<Self> {
            Arc::new(Self {
                start_ok,
                serve_ends,
                started: AtomicBool::new(false),
                stop: Notify::new(),
                shutdown_called: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl ViewerServer for MockViewer {
        async fn start(&self, _auth: AuthPolicy, _mode: Mode) -> anyhow::Result<()> {
            if !self.start_ok {
                return Err(anyhow!("address in use"));
            }
            self.started.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn serve(&self) -> anyhow::Result<()> {
            if self.serve_ends {
                return Ok(());
            }
            self.stop.notified().await;
            Ok(())
        }

        async fn shutdown(&self) {
            self.shutdown_called.store(true, Ordering::SeqCst);
            self.stop.notify_one();
        }
    }

    fn session(
        upstream: Arc<MockUpstream>,
        viewer: Arc<MockViewer>,
    ) -> Session {
        let config = Config::default();
        let bridge = Arc::new(DisplayBridge::new(&config));
        Session::new(config, bridge, upstream, viewer).unwrap()
    }

    #[tokio::test]
    async fn test_connect_failure_never_starts_viewer() {
        let upstream = MockUpstream::refusing();
        let viewer = MockViewer::new(true, true);
        let session = session(upstream, viewer.clone());

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, SessionError::UpstreamConnect { .. }));
        assert!(!viewer.started.load(Ordering::SeqCst));
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn test_viewer_start_failure_tears_down_upstream() {
        let upstream = MockUpstream::healthy();
        let viewer = MockViewer::new(false, true);
        let session = session(upstream.clone(), viewer);

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, SessionError::ViewerStart { .. }));
        assert!(upstream.shutdown_called.load(Ordering::SeqCst));
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn test_viewer_exit_drains_upstream() {
        let upstream = MockUpstream::healthy();
        let viewer = MockViewer::new(true, true);
        let session = session(upstream.clone(), viewer.clone());

        session.run().await.unwrap();
        assert!(upstream.shutdown_called.load(Ordering::SeqCst));
        assert!(viewer.shutdown_called.load(Ordering::SeqCst));
        assert_eq!(session.phase(), SessionPhase::Closed);
    }

    #[tokio::test]
    async fn test_upstream_failure_drains_viewer_and_surfaces() {
        let upstream = MockUpstream::failing_run();
        let viewer = MockViewer::new(true, false);
        let session = session(upstream, viewer.clone());

        let err = session.run().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Runtime {
                phase: SessionPhase::Running,
                ..
            }
        ));
        assert!(viewer.shutdown_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_auth_resolution_failure_tears_down_upstream() {
        let config = Config {
            auth: crate::config::AuthMethod::Password {
                password: None,
                password_file: Some("/nonexistent/rdp2vnc-password".into()),
            },
            ..Config::default()
        };
        let bridge = Arc::new(DisplayBridge::new(&config));
        let upstream = MockUpstream::healthy();
        let viewer = MockViewer::new(true, true);
        let session =
            Session::new(config, bridge, upstream.clone(), viewer.clone()).unwrap();

        let err = session.run().await.unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
        assert!(upstream.shutdown_called.load(Ordering::SeqCst));
        assert!(!viewer.started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_construction() {
        let config = Config {
            initial_width: 0,
            ..Config::default()
        };
        let bridge = Arc::new(DisplayBridge::new(&Config::default()));
        let result = Session::new(
            config,
            bridge,
            MockUpstream::healthy(),
            MockViewer::new(true, true),
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }
}
