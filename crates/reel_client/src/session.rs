//! Front-end behaviour over a [`ReelClient`].
//!
//! A [`Session`] ties the pieces together: the form values and their persistence, one
//! [`JobPanel`] per job kind published through a [`watch`] channel, debounced metadata
//! lookups and a passive liveness indicator.

use crate::board::{Applied, JobBoard, JobPanel, JobPhase, JobTicket};
use crate::config::ClientConfig;
use crate::form::{Field, FieldValue, FormState};
use crate::settings::SettingsStore;
use crate::{ReelClient, Result};
use reel_core::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How a job run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded { download_link: Option<String> },
    Failed(String),
    Cancelled,
}

/// Metadata shown next to the URL input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfoPanel {
    pub info: Option<VideoInfo>,
    /// Inline message from the last failed lookup.
    pub error: Option<String>,
}

impl InfoPanel {
    /// Options for the video resolution selector, in backend order.
    pub fn video_options(&self) -> &[String] {
        self.info
            .as_ref()
            .map(|info| info.video_resolutions.as_slice())
            .unwrap_or_default()
    }

    /// Options for the screenshot resolution selector, in backend order.
    pub fn image_options(&self) -> &[String] {
        self.info
            .as_ref()
            .map(|info| info.image_resolutions.as_slice())
            .unwrap_or_default()
    }
}

pub struct Session {
    client: ReelClient,
    board: Mutex<JobBoard>,
    panels: HashMap<JobKind, watch::Sender<JobPanel>>,
    form: Mutex<FormState>,
    settings: tokio::sync::Mutex<SettingsStore>,
    info: watch::Sender<InfoPanel>,
    info_generation: AtomicU64,
    online: watch::Sender<Option<bool>>,
}

impl Session {
    /// Restores the form from `settings` and prepares one idle panel per job kind.
    pub fn new(config: ClientConfig, settings: SettingsStore) -> Result<Self> {
        let client = ReelClient::new(config.clone())?;
        let form = FormState::restored(&settings);
        let panels = JobKind::ALL
            .into_iter()
            .map(|kind| (kind, watch::Sender::new(JobPanel::default())))
            .collect();

        debug!(
            backend = config.backend_url(),
            source = ?config.source(),
            "Session ready"
        );

        Ok(Self {
            client,
            board: Mutex::new(JobBoard::new(config)),
            panels,
            form: Mutex::new(form),
            settings: tokio::sync::Mutex::new(settings),
            info: watch::Sender::new(InfoPanel::default()),
            info_generation: AtomicU64::new(0),
            online: watch::Sender::new(None),
        })
    }

    pub fn client(&self) -> &ReelClient {
        &self.client
    }

    fn board(&self) -> MutexGuard<'_, JobBoard> {
        self.board.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn form_mut(&self) -> MutexGuard<'_, FormState> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Watches the panel of `kind`. The current value is available immediately.
    pub fn subscribe(&self, kind: JobKind) -> watch::Receiver<JobPanel> {
        self.panels[&kind].subscribe()
    }

    pub fn panel(&self, kind: JobKind) -> JobPanel {
        self.board().panel(kind).clone()
    }

    pub fn form(&self) -> FormState {
        self.form_mut().clone()
    }

    /// Publishes the board's panel for `kind`. Called with the board lock held so
    /// watchers see changes in the order they were made.
    fn publish(&self, board: &JobBoard, kind: JobKind) -> JobPanel {
        let panel = board.panel(kind).clone();
        self.panels[&kind].send_replace(panel.clone());
        panel
    }

    fn update(
        &self,
        ticket: &JobTicket,
        change: impl FnOnce(&mut JobBoard) -> Applied,
    ) -> (Applied, JobPanel) {
        let mut board = self.board();
        let applied = change(&mut board);
        let panel = if applied == Applied::Ignored {
            board.panel(ticket.kind()).clone()
        } else {
            self.publish(&board, ticket.kind())
        };
        (applied, panel)
    }

    /// Changes one input and writes its canonical form to settings.
    ///
    /// This does not look up metadata for a new URL; use [`set_url`](Self::set_url)
    /// for edits of the URL input.
    pub async fn set_field(&self, field: Field, value: FieldValue) {
        let stored = {
            let mut form = self.form_mut();
            form.set(field, value);
            form.get(field).encode()
        };
        self.settings.lock().await.set(field.id(), stored).await;
    }

    /// Runs a job of `kind` with the current form values.
    pub async fn submit(&self, kind: JobKind) -> Result<JobOutcome> {
        let request = self.form_mut().request(kind);
        self.run(kind, request).await
    }

    /// Runs one job to its end.
    ///
    /// Fails only when the job could not start: a missing URL or a job of the same kind
    /// still running. Everything after that, transport errors included, ends up in the
    /// returned [`JobOutcome`] and the panel.
    pub async fn run(&self, kind: JobKind, request: JobRequest) -> Result<JobOutcome> {
        let ticket = {
            let mut board = self.board();
            let begun = board.begin(kind, &request);
            self.publish(&board, kind);
            begun?
        };

        let token = ticket.token().clone();
        let (applied, panel) = tokio::select! {
            _ = token.cancelled() => {
                debug!(%kind, job = ticket.id(), "Dropping cancelled job stream");
                return Ok(JobOutcome::Cancelled);
            }
            finished = self.drive(&ticket, &request) => finished,
        };

        Ok(match applied {
            Applied::Finished(JobPhase::Succeeded) => JobOutcome::Succeeded {
                download_link: panel.download_link,
            },
            Applied::Finished(JobPhase::Failed) => {
                JobOutcome::Failed(panel.error.unwrap_or_else(|| UNTERMINATED_JOB.to_string()))
            }
            _ => JobOutcome::Cancelled,
        })
    }

    async fn drive(&self, ticket: &JobTicket, request: &JobRequest) -> (Applied, JobPanel) {
        let mut stream = match self.client.start_job(ticket.kind(), request).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(kind = %ticket.kind(), "Job request failed: {e}");
                return self.update(ticket, |board| board.fail(ticket, e.to_string()));
            }
        };

        loop {
            let (applied, panel) = match stream.next_event().await {
                Ok(Some(event)) => self.update(ticket, |board| board.apply(ticket, &event)),
                Ok(None) => self.update(ticket, |board| board.end_of_stream(ticket)),
                Err(e) => {
                    warn!(kind = %ticket.kind(), "Job stream failed: {e}");
                    self.update(ticket, |board| board.fail(ticket, e.to_string()))
                }
            };

            if applied != Applied::Continue {
                return (applied, panel);
            }
        }
    }

    /// Cancels the running job of `kind`. The panel is released before this returns.
    pub fn cancel(&self, kind: JobKind) -> bool {
        let mut board = self.board();
        let cancelled = board.cancel(kind);
        if cancelled {
            self.publish(&board, kind);
        }
        cancelled
    }

    /// Watches the metadata panel.
    pub fn subscribe_info(&self) -> watch::Receiver<InfoPanel> {
        self.info.subscribe()
    }

    pub fn info_panel(&self) -> InfoPanel {
        self.info.borrow().clone()
    }

    /// Schedules a metadata lookup for `url` after the debounce pause. A later call
    /// supersedes any lookup that has not finished yet.
    pub fn url_changed(self: &Arc<Self>, url: impl Into<String>) -> JoinHandle<()> {
        let url = url.into();
        let generation = self.info_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = Arc::clone(self);

        tokio::spawn(async move {
            tokio::time::sleep(session.client.config().info_debounce).await;
            session.refresh_info(&url, generation).await;
        })
    }

    /// Stores a new URL and schedules its debounced metadata lookup.
    pub async fn set_url(self: &Arc<Self>, url: impl Into<String>) -> JoinHandle<()> {
        let url = url.into();
        self.set_field(Field::Url, FieldValue::text(url.clone())).await;
        self.url_changed(url)
    }

    /// Looks up metadata for `url` right away.
    pub async fn fetch_video_info(&self, url: &str) {
        let generation = self.info_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_info(url, generation).await;
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.info_generation.load(Ordering::SeqCst) == generation
    }

    async fn refresh_info(&self, url: &str, generation: u64) {
        if !self.is_latest(generation) {
            return;
        }

        let url = url.trim();
        if url.is_empty() {
            self.info.send_replace(InfoPanel::default());
            return;
        }

        let result = self.client.video_info(url).await;
        if !self.is_latest(generation) {
            debug!("Discarding metadata for superseded URL {url}");
            return;
        }

        let panel = match result {
            Ok(info) => InfoPanel {
                info: Some(info),
                error: None,
            },
            Err(e) => {
                debug!("Metadata lookup for {url} failed: {e}");
                InfoPanel {
                    info: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.info.send_replace(panel);
    }

    /// `None` until the first health check has run.
    pub fn backend_online(&self) -> Option<bool> {
        *self.online.borrow()
    }

    pub fn subscribe_online(&self) -> watch::Receiver<Option<bool>> {
        self.online.subscribe()
    }

    /// Checks the backend once and records the result.
    pub async fn check_health(&self) -> bool {
        let online = match self.client.ping().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Health check failed: {e}");
                false
            }
        };

        let previous = self.online.send_replace(Some(online));
        if previous != Some(online) {
            if online {
                info!(backend = self.client.base_url(), "Backend online");
            } else {
                warn!(backend = self.client.base_url(), "Backend offline");
            }
        }
        online
    }

    /// Polls the backend on the configured interval until the session is dropped.
    pub fn spawn_health_monitor(self: &Arc<Self>) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        let period = self.client.config().health_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                session.check_health().await;
            }
        })
    }
}
