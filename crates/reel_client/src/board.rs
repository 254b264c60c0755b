//! Per-kind job state, driven by the events of each job's stream.
//!
//! The board is plain synchronous state; [`Session`](crate::session::Session) owns the
//! I/O and feeds events in. Every job gets a [`JobTicket`] carrying its own cancellation
//! token, and anything presented with a ticket that is no longer current is ignored.

use crate::config::ClientConfig;
use crate::{MISSING_URL, ReelClientError, Result};
use reel_core::prelude::*;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPhase {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobPhase {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            JobPhase::Succeeded | JobPhase::Failed | JobPhase::Cancelled
        )
    }
}

/// What a front end shows for one job kind.
#[derive(Debug, Clone, PartialEq)]
pub struct JobPanel {
    pub phase: JobPhase,
    /// Percentage shown while [`progress_visible`](Self::progress_visible).
    pub progress: f64,
    pub progress_visible: bool,
    pub status: Option<String>,
    pub error: Option<String>,
    /// Inline message for a submission that was rejected before any request.
    pub validation: Option<String>,
    pub submit_enabled: bool,
    pub cancel_visible: bool,
    pub download_link: Option<String>,
    pub gallery: Vec<String>,
    pub player_source: Option<String>,
}

impl Default for JobPanel {
    fn default() -> Self {
        Self {
            phase: JobPhase::Idle,
            progress: 0.0,
            progress_visible: false,
            status: None,
            error: None,
            validation: None,
            submit_enabled: true,
            cancel_visible: false,
            download_link: None,
            gallery: Vec::new(),
            player_source: None,
        }
    }
}

impl JobPanel {
    fn start(&mut self) {
        *self = JobPanel {
            phase: JobPhase::Running,
            progress_visible: true,
            submit_enabled: false,
            cancel_visible: true,
            ..Default::default()
        };
    }

    fn release(&mut self, phase: JobPhase) {
        self.phase = phase;
        self.progress_visible = false;
        self.cancel_visible = false;
        self.submit_enabled = true;
    }
}

/// Identifies one submitted job.
#[derive(Debug, Clone)]
pub struct JobTicket {
    kind: JobKind,
    id: u64,
    token: CancellationToken,
}

impl JobTicket {
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancelled when the job is cancelled from the board.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Result of feeding something to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Keep reading.
    Continue,
    /// The job reached this terminal phase; stop reading.
    Finished(JobPhase),
    /// The ticket is stale (cancelled or superseded); nothing changed.
    Ignored,
}

pub struct JobBoard {
    config: ClientConfig,
    panels: HashMap<JobKind, JobPanel>,
    active: HashMap<JobKind, JobTicket>,
    next_id: u64,
}

impl JobBoard {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            panels: JobKind::ALL
                .into_iter()
                .map(|kind| (kind, JobPanel::default()))
                .collect(),
            active: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn panel(&self, kind: JobKind) -> &JobPanel {
        &self.panels[&kind]
    }

    fn panel_mut(&mut self, kind: JobKind) -> &mut JobPanel {
        self.panels.entry(kind).or_default()
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.active.contains_key(&kind)
    }

    /// Moves `kind` to Running and hands out the job's ticket.
    ///
    /// A missing URL only sets the validation message. A second submission while a job
    /// of the same kind is running is rejected and changes nothing.
    pub fn begin(&mut self, kind: JobKind, request: &JobRequest) -> Result<JobTicket> {
        if !request.has_url() {
            self.panel_mut(kind).validation = Some(MISSING_URL.to_string());
            return Err(ReelClientError::Validation(MISSING_URL.to_string()));
        }

        if self.is_running(kind) {
            return Err(ReelClientError::Busy(kind));
        }

        let ticket = JobTicket {
            kind,
            id: self.next_id,
            token: CancellationToken::new(),
        };
        self.next_id += 1;

        self.panel_mut(kind).start();
        self.active.insert(kind, ticket.clone());
        debug!(%kind, job = ticket.id, "Job running");
        Ok(ticket)
    }

    fn is_current(&self, ticket: &JobTicket) -> bool {
        !ticket.token.is_cancelled()
            && self
                .active
                .get(&ticket.kind)
                .is_some_and(|active| active.id == ticket.id)
    }

    /// Applies one streamed event in order: progress, status, error, completion, then
    /// the kind-specific payload.
    pub fn apply(&mut self, ticket: &JobTicket, event: &JobEvent) -> Applied {
        if !self.is_current(ticket) {
            debug!(kind = %ticket.kind, job = ticket.id, "Ignoring event for stale job");
            return Applied::Ignored;
        }

        let download_link = event
            .download_url
            .as_deref()
            .map(|reference| self.config.download_link(reference));
        let panel = self.panel_mut(ticket.kind);

        if let Some(progress) = event.progress {
            // Out-of-order values never move the indicator backwards.
            panel.progress = panel.progress.max(progress.clamp(0.0, 100.0));
        }

        if let Some(status) = &event.status {
            panel.status = Some(status.clone());
        }

        let mut applied = Applied::Continue;
        if let Some(error) = &event.error {
            panel.error = Some(error.clone());
            panel.release(JobPhase::Failed);
            applied = Applied::Finished(JobPhase::Failed);
        } else if event.is_complete() {
            panel.download_link = download_link;
            panel.release(JobPhase::Succeeded);
            applied = Applied::Finished(JobPhase::Succeeded);
        }

        for image in &event.images {
            if !panel.gallery.contains(image) {
                panel.gallery.push(image.clone());
            }
        }

        if let Some(source) = event.media_source() {
            panel.player_source = Some(source.to_string());
        }

        if let Applied::Finished(phase) = applied {
            self.active.remove(&ticket.kind);
            debug!(kind = %ticket.kind, job = ticket.id, ?phase, "Job finished");
        }

        applied
    }

    /// Ends the job with `reason` (transport errors, timeouts).
    pub fn fail(&mut self, ticket: &JobTicket, reason: impl Into<String>) -> Applied {
        if !self.is_current(ticket) {
            return Applied::Ignored;
        }

        let panel = self.panel_mut(ticket.kind);
        panel.error = Some(reason.into());
        panel.release(JobPhase::Failed);
        self.active.remove(&ticket.kind);
        Applied::Finished(JobPhase::Failed)
    }

    /// The stream ended. If no terminal event arrived, that is a failure.
    pub fn end_of_stream(&mut self, ticket: &JobTicket) -> Applied {
        self.fail(ticket, UNTERMINATED_JOB)
    }

    /// Cancels the running job of `kind` and releases its controls at once.
    ///
    /// Returns `false` if nothing was running.
    pub fn cancel(&mut self, kind: JobKind) -> bool {
        let Some(ticket) = self.active.remove(&kind) else {
            return false;
        };

        ticket.token.cancel();
        let panel = self.panel_mut(kind);
        panel.status = Some("Cancelled".to_string());
        panel.release(JobPhase::Cancelled);
        debug!(%kind, job = ticket.id, "Job cancelled");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> JobBoard {
        JobBoard::new(ClientConfig::for_backend("http://backend:8000").unwrap())
    }

    fn event(json: &str) -> JobEvent {
        serde_json::from_str(json).unwrap()
    }

    fn run(board: &mut JobBoard, kind: JobKind, lines: &[&str]) -> Vec<Applied> {
        let ticket = board.begin(kind, &JobRequest::new("https://youtu.be/abc")).unwrap();
        lines
            .iter()
            .map(|line| board.apply(&ticket, &event(line)))
            .collect()
    }

    #[test]
    fn empty_url_sets_validation_only() {
        let mut board = board();
        let err = board.begin(JobKind::Audio, &JobRequest::new("  ")).unwrap_err();

        assert!(matches!(err, ReelClientError::Validation(_)));
        let panel = board.panel(JobKind::Audio);
        assert_eq!(panel.phase, JobPhase::Idle);
        assert_eq!(panel.validation.as_deref(), Some(MISSING_URL));
        assert!(panel.submit_enabled);
        assert!(!board.is_running(JobKind::Audio));
    }

    #[test]
    fn begin_locks_the_panel() {
        let mut board = board();
        board.begin(JobKind::Video, &JobRequest::new("x")).unwrap();

        let panel = board.panel(JobKind::Video);
        assert_eq!(panel.phase, JobPhase::Running);
        assert!(panel.progress_visible);
        assert_eq!(panel.progress, 0.0);
        assert!(panel.cancel_visible);
        assert!(!panel.submit_enabled);
    }

    #[test]
    fn video_stream_succeeds_with_resolved_link() {
        let mut board = board();
        let applied = run(
            &mut board,
            JobKind::Video,
            &[
                r#"{"status":"fetching"}"#,
                r#"{"progress":50}"#,
                r#"{"progress":100,"complete":true,"download_url":"/api/download/x.mp4"}"#,
            ],
        );

        assert_eq!(applied.last(), Some(&Applied::Finished(JobPhase::Succeeded)));
        let panel = board.panel(JobKind::Video);
        assert_eq!(panel.phase, JobPhase::Succeeded);
        assert_eq!(panel.status.as_deref(), Some("fetching"));
        assert_eq!(
            panel.download_link.as_deref(),
            Some("http://backend:8000/api/download/x.mp4")
        );
        assert!(!panel.progress_visible);
        assert!(panel.submit_enabled);
    }

    #[test]
    fn error_wins_over_complete_in_the_same_event() {
        let mut board = board();
        let applied = run(
            &mut board,
            JobKind::Audio,
            &[r#"{"status":"Processing audio...","error":"ffmpeg not found","complete":true}"#],
        );

        assert_eq!(applied, vec![Applied::Finished(JobPhase::Failed)]);
        let panel = board.panel(JobKind::Audio);
        assert_eq!(panel.error.as_deref(), Some("ffmpeg not found"));
        assert_eq!(panel.status.as_deref(), Some("Processing audio..."));
        assert!(panel.download_link.is_none());
    }

    #[test]
    fn progress_never_moves_backwards() {
        let mut board = board();
        run(
            &mut board,
            JobKind::Screenshots,
            &[r#"{"progress":40}"#, r#"{"progress":30}"#, r#"{"progress":250}"#],
        );
        assert_eq!(board.panel(JobKind::Screenshots).progress, 100.0);
    }

    #[test]
    fn gallery_collects_unique_images_even_on_failure() {
        let mut board = board();
        run(
            &mut board,
            JobKind::Screenshots,
            &[
                r#"{"images":["/tmp/a.png"]}"#,
                r#"{"images":["/tmp/a.png","/tmp/b.png"]}"#,
                r#"{"error":"No more frames","images":["/tmp/a.png","/tmp/b.png","/tmp/c.png"]}"#,
            ],
        );

        let panel = board.panel(JobKind::Screenshots);
        assert_eq!(panel.phase, JobPhase::Failed);
        assert_eq!(panel.gallery, vec!["/tmp/a.png", "/tmp/b.png", "/tmp/c.png"]);
    }

    #[test]
    fn player_source_follows_media_payload() {
        let mut board = board();
        run(
            &mut board,
            JobKind::Audio,
            &[r#"{"progress":100,"complete":true,"audio_file":"/tmp/song.mp3","download_url":"/api/download/song.mp3"}"#],
        );
        assert_eq!(
            board.panel(JobKind::Audio).player_source.as_deref(),
            Some("/tmp/song.mp3")
        );
    }

    #[test]
    fn second_submit_while_running_is_rejected() {
        let mut board = board();
        let first = board.begin(JobKind::Video, &JobRequest::new("x")).unwrap();
        let err = board.begin(JobKind::Video, &JobRequest::new("y")).unwrap_err();
        assert!(matches!(err, ReelClientError::Busy(JobKind::Video)));

        // Other kinds are independent.
        board.begin(JobKind::Audio, &JobRequest::new("y")).unwrap();
        assert_eq!(board.apply(&first, &JobEvent::status("still mine")), Applied::Continue);
    }

    #[test]
    fn cancel_releases_immediately_and_ignores_late_events() {
        let mut board = board();
        let ticket = board.begin(JobKind::Video, &JobRequest::new("x")).unwrap();
        assert!(!board.panel(JobKind::Video).phase.is_finished());

        assert!(board.cancel(JobKind::Video));
        assert!(ticket.token().is_cancelled());
        let panel = board.panel(JobKind::Video).clone();
        assert_eq!(panel.phase, JobPhase::Cancelled);
        assert!(panel.phase.is_finished());
        assert!(!panel.progress_visible);
        assert!(!panel.cancel_visible);
        assert!(panel.submit_enabled);

        let late = JobEvent::completed("/api/download/x.mp4");
        assert_eq!(board.apply(&ticket, &late), Applied::Ignored);
        assert_eq!(board.end_of_stream(&ticket), Applied::Ignored);
        assert_eq!(board.panel(JobKind::Video), &panel);

        assert!(!board.cancel(JobKind::Video));
    }

    #[test]
    fn resubmit_after_cancel_gets_a_fresh_ticket() {
        let mut board = board();
        let old = board.begin(JobKind::Video, &JobRequest::new("x")).unwrap();
        board.cancel(JobKind::Video);
        let new = board.begin(JobKind::Video, &JobRequest::new("x")).unwrap();

        assert_ne!(old.id(), new.id());
        assert!(!new.token().is_cancelled());
        assert_eq!(board.apply(&old, &JobEvent::status("old")), Applied::Ignored);
        assert_eq!(board.apply(&new, &JobEvent::status("new")), Applied::Continue);
        assert_eq!(board.panel(JobKind::Video).status.as_deref(), Some("new"));
    }

    #[test]
    fn stream_without_terminal_fails() {
        let mut board = board();
        let ticket = board.begin(JobKind::Audio, &JobRequest::new("x")).unwrap();
        board.apply(&ticket, &JobEvent::status("Downloading audio..."));

        assert_eq!(board.end_of_stream(&ticket), Applied::Finished(JobPhase::Failed));
        assert_eq!(board.panel(JobKind::Audio).error.as_deref(), Some(UNTERMINATED_JOB));
    }
}
