//! Async session driver
//!
//! Runs a [`Session`] on its own tokio task. The task owns the session and
//! multiplexes user commands, the periodic position update and the
//! one-second countdown ticks, so every state transition happens on one
//! task in arrival order.

use crate::bookmarks::BookmarkId;
use crate::config::PracticeConfig;
use crate::library::KeyValueStore;
use crate::playback::clock::MediaEngine;
use crate::playback::looping::LoopPoint;
use crate::playback::session::{LoadOutcome, PlayState, Session, SessionError, WindowKind};
use crate::render::{RenderFrame, RenderSink};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};

type Reply<T> = oneshot::Sender<Result<T, SessionError>>;

/// Commands sent to the session task
pub enum SessionCommand {
    LoadSong {
        file_name: String,
        reply: Reply<LoadOutcome>,
    },
    TogglePlay {
        reply: Reply<PlayState>,
    },
    SeekBy {
        delta: f64,
        reply: Reply<f64>,
    },
    ClickFullTrack {
        fraction: f64,
        reply: Reply<f64>,
    },
    ClickWindow {
        kind: WindowKind,
        fraction: f64,
        reply: Reply<f64>,
    },
    RewindToStart {
        reply: Reply<()>,
    },
    SetSpeed {
        rate: f64,
        reply: Reply<()>,
    },
    SetVolume {
        percent: u8,
        reply: Reply<()>,
    },
    ToggleCountdown {
        reply: Reply<bool>,
    },
    AddBookmark {
        reply: Reply<BookmarkId>,
    },
    JumpToBookmark {
        id: BookmarkId,
        reply: Reply<f64>,
    },
    PreviousBookmark {
        reply: Reply<Option<f64>>,
    },
    NextBookmark {
        reply: Reply<Option<f64>>,
    },
    RenameBookmark {
        id: BookmarkId,
        label: String,
        reply: Reply<()>,
    },
    RecolorBookmark {
        id: BookmarkId,
        color: String,
        reply: Reply<()>,
    },
    DeleteBookmark {
        id: BookmarkId,
        reply: Reply<()>,
    },
    ToggleLoop {
        reply: Reply<bool>,
    },
    SetLoopPoint {
        id: BookmarkId,
        point: LoopPoint,
        reply: Reply<()>,
    },
    GetStatus {
        reply: oneshot::Sender<SessionStatus>,
    },
    Shutdown {
        reply: Reply<()>,
    },
}

/// Session status snapshot (safe to send between tasks)
#[derive(Clone, Debug, PartialEq)]
pub struct SessionStatus {
    pub song_id: Option<String>,
    pub position: f64,
    pub duration: f64,
    pub playing: bool,
    /// Remaining countdown ticks while counting
    pub countdown: Option<u32>,
    pub loop_enabled: bool,
    pub loop_bounds: Option<(f64, f64)>,
    pub iteration_count: u32,
    pub bookmark_count: usize,
    pub speed: f64,
    pub volume: u8,
    pub countdown_enabled: bool,
}

impl SessionStatus {
    fn capture<M: MediaEngine, S: KeyValueStore>(session: &Session<M, S>) -> Self {
        let clock = session.clock();
        let state = session.state();
        Self {
            song_id: session.song_id().map(str::to_string),
            position: clock.position,
            duration: clock.duration,
            playing: clock.playing,
            countdown: state
                .countdown
                .is_active()
                .then(|| state.countdown.remaining()),
            loop_enabled: state.looping.is_enabled(),
            loop_bounds: state.looping.active_bounds(),
            iteration_count: state.looping.iteration_count(),
            bookmark_count: state.bookmarks.len(),
            speed: state.speed,
            volume: state.volume,
            countdown_enabled: state.looping.countdown_enabled(),
        }
    }
}

/// Frames pushed into a channel; the receiver decides when to draw
impl RenderSink for mpsc::UnboundedSender<RenderFrame> {
    fn render(&mut self, frame: &RenderFrame) {
        let _ = self.send(frame.clone());
    }
}

/// Handle to communicate with the session task
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    /// Move `session` onto a new tokio task and return a handle.
    ///
    /// Must be called from within a tokio runtime. The task stops when every
    /// handle is dropped or on [`SessionHandle::shutdown`].
    pub fn spawn<M, S>(
        session: Session<M, S>,
        sink: Box<dyn RenderSink + Send>,
        config: &PracticeConfig,
    ) -> Self
    where
        M: MediaEngine + Send + 'static,
        S: KeyValueStore + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<SessionCommand>(32);
        let position_every = config.position_update_interval();
        let countdown_every = config.countdown_interval();

        tokio::spawn(run(session, sink, rx, position_every, countdown_every));

        Self { tx }
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> anyhow::Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| anyhow::anyhow!("Session task stopped"))?;
        rx.await.map_err(|_| anyhow::anyhow!("Session task stopped"))
    }

    pub async fn load_song(&self, file_name: impl Into<String>) -> anyhow::Result<LoadOutcome> {
        let file_name = file_name.into();
        Ok(self
            .request(|reply| SessionCommand::LoadSong { file_name, reply })
            .await??)
    }

    pub async fn toggle_play(&self) -> anyhow::Result<PlayState> {
        Ok(self
            .request(|reply| SessionCommand::TogglePlay { reply })
            .await??)
    }

    pub async fn seek_by(&self, delta: f64) -> anyhow::Result<f64> {
        Ok(self
            .request(|reply| SessionCommand::SeekBy { delta, reply })
            .await??)
    }

    pub async fn click_full_track(&self, fraction: f64) -> anyhow::Result<f64> {
        Ok(self
            .request(|reply| SessionCommand::ClickFullTrack { fraction, reply })
            .await??)
    }

    pub async fn click_window(&self, kind: WindowKind, fraction: f64) -> anyhow::Result<f64> {
        Ok(self
            .request(|reply| SessionCommand::ClickWindow {
                kind,
                fraction,
                reply,
            })
            .await??)
    }

    pub async fn rewind_to_start(&self) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::RewindToStart { reply })
            .await??)
    }

    pub async fn set_speed(&self, rate: f64) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::SetSpeed { rate, reply })
            .await??)
    }

    pub async fn set_volume(&self, percent: u8) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::SetVolume { percent, reply })
            .await??)
    }

    pub async fn toggle_countdown(&self) -> anyhow::Result<bool> {
        Ok(self
            .request(|reply| SessionCommand::ToggleCountdown { reply })
            .await??)
    }

    pub async fn add_bookmark(&self) -> anyhow::Result<BookmarkId> {
        Ok(self
            .request(|reply| SessionCommand::AddBookmark { reply })
            .await??)
    }

    pub async fn jump_to_bookmark(&self, id: BookmarkId) -> anyhow::Result<f64> {
        Ok(self
            .request(|reply| SessionCommand::JumpToBookmark { id, reply })
            .await??)
    }

    pub async fn previous_bookmark(&self) -> anyhow::Result<Option<f64>> {
        Ok(self
            .request(|reply| SessionCommand::PreviousBookmark { reply })
            .await??)
    }

    pub async fn next_bookmark(&self) -> anyhow::Result<Option<f64>> {
        Ok(self
            .request(|reply| SessionCommand::NextBookmark { reply })
            .await??)
    }

    pub async fn rename_bookmark(&self, id: BookmarkId, label: String) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::RenameBookmark { id, label, reply })
            .await??)
    }

    pub async fn recolor_bookmark(&self, id: BookmarkId, color: String) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::RecolorBookmark { id, color, reply })
            .await??)
    }

    pub async fn delete_bookmark(&self, id: BookmarkId) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::DeleteBookmark { id, reply })
            .await??)
    }

    pub async fn toggle_loop(&self) -> anyhow::Result<bool> {
        Ok(self
            .request(|reply| SessionCommand::ToggleLoop { reply })
            .await??)
    }

    pub async fn set_loop_point(&self, id: BookmarkId, point: LoopPoint) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::SetLoopPoint { id, point, reply })
            .await??)
    }

    pub async fn get_status(&self) -> anyhow::Result<SessionStatus> {
        self.request(|reply| SessionCommand::GetStatus { reply })
            .await
    }

    /// Stop the practice timer, persist and end the task
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        Ok(self
            .request(|reply| SessionCommand::Shutdown { reply })
            .await??)
    }
}

async fn run<M, S>(
    mut session: Session<M, S>,
    mut sink: Box<dyn RenderSink + Send>,
    mut rx: mpsc::Receiver<SessionCommand>,
    position_every: Duration,
    countdown_every: Duration,
) where
    M: MediaEngine,
    S: KeyValueStore,
{
    let mut position_tick = tokio::time::interval(position_every);
    position_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut countdown_deadline: Option<Instant> = None;
    let mut last_poll = Instant::now();

    tracing::info!(
        position_ms = position_every.as_millis() as u64,
        countdown_ms = countdown_every.as_millis() as u64,
        "Session task started"
    );

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    if let Err(e) = session.teardown(Instant::now().into_std()) {
                        tracing::warn!(error = %e, "Teardown failed");
                    }
                    break;
                };
                if handle_command(&mut session, sink.as_mut(), cmd) {
                    break;
                }
            }
            _ = position_tick.tick() => {
                let now = Instant::now();
                session.media_mut().poll(now.saturating_duration_since(last_poll));
                last_poll = now;
                session.on_position_update(now.into_std(), sink.as_mut());
            }
            _ = countdown_elapsed(countdown_deadline) => {
                let deadline = countdown_deadline.take();
                session.on_countdown_tick(sink.as_mut());
                if session.is_counting_down() {
                    countdown_deadline = deadline.map(|d| d + countdown_every);
                }
            }
        }

        // Arm the ticker for countdowns started by a command or a loop wrap
        match (session.is_counting_down(), countdown_deadline) {
            (true, None) => countdown_deadline = Some(Instant::now() + countdown_every),
            (false, Some(_)) => countdown_deadline = None,
            _ => {}
        }
    }

    tracing::info!("Session task stopped");
}

async fn countdown_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Apply one command; returns true when the task should stop
fn handle_command<M, S>(
    session: &mut Session<M, S>,
    sink: &mut dyn RenderSink,
    cmd: SessionCommand,
) -> bool
where
    M: MediaEngine,
    S: KeyValueStore,
{
    let now = Instant::now().into_std();
    match cmd {
        SessionCommand::LoadSong { file_name, reply } => {
            let result = session.load_song(&file_name, now);
            session.refresh(sink);
            let _ = reply.send(result);
        }
        SessionCommand::TogglePlay { reply } => {
            let _ = reply.send(session.toggle_play(now));
        }
        SessionCommand::SeekBy { delta, reply } => {
            let _ = reply.send(session.seek_by(delta));
        }
        SessionCommand::ClickFullTrack { fraction, reply } => {
            let _ = reply.send(session.click_full_track(fraction));
        }
        SessionCommand::ClickWindow {
            kind,
            fraction,
            reply,
        } => {
            let _ = reply.send(session.click_window(kind, fraction));
        }
        SessionCommand::RewindToStart { reply } => {
            let result = session.rewind_to_start();
            session.refresh(sink);
            let _ = reply.send(result);
        }
        SessionCommand::SetSpeed { rate, reply } => {
            let _ = reply.send(session.set_speed(rate));
        }
        SessionCommand::SetVolume { percent, reply } => {
            let _ = reply.send(session.set_volume(percent));
        }
        SessionCommand::ToggleCountdown { reply } => {
            let _ = reply.send(session.toggle_countdown());
        }
        SessionCommand::AddBookmark { reply } => {
            let result = session.add_bookmark();
            session.refresh(sink);
            let _ = reply.send(result);
        }
        SessionCommand::JumpToBookmark { id, reply } => {
            let _ = reply.send(session.jump_to_bookmark(id));
        }
        SessionCommand::PreviousBookmark { reply } => {
            let _ = reply.send(session.previous_bookmark());
        }
        SessionCommand::NextBookmark { reply } => {
            let _ = reply.send(session.next_bookmark());
        }
        SessionCommand::RenameBookmark { id, label, reply } => {
            let _ = reply.send(session.rename_bookmark(id, &label));
        }
        SessionCommand::RecolorBookmark { id, color, reply } => {
            let _ = reply.send(session.recolor_bookmark(id, &color));
        }
        SessionCommand::DeleteBookmark { id, reply } => {
            let result = session.delete_bookmark(id).map(|_| ());
            session.refresh(sink);
            let _ = reply.send(result);
        }
        SessionCommand::ToggleLoop { reply } => {
            let result = session.toggle_loop();
            session.refresh(sink);
            let _ = reply.send(result);
        }
        SessionCommand::SetLoopPoint { id, point, reply } => {
            let result = session.set_loop_point(id, point);
            session.refresh(sink);
            let _ = reply.send(result);
        }
        SessionCommand::GetStatus { reply } => {
            let _ = reply.send(SessionStatus::capture(session));
        }
        SessionCommand::Shutdown { reply } => {
            let _ = reply.send(session.teardown(now));
            return true;
        }
    }
    false
}
