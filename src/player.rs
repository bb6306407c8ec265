use crate::decoder::FfmpegSource;
use crate::pacing::{FrameClock, Pace, SecondTracker};
use crate::present::{DisplayMode, Resampling};
use crate::{Error, Frame, FrameSlot, FrameSource, Metadata, PlayerState, VideoEvent, VideoInfo};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Opens a fresh source. Runs on the decode worker, never on the caller's thread.
pub type SourceOpener = Arc<dyn Fn() -> Result<Box<dyn FrameSource>, Error> + Send + Sync>;

const COMMAND_CAPACITY: usize = 100;

/// How long an idle worker waits for commands before rechecking its state.
const IDLE_TICK: Duration = Duration::from_millis(16);

/// Longest uninterrupted sleep while waiting for a frame deadline.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(16);

#[derive(Debug, Clone)]
pub struct VideoOptions {
    /// Pace frames to the source frame rate and drop late ones.
    pub consistent_frame_rate: Option<bool>,
    /// Start playing as soon as the source opens.
    pub autoplay: Option<bool>,
    pub display_mode: Option<DisplayMode>,
    pub resampling: Option<Resampling>,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            consistent_frame_rate: Some(true),
            autoplay: Some(false),
            display_mode: Some(DisplayMode::default()),
            resampling: Some(Resampling::Nearest),
        }
    }
}

pub(crate) enum DecoderCommand {
    Seek(Duration),
    Stop,
}

/// State shared between the handle and the decode worker.
struct Shared {
    state: Mutex<PlayerState>,
    play_requested: AtomicBool,
    info: RwLock<Option<VideoInfo>>,
    metadata: RwLock<Metadata>,
    slot: FrameSlot,
    position: Mutex<Duration>,
    frame_number: AtomicU64,
    consistent_frame_rate: AtomicBool,
    events: Sender<VideoEvent>,
}

impl Shared {
    fn state(&self) -> PlayerState {
        *self.state.lock()
    }

    fn emit(&self, event: VideoEvent) {
        // Only fails once every receiver is gone.
        let _ = self.events.send(event);
    }

    fn show(&self, frame: Frame) {
        let number = frame.number;
        let timestamp = frame.timestamp;
        *self.position.lock() = timestamp;
        self.frame_number.store(number, Ordering::Release);
        self.slot.publish(frame);
        self.emit(VideoEvent::FrameGenerated { number, timestamp });
    }

    /// Shows `frame` unless playback was paused meanwhile, in which case it is handed back.
    fn show_if_playing(&self, frame: Frame) -> Option<Frame> {
        let state = self.state.lock();
        if *state != PlayerState::Playing {
            return Some(frame);
        }
        self.show(frame);
        drop(state);
        None
    }

    fn reset_playback(&self) {
        self.slot.clear();
        *self.info.write() = None;
        self.metadata.write().clear();
        *self.position.lock() = Duration::ZERO;
        self.frame_number.store(0, Ordering::Release);
    }
}

struct Worker {
    alive: Arc<AtomicBool>,
    command_tx: Sender<DecoderCommand>,
    thread: Option<JoinHandle<()>>,
}

struct Loaded {
    opener: SourceOpener,
    url: Option<url::Url>,
}

pub(crate) struct Internal {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
    loaded: Mutex<Option<Loaded>>,
    autoplay: AtomicBool,
    events_rx: Receiver<VideoEvent>,
}

impl Internal {
    fn shutdown_worker(&self) {
        let Some(mut worker) = self.worker.lock().take() else {
            return;
        };
        worker.alive.store(false, Ordering::SeqCst);
        let _ = worker.command_tx.try_send(DecoderCommand::Stop);

        if let Some(thread) = worker.thread.take() {
            if thread.join().is_err() {
                log::error!("Decoder thread panicked");
            }
        }
    }

    fn start(&self, opener: SourceOpener, url: Option<url::Url>, play: bool) -> Result<(), Error> {
        self.shutdown_worker();
        self.shared.reset_playback();

        {
            let mut state = self.shared.state.lock();
            *state = PlayerState::Loading;
            self.shared.play_requested.store(play, Ordering::SeqCst);
        }

        let (command_tx, command_rx) = bounded(COMMAND_CAPACITY);
        let alive = Arc::new(AtomicBool::new(true));

        let shared = Arc::clone(&self.shared);
        let alive_ref = Arc::clone(&alive);
        let worker_opener = Arc::clone(&opener);

        let spawned = std::thread::Builder::new()
            .name("video-decoder".to_string())
            .spawn(move || decoder_main(shared, worker_opener, alive_ref, command_rx));

        let thread = match spawned {
            Ok(thread) => thread,
            Err(e) => {
                *self.shared.state.lock() = PlayerState::Stopped;
                return Err(Error::Io(e));
            }
        };

        *self.loaded.lock() = Some(Loaded { opener, url });
        *self.worker.lock() = Some(Worker {
            alive,
            command_tx,
            thread: Some(thread),
        });
        Ok(())
    }

    fn restart(&self, play: bool) -> Result<(), Error> {
        let (opener, url) = {
            let loaded = self.loaded.lock();
            let loaded = loaded.as_ref().ok_or(Error::NotLoaded)?;
            (Arc::clone(&loaded.opener), loaded.url.clone())
        };
        log::info!("Reopening source from the start");
        self.start(opener, url, play)
    }

    fn send(&self, command: DecoderCommand) -> Result<(), Error> {
        let worker = self.worker.lock();
        let worker = worker.as_ref().ok_or(Error::NotLoaded)?;
        worker.command_tx.send(command).map_err(|_| Error::Sync)
    }
}

impl Drop for Internal {
    fn drop(&mut self) {
        self.shutdown_worker();
    }
}

impl std::fmt::Debug for Internal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Internal")
            .field("state", &self.shared.state())
            .field("info", &*self.shared.info.read())
            .field("frame_number", &self.shared.frame_number.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// Handle to a video playback pipeline.
///
/// Clones share the same pipeline; the decode worker is stopped and joined
/// when the last clone is dropped.
#[derive(Debug, Clone)]
pub struct Player(pub(crate) Arc<Internal>);

impl Default for Player {
    fn default() -> Self {
        Self::new(VideoOptions::default())
    }
}

impl Player {
    pub fn new(options: VideoOptions) -> Self {
        let (events_tx, events_rx) = unbounded();

        let shared = Arc::new(Shared {
            state: Mutex::new(PlayerState::Stopped),
            play_requested: AtomicBool::new(false),
            info: RwLock::new(None),
            metadata: RwLock::new(Metadata::new()),
            slot: FrameSlot::new(),
            position: Mutex::new(Duration::ZERO),
            frame_number: AtomicU64::new(0),
            consistent_frame_rate: AtomicBool::new(options.consistent_frame_rate.unwrap_or(true)),
            events: events_tx,
        });

        Player(Arc::new(Internal {
            shared,
            worker: Mutex::new(None),
            loaded: Mutex::new(None),
            autoplay: AtomicBool::new(options.autoplay.unwrap_or(false)),
            events_rx,
        }))
    }

    /// Starts opening `uri` in the background. Any previous playback is stopped first.
    ///
    /// Open failures arrive as [`VideoEvent::LoadFailed`].
    pub fn load(&self, uri: &url::Url) -> Result<(), Error> {
        log::info!("Loading {}", uri);
        let target = uri.clone();
        let opener: SourceOpener = Arc::new(move || {
            FfmpegSource::open(&target).map(|source| Box::new(source) as Box<dyn FrameSource>)
        });
        let autoplay = self.0.autoplay.load(Ordering::Relaxed);
        self.0.start(opener, Some(uri.clone()), autoplay)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = std::path::absolute(path.as_ref())?;
        let uri = url::Url::from_file_path(&path).map_err(|_| Error::Uri)?;
        self.load(&uri)
    }

    /// Loads from a custom [`FrameSource`]. `open` runs on the decode worker
    /// and again whenever playback restarts after a stop.
    pub fn load_with<F>(&self, open: F) -> Result<(), Error>
    where
        F: Fn() -> Result<Box<dyn FrameSource>, Error> + Send + Sync + 'static,
    {
        let autoplay = self.0.autoplay.load(Ordering::Relaxed);
        self.0.start(Arc::new(open), None, autoplay)
    }

    pub fn play(&self) -> Result<(), Error> {
        let mut state = self.0.shared.state.lock();
        match *state {
            PlayerState::Playing => Ok(()),
            PlayerState::Paused => {
                *state = PlayerState::Playing;
                log::info!("Resuming playback");
                Ok(())
            }
            PlayerState::Loading => {
                self.0.shared.play_requested.store(true, Ordering::SeqCst);
                Ok(())
            }
            PlayerState::Stopped | PlayerState::Ended => {
                drop(state);
                self.0.restart(true)
            }
        }
    }

    pub fn pause(&self) -> Result<(), Error> {
        let mut state = self.0.shared.state.lock();
        match *state {
            PlayerState::Playing => {
                *state = PlayerState::Paused;
                log::info!("Pausing playback");
                Ok(())
            }
            PlayerState::Loading => {
                self.0.shared.play_requested.store(false, Ordering::SeqCst);
                Ok(())
            }
            PlayerState::Paused => Ok(()),
            PlayerState::Stopped | PlayerState::Ended => {
                if self.0.loaded.lock().is_some() {
                    Ok(())
                } else {
                    Err(Error::NotLoaded)
                }
            }
        }
    }

    pub fn toggle_pause(&self) -> Result<(), Error> {
        if self.state() == PlayerState::Playing {
            self.pause()
        } else {
            self.play()
        }
    }

    /// Stops playback and releases the decoder. Never fails.
    ///
    /// The source is remembered; a later [`play`](Self::play) reopens it from the start.
    pub fn stop(&self) {
        self.0.shutdown_worker();
        *self.0.shared.state.lock() = PlayerState::Stopped;
        *self.0.shared.position.lock() = Duration::ZERO;
        self.0.shared.frame_number.store(0, Ordering::Release);
        log::info!("Playback stopped");
    }

    /// Repositions to the first frame at or after `target`, clamped to the video duration.
    ///
    /// Works while paused; the frame found is displayed right away.
    pub fn seek(&self, target: Duration) -> Result<(), Error> {
        if self.state().is_stopped() {
            self.0.restart(false)?;
        }
        let target = match self.video_info() {
            Some(info) => info.clamp(target),
            None => target,
        };
        self.0.send(DecoderCommand::Seek(target))
    }

    pub fn state(&self) -> PlayerState {
        self.0.shared.state()
    }

    pub fn is_paused(&self) -> bool {
        self.state().is_paused()
    }

    /// `None` until the current source has opened.
    pub fn video_info(&self) -> Option<VideoInfo> {
        *self.0.shared.info.read()
    }

    pub fn duration(&self) -> Duration {
        self.video_info().map(|info| info.duration).unwrap_or_default()
    }

    pub fn size(&self) -> (u32, u32) {
        self.video_info().map(|info| info.frame_size).unwrap_or_default()
    }

    pub fn metadata(&self) -> Metadata {
        self.0.shared.metadata.read().clone()
    }

    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.0.shared.slot.latest()
    }

    /// The displayed frame and its [`frame_generation`](Self::frame_generation), read together.
    pub fn current_frame_with_generation(&self) -> (Option<Arc<Frame>>, u64) {
        self.0.shared.slot.latest_with_generation()
    }

    pub fn current_frame_number(&self) -> u64 {
        self.0.shared.frame_number.load(Ordering::Acquire)
    }

    /// Timestamp of the frame on display.
    pub fn position(&self) -> Duration {
        *self.0.shared.position.lock()
    }

    /// Changes whenever the displayed frame changes.
    pub fn frame_generation(&self) -> u64 {
        self.0.shared.slot.generation()
    }

    /// Receiver for this player's notifications. Clones share one queue.
    pub fn events(&self) -> Receiver<VideoEvent> {
        self.0.events_rx.clone()
    }

    pub fn source_url(&self) -> Option<url::Url> {
        self.0.loaded.lock().as_ref().and_then(|loaded| loaded.url.clone())
    }

    pub fn consistent_frame_rate(&self) -> bool {
        self.0.shared.consistent_frame_rate.load(Ordering::Relaxed)
    }

    pub fn set_consistent_frame_rate(&self, enabled: bool) {
        self.0
            .shared
            .consistent_frame_rate
            .store(enabled, Ordering::Relaxed);
    }
}

enum Outcome {
    Stopped,
    Ended,
}

fn decoder_main(
    shared: Arc<Shared>,
    opener: SourceOpener,
    alive: Arc<AtomicBool>,
    command_rx: Receiver<DecoderCommand>,
) {
    let mut source = match opener() {
        Ok(source) => source,
        Err(e) => {
            log::error!("Failed to open video: {}", e);
            if alive.load(Ordering::Acquire) {
                *shared.state.lock() = PlayerState::Stopped;
                shared.emit(VideoEvent::LoadFailed(Arc::new(e)));
            }
            return;
        }
    };

    if !alive.load(Ordering::Acquire) {
        return;
    }

    let info = source.info();
    *shared.info.write() = Some(info);
    *shared.metadata.write() = source.metadata();
    {
        let mut state = shared.state.lock();
        *state = PlayerState::after_open(shared.play_requested.swap(false, Ordering::SeqCst));
    }

    shared.emit(VideoEvent::Loaded(info));
    if !info.duration.is_zero() {
        shared.emit(VideoEvent::DurationKnown(info.duration));
    }

    match playback_loop(&shared, &mut *source, info, &alive, &command_rx) {
        Ok(Outcome::Stopped) => log::info!("Decoder stopped"),
        Ok(Outcome::Ended) => {
            log::info!("End of stream");
            if alive.load(Ordering::Acquire) {
                *shared.state.lock() = PlayerState::Ended;
                shared.emit(VideoEvent::Ended);
            }
        }
        Err(e) => {
            log::error!("Decoder error: {}", e);
            if alive.load(Ordering::Acquire) {
                *shared.state.lock() = PlayerState::Stopped;
                shared.emit(VideoEvent::Failed(Arc::new(e)));
            }
        }
    }
}

/// Pending work pulled off the command channel.
#[derive(Default)]
struct Commands {
    seek: Option<Duration>,
    stop: bool,
}

fn take_commands(command_rx: &Receiver<DecoderCommand>, wait: bool) -> Commands {
    let mut commands = Commands::default();
    let mut apply = |command: DecoderCommand| match command {
        DecoderCommand::Seek(target) => commands.seek = Some(target),
        DecoderCommand::Stop => commands.stop = true,
    };

    if wait {
        match command_rx.recv_timeout(IDLE_TICK) {
            Ok(command) => apply(command),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Commands { seek: None, stop: true },
        }
    }

    loop {
        match command_rx.try_recv() {
            Ok(command) => apply(command),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => return Commands { seek: None, stop: true },
        }
    }
    commands
}

fn sleep_while_alive(alive: &AtomicBool, duration: Duration) {
    let deadline = Instant::now() + duration;
    while alive.load(Ordering::Acquire) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        std::thread::sleep(remaining.min(MAX_SLEEP_SLICE));
    }
}

fn playback_loop(
    shared: &Shared,
    source: &mut dyn FrameSource,
    info: VideoInfo,
    alive: &AtomicBool,
    command_rx: &Receiver<DecoderCommand>,
) -> Result<Outcome, Error> {
    let mut clock = FrameClock::new(info.frame_interval(), Instant::now());
    let mut seconds = SecondTracker::new();
    let mut was_playing = false;
    let mut held: Option<Frame> = None;
    let mut presented = 0u64;
    let mut last_timestamp = Duration::ZERO;

    log::info!("Decoder loop started");

    while alive.load(Ordering::Acquire) {
        let playing = shared.state() == PlayerState::Playing;
        let commands = take_commands(command_rx, !playing);
        if commands.stop || !alive.load(Ordering::Acquire) {
            return Ok(Outcome::Stopped);
        }

        if let Some(target) = commands.seek {
            let target = info.clamp(target);
            held = None;
            if let Some(frame) = source.seek(target)? {
                seconds.reset(frame.timestamp);
                clock.reanchor(frame.timestamp, Instant::now());
                last_timestamp = frame.timestamp;
                shared.show(frame);
            }
        }

        if shared.state() != PlayerState::Playing {
            was_playing = false;
            continue;
        }

        if !was_playing {
            was_playing = true;
            let from = held
                .as_ref()
                .map(|frame| frame.timestamp)
                .unwrap_or_else(|| *shared.position.lock());
            clock.reanchor(from, Instant::now());
        }

        let frame = match held.take() {
            Some(frame) => frame,
            None => match source.next_frame()? {
                Some(frame) => frame,
                None => {
                    // The last frame stays on screen for one interval.
                    if shared.consistent_frame_rate.load(Ordering::Relaxed) {
                        let end = clock.deadline(last_timestamp + info.frame_interval());
                        sleep_while_alive(alive, end.saturating_duration_since(Instant::now()));
                        if !alive.load(Ordering::Acquire) {
                            return Ok(Outcome::Stopped);
                        }
                    }
                    return Ok(Outcome::Ended);
                }
            },
        };
        let timestamp = frame.timestamp;
        last_timestamp = timestamp;

        if shared.consistent_frame_rate.load(Ordering::Relaxed) {
            match clock.pace(timestamp, Instant::now()) {
                Pace::Drop => {
                    log::debug!("Dropped late frame {}", frame.number);
                    if let Some(second) = seconds.advance(timestamp) {
                        shared.emit(VideoEvent::SecondChanged(second));
                    }
                    continue;
                }
                Pace::Present(wait) => sleep_while_alive(alive, wait),
            }
        }

        if !alive.load(Ordering::Acquire) {
            return Ok(Outcome::Stopped);
        }

        held = shared.show_if_playing(frame);
        if held.is_none() {
            if let Some(second) = seconds.advance(timestamp) {
                shared.emit(VideoEvent::SecondChanged(second));
            }
            presented += 1;
            if presented % 100 == 0 {
                log::debug!("Presented {} frames", presented);
            }
        }
    }

    Ok(Outcome::Stopped)
}
