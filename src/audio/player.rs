//! Rodio-backed streaming resource.
//!
//! `OutputStream` is not `Send`, so it lives on a dedicated audio thread that
//! owns the sink and takes [`AudioCmd`]s over a std channel. Fetching a stream
//! URL happens on a tokio task; the downloaded bytes are handed to the thread
//! and decoded from memory, which also makes seeking a cheap sink rebuild.
//!
//! Every event goes out tagged with the [`LoadId`] it belongs to. The thread
//! only accepts bytes for the load it was last told to expect.

use anyhow::{anyhow, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task;
use tracing::{debug, error, info, warn};

use crate::playback::{LoadId, MediaCommand, MediaEvent, StreamingResource};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug)]
enum AudioCmd {
    /// Drop whatever is attached; only bytes for this load are accepted from now on.
    Expect(LoadId),
    Load { load: LoadId, bytes: Arc<[u8]> },
    Play,
    Pause,
    Seek(Duration),
    SetVolume(f32),
    Detach,
    Quit,
}

pub struct AudioPlayer {
    commands: Sender<AudioCmd>,
    http: reqwest::Client,
    events: UnboundedSender<MediaEvent>,
    fetch: Option<task::JoinHandle<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioPlayer {
    /// Open the default output device and start the audio thread.
    pub fn new(http: reqwest::Client, events: UnboundedSender<MediaEvent>, volume: f32) -> Result<Self> {
        let (commands, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<(), String>>(1);
        let thread_events = events.clone();

        let thread = thread::Builder::new()
            .name("rayyfy-audio".into())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                Deck::new(handle, thread_events, volume).run(rx);
                drop(stream);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => info!("Audio output ready"),
            Ok(Err(e)) => return Err(anyhow!("No audio output device: {}", e)),
            Err(_) => return Err(anyhow!("Audio thread exited during startup")),
        }

        Ok(Self {
            commands,
            http,
            events,
            fetch: None,
            thread: Some(thread),
        })
    }

    fn send(&self, cmd: AudioCmd) -> Result<()> {
        self.commands
            .send(cmd)
            .map_err(|_| anyhow!("audio thread is gone"))
    }

    fn attach(&mut self, load: LoadId, url: String) -> Result<()> {
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        self.send(AudioCmd::Expect(load.clone()))?;

        let http = self.http.clone();
        let commands = self.commands.clone();
        let events = self.events.clone();
        self.fetch = Some(tokio::spawn(async move {
            debug!(load = %load, "Fetching stream");
            match fetch_stream(&http, &url).await {
                Ok(bytes) => {
                    debug!(load = %load, "Fetched {} bytes", bytes.len());
                    let _ = commands.send(AudioCmd::Load { load, bytes });
                }
                Err(e) => {
                    warn!(load = %load, "Stream fetch failed: {}", e);
                    let _ = events.send(MediaEvent::Error {
                        load,
                        message: format!("Unable to play: {}", e),
                    });
                }
            }
        }));
        Ok(())
    }
}

async fn fetch_stream(http: &reqwest::Client, url: &str) -> reqwest::Result<Arc<[u8]>> {
    let response = http.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(Arc::from(bytes.as_ref()))
}

impl StreamingResource for AudioPlayer {
    fn dispatch(&mut self, command: MediaCommand) -> Result<()> {
        debug!(?command, "Dispatching media command");
        match command {
            MediaCommand::Attach { load, url } => self.attach(load, url),
            MediaCommand::Play => self.send(AudioCmd::Play),
            MediaCommand::Pause => self.send(AudioCmd::Pause),
            MediaCommand::Seek(position) => self.send(AudioCmd::Seek(position)),
            MediaCommand::SetVolume(level) => self.send(AudioCmd::SetVolume(level)),
            MediaCommand::Detach => {
                if let Some(fetch) = self.fetch.take() {
                    fetch.abort();
                }
                self.send(AudioCmd::Detach)
            }
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        if let Some(fetch) = self.fetch.take() {
            fetch.abort();
        }
        let _ = self.commands.send(AudioCmd::Quit);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Audio thread panicked");
            }
        }
    }
}

/// Play position bookkeeping: time accumulated before the last start plus
/// time since then.
#[derive(Debug, Clone, Copy, Default)]
struct PlayClock {
    offset: Duration,
    started_at: Option<Instant>,
}

impl PlayClock {
    fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    fn stop(&mut self, now: Instant) {
        if let Some(started) = self.started_at.take() {
            self.offset += now.saturating_duration_since(started);
        }
    }

    fn reset_to(&mut self, position: Duration, now: Instant) {
        let running = self.started_at.is_some();
        self.offset = position;
        self.started_at = running.then_some(now);
    }

    fn position(&self, now: Instant) -> Duration {
        self.offset
            + self
                .started_at
                .map_or(Duration::ZERO, |started| now.saturating_duration_since(started))
    }
}

/// Which load the thread is serving, and whether its end was reported.
#[derive(Debug, Default)]
struct LoadSlot {
    expected: Option<LoadId>,
    ended: bool,
}

impl LoadSlot {
    /// From now on only bytes for `load` are accepted.
    fn expect(&mut self, load: LoadId) {
        self.expected = Some(load);
        self.ended = false;
    }

    fn detach(&mut self) {
        self.expected = None;
        self.ended = false;
    }

    fn accepts(&self, load: &LoadId) -> bool {
        self.expected.as_ref() == Some(load)
    }

    fn current(&self) -> Option<&LoadId> {
        self.expected.as_ref()
    }

    fn has_ended(&self) -> bool {
        self.ended
    }

    /// The load to report as ended, once per load (or per rewind).
    fn end(&mut self) -> Option<LoadId> {
        if self.ended {
            return None;
        }
        let load = self.expected.clone()?;
        self.ended = true;
        Some(load)
    }

    /// A fresh sink for the same load can end again.
    fn rewind(&mut self) {
        self.ended = false;
    }
}

/// Everything the audio thread owns.
struct Deck {
    handle: OutputStreamHandle,
    events: UnboundedSender<MediaEvent>,
    slot: LoadSlot,
    bytes: Option<Arc<[u8]>>,
    sink: Option<Sink>,
    clock: PlayClock,
    volume: f32,
    last_update: Instant,
}

impl Deck {
    fn new(handle: OutputStreamHandle, events: UnboundedSender<MediaEvent>, volume: f32) -> Self {
        Self {
            handle,
            events,
            slot: LoadSlot::default(),
            bytes: None,
            sink: None,
            clock: PlayClock::default(),
            volume,
            last_update: Instant::now(),
        }
    }

    fn run(mut self, rx: Receiver<AudioCmd>) {
        loop {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(AudioCmd::Quit) => break,
                Ok(cmd) => self.handle(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            self.tick(Instant::now());
        }
        self.clear();
        debug!("Audio thread stopped");
    }

    fn handle(&mut self, cmd: AudioCmd) {
        let now = Instant::now();
        match cmd {
            AudioCmd::Expect(load) => {
                self.clear();
                self.slot.expect(load);
            }
            AudioCmd::Load { load, bytes } => {
                if !self.slot.accepts(&load) {
                    debug!(load = %load, "Discarding bytes for superseded load");
                    return;
                }
                match self.open(&bytes, Duration::ZERO) {
                    Ok((sink, duration)) => {
                        self.sink = Some(sink);
                        self.bytes = Some(bytes);
                        self.clock = PlayClock::default();
                        self.slot.rewind();
                        self.emit(MediaEvent::Ready { load, duration });
                    }
                    Err(e) => {
                        warn!(load = %load, "Decoding failed: {}", e);
                        self.emit(MediaEvent::Error {
                            load,
                            message: format!("Unable to play: {}", e),
                        });
                    }
                }
            }
            AudioCmd::Play => {
                if let Some(sink) = &self.sink {
                    sink.play();
                    self.clock.start(now);
                }
            }
            AudioCmd::Pause => {
                if let Some(sink) = &self.sink {
                    sink.pause();
                    self.clock.stop(now);
                }
            }
            AudioCmd::Seek(position) => self.seek(position, now),
            AudioCmd::SetVolume(level) => {
                self.volume = level;
                if let Some(sink) = &self.sink {
                    sink.set_volume(level);
                }
            }
            AudioCmd::Detach => {
                self.clear();
                self.slot.detach();
            }
            AudioCmd::Quit => {}
        }
    }

    /// Rebuild the sink from the in-memory bytes, skipping into the stream.
    fn seek(&mut self, position: Duration, now: Instant) {
        let (Some(bytes), Some(old)) = (self.bytes.clone(), self.sink.take()) else {
            return;
        };
        let was_playing = !old.is_paused() && self.clock.started_at.is_some();
        old.stop();

        match self.open(&bytes, position) {
            Ok((sink, _)) => {
                if was_playing {
                    sink.play();
                }
                self.sink = Some(sink);
                self.clock.reset_to(position, now);
                self.slot.rewind();
            }
            Err(e) => {
                if let Some(load) = self.slot.current().cloned() {
                    self.emit(MediaEvent::Error {
                        load,
                        message: format!("Unable to play: {}", e),
                    });
                }
            }
        }
    }

    /// Returns a paused sink positioned at `start`, plus the stream length if known.
    fn open(&self, bytes: &Arc<[u8]>, start: Duration) -> Result<(Sink, Option<Duration>)> {
        let source = Decoder::new(Cursor::new(bytes.clone()))?;
        let duration = source.total_duration();
        let sink = Sink::try_new(&self.handle)?;
        sink.pause();
        sink.set_volume(self.volume);
        sink.append(source.skip_duration(start));
        Ok((sink, duration))
    }

    fn tick(&mut self, now: Instant) {
        let Some(sink) = &self.sink else {
            return;
        };
        if self.slot.has_ended() || sink.is_paused() {
            return;
        }

        if sink.empty() {
            self.clock.stop(now);
            if let Some(load) = self.slot.end() {
                debug!(load = %load, "Track ended");
                self.emit(MediaEvent::Ended { load });
            }
            return;
        }

        if now.saturating_duration_since(self.last_update) >= TIME_UPDATE_INTERVAL {
            let Some(load) = self.slot.current().cloned() else {
                return;
            };
            self.last_update = now;
            let position = self.clock.position(now);
            self.emit(MediaEvent::TimeUpdate { load, position });
        }
    }

    fn clear(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.bytes = None;
        self.clock = PlayClock::default();
    }

    fn emit(&self, event: MediaEvent) {
        // the UI loop is gone when this fails; the thread is about to be told to quit
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_accumulates_across_pauses() {
        let t0 = Instant::now();
        let mut clock = PlayClock::default();
        assert_eq!(clock.position(t0), Duration::ZERO);

        clock.start(t0);
        let t1 = t0 + Duration::from_secs(5);
        assert_eq!(clock.position(t1), Duration::from_secs(5));

        clock.stop(t1);
        let t2 = t1 + Duration::from_secs(60);
        assert_eq!(clock.position(t2), Duration::from_secs(5));

        clock.start(t2);
        assert_eq!(clock.position(t2 + Duration::from_secs(2)), Duration::from_secs(7));
    }

    #[test]
    fn clock_seek_keeps_running_state() {
        let t0 = Instant::now();
        let mut clock = PlayClock::default();
        clock.start(t0);
        clock.reset_to(Duration::from_secs(30), t0 + Duration::from_secs(1));
        assert_eq!(clock.position(t0 + Duration::from_secs(3)), Duration::from_secs(32));

        let mut paused = PlayClock::default();
        paused.reset_to(Duration::from_secs(30), t0);
        assert_eq!(paused.position(t0 + Duration::from_secs(10)), Duration::from_secs(30));
    }

    fn load(track_id: &str, generation: u64) -> LoadId {
        LoadId {
            track_id: track_id.to_string(),
            generation,
        }
    }

    #[test]
    fn bytes_for_a_superseded_load_are_refused() {
        let mut slot = LoadSlot::default();
        assert!(!slot.accepts(&load("a", 1)));

        slot.expect(load("a", 1));
        slot.expect(load("a", 2));
        assert!(!slot.accepts(&load("a", 1)));
        assert!(slot.accepts(&load("a", 2)));
        assert_eq!(slot.current(), Some(&load("a", 2)));
    }

    #[test]
    fn detach_forgets_the_expected_load() {
        let mut slot = LoadSlot::default();
        slot.expect(load("a", 1));
        slot.detach();
        assert!(!slot.accepts(&load("a", 1)));
        assert!(slot.current().is_none());
        assert_eq!(slot.end(), None);
    }

    #[test]
    fn end_is_reported_once_per_load() {
        let mut slot = LoadSlot::default();
        slot.expect(load("a", 1));
        assert_eq!(slot.end(), Some(load("a", 1)));
        assert!(slot.has_ended());
        assert_eq!(slot.end(), None);

        // seek back into the same load
        slot.rewind();
        assert_eq!(slot.end(), Some(load("a", 1)));

        slot.expect(load("b", 2));
        assert!(!slot.has_ended());
        assert_eq!(slot.end(), Some(load("b", 2)));
    }

    #[test]
    fn double_start_does_not_reset() {
        let t0 = Instant::now();
        let mut clock = PlayClock::default();
        clock.start(t0);
        clock.start(t0 + Duration::from_secs(4));
        assert_eq!(clock.position(t0 + Duration::from_secs(4)), Duration::from_secs(4));
    }
}
