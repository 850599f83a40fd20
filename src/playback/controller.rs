use std::time::Duration;
use tracing::{debug, info, warn};

use super::traversal::{self, RandomSource, ThreadRandom};
use super::{LoadId, MediaCommand, MediaEvent, PlaybackError, PlaybackState};
use crate::audio::{QualityTag, Queue, Track};

pub const PLAYBACK_ERROR_MESSAGE: &str = "Playback error occurred";

/// Owns the playback session: current track, intent to play, shuffle/repeat,
/// quality, volume and the queue.
///
/// Every mutating call returns the commands the caller must hand to the
/// streaming resource, in order. Media events are matched against the load
/// they were issued for; anything tagged with an older load is dropped.
pub struct PlaybackController<R = ThreadRandom> {
    current: Option<Track>,
    current_url: Option<String>,
    state: PlaybackState,
    should_play: bool,
    shuffle: bool,
    repeat: bool,
    quality: QualityTag,
    volume: f32,
    muted: bool,
    position: Duration,
    duration: Option<Duration>,
    error: Option<PlaybackError>,
    queue: Queue,
    load: Option<LoadId>,
    generation: u64,
    rng: R,
}

impl PlaybackController<ThreadRandom> {
    pub fn new(quality: QualityTag, volume: f32) -> Self {
        Self::with_random(quality, volume, ThreadRandom)
    }
}

impl<R: RandomSource> PlaybackController<R> {
    pub fn with_random(quality: QualityTag, volume: f32, rng: R) -> Self {
        Self {
            current: None,
            current_url: None,
            state: PlaybackState::Idle,
            should_play: false,
            shuffle: false,
            repeat: false,
            quality,
            volume: volume.clamp(0.0, 1.0),
            muted: false,
            position: Duration::ZERO,
            duration: None,
            error: None,
            queue: Queue::new(),
            load: None,
            generation: 0,
            rng,
        }
    }

    // --- track selection -------------------------------------------------

    /// Make `track` current and start it (auto-play).
    pub fn select_track(&mut self, track: Track) -> Vec<MediaCommand> {
        self.error = None;
        self.position = Duration::ZERO;
        self.duration = track.duration();

        let url = track.stream_url_for(self.quality).map(str::to_owned);
        let track_id = track.id.clone();
        info!(track_id = %track_id, "Selected '{}' by {}", track.display_title(), track.artist);
        self.current = Some(track);

        match url {
            Some(url) => {
                self.should_play = true;
                self.attach(track_id, url)
            }
            None => {
                debug!(track_id = %track_id, "Track has no playable source");
                self.should_play = false;
                self.state = PlaybackState::NoSource;
                self.load = None;
                self.current_url = None;
                vec![MediaCommand::Detach]
            }
        }
    }

    fn attach(&mut self, track_id: String, url: String) -> Vec<MediaCommand> {
        self.generation += 1;
        let load = LoadId {
            track_id,
            generation: self.generation,
        };
        debug!(load = %load, "Attaching source");
        self.load = Some(load.clone());
        self.current_url = Some(url.clone());
        self.state = PlaybackState::Loading;
        self.position = Duration::ZERO;
        vec![MediaCommand::Attach { load, url }]
    }

    pub fn next(&mut self, results: &[Track]) -> Vec<MediaCommand> {
        let current_id = self.current_id().map(str::to_owned);
        let next = traversal::next_track(results, current_id.as_deref(), self.shuffle, &mut self.rng)
            .cloned();
        match next {
            Some(track) => self.select_track(track),
            None => Vec::new(),
        }
    }

    pub fn previous(&mut self, results: &[Track]) -> Vec<MediaCommand> {
        let current_id = self.current_id().map(str::to_owned);
        let previous =
            traversal::previous_track(results, current_id.as_deref(), self.shuffle, &mut self.rng)
                .cloned();
        match previous {
            Some(track) => self.select_track(track),
            None => Vec::new(),
        }
    }

    // --- transport ---------------------------------------------------------

    pub fn play(&mut self) -> Vec<MediaCommand> {
        let Some(track) = &self.current else {
            return Vec::new();
        };
        let Some(url) = track.stream_url_for(self.quality).map(str::to_owned) else {
            return Vec::new();
        };
        let track_id = track.id.clone();

        match self.state {
            PlaybackState::Paused => {
                self.error = None;
                self.should_play = true;
                self.state = PlaybackState::Playing;
                vec![MediaCommand::Play]
            }
            PlaybackState::Loading => {
                self.error = None;
                self.should_play = true;
                Vec::new()
            }
            PlaybackState::Error => {
                // retry: the old source is unusable, attach it again
                info!(track_id = %track_id, "Retrying playback");
                self.error = None;
                self.should_play = true;
                self.attach(track_id, url)
            }
            PlaybackState::Idle | PlaybackState::NoSource | PlaybackState::Playing => Vec::new(),
        }
    }

    pub fn pause(&mut self) -> Vec<MediaCommand> {
        match self.state {
            PlaybackState::Playing => {
                self.should_play = false;
                self.state = PlaybackState::Paused;
                vec![MediaCommand::Pause]
            }
            PlaybackState::Loading => {
                self.should_play = false;
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    pub fn toggle_play_pause(&mut self) -> Vec<MediaCommand> {
        if self.should_play {
            self.pause()
        } else {
            self.play()
        }
    }

    pub fn seek(&mut self, position: Duration) -> Vec<MediaCommand> {
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            return Vec::new();
        }
        let position = match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        };
        self.position = position;
        vec![MediaCommand::Seek(position)]
    }

    pub fn seek_by(&mut self, delta_secs: i64) -> Vec<MediaCommand> {
        let step = Duration::from_secs(delta_secs.unsigned_abs());
        let target = if delta_secs < 0 {
            self.position.saturating_sub(step)
        } else {
            self.position + step
        };
        self.seek(target)
    }

    // --- media events ------------------------------------------------------

    /// Feed back an event from the streaming resource. `results` is the list
    /// auto-advance falls back to once the queue is empty.
    pub fn handle_media_event(&mut self, event: MediaEvent, results: &[Track]) -> Vec<MediaCommand> {
        if self.load.as_ref() != Some(event.load()) {
            debug!(load = %event.load(), "Dropping stale media event");
            return Vec::new();
        }

        match event {
            MediaEvent::Ready { duration, .. } => self.on_ready(duration),
            MediaEvent::TimeUpdate { position, .. } => {
                self.position = position;
                Vec::new()
            }
            MediaEvent::Ended { .. } => self.on_ended(results),
            MediaEvent::Error { message, .. } => self.on_error(message),
        }
    }

    fn on_ready(&mut self, duration: Option<Duration>) -> Vec<MediaCommand> {
        if self.state != PlaybackState::Loading {
            return Vec::new();
        }
        if duration.is_some() {
            self.duration = duration;
        }
        if self.should_play {
            self.state = PlaybackState::Playing;
            vec![MediaCommand::Play]
        } else {
            self.state = PlaybackState::Paused;
            Vec::new()
        }
    }

    /// Natural end. A pause can race the end of the stream; in `Paused` the
    /// session still advances (or rewinds) but nothing starts playing.
    fn on_ended(&mut self, results: &[Track]) -> Vec<MediaCommand> {
        let auto_play = match self.state {
            PlaybackState::Playing => true,
            PlaybackState::Paused => false,
            _ => return Vec::new(),
        };

        if self.repeat {
            debug!(auto_play, "Repeat on, restarting track");
            self.position = Duration::ZERO;
            return if auto_play {
                vec![MediaCommand::Seek(Duration::ZERO), MediaCommand::Play]
            } else {
                vec![MediaCommand::Seek(Duration::ZERO)]
            };
        }

        let current_id = self.current_id().map(str::to_owned);

        // a queued copy of the track that just finished is spent, not replayed
        let mut next = None;
        while let Some(queued) = self.queue.dequeue_front() {
            if Some(queued.id.as_str()) == current_id.as_deref() {
                debug!(track_id = %queued.id, "Dropping queued copy of finished track");
                continue;
            }
            info!(track_id = %queued.id, "Advancing from queue");
            next = Some(queued);
            break;
        }

        let next = next.or_else(|| {
            traversal::next_track(results, current_id.as_deref(), self.shuffle, &mut self.rng)
                .filter(|t| Some(t.id.as_str()) != current_id.as_deref())
                .cloned()
        });

        match next {
            Some(track) => {
                let commands = self.select_track(track);
                if !auto_play {
                    // ready lands in Paused
                    self.should_play = false;
                }
                commands
            }
            None => {
                info!("Reached the end of the results, stopping");
                self.should_play = false;
                self.state = PlaybackState::Paused;
                self.position = Duration::ZERO;
                vec![MediaCommand::Seek(Duration::ZERO)]
            }
        }
    }

    fn on_error(&mut self, message: String) -> Vec<MediaCommand> {
        let track_id = self.current_id().unwrap_or_default().to_string();
        warn!(track_id = %track_id, "Playback failed: {}", message);
        self.should_play = false;
        self.state = PlaybackState::Error;
        self.error = Some(PlaybackError { track_id, message });
        vec![MediaCommand::Pause]
    }

    // --- modes -------------------------------------------------------------

    /// Switch quality; the current track re-resolves from its own variants and
    /// keeps its play/pause intent.
    pub fn set_quality(&mut self, quality: QualityTag) -> Vec<MediaCommand> {
        self.quality = quality;
        let Some(track) = &self.current else {
            return Vec::new();
        };
        let Some(url) = track.stream_url_for(quality).map(str::to_owned) else {
            return Vec::new();
        };
        if self.current_url.as_deref() == Some(url.as_str()) {
            return Vec::new();
        }

        info!(track_id = %track.id, quality = %quality, "Switching stream quality");
        let track_id = track.id.clone();
        self.error = None;
        self.attach(track_id, url)
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffle = !self.shuffle;
        self.shuffle
    }

    pub fn toggle_repeat(&mut self) -> bool {
        self.repeat = !self.repeat;
        self.repeat
    }

    pub fn set_volume(&mut self, volume: f32) -> Vec<MediaCommand> {
        self.volume = volume.clamp(0.0, 1.0);
        self.muted = false;
        vec![MediaCommand::SetVolume(self.effective_volume())]
    }

    pub fn adjust_volume(&mut self, delta: f32) -> Vec<MediaCommand> {
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
        vec![MediaCommand::SetVolume(self.effective_volume())]
    }

    pub fn toggle_mute(&mut self) -> Vec<MediaCommand> {
        self.muted = !self.muted;
        vec![MediaCommand::SetVolume(self.effective_volume())]
    }

    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    // --- queue -------------------------------------------------------------

    pub fn enqueue(&mut self, track: Track) -> bool {
        self.queue.enqueue(track)
    }

    pub fn remove_from_queue(&mut self, track_id: &str) -> bool {
        self.queue.remove(track_id)
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Pull `track_id` out of the queue and play it now.
    pub fn play_from_queue(&mut self, track_id: &str) -> Vec<MediaCommand> {
        match self.queue.take(track_id) {
            Some(track) => self.select_track(track),
            None => Vec::new(),
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // --- read side for the views -------------------------------------------

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.as_ref()
    }

    fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.id.as_str())
    }

    /// The session's intent: true while playing or about to play.
    pub fn is_playing(&self) -> bool {
        self.should_play
    }

    pub fn shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.repeat
    }

    pub fn quality(&self) -> QualityTag {
        self.quality
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn error(&self) -> Option<&PlaybackError> {
        self.error.as_ref()
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current_load(&self) -> Option<&LoadId> {
        self.load.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::fixtures::{playable, silent, track};
    use crate::playback::traversal::scripted::ScriptedRandom;

    type Controller = PlaybackController<ScriptedRandom>;

    fn controller() -> Controller {
        PlaybackController::with_random(QualityTag::Kbps320, 0.8, ScriptedRandom::default())
    }

    fn attached_load(commands: &[MediaCommand]) -> LoadId {
        match commands {
            [MediaCommand::Attach { load, .. }] => load.clone(),
            other => panic!("expected a single attach, got {:?}", other),
        }
    }

    /// Select `track` and drive it through ready so it is audibly playing.
    fn start(controller: &mut Controller, track: Track) -> LoadId {
        let load = attached_load(&controller.select_track(track));
        let commands = controller.handle_media_event(
            MediaEvent::Ready {
                load: load.clone(),
                duration: Some(Duration::from_secs(200)),
            },
            &[],
        );
        assert_eq!(commands, vec![MediaCommand::Play]);
        load
    }

    fn ended(load: &LoadId) -> MediaEvent {
        MediaEvent::Ended { load: load.clone() }
    }

    fn current_id(controller: &Controller) -> Option<&str> {
        controller.current_track().map(|t| t.id.as_str())
    }

    #[test]
    fn starts_idle() {
        let controller = controller();
        assert_eq!(controller.state(), PlaybackState::Idle);
        assert!(controller.current_track().is_none());
        assert!(!controller.is_playing());
    }

    #[test]
    fn select_attaches_once_and_plays_on_ready() {
        let mut controller = controller();
        let commands = controller.select_track(playable("a"));
        assert_eq!(
            commands,
            vec![MediaCommand::Attach {
                load: LoadId { track_id: "a".into(), generation: 1 },
                url: "https://cdn.test/a/320kbps.mp4".into(),
            }]
        );
        assert_eq!(controller.state(), PlaybackState::Loading);
        assert!(controller.is_playing());

        start(&mut controller, playable("b"));
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.duration(), Some(Duration::from_secs(200)));
    }

    #[test]
    fn select_without_source_is_not_playing() {
        let mut controller = controller();
        start(&mut controller, playable("a"));

        let commands = controller.select_track(silent("mute"));
        assert_eq!(commands, vec![MediaCommand::Detach]);
        assert_eq!(controller.state(), PlaybackState::NoSource);
        assert!(!controller.is_playing());
        assert_eq!(current_id(&controller), Some("mute"));

        // nothing to play
        assert!(controller.play().is_empty());
        assert_eq!(controller.state(), PlaybackState::NoSource);
    }

    #[test]
    fn pause_before_ready_lands_paused() {
        let mut controller = controller();
        let load = attached_load(&controller.select_track(playable("a")));
        assert!(controller.pause().is_empty());

        let commands =
            controller.handle_media_event(MediaEvent::Ready { load, duration: None }, &[]);
        assert!(commands.is_empty());
        assert_eq!(controller.state(), PlaybackState::Paused);

        assert_eq!(controller.play(), vec![MediaCommand::Play]);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn toggle_play_pause_round_trip() {
        let mut controller = controller();
        start(&mut controller, playable("a"));
        assert_eq!(controller.toggle_play_pause(), vec![MediaCommand::Pause]);
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.toggle_play_pause(), vec![MediaCommand::Play]);
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn play_without_track_is_a_no_op() {
        let mut controller = controller();
        assert!(controller.play().is_empty());
        assert!(controller.pause().is_empty());
        assert_eq!(controller.state(), PlaybackState::Idle);
    }

    #[test]
    fn stale_events_are_dropped() {
        let mut controller = controller();
        let old = attached_load(&controller.select_track(playable("a")));
        let fresh = attached_load(&controller.select_track(playable("b")));

        // late ready and error for "a" must not touch "b"
        assert!(controller
            .handle_media_event(MediaEvent::Ready { load: old.clone(), duration: None }, &[])
            .is_empty());
        assert!(controller
            .handle_media_event(
                MediaEvent::Error { load: old.clone(), message: "boom".into() },
                &[]
            )
            .is_empty());
        assert_eq!(controller.state(), PlaybackState::Loading);
        assert!(controller.error().is_none());

        let commands =
            controller.handle_media_event(MediaEvent::Ready { load: fresh, duration: None }, &[]);
        assert_eq!(commands, vec![MediaCommand::Play]);
        assert_eq!(current_id(&controller), Some("b"));
    }

    #[test]
    fn events_after_switching_to_a_silent_track_are_dropped() {
        let mut controller = controller();
        let old = start(&mut controller, playable("a"));
        controller.select_track(silent("s"));
        assert!(controller.handle_media_event(ended(&old), &[playable("z")]).is_empty());
        assert_eq!(current_id(&controller), Some("s"));
    }

    #[test]
    fn ended_with_queue_advances_from_queue() {
        let mut controller = controller();
        let results = vec![playable("r1"), playable("r2")];
        let load = start(&mut controller, playable("a"));
        controller.enqueue(playable("b"));
        controller.enqueue(playable("c"));

        let commands = controller.handle_media_event(ended(&load), &results);
        assert!(matches!(commands.as_slice(), [MediaCommand::Attach { load, .. }] if load.track_id == "b"));
        assert_eq!(current_id(&controller), Some("b"));
        assert_eq!(controller.queue().len(), 1);
        assert!(controller.is_playing());
    }

    #[test]
    fn queue_a_then_b_scenario() {
        let mut controller = controller();
        controller.enqueue(playable("a"));
        controller.enqueue(playable("b"));
        let load = start(&mut controller, playable("a"));

        controller.handle_media_event(ended(&load), &[playable("r")]);
        assert_eq!(current_id(&controller), Some("b"));
        assert!(controller.queue().is_empty());
    }

    #[test]
    fn queue_holding_only_the_finished_track_falls_through_to_results() {
        let mut controller = controller();
        controller.enqueue(playable("a"));
        let results = vec![playable("a"), playable("b")];
        let load = start(&mut controller, results[0].clone());

        controller.handle_media_event(ended(&load), &results);
        assert_eq!(current_id(&controller), Some("b"));
        assert!(controller.queue().is_empty());
    }

    #[test]
    fn repeat_restarts_regardless_of_queue() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));
        controller.enqueue(playable("b"));
        controller.toggle_repeat();
        controller.handle_media_event(
            MediaEvent::TimeUpdate { load: load.clone(), position: Duration::from_secs(199) },
            &[],
        );

        let commands = controller.handle_media_event(ended(&load), &[]);
        assert_eq!(commands, vec![MediaCommand::Seek(Duration::ZERO), MediaCommand::Play]);
        assert_eq!(current_id(&controller), Some("a"));
        assert_eq!(controller.position(), Duration::ZERO);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(controller.queue().len(), 1);
        assert_eq!(controller.current_load(), Some(&load));
    }

    #[test]
    fn end_racing_a_pause_rewinds_so_play_restarts_audibly() {
        let mut controller = controller();
        let results = vec![playable("a"), silent("x")];
        let load = start(&mut controller, results[0].clone());

        assert_eq!(controller.pause(), vec![MediaCommand::Pause]);
        let commands = controller.handle_media_event(ended(&load), &results);
        assert_eq!(commands, vec![MediaCommand::Seek(Duration::ZERO)]);
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.position(), Duration::ZERO);

        assert_eq!(controller.play(), vec![MediaCommand::Play]);
        assert_eq!(controller.state(), PlaybackState::Playing);
        assert_eq!(current_id(&controller), Some("a"));
    }

    #[test]
    fn end_while_paused_advances_without_auto_play() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));
        controller.enqueue(playable("b"));
        controller.pause();

        let next = attached_load(&controller.handle_media_event(ended(&load), &[]));
        assert_eq!(next.track_id, "b");
        assert!(!controller.is_playing());
        assert!(controller.queue().is_empty());

        let commands = controller.handle_media_event(MediaEvent::Ready { load: next, duration: None }, &[]);
        assert!(commands.is_empty());
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert_eq!(controller.play(), vec![MediaCommand::Play]);
    }

    #[test]
    fn repeat_end_while_paused_only_rewinds() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));
        controller.toggle_repeat();
        controller.pause();

        let commands = controller.handle_media_event(ended(&load), &[]);
        assert_eq!(commands, vec![MediaCommand::Seek(Duration::ZERO)]);
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert!(!controller.is_playing());
    }

    #[test]
    fn end_before_ready_is_ignored() {
        let mut controller = controller();
        let load = attached_load(&controller.select_track(playable("a")));
        assert!(controller.handle_media_event(ended(&load), &[playable("b")]).is_empty());
        assert_eq!(controller.state(), PlaybackState::Loading);
        assert_eq!(current_id(&controller), Some("a"));
    }

    #[test]
    fn ended_without_queue_follows_results() {
        let mut controller = controller();
        let results = vec![playable("a"), silent("x"), playable("b")];
        let load = start(&mut controller, results[0].clone());

        controller.handle_media_event(ended(&load), &results);
        assert_eq!(current_id(&controller), Some("b"));
        assert_eq!(controller.state(), PlaybackState::Loading);
    }

    #[test]
    fn ended_stops_when_only_current_is_eligible() {
        let mut controller = controller();
        let results = vec![playable("a"), silent("x")];
        let load = start(&mut controller, results[0].clone());

        let commands = controller.handle_media_event(ended(&load), &results);
        assert_eq!(commands, vec![MediaCommand::Seek(Duration::ZERO)]);
        assert_eq!(current_id(&controller), Some("a"));
        assert_eq!(controller.state(), PlaybackState::Paused);
        assert!(!controller.is_playing());

        // play again from the top
        assert_eq!(controller.play(), vec![MediaCommand::Play]);
    }

    #[test]
    fn ended_stops_with_empty_results() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));
        controller.handle_media_event(ended(&load), &[]);
        assert_eq!(controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn explicit_next_ignores_queue() {
        let mut controller = controller();
        let results = vec![playable("a"), playable("b"), playable("c")];
        start(&mut controller, results[0].clone());
        controller.enqueue(playable("q"));

        controller.next(&results);
        assert_eq!(current_id(&controller), Some("b"));
        assert_eq!(controller.queue().len(), 1);

        controller.previous(&results);
        controller.previous(&results);
        assert_eq!(current_id(&controller), Some("c"));
    }

    #[test]
    fn next_with_nothing_eligible_is_a_no_op() {
        let mut controller = controller();
        start(&mut controller, playable("a"));
        assert!(controller.next(&[silent("x")]).is_empty());
        assert_eq!(current_id(&controller), Some("a"));
        assert_eq!(controller.state(), PlaybackState::Playing);
    }

    #[test]
    fn shuffle_next_uses_injected_random() {
        let mut controller =
            PlaybackController::with_random(QualityTag::Kbps320, 1.0, ScriptedRandom::new(&[1]));
        let results = vec![playable("a"), playable("b"), playable("c")];
        controller.select_track(results[0].clone());
        assert!(controller.toggle_shuffle());

        controller.next(&results);
        // others of "a" are [b, c]; scripted pick 1 -> c
        assert_eq!(current_id(&controller), Some("c"));
    }

    #[test]
    fn error_stops_and_keeps_track_selected() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));

        let commands = controller.handle_media_event(
            MediaEvent::Error { load, message: PLAYBACK_ERROR_MESSAGE.into() },
            &[],
        );
        assert_eq!(commands, vec![MediaCommand::Pause]);
        assert_eq!(controller.state(), PlaybackState::Error);
        assert!(!controller.is_playing());
        assert_eq!(current_id(&controller), Some("a"));
        assert_eq!(controller.error().map(|e| e.message.as_str()), Some(PLAYBACK_ERROR_MESSAGE));

        controller.dismiss_error();
        assert!(controller.error().is_none());
    }

    #[test]
    fn play_after_error_retries_with_fresh_load() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));
        controller.handle_media_event(MediaEvent::Error { load: load.clone(), message: "x".into() }, &[]);

        let retry = attached_load(&controller.play());
        assert_eq!(retry.track_id, "a");
        assert!(retry.generation > load.generation);
        assert!(controller.error().is_none());
        assert_eq!(controller.state(), PlaybackState::Loading);
    }

    #[test]
    fn selecting_clears_previous_error() {
        let mut controller = controller();
        let load = start(&mut controller, playable("a"));
        controller.handle_media_event(MediaEvent::Error { load, message: "x".into() }, &[]);
        controller.select_track(playable("b"));
        assert!(controller.error().is_none());
    }

    #[test]
    fn quality_change_swaps_source_of_current_track_only() {
        let mut controller = controller();
        let results = vec![playable("a"), playable("b")];
        let before = start(&mut controller, results[0].clone());
        controller.enqueue(playable("q"));

        let commands = controller.set_quality(QualityTag::Kbps96);
        match commands.as_slice() {
            [MediaCommand::Attach { load, url }] => {
                assert_eq!(load.track_id, "a");
                assert!(load.generation > before.generation);
                assert_eq!(url, "https://cdn.test/a/96kbps.mp4");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(current_id(&controller), Some("a"));
        assert_eq!(controller.quality(), QualityTag::Kbps96);
        assert_eq!(controller.queue().len(), 1);
        // was playing, keeps playing once the new source is ready
        assert!(controller.is_playing());
    }

    #[test]
    fn quality_change_preserves_pause() {
        let mut controller = controller();
        start(&mut controller, playable("a"));
        controller.pause();

        let load = attached_load(&controller.set_quality(QualityTag::Kbps160));
        let commands =
            controller.handle_media_event(MediaEvent::Ready { load, duration: None }, &[]);
        assert!(commands.is_empty());
        assert_eq!(controller.state(), PlaybackState::Paused);
    }

    #[test]
    fn quality_change_falls_back_within_own_variants() {
        let mut controller = controller();
        start(&mut controller, track("a", &["48kbps", "160kbps"]));
        // 320 was missing so the current source is already the last entry
        assert!(controller.set_quality(QualityTag::Kbps12).is_empty());

        let load = attached_load(&controller.set_quality(QualityTag::Kbps48));
        assert_eq!(load.track_id, "a");
    }

    #[test]
    fn quality_change_without_track_only_records_it() {
        let mut controller = controller();
        assert!(controller.set_quality(QualityTag::Kbps96).is_empty());
        let commands = controller.select_track(playable("a"));
        assert!(matches!(commands.as_slice(), [MediaCommand::Attach { url, .. }] if url.ends_with("96kbps.mp4")));
    }

    #[test]
    fn seek_is_clamped_to_duration() {
        let mut controller = controller();
        start(&mut controller, playable("a"));
        assert_eq!(
            controller.seek(Duration::from_secs(500)),
            vec![MediaCommand::Seek(Duration::from_secs(200))]
        );
        assert_eq!(controller.seek_by(-300), vec![MediaCommand::Seek(Duration::ZERO)]);
        assert_eq!(controller.seek_by(10), vec![MediaCommand::Seek(Duration::from_secs(10))]);
    }

    #[test]
    fn seek_while_loading_is_ignored() {
        let mut controller = controller();
        controller.select_track(playable("a"));
        assert!(controller.seek(Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn volume_and_mute() {
        let mut controller = controller();
        assert_eq!(controller.adjust_volume(0.5), vec![MediaCommand::SetVolume(1.0)]);
        assert_eq!(controller.toggle_mute(), vec![MediaCommand::SetVolume(0.0)]);
        assert!(controller.is_muted());
        // the slider un-mutes
        assert_eq!(controller.set_volume(0.25), vec![MediaCommand::SetVolume(0.25)]);
        assert!(!controller.is_muted());
        assert_eq!(controller.set_volume(-3.0), vec![MediaCommand::SetVolume(0.0)]);
    }

    #[test]
    fn play_from_queue_removes_and_selects() {
        let mut controller = controller();
        controller.enqueue(playable("a"));
        controller.enqueue(playable("b"));

        let load = attached_load(&controller.play_from_queue("b"));
        assert_eq!(load.track_id, "b");
        assert_eq!(controller.queue().len(), 1);
        assert!(controller.play_from_queue("missing").is_empty());

        controller.clear_queue();
        assert!(controller.queue().is_empty());
    }
}
