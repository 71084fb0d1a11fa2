use crate::audio::AudioEngine;
use crate::model::{PlayerState, Track, clamp_volume};
use crate::playlist::{AssetResolver, Playlist};

/// Owns the player state and the optional playback engine.
///
/// `is_playing` is set on user action and never read back from the engine,
/// so it can disagree with what is actually audible when `play` fails.
pub struct PlayerController {
    playlist: Playlist,
    assets: AssetResolver,
    state: PlayerState,
    engine: Option<Box<dyn AudioEngine>>,
    pub dirty: bool,
    status: String,
}

impl PlayerController {
    pub fn new(playlist: Playlist, assets: AssetResolver) -> Self {
        Self {
            playlist,
            assets,
            state: PlayerState::default(),
            engine: None,
            dirty: true,
            status: String::from("Ready"),
        }
    }

    pub fn attach(&mut self, mut engine: Box<dyn AudioEngine>) {
        engine.set_volume(self.state.gain());
        if let Some(name) = engine.output_name() {
            tracing::info!(output = %name, "audio engine attached");
        }
        self.engine = Some(engine);
        self.dirty = true;
    }

    pub fn detach(&mut self) -> Option<Box<dyn AudioEngine>> {
        self.dirty = true;
        self.engine.take()
    }

    pub fn is_attached(&self) -> bool {
        self.engine.is_some()
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn assets(&self) -> &AssetResolver {
        &self.assets
    }

    pub fn track_count(&self) -> usize {
        self.playlist.len()
    }

    pub fn current_track(&self) -> &Track {
        &self.playlist.tracks()[self.state.current_index]
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn select_previous(&mut self) {
        let count = self.track_count();
        self.state.current_index = (self.state.current_index + count - 1) % count;
        self.state.is_playing = false;
        self.announce_track();
    }

    pub fn select_next(&mut self) {
        let count = self.track_count();
        self.state.current_index = (self.state.current_index + 1) % count;
        self.state.is_playing = false;
        self.announce_track();
    }

    pub fn toggle_playback(&mut self) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        if self.state.is_playing {
            engine.pause();
            self.set_status("Paused");
        } else if let Err(err) = engine.play() {
            tracing::warn!(error = %format!("{err:#}"), "play request failed");
            self.status = format!("playback error: {err:#}");
        } else {
            self.set_status("Playing");
        }
        self.state.is_playing = !self.state.is_playing;
        self.dirty = true;
    }

    pub fn set_volume(&mut self, volume: i32) {
        self.state.volume = clamp_volume(volume);
        if let Some(engine) = self.engine.as_mut() {
            engine.set_volume(self.state.gain());
        }
        self.status = format!("Volume: {}%", self.state.volume);
        self.dirty = true;
    }

    pub fn on_playback_ended(&mut self) {
        tracing::debug!(index = self.state.current_index, "track finished");
        self.select_next();
    }

    /// Points the engine at the current track when it holds anything else.
    pub fn bind_source(&mut self) {
        let track = &self.playlist.tracks()[self.state.current_index];
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        if engine.source() == Some(track.audio_ref.as_str()) {
            return;
        }

        let path = self.assets.resolve(&track.audio_ref);
        tracing::debug!(source = %track.audio_ref, ?path, "binding source");
        if let Err(err) = engine.set_source(path.as_deref(), &track.audio_ref) {
            tracing::warn!(error = %format!("{err:#}"), "failed to load track");
            self.status = format!("load error: {err:#}");
            self.dirty = true;
        }
    }

    /// One event-loop pass: keep the source bound and react to end-of-track.
    pub fn poll(&mut self) {
        self.bind_source();
        let ended = self
            .engine
            .as_mut()
            .is_some_and(|engine| engine.take_ended());
        if ended {
            self.on_playback_ended();
            self.bind_source();
        }
    }

    fn announce_track(&mut self) {
        let track = self.current_track();
        let status = format!("{} - {}", track.title, track.artist);
        tracing::info!(index = self.state.current_index, title = %track.title, "track selected");
        self.status = status;
        self.dirty = true;
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }
}
