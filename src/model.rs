use serde::{Deserialize, Serialize};

pub const DEFAULT_VOLUME: u8 = 50;
pub const MAX_VOLUME: u8 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    #[serde(rename = "cover")]
    pub cover_ref: String,
    #[serde(rename = "audio")]
    pub audio_ref: String,
}

impl Track {
    pub fn new(title: &str, artist: &str, cover_ref: &str, audio_ref: &str) -> Self {
        Self {
            title: title.to_string(),
            artist: artist.to_string(),
            cover_ref: cover_ref.to_string(),
            audio_ref: audio_ref.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerState {
    pub current_index: usize,
    pub is_playing: bool,
    pub volume: u8,
}

impl PlayerState {
    /// Linear gain handed to the playback engine.
    pub fn gain(&self) -> f32 {
        f32::from(self.volume) / 100.0
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            current_index: 0,
            is_playing: false,
            volume: DEFAULT_VOLUME,
        }
    }
}

pub fn clamp_volume(value: i32) -> u8 {
    value.clamp(0, i32::from(MAX_VOLUME)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_paused_at_first_track_half_volume() {
        let state = PlayerState::default();
        assert_eq!(state.current_index, 0);
        assert!(!state.is_playing);
        assert_eq!(state.volume, 50);
        assert_eq!(state.gain(), 0.5);
    }

    #[test]
    fn clamp_volume_bounds_both_sides() {
        assert_eq!(clamp_volume(-20), 0);
        assert_eq!(clamp_volume(0), 0);
        assert_eq!(clamp_volume(73), 73);
        assert_eq!(clamp_volume(100), 100);
        assert_eq!(clamp_volume(250), 100);
    }

    #[test]
    fn track_uses_short_field_names_in_json() {
        let raw = r#"{"title":"t","artist":"a","cover":"c.jpg","audio":"a.mp3"}"#;
        let track: Track = serde_json::from_str(raw).expect("parse");
        assert_eq!(track, Track::new("t", "a", "c.jpg", "a.mp3"));
    }
}
