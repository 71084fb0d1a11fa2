#![no_main]

use libfuzzer_sys::fuzz_target;
use songcard::audio::NullAudioEngine;
use songcard::controller::PlayerController;
use songcard::model::Track;
use songcard::playlist::{AssetResolver, Playlist};

fuzz_target!(|data: &[u8]| {
    let len = (data.first().copied().unwrap_or(0) % 16).max(1) as usize;
    let tracks = (0..len)
        .map(|idx| {
            Track::new(
                &format!("track {idx}"),
                "fuzz",
                &format!("cover_{idx}.png"),
                &format!("track_{idx}.mp3"),
            )
        })
        .collect();
    let Ok(playlist) = Playlist::new(tracks) else {
        return;
    };
    let mut player = PlayerController::new(playlist, AssetResolver::new("fuzz-assets"));

    for byte in data {
        match byte % 7 {
            0 => player.select_next(),
            1 => player.select_previous(),
            2 => player.toggle_playback(),
            3 => player.set_volume(i32::from(*byte) - 64),
            4 => player.poll(),
            5 => player.attach(Box::new(NullAudioEngine::new())),
            _ => {
                let _ = player.detach();
            }
        }

        let state = player.state();
        assert!(state.current_index < player.track_count());
        assert!(state.volume <= 100);
    }
});
