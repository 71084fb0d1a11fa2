use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine};
use crate::config::Settings;
use crate::controller::PlayerController;
use crate::cover::CoverCache;
use crate::playlist::{AssetResolver, Playlist};
use crate::ui::{self, CardLayout};
use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct AppStartupOptions {
    pub asset_root: Option<PathBuf>,
    pub no_audio: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

pub fn build_player(settings: &Settings, options: &AppStartupOptions) -> Result<PlayerController> {
    let playlist = match settings.tracks.clone() {
        Some(tracks) => Playlist::new(tracks).context("invalid tracks in settings file")?,
        None => Playlist::builtin(),
    };
    let root = options
        .asset_root
        .clone()
        .unwrap_or_else(|| settings.asset_root.clone());
    tracing::info!(tracks = playlist.len(), assets = %root.display(), "player created");
    Ok(PlayerController::new(playlist, AssetResolver::new(root)))
}

fn open_engine(no_audio: bool) -> Box<dyn AudioEngine> {
    if no_audio {
        return Box::new(NullAudioEngine::new());
    }
    match RodioAudioEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "no audio output, using null engine");
            Box::new(NullAudioEngine::new())
        }
    }
}

pub fn run_with_startup(settings: Settings, options: AppStartupOptions) -> Result<()> {
    let mut player = build_player(&settings, &options)?;
    player.attach(open_engine(options.no_audio));
    let volume_step = settings.volume_step();

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut covers = CoverCache::new();
    let mut layout = CardLayout::default();
    let mut pointer = PointerState::default();
    let mut last_tick = Instant::now();

    let result: Result<()> = loop {
        player.poll();

        if player.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            if let Err(err) = terminal.draw(|frame| {
                layout = ui::card_layout(frame.area());
                ui::draw(frame, &player, &mut covers);
            }) {
                break Err(err.into());
            }
            player.dirty = false;
            last_tick = Instant::now();
        }

        match event::poll(Duration::from_millis(33)) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => break Err(err.into()),
        }

        let event = match event::read() {
            Ok(event) => event,
            Err(err) => break Err(err.into()),
        };

        match event {
            Event::Mouse(mouse) => handle_mouse(&mut player, mouse, &layout, &mut pointer),
            Event::Key(key) => {
                if handle_key(&mut player, key, volume_step) == KeyOutcome::Quit {
                    break Ok(());
                }
            }
            Event::Resize(_, _) => player.dirty = true,
            _ => {}
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    tracing::info!("player closed");
    result
}

pub fn handle_key(player: &mut PlayerController, key: KeyEvent, volume_step: i32) -> KeyOutcome {
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Continue;
    }

    let volume = i32::from(player.state().volume);
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            return KeyOutcome::Quit;
        }
        KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
        KeyCode::Left | KeyCode::Char('p') | KeyCode::Char('b') => player.select_previous(),
        KeyCode::Right | KeyCode::Char('n') => player.select_next(),
        KeyCode::Char(' ') | KeyCode::Enter => player.toggle_playback(),
        KeyCode::Up | KeyCode::Char('+') | KeyCode::Char('=') => {
            player.set_volume(volume + volume_step)
        }
        KeyCode::Down | KeyCode::Char('-') => player.set_volume(volume - volume_step),
        _ => {}
    }
    KeyOutcome::Continue
}

/// Tracks whether the left button went down on the volume slider, so only
/// drags that started there move the volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerState {
    volume_grab: bool,
}

pub fn handle_mouse(
    player: &mut PlayerController,
    mouse: MouseEvent,
    layout: &CardLayout,
    pointer: &mut PointerState,
) {
    let (x, y) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            pointer.volume_grab = false;
            if ui::point_in_rect(x, y, layout.previous) {
                player.select_previous();
            } else if ui::point_in_rect(x, y, layout.toggle) {
                player.toggle_playback();
            } else if ui::point_in_rect(x, y, layout.next) {
                player.select_next();
            } else if ui::point_in_rect(x, y, layout.volume_slider) {
                pointer.volume_grab = true;
                player.set_volume(ui::volume_at(layout.volume_slider, x));
            }
        }
        MouseEventKind::Drag(MouseButton::Left) if pointer.volume_grab => {
            player.set_volume(ui::volume_at(layout.volume_slider, x));
        }
        MouseEventKind::Up(MouseButton::Left) => pointer.volume_grab = false,
        MouseEventKind::ScrollUp if ui::point_in_rect(x, y, layout.card) => {
            player.set_volume(i32::from(player.state().volume) + 1);
        }
        MouseEventKind::ScrollDown if ui::point_in_rect(x, y, layout.card) => {
            player.set_volume(i32::from(player.state().volume) - 1);
        }
        _ => {}
    }
}
