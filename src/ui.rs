use crate::controller::PlayerController;
use crate::cover::CoverCache;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const APP_TITLE: &str = "SongCard";
const CARD_MAX_WIDTH: u16 = 46;
const CARD_MAX_HEIGHT: u16 = 34;
const VOLUME_LABEL: &str = "Vol ";
const VOLUME_SUFFIX_WIDTH: u16 = 5;

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    card_bg: Color,
    border: Color,
    text: Color,
    muted: Color,
    accent: Color,
    track: Color,
}

const PALETTE: Palette = Palette {
    bg: Color::Rgb(12, 20, 48),
    card_bg: Color::Rgb(24, 28, 36),
    border: Color::Rgb(69, 121, 176),
    text: Color::Rgb(240, 242, 248),
    muted: Color::Rgb(156, 163, 175),
    accent: Color::Rgb(100, 203, 184),
    track: Color::Rgb(75, 85, 99),
};

/// Screen regions of the card, shared by drawing and mouse hit-testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardLayout {
    pub card: Rect,
    pub cover: Rect,
    pub title: Rect,
    pub artist: Rect,
    pub previous: Rect,
    pub toggle: Rect,
    pub next: Rect,
    pub volume_label: Rect,
    pub volume_slider: Rect,
    pub volume_value: Rect,
    pub status: Rect,
}

pub fn card_layout(area: Rect) -> CardLayout {
    let card = centered(area, CARD_MAX_WIDTH, CARD_MAX_HEIGHT);
    let inner = card.inner(Margin {
        vertical: 1,
        horizontal: 2,
    });

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(2),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);

    let transport = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(rows[4]);

    let volume = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(VOLUME_LABEL.len() as u16),
            Constraint::Min(1),
            Constraint::Length(VOLUME_SUFFIX_WIDTH),
        ])
        .split(rows[6]);

    CardLayout {
        card,
        cover: square_cells(rows[0]),
        title: rows[1],
        artist: rows[2],
        previous: transport[0],
        toggle: transport[1],
        next: transport[2],
        volume_label: volume[0],
        volume_slider: volume[1],
        volume_value: volume[2],
        status: rows[7],
    }
}

pub fn draw(frame: &mut Frame, player: &PlayerController, covers: &mut CoverCache) {
    let layout = card_layout(frame.area());
    let state = player.state();
    let track = player.current_track();

    frame.render_widget(
        Block::default().style(Style::default().bg(PALETTE.bg)),
        frame.area(),
    );
    frame.render_widget(
        Block::default()
            .borders(Borders::ALL)
            .title(Span::styled(
                format!(" {APP_TITLE} "),
                Style::default()
                    .fg(PALETTE.accent)
                    .add_modifier(Modifier::BOLD),
            ))
            .title_bottom(
                Line::from(Span::styled(
                    format!(" {}/{} ", state.current_index + 1, player.track_count()),
                    Style::default().fg(PALETTE.muted),
                ))
                .right_aligned(),
            )
            .border_style(Style::default().fg(PALETTE.border))
            .style(Style::default().bg(PALETTE.card_bg)),
        layout.card,
    );

    match covers.lines_for(
        track,
        player.assets(),
        layout.cover.width,
        layout.cover.height,
    ) {
        Some(lines) => frame.render_widget(Paragraph::new(lines.to_vec()), layout.cover),
        None => frame.render_widget(missing_cover(layout.cover.height), layout.cover),
    }

    frame.render_widget(
        Paragraph::new(Span::styled(
            track.title.as_str(),
            Style::default()
                .fg(PALETTE.text)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        layout.title,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            track.artist.as_str(),
            Style::default().fg(PALETTE.muted),
        ))
        .alignment(Alignment::Center),
        layout.artist,
    );

    let button = Style::default().fg(PALETTE.text);
    frame.render_widget(
        Paragraph::new(Span::styled("|<<", button)).alignment(Alignment::Left),
        layout.previous,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            play_pause_icon(state.is_playing),
            button.add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        layout.toggle,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(">>|", button)).alignment(Alignment::Right),
        layout.next,
    );

    frame.render_widget(
        Paragraph::new(Span::styled(VOLUME_LABEL, Style::default().fg(PALETTE.muted))),
        layout.volume_label,
    );
    frame.render_widget(
        Paragraph::new(slider_line(
            state.volume,
            usize::from(layout.volume_slider.width),
        )),
        layout.volume_slider,
    );
    frame.render_widget(
        Paragraph::new(Span::styled(
            format!("{:>4}%", state.volume),
            Style::default().fg(PALETTE.muted),
        )),
        layout.volume_value,
    );

    frame.render_widget(
        Paragraph::new(Span::styled(
            player.status(),
            Style::default().fg(PALETTE.muted),
        ))
        .alignment(Alignment::Center),
        layout.status,
    );
}

pub fn play_pause_icon(is_playing: bool) -> &'static str {
    if is_playing { "||" } else { ">" }
}

/// Maps a column on the slider to a volume percentage.
pub fn volume_at(slider: Rect, column: u16) -> i32 {
    if slider.width <= 1 {
        return if column >= slider.x { 100 } else { 0 };
    }
    let offset = i32::from(column) - i32::from(slider.x);
    let span = i32::from(slider.width) - 1;
    let scaled = (f64::from(offset) * 100.0 / f64::from(span)).round() as i32;
    scaled.clamp(0, 100)
}

pub fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

fn slider_line(volume: u8, width: usize) -> Line<'static> {
    if width == 0 {
        return Line::default();
    }
    let knob = ((f64::from(volume) / 100.0) * (width - 1) as f64).round() as usize;
    Line::from(vec![
        Span::styled("=".repeat(knob), Style::default().fg(PALETTE.accent)),
        Span::styled(
            "O",
            Style::default()
                .fg(PALETTE.text)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "-".repeat(width - 1 - knob),
            Style::default().fg(PALETTE.track),
        ),
    ])
}

fn missing_cover(height: u16) -> Paragraph<'static> {
    let mut lines = vec![Line::default(); usize::from(height / 2)];
    lines.push(Line::from(Span::styled(
        "[ no cover ]",
        Style::default().fg(PALETTE.muted),
    )));
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(PALETTE.track)),
        )
}

/// Largest area that shows square pixels when each cell holds two of them.
fn square_cells(area: Rect) -> Rect {
    let width = area.width.min(area.height.saturating_mul(2));
    let height = (width / 2).max(1).min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y,
        width,
        height,
    }
}

fn centered(area: Rect, max_width: u16, max_height: u16) -> Rect {
    let width = area.width.min(max_width);
    let height = area.height.min(max_height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::{AssetResolver, Playlist};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    #[test]
    fn layout_stays_inside_the_screen() {
        let area = Rect::new(0, 0, 120, 40);
        let layout = card_layout(area);
        assert_eq!(layout.card.width, CARD_MAX_WIDTH);
        assert_eq!(layout.card.height, CARD_MAX_HEIGHT);
        for rect in [
            layout.cover,
            layout.previous,
            layout.toggle,
            layout.next,
            layout.volume_slider,
            layout.status,
        ] {
            assert!(rect.x >= layout.card.x && rect.right() <= layout.card.right());
            assert!(rect.y >= layout.card.y && rect.bottom() <= layout.card.bottom());
        }
    }

    #[test]
    fn transport_buttons_do_not_overlap() {
        let layout = card_layout(Rect::new(0, 0, 80, 30));
        assert!(layout.previous.right() <= layout.toggle.x);
        assert!(layout.toggle.right() <= layout.next.x);
        assert_eq!(layout.previous.y, layout.next.y);
    }

    #[test]
    fn cover_uses_square_pixels() {
        let layout = card_layout(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.cover.width, layout.cover.height * 2);
    }

    #[test]
    fn slider_maps_ends_and_middle() {
        let slider = Rect::new(10, 5, 21, 1);
        assert_eq!(volume_at(slider, 10), 0);
        assert_eq!(volume_at(slider, 20), 50);
        assert_eq!(volume_at(slider, 30), 100);
        assert_eq!(volume_at(slider, 2), 0);
        assert_eq!(volume_at(slider, 90), 100);
    }

    #[test]
    fn slider_line_fills_width() {
        let line = slider_line(50, 21);
        assert_eq!(line.width(), 21);
        assert_eq!(line.spans[0].content.len(), 10);
    }

    #[test]
    fn icon_reflects_playing_flag() {
        assert_eq!(play_pause_icon(false), ">");
        assert_eq!(play_pause_icon(true), "||");
    }

    #[test]
    fn point_in_rect_excludes_edges_past_width() {
        let rect = Rect::new(2, 2, 3, 1);
        assert!(point_in_rect(2, 2, rect));
        assert!(point_in_rect(4, 2, rect));
        assert!(!point_in_rect(5, 2, rect));
        assert!(!point_in_rect(2, 3, rect));
    }

    #[test]
    fn draw_renders_title_artist_and_volume() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut player =
            PlayerController::new(Playlist::builtin(), AssetResolver::new(dir.path()));
        player.select_next();
        let mut covers = CoverCache::new();
        let mut terminal = Terminal::new(TestBackend::new(60, 36)).expect("terminal");
        terminal
            .draw(|frame| draw(frame, &player, &mut covers))
            .expect("draw");

        let buffer = terminal.backend().buffer();
        let text: String = buffer
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect::<Vec<_>>()
            .join("");
        assert!(text.contains("Burning Heart"));
        assert!(text.contains("KEI"));
        assert!(text.contains("no cover"));
        assert!(text.contains("50%"));
        assert!(text.contains("2/5"));
    }
}
