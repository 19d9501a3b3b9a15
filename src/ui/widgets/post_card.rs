use crate::card::Card;
use crate::feeds::Avatar;
use crate::ui::{CELL_HEIGHT, CELL_WIDTH};
use image::imageops::{self, FilterType};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

/// Narrowest a card may get, in cells, before it is not drawn at all.
const MIN_VISIBLE_COLUMNS: u16 = 3;

/// Draws one card, narrowed horizontally according to its flip pose.
pub struct PostCardWidget<'a> {
    card: &'a Card,
}

impl<'a> PostCardWidget<'a> {
    pub fn new(card: &'a Card) -> Self {
        Self { card }
    }

    /// Full-size footprint of the card in cells.
    pub fn footprint(card: &Card) -> (u16, u16) {
        (
            to_cells(card.width(), CELL_WIDTH),
            to_cells(card.height(), CELL_HEIGHT),
        )
    }

    fn flipped_area(&self, area: Rect) -> Option<Rect> {
        let visible = self.card.pose.get().visible_width();
        let width = (f32::from(area.width) * visible).round() as u16;
        if width < MIN_VISIBLE_COLUMNS {
            return None;
        }
        let inset = (area.width - width) / 2;
        Some(Rect::new(area.x + inset, area.y, width, area.height))
    }
}

impl Widget for PostCardWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(area) = self.flipped_area(area) else {
            return;
        };
        let faded = self.card.pose.get().opacity < 0.5;
        let text_style = if faded {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Gray));
        let inner = block.inner(area);
        block.render(area, buf);

        let avatar_cols = to_cells(self.card.avatar.fit_width, CELL_WIDTH).min(inner.width);
        let avatar_rows = to_cells(self.card.avatar.fit_height, CELL_HEIGHT).min(inner.height);
        let avatar_area = Rect::new(inner.x, inner.y, avatar_cols, avatar_rows);
        if !faded {
            Paragraph::new(avatar_lines(&self.card.avatar.avatar, avatar_cols, avatar_rows))
                .render(avatar_area, buf);
        }

        let gap = to_cells(self.card.gap, CELL_WIDTH);
        let text_x = inner.x + (avatar_cols + gap).min(inner.width);
        let text_width = inner.right().saturating_sub(text_x);
        if text_width == 0 {
            return;
        }

        let text_rows = usize::from(to_cells(self.card.flow.max_height, CELL_HEIGHT));
        let mut header = vec![Span::styled(
            self.card.name.text.as_str(),
            text_style.add_modifier(Modifier::BOLD),
        )];
        if let Some(posted_at) = self.card.posted_at {
            header.push(Span::styled(
                format!(" | {}", posted_at.format("%b %d %H:%M")),
                Style::default().fg(Color::DarkGray),
            ));
        }
        let mut lines = vec![Line::from(header)];
        lines.extend(
            textwrap::wrap(&self.card.flow.text.text, usize::from(text_width))
                .into_iter()
                .take(text_rows)
                .map(|line| Line::from(Span::styled(line.into_owned(), text_style))),
        );

        Paragraph::new(lines).render(
            Rect::new(text_x, inner.y, text_width, inner.height),
            buf,
        );
    }
}

/// Avatar as half-block characters, two image rows per cell.
fn avatar_lines(avatar: &Avatar, cols: u16, rows: u16) -> Vec<Line<'static>> {
    if cols == 0 || rows == 0 {
        return Vec::new();
    }
    let scaled = imageops::resize(
        avatar.image(),
        u32::from(cols),
        u32::from(rows) * 2,
        FilterType::Nearest,
    );

    (0..u32::from(rows))
        .map(|row| {
            let spans: Vec<Span> = (0..u32::from(cols))
                .map(|col| {
                    let top = scaled.get_pixel(col, row * 2);
                    let bottom = scaled.get_pixel(col, row * 2 + 1);
                    Span::styled(
                        "▀",
                        Style::default()
                            .fg(Color::Rgb(top[0], top[1], top[2]))
                            .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

pub(crate) fn to_cells(units: f64, cell: f64) -> u16 {
    (units / cell).ceil().clamp(0.0, f64::from(u16::MAX)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::PoseState;
    use crate::card::{CardBuilder, CardMetrics};
    use crate::feeds::{make_post, AvatarProvider, GeneratedAvatars};
    use chrono::{TimeZone, Utc};

    fn card() -> Card {
        let avatars = AvatarProvider::new(GeneratedAvatars::default());
        CardBuilder::new(CardMetrics::default(), &avatars)
            .build(&make_post(1), 600.0)
            .unwrap()
    }

    fn rendered(card: &Card) -> String {
        let (w, h) = PostCardWidget::footprint(card);
        let area = Rect::new(0, 0, w, h);
        let mut buf = Buffer::empty(area);
        PostCardWidget::new(card).render(area, &mut buf);
        buf.content().iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_footprint() {
        assert_eq!(PostCardWidget::footprint(&card()), (85, 6));
    }

    #[test]
    fn test_edge_on_card_draws_nothing() {
        let card = card();
        assert!(rendered(&card).trim().is_empty());
    }

    #[test]
    fn test_face_on_card_shows_name_and_text() {
        let card = card();
        card.pose.set(PoseState::FACE_ON);
        let out = rendered(&card);
        assert!(out.contains("User 1"));
        assert!(out.contains("Post number 1"));
        assert!(out.contains("▀"));
    }

    #[test]
    fn test_face_on_card_shows_post_time() {
        let avatars = AvatarProvider::new(GeneratedAvatars::default());
        let mut post = make_post(2);
        post.created_at = Some(Utc.with_ymd_and_hms(2024, 5, 1, 14, 5, 0).unwrap());
        let timed = CardBuilder::new(CardMetrics::default(), &avatars)
            .build(&post, 600.0)
            .unwrap();
        timed.pose.set(PoseState::FACE_ON);
        assert!(rendered(&timed).contains("User 2 | May 01 14:05"));

        let untimed = card();
        untimed.pose.set(PoseState::FACE_ON);
        assert!(!rendered(&untimed).contains(" | "));
    }

    #[test]
    fn test_to_cells_rounds_up() {
        assert_eq!(to_cells(674.0, CELL_WIDTH), 85);
        assert_eq!(to_cells(64.0, CELL_WIDTH), 8);
        assert_eq!(to_cells(0.0, CELL_WIDTH), 0);
    }
}
