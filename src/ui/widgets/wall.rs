use super::post_card::{to_cells, PostCardWidget};
use crate::scene::Surface;
use crate::ui::{CELL_HEIGHT, CELL_WIDTH};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Renders the card list container of a surface at its bound position.
#[derive(Debug, Clone)]
pub struct WallWidget {
    title: String,
    container_key: String,
}

impl WallWidget {
    pub fn new(title: impl Into<String>, container_key: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            container_key: container_key.into(),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, surface: &Surface, status: Option<&str>) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(self.title.as_str());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let container = match surface.lookup(&self.container_key) {
            Some(container) => container,
            None => {
                let waiting = Paragraph::new(vec![
                    Line::from(""),
                    Line::from("Waiting for posts..."),
                ])
                .alignment(Alignment::Center);
                frame.render_widget(waiting, inner);
                return;
            }
        };

        let (x, y) = container.layout_position().unwrap_or((0.0, 0.0));
        let offsets = container.child_offsets();
        for (card, offset) in container.children().iter().zip(offsets) {
            let (width, height) = PostCardWidget::footprint(card);
            let card_area = Rect::new(
                inner.x.saturating_add(to_cells(x, CELL_WIDTH)),
                inner.y.saturating_add(to_cells(y + offset, CELL_HEIGHT)),
                width,
                height,
            );
            // Cards pushed past the bottom edge stay in the list but are not drawn.
            if !inner.contains(card_area.as_position()) {
                continue;
            }
            frame.render_widget(PostCardWidget::new(card), card_area.intersection(inner));
        }

        if let Some(status) = status {
            let status_area = Rect::new(
                inner.x,
                inner.y + inner.height.saturating_sub(1),
                inner.width,
                inner.height.min(1),
            );
            frame.render_widget(
                Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
                status_area,
            );
        }
    }
}
