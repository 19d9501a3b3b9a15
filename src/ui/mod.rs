pub mod widgets;

use crate::scene::Surface;
use crate::step::{MachineContext, Proceed, ProceedReceiver, Step};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use widgets::WallWidget;

/// Surface units covered by one terminal cell.
pub const CELL_WIDTH: f64 = 8.0;
pub const CELL_HEIGHT: f64 = 16.0;

const FRAME: Duration = Duration::from_millis(33);

/// Terminal host for a single step: draws the surface, maps terminal size
/// onto it and replays the step on request.
pub struct App {
    surface: Arc<Surface>,
    step: Box<dyn Step>,
    context: MachineContext,
    proceed: ProceedReceiver,
    wall: WallWidget,
    status: Option<String>,
    running: usize,
    should_quit: bool,
}

impl App {
    pub fn new(
        surface: Arc<Surface>,
        step: Box<dyn Step>,
        context: MachineContext,
        proceed: ProceedReceiver,
        container_key: &str,
    ) -> Self {
        Self {
            surface,
            step,
            context,
            proceed,
            wall: WallWidget::new(" tweetwall ", container_key),
            status: None,
            running: 0,
            should_quit: false,
        }
    }

    pub fn run_step(&mut self) {
        match self.step.do_step(&self.context) {
            Ok(()) => {
                self.running += 1;
                self.status = Some("Flipping in...".to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, "step failed");
                self.status = Some(format!("Error: {}", e));
            }
        }
    }

    pub fn poll_proceed(&mut self) {
        while let Ok(Proceed) = self.proceed.try_recv() {
            self.running = self.running.saturating_sub(1);
            tracing::info!("step signalled proceed");
            if self.running == 0 {
                self.status = Some("r: replay | q: quit".to_string());
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('r') => self.run_step(),
            _ => {}
        }
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Runs until quit. Never blocks the runtime thread so the flip-in
    /// animation keeps ticking between frames.
    pub async fn run(mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        self.run_step();
        while !self.should_quit {
            terminal.draw(|frame| {
                let area = frame.area();
                self.surface.resize(
                    f64::from(area.width) * CELL_WIDTH,
                    f64::from(area.height) * CELL_HEIGHT,
                );
                self.wall
                    .render(frame, area, &self.surface, self.status.as_deref());
            })?;

            while event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
            self.poll_proceed();
            tokio::time::sleep(FRAME).await;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardSnapshot {
    pub post_id: String,
    pub author: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f32,
    pub opacity: f32,
}

/// Serializable layout of the card list, for headless runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallSnapshot {
    pub surface_width: f64,
    pub surface_height: f64,
    pub container: String,
    pub x: f64,
    pub y: f64,
    pub cards: Vec<CardSnapshot>,
}

impl WallSnapshot {
    pub fn capture(surface: &Surface, container_key: &str) -> Option<Self> {
        let container = surface.lookup(container_key)?;
        let size = surface.size();
        let (x, y) = container.layout_position().unwrap_or((0.0, 0.0));
        let cards = container
            .children()
            .into_iter()
            .zip(container.child_offsets())
            .map(|(card, offset)| {
                let pose = card.pose.get();
                CardSnapshot {
                    x,
                    y: y + offset,
                    width: card.width(),
                    height: card.height(),
                    angle: pose.angle,
                    opacity: pose.opacity,
                    post_id: card.post_id,
                    author: card.name.text,
                    text: card.flow.text.text,
                }
            })
            .collect();

        Some(Self {
            surface_width: size.width,
            surface_height: size.height,
            container: container.id().to_string(),
            x,
            y,
            cards,
        })
    }
}
