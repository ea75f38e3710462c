use std::io;

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

use crate::framebuffer::{Framebuffer, HEIGHT, WIDTH};

/// Display is used by the environment to put the frame buffer on a screen. It
/// only ever reads the buffer, so a variety of kinds of screen would work.
pub trait Display {
    /// present the whole frame
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error>;
}

// store useful metadata about the canvas
struct Resolution(usize, usize);

impl Resolution {
    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// canvas coordinates of every pixel in the given state; y grows
    /// downwards on the chip-8 and upwards on the canvas
    fn bitplane_from_frame(&self, frame: &Framebuffer, lit: bool) -> Vec<(f64, f64)> {
        frame
            .rows()
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(move |(_, p)| **p == lit)
                    .map(move |(x, _)| (x as f64, -1.0 * y as f64))
            })
            .collect()
    }
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct MonoTermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    title: String,
}

impl MonoTermDisplay {
    pub fn new(title: &str) -> Result<MonoTermDisplay, io::Error> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(MonoTermDisplay {
            terminal,
            resolution: Resolution(WIDTH, HEIGHT),
            title: format!("CHIP-8: {}", title),
        })
    }
}

impl Drop for MonoTermDisplay {
    fn drop(&mut self) {
        // nothing sensible to do if the terminal has gone away
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    }
}

impl Display for MonoTermDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        // for now this assumes a 1:1 ratio between terminal, chip8 and the
        // internal TUI canvas
        let off = self.resolution.bitplane_from_frame(frame, false);
        let on = self.resolution.bitplane_from_frame(frame, true);
        let size = Rect::new(0, 0, 2 + self.resolution.0 as u16, 2 + self.resolution.1 as u16);
        let x_bounds = self.resolution.x_bounds();
        let y_bounds = self.resolution.y_bounds();
        let title = self.title.as_str();

        self.terminal.draw(|f| {
            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title(title)
                        .borders(Borders::ALL)
                        .style(Style::default().bg(Color::Black)),
                )
                .x_bounds(x_bounds)
                .y_bounds(y_bounds)
                .marker(Marker::Block)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &off,
                        color: Color::Black,
                    });
                    ctx.draw(&Points {
                        coords: &on,
                        color: Color::White,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; keeps the last frame it was given
#[derive(Default)]
pub struct DummyDisplay {
    pub frames: usize,
    pub last: Option<Framebuffer>,
}

impl DummyDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, frame: &Framebuffer) -> Result<(), io::Error> {
        self.frames += 1;
        self.last = Some(frame.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.x_bounds(), [0.0, 63.0]);
    }

    #[test]
    fn test_y_bounds() {
        let r = Resolution(64, 32);
        assert_eq!(r.y_bounds(), [-31.0, 0.0]);
    }

    #[test]
    fn test_bitplanes_partition_the_frame() {
        let r = Resolution(64, 32);
        let mut fb = Framebuffer::new();
        fb.draw_sprite(1, 2, &[0xc0], false);
        let on = r.bitplane_from_frame(&fb, true);
        assert_eq!(on, vec![(1.0, -2.0), (2.0, -2.0)]);
        assert_eq!(r.bitplane_from_frame(&fb, false).len(), 2048 - 2);
    }

    #[test]
    fn test_dummy_keeps_last_frame() {
        let mut d = DummyDisplay::new();
        let mut fb = Framebuffer::new();
        d.draw(&fb).unwrap();
        fb.draw_sprite(0, 0, &[0x80], false);
        d.draw(&fb).unwrap();
        assert_eq!(d.frames, 2);
        assert!(d.last.unwrap().pixel(0, 0));
    }

    #[test]
    #[ignore]
    // NB. needs a real terminal
    fn test_draw_blank_frame() -> Result<(), io::Error> {
        let mut d = MonoTermDisplay::new("test")?;
        d.draw(&Framebuffer::new())
    }
}
