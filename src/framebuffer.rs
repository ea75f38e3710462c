/// display width in pixels
pub const WIDTH: usize = 64;
/// display height in pixels
pub const HEIGHT: usize = 32;

/// The 64x32 monochrome display buffer. Only clear and sprite drawing mutate
/// it; renderers read it and take the dirty flag.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pixels: [[bool; WIDTH]; HEIGHT],
    dirty: bool,
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: [[false; WIDTH]; HEIGHT],
            dirty: false,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[y][x]
    }

    pub fn rows(&self) -> &[[bool; WIDTH]; HEIGHT] {
        &self.pixels
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// read and clear the dirty flag
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// all pixels off
    pub fn clear(&mut self) {
        self.pixels = [[false; WIDTH]; HEIGHT];
        self.dirty = true;
    }

    /// back to power-on state, which is not dirty
    pub fn reset(&mut self) {
        self.pixels = [[false; WIDTH]; HEIGHT];
        self.dirty = false;
    }

    /// XOR a sprite onto the display with its top-left corner at (x, y).
    ///
    /// The origin always wraps. Each sprite byte is one row, most significant
    /// bit leftmost. Pixels past the right or bottom edge wrap around, or are
    /// dropped when `clip` is set. Returns true if any pixel went from on to
    /// off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8], clip: bool) -> bool {
        let x0 = x as usize % WIDTH;
        let y0 = y as usize % HEIGHT;
        let mut collision = false;

        for (r, row) in sprite.iter().enumerate() {
            let py = y0 + r;
            if clip && py >= HEIGHT {
                break;
            }
            let py = py % HEIGHT;
            for c in 0..8 {
                if row & (0x80 >> c) == 0 {
                    continue;
                }
                let px = x0 + c;
                if clip && px >= WIDTH {
                    continue;
                }
                let px = px % WIDTH;
                let pixel = &mut self.pixels[py][px];
                collision |= *pixel;
                *pixel = !*pixel;
            }
        }

        self.dirty = true;
        collision
    }

    /// count of lit pixels
    pub fn lit(&self) -> usize {
        self.pixels.iter().flatten().filter(|&&p| p).count()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Framebuffer(dirty: {})", self.dirty)?;
        for row in &self.pixels {
            let line: String = row.iter().map(|&p| if p { '#' } else { '.' }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
