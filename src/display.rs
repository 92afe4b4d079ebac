use crate::{Chip8Error, DISPLAY_X, DISPLAY_Y};

/// Monochrome frame buffer, stored row major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Display {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, state: bool) {
        if let Some(index) = self.index_of(x, y) {
            self.pixels[index] = state;
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.index_of(x, y).is_some_and(|index| self.pixels[index])
    }

    /// Toggles the pixel at (x, y) and returns its new state.
    pub fn flip_pixel(&mut self, x: usize, y: usize) -> bool {
        match self.index_of(x, y) {
            Some(index) => {
                self.pixels[index] ^= true;
                self.pixels[index]
            }
            None => false,
        }
    }

    pub fn set_all(&mut self, state: bool) {
        self.pixels.fill(state);
    }

    /// Iterates the rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks_exact(self.width.max(1))
    }

    fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(y * self.width + x)
        } else {
            log::error!(
                "{}",
                Chip8Error::PixelOutOfBounds {
                    x,
                    y,
                    width: self.width,
                    height: self.height,
                }
            );
            None
        }
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new(DISPLAY_X, DISPLAY_Y)
    }
}
