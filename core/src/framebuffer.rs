// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Software framebuffer
//!
//! Draw calls accumulate as pending deltas which are committed to the
//! screen snapshot on refresh, returning the changed [`Pixel`]s so display
//! sinks can be updated.

use std::collections::HashMap;

use image::{Rgb, RgbImage};

use crate::Model;

/// Canonical foreground for 1-bit panels
pub const MONO_FOREGROUND: u32 = 0xFFFFFF;

/// A committed pixel update
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Pixel {
    pub x: u16,
    pub y: u16,
    pub color: u32,
}

/// Device framebuffer
pub struct Framebuffer {
    model: Model,
    width: u16,
    height: u16,
    pending: HashMap<(u16, u16), u32>,
    screen: Vec<u32>,
}

impl Framebuffer {
    /// Create a new (black) framebuffer sized for the provided model
    pub fn new(model: Model) -> Self {
        let (width, height) = model.screen_size();

        Self {
            model,
            width,
            height,
            pending: HashMap::new(),
            screen: vec![0; width as usize * height as usize],
        }
    }

    /// Screen width in pixels
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Screen height in pixels
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Device model
    pub fn model(&self) -> Model {
        self.model
    }

    /// Draw a single point, points outside the screen are clipped
    pub fn draw_point(&mut self, x: i32, y: i32, color: u32) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }

        let color = match self.model.is_monochrome() && color & 0xFFFFFF != 0 {
            true => MONO_FOREGROUND,
            false => color & 0xFFFFFF,
        };

        self.pending.insert((x as u16, y as u16), color);
    }

    /// Fill a rectangle
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        // Clamp to the screen before iterating
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + w).min(self.width as i32);
        let y1 = (y + h).min(self.height as i32);

        for py in y0..y1 {
            for px in x0..x1 {
                self.draw_point(px, py, color);
            }
        }
    }

    /// Fetch the most recently drawn color at `(x, y)`, including uncommitted draws
    pub fn pixel(&self, x: u16, y: u16) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }

        match self.pending.get(&(x, y)) {
            Some(c) => Some(*c),
            None => Some(self.screen[self.index(x, y)]),
        }
    }

    /// Whether draws are waiting to be committed
    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Commit pending draws within the provided region
    pub fn update_region(&mut self, x: u16, y: u16, w: u16, h: u16) -> Vec<Pixel> {
        let x1 = x.saturating_add(w);
        let y1 = y.saturating_add(h);

        let keys: Vec<_> = self
            .pending
            .keys()
            .filter(|(px, py)| *px >= x && *px < x1 && *py >= y && *py < y1)
            .copied()
            .collect();

        let mut updated = Vec::with_capacity(keys.len());
        for (px, py) in keys {
            if let Some(color) = self.pending.remove(&(px, py)) {
                let i = self.index(px, py);
                self.screen[i] = color;
                updated.push(Pixel {
                    x: px,
                    y: py,
                    color,
                });
            }
        }

        updated.sort_by_key(|p| (p.y, p.x));
        updated
    }

    /// Commit every pending draw
    pub fn screen_update(&mut self) -> Vec<Pixel> {
        self.update_region(0, 0, self.width, self.height)
    }

    /// Render the committed screen to an image
    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let c = self.screen[self.index(x as u16, y as u16)];
            Rgb([(c >> 16) as u8, (c >> 8) as u8, c as u8])
        })
    }

    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }
}
