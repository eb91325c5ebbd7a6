// Copyright (c) 2022-2023 The MobileCoin Foundation

//! On-screen text recognition
//!
//! Characters are either stamped by the firmware or recovered by matching
//! drawn 1-bpp bitmaps against the built-in fonts. Characters drawn next to
//! each other on the same line are merged into a single [`TextEvent`].

use serde::Serialize;

use crate::{fonts, Model};

/// Text recognised on screen
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct TextEvent {
    pub text: String,
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
    /// Set on the first event following a full-screen clear
    pub clear: bool,
}

impl TextEvent {
    fn right(&self) -> i32 {
        self.x as i32 + self.w as i32
    }

    fn bottom(&self) -> i32 {
        self.y as i32 + self.h as i32
    }
}

/// OCR state, accumulating events between screen refreshes
#[derive(Debug)]
pub struct Ocr {
    max_blank_space: u16,
    events: Vec<TextEvent>,
    cleared: bool,
}

impl Ocr {
    /// Create a new OCR instance for the provided model
    pub fn new(model: Model) -> Self {
        Self {
            max_blank_space: model.max_blank_space(),
            events: vec![],
            cleared: false,
        }
    }

    /// Add a recognised character, merging with the previous event when
    /// it sits on the same line within `max_blank_space` pixels
    pub fn add_char(&mut self, c: char, x: u16, y: u16, w: u16, h: u16) {
        if let Some(ev) = self.events.last_mut() {
            let gap = x as i32 - ev.right();
            let overlaps = (y as i32) < ev.bottom() && (ev.y as i32) < y as i32 + h as i32;

            if x >= ev.x && gap < self.max_blank_space as i32 && overlaps {
                let right = ev.right().max(x as i32 + w as i32);
                let top = ev.y.min(y);
                let bottom = ev.bottom().max(y as i32 + h as i32);

                ev.text.push(c);
                ev.w = (right - ev.x as i32) as u16;
                ev.y = top;
                ev.h = (bottom - top as i32) as u16;
                return;
            }
        }

        self.add_event(TextEvent {
            text: c.to_string(),
            x,
            y,
            w,
            h,
            clear: false,
        });
    }

    /// Add a complete text event (from a BAGL label)
    pub fn add_event(&mut self, mut ev: TextEvent) {
        if self.cleared {
            ev.clear = true;
            self.cleared = false;
        }
        self.events.push(ev);
    }

    /// Match a row-major 1-bpp bitmap against the built-in fonts,
    /// adding the recognised character
    pub fn analyze_bitmap(&mut self, bitmap: &[u8], x: u16, y: u16, w: u16, h: u16) -> bool {
        match recognise(bitmap, w, h) {
            Some(c) => {
                self.add_char(c, x, y, w, h);
                true
            }
            None => false,
        }
    }

    /// Note a full-screen clear, flagging the next event
    pub fn clear_screen(&mut self) {
        self.cleared = true;
    }

    /// Drain the accumulated events
    pub fn get_events(&mut self) -> Vec<TextEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Find the character whose glyph starts with the provided bitmap
///
/// Trailing zero bytes are ignored, an empty bitmap is a space. Where more
/// than one glyph matches the greatest character wins.
pub fn recognise(bitmap: &[u8], w: u16, h: u16) -> Option<char> {
    let end = bitmap.iter().rposition(|b| *b != 0).map(|i| i + 1).unwrap_or(0);
    let bitmap = &bitmap[..end];

    if bitmap.is_empty() {
        return Some(' ');
    }

    fonts::fonts()
        .flat_map(|f| f.glyphs.iter())
        .filter(|(_, g)| g.width == w && g.height == h && g.bitmap.starts_with(bitmap))
        .map(|(c, _)| *c)
        .max()
}
