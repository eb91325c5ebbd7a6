// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device models and their display characteristics

use strum::{Display, EnumIter, EnumString, EnumVariantNames};

/// Graphics library used by the firmware
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Graphics {
    Bagl,
    Nbgl,
}

/// Emulated device model
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumString, EnumVariantNames, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Model {
    NanoS,
    NanoX,
    NanoSP,
    Blue,
    Stax,
    Flex,
}

impl Default for Model {
    fn default() -> Self {
        Model::NanoSP
    }
}

impl Model {
    /// Screen size in pixels `(width, height)`
    pub fn screen_size(&self) -> (u16, u16) {
        match self {
            Model::NanoS => (128, 32),
            Model::NanoX | Model::NanoSP => (128, 64),
            Model::Blue => (320, 480),
            Model::Stax => (400, 672),
            Model::Flex => (480, 600),
        }
    }

    /// Position of the device box within the rendered window
    pub fn box_position(&self) -> (u16, u16) {
        match self {
            Model::NanoS => (20, 13),
            Model::NanoX | Model::NanoSP => (5, 5),
            _ => (13, 13),
        }
    }

    /// Size of the device box border
    pub fn box_size(&self) -> (u16, u16) {
        match self {
            Model::NanoS => (100, 26),
            Model::NanoX | Model::NanoSP => (10, 10),
            _ => (26, 26),
        }
    }

    /// Maximum horizontal gap between glyphs of the same OCR text event
    pub fn max_blank_space(&self) -> u16 {
        match self {
            Model::NanoS | Model::NanoX | Model::NanoSP => 12,
            Model::Blue | Model::Stax => 24,
            Model::Flex => 26,
        }
    }

    /// Whether the display is a 1-bit (black / white) panel
    pub fn is_monochrome(&self) -> bool {
        matches!(self, Model::NanoS | Model::NanoX | Model::NanoSP)
    }

    /// Whether raw BAGL bitmaps should be fed to the OCR
    pub fn ocr_raw_status(&self) -> bool {
        matches!(self, Model::NanoX | Model::NanoSP)
    }

    /// Default graphics library shipped with this model
    pub fn default_graphics(&self) -> Graphics {
        match self {
            Model::Stax | Model::Flex => Graphics::Nbgl,
            _ => Graphics::Bagl,
        }
    }
}
