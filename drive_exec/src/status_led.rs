//! # Status LED
//!
//! The board's RGB LED shows how far startup has got. Each colour component is a Linux LED class
//! device with a `brightness` attribute.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

pub trait StatusLed {
    fn set_colour(&mut self, colour: Colour) -> Result<(), LedError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedParams {
    pub red_dir: PathBuf,

    pub green_dir: PathBuf,

    pub blue_dir: PathBuf,

    /// Write 0 to light a component rather than 1.
    pub active_low: bool,
}

/// An RGB LED made of three sysfs LED class devices.
pub struct SysfsRgbLed {
    params: LedParams,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colour {
    Black,
    Red,
    Green,
    Blue,
    Cyan,
    Magenta,
    Yellow,
    White,
}

#[derive(Debug, thiserror::Error)]
pub enum LedError {
    #[error("No LED at {0:?}")]
    NotFound(PathBuf),

    #[error("Could not write the brightness of {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Colour {
    /// Which of the (red, green, blue) components are lit.
    pub fn components(self) -> (bool, bool, bool) {
        match self {
            Colour::Black => (false, false, false),
            Colour::Red => (true, false, false),
            Colour::Green => (false, true, false),
            Colour::Blue => (false, false, true),
            Colour::Cyan => (false, true, true),
            Colour::Magenta => (true, false, true),
            Colour::Yellow => (true, true, false),
            Colour::White => (true, true, true),
        }
    }
}

impl Default for LedParams {
    fn default() -> Self {
        Self {
            red_dir: PathBuf::from("/sys/class/leds/rgb_led0"),
            green_dir: PathBuf::from("/sys/class/leds/rgb_led2"),
            blue_dir: PathBuf::from("/sys/class/leds/rgb_led1"),
            active_low: false,
        }
    }
}

impl SysfsRgbLed {
    /// Open the LED, failing if any component is missing.
    pub fn new(params: &LedParams) -> Result<Self, LedError> {
        for dir in [&params.red_dir, &params.green_dir, &params.blue_dir].iter() {
            if !dir.join("brightness").exists() {
                return Err(LedError::NotFound(dir.to_path_buf()));
            }
        }

        Ok(Self {
            params: params.clone(),
        })
    }

    fn write_component(&self, dir: &Path, lit: bool) -> Result<(), LedError> {
        let path = dir.join("brightness");
        let value = if lit != self.params.active_low { "1" } else { "0" };

        fs::write(&path, value).map_err(|e| LedError::WriteError { path, source: e })
    }
}

impl StatusLed for SysfsRgbLed {
    fn set_colour(&mut self, colour: Colour) -> Result<(), LedError> {
        let (r, g, b) = colour.components();

        self.write_component(&self.params.red_dir, r)?;
        self.write_component(&self.params.green_dir, g)?;
        self.write_component(&self.params.blue_dir, b)
    }
}
