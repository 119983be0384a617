//! Scenes: the content the producer draws onto its master canvas.
//!
//! A [`Scene`] renders one frame at a time; content may change from frame to
//! frame. Scenes are created on the producer thread from a named factory in a
//! [`SceneRegistry`] when `INIT_STATE` arrives.

use crate::bitmap::{Bitmap, Rgb};
use crate::error::SceneError;
use std::collections::BTreeMap;
use std::f32::consts::TAU;

/// Content drawn by the producer.
pub trait Scene: Send {
    /// Name the scene was registered under.
    fn name(&self) -> &str;

    /// Draw frame number `frame` onto `canvas`, overwriting it entirely.
    fn render(&mut self, frame: u64, canvas: &mut Bitmap) -> Result<(), SceneError>;
}

/// Factory building a fresh scene instance.
pub type SceneFactory = Box<dyn Fn() -> Box<dyn Scene> + Send>;

/// Name of the scene used when a requested name is not registered.
pub const DEFAULT_SCENE: &str = "plasma";

/// Named scene factories available to the producer.
pub struct SceneRegistry {
    factories: BTreeMap<String, SceneFactory>,
    fallback: String,
}

impl SceneRegistry {
    /// Create a registry with no scenes and `fallback` as the fallback name.
    pub fn empty(fallback: impl Into<String>) -> Self {
        Self {
            factories: BTreeMap::new(),
            fallback: fallback.into(),
        }
    }

    /// Register (or replace) a scene factory.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Scene> + Send + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Scene> + Send + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Registered scene names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Name used when a requested scene is missing.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Instantiate the scene registered under `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Scene>> {
        self.factories.get(name).map(|factory| factory())
    }
}

impl Default for SceneRegistry {
    fn default() -> Self {
        Self::empty(DEFAULT_SCENE)
            .with("plasma", || Box::new(Plasma::default()))
            .with("checkerboard", || Box::new(Checkerboard::default()))
    }
}

impl std::fmt::Debug for SceneRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRegistry")
            .field("scenes", &self.factories.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback)
            .finish()
    }
}

/// Animated interference pattern.
#[derive(Debug, Clone)]
pub struct Plasma {
    /// Phase advance per frame, in radians.
    pub speed: f32,
}

impl Default for Plasma {
    fn default() -> Self {
        Self { speed: 0.05 }
    }
}

impl Scene for Plasma {
    fn name(&self) -> &str {
        "plasma"
    }

    #[allow(clippy::cast_precision_loss)]
    fn render(&mut self, frame: u64, canvas: &mut Bitmap) -> Result<(), SceneError> {
        let width = canvas.width().max(1) as f32;
        let height = canvas.height().max(1) as f32;
        let t = (frame as f32 * self.speed) % TAU;
        let row_len = canvas.width() as usize;

        if row_len == 0 {
            return Ok(());
        }
        for (y, row) in canvas.pixels_mut().chunks_mut(row_len).enumerate() {
            let v = y as f32 / height;
            for (x, pixel) in row.iter_mut().enumerate() {
                let u = x as f32 / width;
                let value = (u * 10.0 + t).sin()
                    + (v * 8.0 + t * 1.3).sin()
                    + ((u + v) * 6.0 + t * 0.7).sin();
                let phase = value * 0.5;
                *pixel = Rgb::from_unit(
                    0.5 + 0.5 * (phase * TAU * 0.25).sin(),
                    0.5 + 0.5 * (phase * TAU * 0.25 + 2.1).sin(),
                    0.5 + 0.5 * (phase * TAU * 0.25 + 4.2).sin(),
                );
            }
        }
        Ok(())
    }
}

/// Scrolling two-color checkerboard.
#[derive(Debug, Clone)]
pub struct Checkerboard {
    /// Squares across the canvas width.
    pub columns: u32,
    /// First square color.
    pub light: Rgb,
    /// Second square color.
    pub dark: Rgb,
}

impl Default for Checkerboard {
    fn default() -> Self {
        Self {
            columns: 16,
            light: Rgb::from_u32(0x00E0_E0E0),
            dark: Rgb::from_u32(0x0020_2830),
        }
    }
}

impl Scene for Checkerboard {
    fn name(&self) -> &str {
        "checkerboard"
    }

    fn render(&mut self, frame: u64, canvas: &mut Bitmap) -> Result<(), SceneError> {
        if self.columns == 0 {
            return Err(SceneError::render(self.name(), frame, "zero columns"));
        }
        let square = (canvas.width() / self.columns).max(1);
        let row_len = canvas.width() as usize;
        if row_len == 0 {
            return Ok(());
        }
        // One pixel of horizontal scroll per frame.
        let offset = frame % u64::from(square * 2);

        for (y, row) in canvas.pixels_mut().chunks_mut(row_len).enumerate() {
            let band = y as u64 / u64::from(square);
            for (x, pixel) in row.iter_mut().enumerate() {
                let column = (x as u64 + offset) / u64::from(square);
                *pixel = if (band + column) % 2 == 0 {
                    self.light
                } else {
                    self.dark
                };
            }
        }
        Ok(())
    }
}
