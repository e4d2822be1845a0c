//! # landchange Colormap
//!
//! Color mapping and PNG rendering of change overlays.
//!
//! Two schemes are provided: the 10-color categorical `Tab10` palette used
//! for class maps, and the continuous `Ndvi` ramp used for index deltas.
//! [`raster_to_rgba`] turns a `Raster<T>` into an RGBA buffer and
//! [`render_png`] writes it straight to disk.
//!
//! ## Usage
//!
//! ```ignore
//! use landchange_colormap::{render_png, ColorScheme, ColormapParams};
//!
//! let params = ColormapParams::with_range(ColorScheme::Tab10, 0.0, 9.0);
//! render_png(&class_map, &params, "outputs/job/class_map.png")?;
//! ```

mod png;
mod render;
mod scheme;

pub use png::{render_png, write_png, RenderError};
pub use render::{raster_to_rgba, ColormapParams};
pub use scheme::{evaluate, ColorScheme, ColorStop, Rgb};
