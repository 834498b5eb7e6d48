//! Canonical dataset model for labelpack.
//!
//! This module defines the format-agnostic representation of an annotation
//! workspace. It is the central "hub" that every format conversion passes
//! through: parsers build it from archive contents, exporters render it
//! back out, and the merger reconciles two of them.
//!
//! # Design Principles
//!
//! 1. **Type Safety**: newtype ids and coordinate-space marker types stop
//!    common mixups (file vs. annotation ids, pixel vs. normalized boxes)
//!    at compile time.
//!
//! 2. **Canonical Format**: boxes are always pixel-space XYWH with a
//!    top-left origin; the center-based and normalized forms exist only at
//!    the codec boundary.
//!
//! 3. **Permissive Construction**: out-of-bounds or degenerate boxes can be
//!    represented, so that the bounds filter and validator can report them
//!    instead of parsers panicking.

mod bbox;
mod coord;
mod ids;
mod model;
mod palette;
mod space;

// Re-export core types for convenient access
pub use bbox::BBoxXYWH;
pub use coord::Coord;
pub use ids::{AnnotationId, CategoryId, FileId};
pub use model::{base_name, Annotation, AnnotationMap, Category, Dataset, FileContent, ImageFile};
pub use palette::{color_for_index, PALETTE};
pub use space::{Normalized, Pixel};
