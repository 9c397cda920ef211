//! Shared constants for the page pipeline
//!
//! This module centralizes unit factors and defaults used by the
//! transforms, the safety gate, and the document codec.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Points per centimeter
pub const POINTS_PER_CM: f32 = 72.0 / 2.54;

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

/// Convert inches to points
#[inline]
pub fn in_to_pt(inches: f32) -> f32 {
    inches * POINTS_PER_INCH
}

/// Convert centimeters to points
#[inline]
pub fn cm_to_pt(cm: f32) -> f32 {
    cm * POINTS_PER_CM
}

// =============================================================================
// Default Page Dimensions
// =============================================================================

/// Default page width in points (US Letter: 8.5" × 11")
pub const DEFAULT_PAGE_WIDTH_PT: f32 = 612.0;

/// Default page height in points (US Letter)
pub const DEFAULT_PAGE_HEIGHT_PT: f32 = 792.0;

/// Default page dimensions as tuple (width, height)
pub const DEFAULT_PAGE_DIMENSIONS: (f32, f32) = (DEFAULT_PAGE_WIDTH_PT, DEFAULT_PAGE_HEIGHT_PT);

// =============================================================================
// Stamp
// =============================================================================

/// Default stamp font size (points)
pub const STAMP_FONT_SIZE: f32 = 10.0;

/// Default stamp font
pub const STAMP_FONT_NAME: &str = "Helvetica";

/// Default margin between a preset stamp position and the page edge (points)
pub const STAMP_MARGIN: f32 = 10.0;

/// Approximate character width ratio used to estimate stamp text width
pub const HELVETICA_CHAR_WIDTH_RATIO: f32 = 0.5;

/// Default strftime format for the `{datetime}` placeholder
pub const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed format for the `{date}` placeholder
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Fixed format for the `{time}` placeholder
pub const TIME_FORMAT: &str = "%H:%M:%S";

// =============================================================================
// Render
// =============================================================================

/// Default rasterization resolution
pub const DEFAULT_RENDER_DPI: u32 = 150;

/// Resolution used when rasterizing a page for orientation detection
pub const OCR_RENDER_DPI: u32 = 150;

// =============================================================================
// Geometry
// =============================================================================

/// Tolerance used when comparing point coordinates
pub const GEOMETRY_EPSILON: f32 = 1e-3;
