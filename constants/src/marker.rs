/// Radius of the sphere rendered for each inventory marker (metres).
pub const MARKER_RADIUS: f32 = 0.15;

/// Extra half-extent added around a marker when testing taps against it.
pub const MARKER_PICK_PADDING: f32 = 0.05;

/// Base colour of marker spheres (linear sRGB components).
pub const MARKER_COLOUR: [f32; 3] = [1.0, 0.35, 0.1];

/// Marker positions closer than this are treated as unchanged between refreshes.
pub const MARKER_POSITION_EPSILON: f32 = 1.0e-4;
