//! Tap zone classification
//!
//! Coarsens a tap position to one of nine named regions of a 3x3 grid laid
//! over the container the tap was captured in.

use crate::types::{ContainerSize, Position, Zone};

/// Zone labels by row (top, middle, bottom) then column (left, center, right)
const ZONE_GRID: [[Zone; 3]; 3] = [
    [Zone::TopLeft, Zone::TopCenter, Zone::TopRight],
    [Zone::MiddleLeft, Zone::Center, Zone::MiddleRight],
    [Zone::BottomLeft, Zone::BottomCenter, Zone::BottomRight],
];

/// Classify a position inside a container of known size
pub fn classify_zone(position: Position, container: ContainerSize) -> Zone {
    let column = band_index(position.x, container.width());
    let row = band_index(position.y, container.height());
    ZONE_GRID[row][column]
}

/// Classify a position, falling back to `Zone::Unknown` when the container
/// size could not be measured
pub fn zone_for(position: Position, container: Option<ContainerSize>) -> Zone {
    match container {
        Some(size) if position.x.is_finite() && position.y.is_finite() => {
            classify_zone(position, size)
        }
        _ => Zone::Unknown,
    }
}

/// floor(value / (extent / 3)) clamped to [0, 2]
fn band_index(value: f64, extent: f64) -> usize {
    let band = (value / (extent / 3.0)).floor();
    band.clamp(0.0, 2.0) as usize
}
