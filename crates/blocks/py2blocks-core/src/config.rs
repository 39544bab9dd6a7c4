//! Editor configuration handed to a [`Workspace`](crate::Workspace) at construction.

use serde::{Deserialize, Serialize};

use crate::duplicate::DuplicateOnDragRules;
use crate::error::{EditorError, EditorResult};
use crate::events::DEFAULT_EVENT_CAPACITY;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridOptions {
    pub spacing: f64,
    /// Snap top-level blocks to the grid when a drag ends.
    pub snap: bool,
}

/// Drag radii, tie-break margin, grid and duplication policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Search radius while no candidate is held.
    pub snap_radius: f64,
    /// Tighter radius once a candidate is held during the drag.
    pub connecting_snap_radius: f64,
    /// How much closer a new candidate must be to displace the held one.
    pub current_connection_preference: f64,
    pub grid: Option<GridOptions>,
    pub read_only: bool,
    /// Offset applied to orphaned blocks that cannot be re-attached.
    pub bump_delta: f64,
    pub duplicate_on_drag: DuplicateOnDragRules,
    /// Shadow types that may be dragged out of their parent. `None` allows all.
    pub draggable_shadows: Option<Vec<String>>,
    /// Undrained events kept before the oldest are dropped.
    pub event_log_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_radius: 28.0,
            connecting_snap_radius: 24.0,
            current_connection_preference: 8.0,
            grid: None,
            read_only: false,
            bump_delta: 25.0,
            duplicate_on_drag: DuplicateOnDragRules::default(),
            draggable_shadows: None,
            event_log_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EditorConfig {
    pub fn validate(&self) -> EditorResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.snap_radius) || !positive(self.connecting_snap_radius) {
            return Err(EditorError::InvalidConfig(format!(
                "snap radii must be positive and finite (snap={}, connecting={})",
                self.snap_radius, self.connecting_snap_radius
            )));
        }
        if self.connecting_snap_radius > self.snap_radius {
            return Err(EditorError::InvalidConfig(format!(
                "connecting_snap_radius {} exceeds snap_radius {}",
                self.connecting_snap_radius, self.snap_radius
            )));
        }
        if !self.current_connection_preference.is_finite() || self.current_connection_preference < 0.0
        {
            return Err(EditorError::InvalidConfig(format!(
                "current_connection_preference must be >= 0 (got {})",
                self.current_connection_preference
            )));
        }
        if self.event_log_capacity == 0 {
            return Err(EditorError::InvalidConfig(
                "event_log_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(grid) = self.grid {
            if grid.snap && !positive(grid.spacing) {
                return Err(EditorError::InvalidConfig(format!(
                    "grid spacing must be positive when snapping (got {})",
                    grid.spacing
                )));
            }
        }
        Ok(())
    }

    pub fn is_draggable_shadow(&self, type_name: &str) -> bool {
        self.draggable_shadows
            .as_ref()
            .map_or(true, |allowed| allowed.iter().any(|t| t == type_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid_and_tightens_radius() {
        let cfg = EditorConfig::default();
        cfg.validate().expect("default config valid");
        assert!(cfg.connecting_snap_radius < cfg.snap_radius);
    }

    #[test]
    fn rejects_wider_connecting_radius() {
        let cfg = EditorConfig {
            connecting_snap_radius: 40.0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EditorError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_zero_grid_spacing_when_snapping() {
        let cfg = EditorConfig {
            grid: Some(GridOptions {
                spacing: 0.0,
                snap: true,
            }),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_empty_event_log() {
        let cfg = EditorConfig {
            event_log_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(EditorError::InvalidConfig(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EditorConfig =
            serde_json::from_str(r#"{ "snap_radius": 40, "draggable_shadows": [] }"#)
                .expect("parse");
        assert_eq!(cfg.snap_radius, 40.0);
        assert_eq!(cfg.connecting_snap_radius, 24.0);
        assert!(!cfg.is_draggable_shadow("int"));
        assert!(EditorConfig::default().is_draggable_shadow("int"));
    }
}
