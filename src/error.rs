//! Error taxonomy for the placement and visibility engines.
//!
//! Nothing here is fatal. Placement errors tell the caller to leave a
//! definition dormant until the next topology change, and visibility errors
//! tell the caller a mutation was ignored.

use thiserror::Error;

use crate::edge::Edge;
use crate::registry::PanelId;
use crate::screens::ScreenId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error("panel {0} is not registered in this layout")]
    UnknownPanel(PanelId),
    #[error("panel {panel} can not be loaded: {reason}")]
    InvalidDefinition { panel: PanelId, reason: String },
    #[error("panel {0} is not a dock panel")]
    NotAPanel(PanelId),
    #[error("panel {0} already has a live view")]
    DuplicateView(PanelId),
    #[error("no primary screen is connected")]
    NoPrimaryScreen,
    #[error("panel {0} is pinned to no screen")]
    Unpinned(PanelId),
    #[error("screen {0} is not connected")]
    ScreenUnavailable(ScreenId),
    #[error("{edge} edge of the primary screen is held by on-primary panel {holder}")]
    EdgeHeldByPrimary { edge: Edge, holder: PanelId },
    #[error("{edge} edge of screen {screen} is occupied by panel {holder}")]
    EdgeOccupied {
        screen: ScreenId,
        edge: Edge,
        holder: PanelId,
    },
}

impl PlacementError {
    /// True for the errors that only mean "no free slot right now"; the
    /// definition may be instantiated by a later reconciliation pass.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoPrimaryScreen
                | Self::Unpinned(_)
                | Self::ScreenUnavailable(_)
                | Self::EdgeHeldByPrimary { .. }
                | Self::EdgeOccupied { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VisibilityError {
    #[error("hiding is blocked, ignoring update")]
    HidingBlocked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_separated_from_invalid_definitions() {
        assert!(PlacementError::ScreenUnavailable(ScreenId(3)).is_rejection());
        assert!(
            PlacementError::EdgeHeldByPrimary {
                edge: Edge::Bottom,
                holder: PanelId(1),
            }
            .is_rejection()
        );
        assert!(!PlacementError::DuplicateView(PanelId(1)).is_rejection());
        assert!(
            !PlacementError::InvalidDefinition {
                panel: PanelId(1),
                reason: "missing package".into(),
            }
            .is_rejection()
        );
    }

    #[test]
    fn messages_name_the_slot() {
        let err = PlacementError::EdgeOccupied {
            screen: ScreenId(2),
            edge: Edge::Left,
            holder: PanelId(7),
        };
        assert_eq!(
            err.to_string(),
            "left edge of screen 2 is occupied by panel 7"
        );
    }
}
