//! Shortcut routing order among live views.

use crate::edge::Edge;
use crate::registry::PanelId;
use crate::screens::{ScreenDirectory, ScreenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRank {
    pub panel: PanelId,
    pub screen: ScreenId,
    pub edge: Edge,
    pub preferred: bool,
}

/// Primary screen first, then the rest in enumeration order. Screens that
/// are gone sort last.
fn screen_rank(screens: &ScreenDirectory, screen: ScreenId) -> usize {
    if screens.is_primary(screen) {
        return 0;
    }
    screens
        .enumeration_index(screen)
        .map_or(usize::MAX, |idx| idx + 1)
}

/// Orders views by screen, then by edge (bottom, left, top, right). The
/// first view flagged preferred for shortcuts is moved to the front.
pub fn sort_by_priority(ranks: &[ViewRank], screens: &ScreenDirectory) -> Vec<PanelId> {
    let mut sorted = ranks.to_vec();
    sorted.sort_by_key(|rank| (screen_rank(screens, rank.screen), rank.edge.priority()));
    if let Some(pos) = sorted.iter().position(|rank| rank.preferred) {
        let preferred = sorted.remove(pos);
        sorted.insert(0, preferred);
    }
    sorted.into_iter().map(|rank| rank.panel).collect()
}
