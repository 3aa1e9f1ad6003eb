//! Visible-window tracking for virtualized pages
//!
//! The host reports intersection changes as pages scroll in and out of the
//! scroll container. The tracker keeps the set of intersecting pages, the
//! visible fraction of each, and the wanted window: the intersecting range
//! widened by a margin on both sides and clamped to the document.
//!
//! The wanted window is only recomputed when at least one page intersects,
//! so a transient empty report (for example mid-relayout) keeps the pages
//! that were already wanted.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

/// Default pages kept on each side of the intersecting range
pub const DEFAULT_PAGE_MARGIN: u32 = 2;

/// One intersection report for a page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageVisibility {
    /// Zero-based page index
    pub page: u32,

    /// Visible fraction of the page element in 0..=1; zero means not intersecting
    pub ratio: f32,
}

impl PageVisibility {
    /// Create a new report
    pub fn new(page: u32, ratio: f32) -> Self {
        Self { page, ratio }
    }

    /// Report that the page left the viewport
    pub fn hidden(page: u32) -> Self {
        Self { page, ratio: 0.0 }
    }
}

/// Widen the intersecting range by `margin` pages and clamp to the document
///
/// Returns `None` when nothing intersects or the document is empty.
pub fn wanted_window(
    intersecting: impl IntoIterator<Item = u32>,
    margin: u32,
    page_count: u32,
) -> Option<RangeInclusive<u32>> {
    if page_count == 0 {
        return None;
    }
    let mut bounds: Option<(u32, u32)> = None;
    for page in intersecting.into_iter().filter(|page| *page < page_count) {
        bounds = Some(match bounds {
            None => (page, page),
            Some((low, high)) => (low.min(page), high.max(page)),
        });
    }
    let (low, high) = bounds?;
    Some(low.saturating_sub(margin)..=high.saturating_add(margin).min(page_count - 1))
}

/// Order `pages` nearest-first around `focus`, lower index breaking ties
pub fn order_by_distance(pages: &mut [u32], focus: u32) {
    pages.sort_by_key(|page| (page.abs_diff(focus), *page));
}

/// Tracks intersecting pages and the wanted window around them
#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    /// Pages in the document
    page_count: u32,

    /// Pages kept on each side of the intersecting range
    margin: u32,

    /// Visible fraction of each intersecting page
    ratios: BTreeMap<u32, f32>,

    /// Last non-empty wanted window
    wanted: Option<RangeInclusive<u32>>,
}

impl VisibilityTracker {
    /// Create a new tracker for a document with `page_count` pages
    pub fn new(page_count: u32, margin: u32) -> Self {
        Self { page_count, margin, ratios: BTreeMap::new(), wanted: None }
    }

    /// Apply a batch of intersection reports
    ///
    /// Returns `true` when the wanted window changed.
    pub fn update(&mut self, reports: &[PageVisibility]) -> bool {
        for report in reports {
            if report.page >= self.page_count {
                log::debug!("ignoring visibility for page {} of {}", report.page, self.page_count);
                continue;
            }
            if report.ratio > 0.0 {
                self.ratios.insert(report.page, report.ratio.min(1.0));
            } else {
                self.ratios.remove(&report.page);
            }
        }

        match wanted_window(self.ratios.keys().copied(), self.margin, self.page_count) {
            Some(window) if self.wanted.as_ref() != Some(&window) => {
                log::trace!("wanted pages now {window:?}");
                self.wanted = Some(window);
                true
            }
            _ => false,
        }
    }

    /// Replace the document length, dropping reports past the end
    pub fn set_page_count(&mut self, page_count: u32) {
        self.page_count = page_count;
        self.ratios.retain(|page, _| *page < page_count);
        self.wanted = wanted_window(self.ratios.keys().copied(), self.margin, page_count);
    }

    /// Current wanted window
    pub fn wanted(&self) -> Option<RangeInclusive<u32>> {
        self.wanted.clone()
    }

    /// Whether `page` lies in the wanted window
    pub fn is_wanted(&self, page: u32) -> bool {
        self.wanted.as_ref().is_some_and(|window| window.contains(&page))
    }

    /// Intersecting page with the largest visible fraction
    pub fn most_visible(&self) -> Option<u32> {
        // Lowest index wins a tie
        self.ratios
            .iter()
            .fold(None, |best: Option<(u32, f32)>, (&page, &ratio)| match best {
                Some((_, best_ratio)) if best_ratio >= ratio => best,
                _ => Some((page, ratio)),
            })
            .map(|(page, _)| page)
    }

    /// Pages currently intersecting, ascending
    pub fn intersecting(&self) -> impl Iterator<Item = u32> + '_ {
        self.ratios.keys().copied()
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn margin(&self) -> u32 {
        self.margin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wanted_window_clamps() {
        assert_eq!(wanted_window([0], 2, 10), Some(0..=2));
        assert_eq!(wanted_window([4, 5], 2, 10), Some(2..=7));
        assert_eq!(wanted_window([9], 2, 10), Some(7..=9));
        assert_eq!(wanted_window([], 2, 10), None);
        assert_eq!(wanted_window([3], 2, 0), None);
        assert_eq!(wanted_window([12], 2, 10), None);
    }

    #[test]
    fn test_order_by_distance() {
        let mut pages = vec![3, 4, 5, 6, 7, 8, 9];
        order_by_distance(&mut pages, 6);
        assert_eq!(pages, vec![6, 5, 7, 4, 8, 3, 9]);
    }

    #[test]
    fn test_empty_update_keeps_previous_window() {
        let mut tracker = VisibilityTracker::new(40, DEFAULT_PAGE_MARGIN);
        assert!(tracker.update(&[PageVisibility::new(10, 0.6), PageVisibility::new(11, 0.4)]));
        assert_eq!(tracker.wanted(), Some(8..=13));

        assert!(!tracker.update(&[PageVisibility::hidden(10), PageVisibility::hidden(11)]));
        assert_eq!(tracker.wanted(), Some(8..=13));
        assert!(tracker.is_wanted(13));
        assert!(!tracker.is_wanted(14));
    }

    #[test]
    fn test_most_visible_and_distance_order() {
        let mut tracker = VisibilityTracker::new(40, 1);
        tracker.update(&[PageVisibility::new(20, 0.3), PageVisibility::new(21, 0.7)]);
        assert_eq!(tracker.most_visible(), Some(21));
        let mut wanted: Vec<u32> = tracker.wanted().expect("window").collect();
        order_by_distance(&mut wanted, 21);
        assert_eq!(wanted, vec![21, 20, 22, 19]);

        tracker.update(&[PageVisibility::new(20, 0.7)]);
        assert_eq!(tracker.most_visible(), Some(20));
    }

    #[test]
    fn test_out_of_range_reports_are_ignored() {
        let mut tracker = VisibilityTracker::new(5, 2);
        assert!(!tracker.update(&[PageVisibility::new(7, 1.0)]));
        assert_eq!(tracker.wanted(), None);

        tracker.update(&[PageVisibility::new(4, 1.0)]);
        tracker.set_page_count(3);
        assert_eq!(tracker.wanted(), None);
        assert_eq!(tracker.intersecting().count(), 0);
    }
}
