//! Heuristics that pick one candidate region out of many.
//!
//! Box photographs follow a house layout: the cores form the largest region,
//! the scale bar has more regularly spaced white ticks than anything else, and
//! the depth labels are the longest fully numeric row of text. Other layouts
//! can override any of these choices without touching the pipeline.

use std::fmt;

use crate::contours::Contour;
use crate::ocr::OcrCluster;

/// Index of the first maximum, `None` for an empty input.
pub(crate) fn argmax_first<T: PartialOrd + Copy>(
    values: impl IntoIterator<Item = T>,
) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (idx, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if !(v > b) => {}
            _ => best = Some((idx, v)),
        }
    }
    best.map(|(idx, _)| idx)
}

pub trait RegionSelector: fmt::Debug + Send + Sync {
    /// Contour outlining the core boxes. Default: largest area.
    fn select_core_region(&self, contours: &[Contour]) -> Option<usize> {
        argmax_first(contours.iter().map(Contour::area))
    }

    /// Mean-shift cluster made of the scale-bar white ticks. Default: most members.
    fn select_tick_cluster(&self, cluster_sizes: &[usize]) -> Option<usize> {
        argmax_first(cluster_sizes.iter().copied())
    }

    /// Text row carrying the depth labels. Default: among rows whose every
    /// token is a number, the one with the most tokens.
    fn select_label_row(&self, rows: &[OcrCluster]) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for (idx, row) in rows.iter().enumerate() {
            if row.is_empty() || !row.has_only_numbers() {
                continue;
            }
            match best {
                Some((_, count)) if row.len() <= count => {}
                _ => best = Some((idx, row.len())),
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// The stock heuristics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LargestRegionSelector;

impl RegionSelector for LargestRegionSelector {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrToken;

    fn row(texts: &[&str]) -> OcrCluster {
        OcrCluster::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| OcrToken::new(i as i32 * 100, 10, 40, 12, *t))
                .collect(),
        )
    }

    #[test]
    fn test_argmax_first_on_ties() {
        assert_eq!(argmax_first([3, 7, 7, 1]), Some(1));
        assert_eq!(argmax_first(Vec::<usize>::new()), None);
    }

    #[test]
    fn test_core_region_is_largest_contour() {
        let small = Contour::new(vec![(0, 0), (4, 0), (4, 4), (0, 4)]);
        let big = Contour::new(vec![(10, 10), (40, 10), (40, 30), (10, 30)]);
        let selector = LargestRegionSelector;
        assert_eq!(selector.select_core_region(&[small, big]), Some(1));
        assert_eq!(selector.select_core_region(&[]), None);
    }

    #[test]
    fn test_label_row_skips_non_numeric_rows() {
        let rows = vec![
            row(&["T-01", "cx", "3", "4"]),
            row(&["100,00", "100,50"]),
            row(&["7", "8"]),
        ];
        assert_eq!(LargestRegionSelector.select_label_row(&rows), Some(1));

        let rows = vec![row(&["T", "x"])];
        assert_eq!(LargestRegionSelector.select_label_row(&rows), None);
    }
}
