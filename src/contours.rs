// Region boundaries for binary masks, traced with imageproc's border
// following. Regions are 8-connected; only outer borders are kept, so a
// region with holes still yields a single contour.

use image::{GrayImage, Luma};
use imageproc::contours::{self, BorderType};

use crate::postprocess::Mask;

#[derive(Debug, Clone, Default)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn mask_to_gray(mask: &Mask) -> GrayImage {
    GrayImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        Luma([if mask.is_set(x as usize, y as usize) { 255 } else { 0 }])
    })
}

/// Outer border of every connected foreground region, ordered by the raster
/// position of the border's first pixel.
pub fn find_contours(mask: &Mask) -> Vec<Contour> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    contours::find_contours::<i32>(&mask_to_gray(mask))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer)
        .map(|c| Contour {
            points: c.points.into_iter().map(|p| (p.x, p.y)).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> Mask {
        let height = rows.len();
        let width = rows[0].len();
        let data = rows
            .iter()
            .flat_map(|r| r.bytes().map(|b| if b == b'#' { 1u8 } else { 0u8 }))
            .collect();
        Mask::from_raw(width, height, data).unwrap()
    }

    fn bounds(contour: &Contour) -> (i32, i32, i32, i32) {
        let xs = contour.points.iter().map(|p| p.0);
        let ys = contour.points.iter().map(|p| p.1);
        (
            xs.clone().min().unwrap(),
            ys.clone().min().unwrap(),
            xs.max().unwrap(),
            ys.max().unwrap(),
        )
    }

    #[test]
    fn test_find_contours_simple() {
        let mask = mask_from_rows(&[
            "..........",
            "..######..",
            "..######..",
            "..######..",
            "..........",
        ]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounds(&contours[0]), (2, 1, 7, 3));
        // interior pixels are not on the border
        assert!(!contours[0].points.contains(&(4, 2)));
    }

    #[test]
    fn test_diagonal_pixels_form_one_region() {
        let mask = mask_from_rows(&["#...", ".#..", "..#.", "...."]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounds(&contours[0]), (0, 0, 2, 2));
    }

    #[test]
    fn test_hole_is_not_reported_separately() {
        let mask = mask_from_rows(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounds(&contours[0]), (1, 1, 5, 4));
    }

    #[test]
    fn test_region_touching_image_edge() {
        let mask = mask_from_rows(&["###", "###"]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 1);
        assert_eq!(bounds(&contours[0]), (0, 0, 2, 1));
    }

    #[test]
    fn test_regions_in_raster_order() {
        let mask = mask_from_rows(&["....##", "......", "##....", "##...."]);
        let contours = find_contours(&mask);
        assert_eq!(contours.len(), 2);
        assert_eq!(contours[0].points[0], (4, 0));
        assert_eq!(contours[1].points[0], (0, 2));
    }

    #[test]
    fn test_empty_mask_has_no_contours() {
        let mask = Mask::from_raw(8, 8, vec![0; 64]).unwrap();
        assert!(find_contours(&mask).is_empty());
    }
}
