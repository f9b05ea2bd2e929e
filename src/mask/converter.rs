//! Turns parsed PAGE annotations into ground-truth masks and records.

use image::{GrayImage, Luma, RgbImage};
use imageproc::contours::find_contours;
use tracing::warn;

use crate::config::TrainingConfig;
use crate::core::{validate_image_dimensions, LayprepError, LayprepResult};
use crate::mask::draw;
use crate::mask::instances::{Instance, SegmentsInfo};
use crate::page::{GroundTruthMode, PageAnnotation, Point, RegionSet};

/// Absolute `[min_x, min_y, max_x, max_y]` box encoding.
const BBOX_XYXY_ABS: u32 = 0;

/// Rasterizes page annotations according to a ground-truth mode.
///
/// Semantic masks exist for every mode; instance and panoptic output only
/// for the modes where individual objects are meaningful (regions, text
/// lines, baselines).
#[derive(Debug, Clone)]
pub struct GroundTruthBuilder {
    regions: RegionSet,
    square_lines: bool,
}

impl GroundTruthBuilder {
    pub fn new(regions: RegionSet, square_lines: bool) -> Self {
        Self {
            regions,
            square_lines,
        }
    }

    /// Builds the rasterizer from a training configuration.
    pub fn from_config(config: &TrainingConfig) -> LayprepResult<Self> {
        Ok(Self::new(
            RegionSet::from_config(config)?,
            config.preprocess.baseline.square_lines,
        ))
    }

    /// The configured ground-truth mode.
    pub fn mode(&self) -> GroundTruthMode {
        self.regions.mode
    }

    /// The region-name to class-id mapping in use.
    pub fn regions(&self) -> &RegionSet {
        &self.regions
    }

    /// Rasterizes the semantic segmentation mask at `out_size` (height,
    /// width). Page coordinates are scaled from the annotated page size.
    pub fn build_sem_seg(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> LayprepResult<GrayImage> {
        check_sizes(page, out_size)?;
        let sem_seg = match self.regions.mode {
            GroundTruthMode::Region => self.sem_seg_region(page, out_size),
            GroundTruthMode::TextLine => self.sem_seg_text_line(page, out_size),
            GroundTruthMode::Baseline => self.sem_seg_baseline(page, out_size),
            GroundTruthMode::ClassBaseline => self.sem_seg_class_baseline(page, out_size),
            GroundTruthMode::TopBottom => self.sem_seg_top_bottom(page, out_size),
            GroundTruthMode::Start => self.sem_seg_endpoint(page, out_size, Endpoint::Start),
            GroundTruthMode::End => self.sem_seg_endpoint(page, out_size, Endpoint::End),
            GroundTruthMode::Separator => self.sem_seg_endpoint(page, out_size, Endpoint::Both),
            GroundTruthMode::BaselineSeparator => self.sem_seg_baseline_separator(page, out_size),
        };
        if sem_seg.pixels().all(|p| p[0] == 0) {
            warn!(
                "{} produced an empty {} semantic mask",
                page.source.display(),
                self.regions.mode
            );
        }
        Ok(sem_seg)
    }

    /// Builds the instance records, or `None` when the mode has no
    /// instance interpretation.
    pub fn build_instances(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> LayprepResult<Option<Vec<Instance>>> {
        if !self.regions.mode.supports_instances() {
            return Ok(None);
        }
        check_sizes(page, out_size)?;
        let instances = match self.regions.mode {
            GroundTruthMode::Region => self.instances_region(page, out_size),
            GroundTruthMode::TextLine => self.instances_text_line(page, out_size),
            GroundTruthMode::Baseline => self.instances_baseline(page, out_size)?,
            _ => unreachable!("gated by supports_instances"),
        };
        if instances.is_empty() {
            warn!(
                "{} produced no {} instances",
                page.source.display(),
                self.regions.mode
            );
        }
        Ok(Some(instances))
    }

    /// Builds the panoptic mask and its segments info, or `None` when the
    /// mode has no panoptic interpretation.
    pub fn build_pano(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> LayprepResult<Option<(RgbImage, Vec<SegmentsInfo>)>> {
        if !self.regions.mode.supports_pano() {
            return Ok(None);
        }
        check_sizes(page, out_size)?;
        let (pano, segments) = match self.regions.mode {
            GroundTruthMode::Region => self.pano_region(page, out_size),
            GroundTruthMode::TextLine => self.pano_text_line(page, out_size),
            GroundTruthMode::Baseline => self.pano_baseline(page, out_size),
            _ => unreachable!("gated by supports_pano"),
        };
        if pano.pixels().all(|p| p.0 == [0, 0, 0]) {
            warn!(
                "{} produced an empty {} panoptic mask",
                page.source.display(),
                self.regions.mode
            );
        }
        Ok(Some((pano, segments)))
    }

    fn sem_seg_region(&self, page: &PageAnnotation, out_size: (u32, u32)) -> GrayImage {
        let mut sem_seg = gray(out_size);
        for (class, coords) in page.iter_class_coords(&self.regions) {
            let coords = scale_coords(coords, out_size, page.size());
            draw::fill_polygon(&mut sem_seg, &coords, Luma([class]));
        }
        sem_seg
    }

    fn sem_seg_text_line(&self, page: &PageAnnotation, out_size: (u32, u32)) -> GrayImage {
        let mut sem_seg = gray(out_size);
        for coords in page.iter_text_line_coords() {
            let coords = scale_coords(coords, out_size, page.size());
            draw::fill_polygon(&mut sem_seg, &coords, Luma([1]));
        }
        sem_seg
    }

    fn sem_seg_baseline(&self, page: &PageAnnotation, out_size: (u32, u32)) -> GrayImage {
        let mut sem_seg = gray(out_size);
        let mut total_overlap = false;
        for coords in page.iter_baseline_coords() {
            let coords = scale_coords(coords, out_size, page.size());
            let stroke = self.stroke(out_size, &coords);
            total_overlap |= draw::compose_stroke(&mut sem_seg, &stroke, 1);
        }
        self.warn_overlap(page, total_overlap);
        sem_seg
    }

    fn sem_seg_class_baseline(&self, page: &PageAnnotation, out_size: (u32, u32)) -> GrayImage {
        let mut sem_seg = gray(out_size);
        let mut total_overlap = false;
        for (class, coords) in page.iter_class_baseline_coords(&self.regions) {
            let coords = scale_coords(coords, out_size, page.size());
            let stroke = self.stroke(out_size, &coords);
            total_overlap |= draw::compose_stroke(&mut sem_seg, &stroke, class);
        }
        self.warn_overlap(page, total_overlap);
        sem_seg
    }

    fn sem_seg_top_bottom(&self, page: &PageAnnotation, out_size: (u32, u32)) -> GrayImage {
        const TOP: u8 = 1;
        const BOTTOM: u8 = 2;
        let mut sem_seg = gray(out_size);
        for coords in page.iter_baseline_coords() {
            let coords = scale_coords(coords, out_size, page.size());
            let stroke = self.stroke(out_size, &coords);
            for (x, y, pixel) in stroke.enumerate_pixels() {
                if pixel[0] != 0 {
                    let value = if draw::is_above(&coords, x, y) { TOP } else { BOTTOM };
                    sem_seg.put_pixel(x, y, Luma([value]));
                }
            }
        }
        sem_seg
    }

    fn sem_seg_endpoint(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
        which: Endpoint,
    ) -> GrayImage {
        let mut sem_seg = gray(out_size);
        let radius = self.regions.line_width as i32;
        for coords in page.iter_baseline_coords() {
            let coords = scale_coords(coords, out_size, page.size());
            let (Some(first), Some(last)) = (coords.first(), coords.last()) else {
                continue;
            };
            if matches!(which, Endpoint::Start | Endpoint::Both) {
                draw::draw_disc(&mut sem_seg, *first, radius, Luma([1]));
            }
            if matches!(which, Endpoint::End | Endpoint::Both) {
                draw::draw_disc(&mut sem_seg, *last, radius, Luma([1]));
            }
        }
        sem_seg
    }

    fn sem_seg_baseline_separator(&self, page: &PageAnnotation, out_size: (u32, u32)) -> GrayImage {
        const BASELINE: u8 = 1;
        const SEPARATOR: u8 = 2;
        let mut sem_seg = gray(out_size);
        let radius = self.regions.line_width as i32;
        let mut total_overlap = false;
        for coords in page.iter_baseline_coords() {
            let coords = scale_coords(coords, out_size, page.size());
            let stroke = self.stroke(out_size, &coords);
            total_overlap |= draw::compose_stroke(&mut sem_seg, &stroke, BASELINE);
            let (Some(first), Some(last)) = (coords.first(), coords.last()) else {
                continue;
            };
            draw::draw_disc(&mut sem_seg, *first, radius, Luma([SEPARATOR]));
            draw::draw_disc(&mut sem_seg, *last, radius, Luma([SEPARATOR]));
        }
        self.warn_overlap(page, total_overlap);
        sem_seg
    }

    fn instances_region(&self, page: &PageAnnotation, out_size: (u32, u32)) -> Vec<Instance> {
        page.iter_class_coords(&self.regions)
            .map(|(class, coords)| {
                let coords = scale_coords(coords, out_size, page.size());
                polygon_instance(&coords, u32::from(class) - 1)
            })
            .collect()
    }

    fn instances_text_line(&self, page: &PageAnnotation, out_size: (u32, u32)) -> Vec<Instance> {
        page.iter_text_line_coords()
            .map(|coords| {
                let coords = scale_coords(coords, out_size, page.size());
                polygon_instance(&coords, 0)
            })
            .collect()
    }

    /// Baseline instances are traced from the thickened stroke, so the
    /// segmentation polygons follow the painted outline rather than the
    /// annotated centerline.
    fn instances_baseline(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> LayprepResult<Vec<Instance>> {
        let mut instances = Vec::new();
        for coords in page.iter_baseline_coords() {
            let coords = scale_coords(coords, out_size, page.size());
            let stroke = self.stroke(out_size, &coords);
            let contours = find_contours::<i32>(&stroke);
            if contours.is_empty() {
                return Err(LayprepError::invalid_input(format!(
                    "baseline in {} rasterized to no contours",
                    page.source.display()
                )));
            }
            // More than one contour is unusual but valid, keep them all.
            let mut segmentation = Vec::with_capacity(contours.len());
            let mut all_points = Vec::new();
            for contour in &contours {
                let mut flattened = Vec::with_capacity(contour.points.len() * 2);
                for point in &contour.points {
                    flattened.push(point.x as f32);
                    flattened.push(point.y as f32);
                    all_points.push(Point::new(point.x as f32, point.y as f32));
                }
                segmentation.push(flattened);
            }
            instances.push(Instance {
                bbox: bounding_box(&all_points),
                bbox_mode: BBOX_XYXY_ABS,
                category_id: 0,
                segmentation,
                keypoints: vec![],
                iscrowd: false,
            });
        }
        Ok(instances)
    }

    fn pano_region(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> (RgbImage, Vec<SegmentsInfo>) {
        let mut pano = rgb(out_size);
        let mut segments = Vec::new();
        for (id, (class, coords)) in (1u32..).zip(page.iter_class_coords(&self.regions)) {
            let coords = scale_coords(coords, out_size, page.size());
            draw::fill_polygon(&mut pano, &coords, draw::id_to_rgb(id));
            segments.push(SegmentsInfo {
                id,
                category_id: u32::from(class) - 1,
                iscrowd: false,
            });
        }
        (pano, segments)
    }

    fn pano_text_line(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> (RgbImage, Vec<SegmentsInfo>) {
        let mut pano = rgb(out_size);
        let mut segments = Vec::new();
        for (id, coords) in (1u32..).zip(page.iter_text_line_coords()) {
            let coords = scale_coords(coords, out_size, page.size());
            draw::fill_polygon(&mut pano, &coords, draw::id_to_rgb(id));
            segments.push(SegmentsInfo {
                id,
                category_id: 0,
                iscrowd: false,
            });
        }
        (pano, segments)
    }

    fn pano_baseline(
        &self,
        page: &PageAnnotation,
        out_size: (u32, u32),
    ) -> (RgbImage, Vec<SegmentsInfo>) {
        let mut pano = rgb(out_size);
        let mut segments = Vec::new();
        let mut total_overlap = false;
        for (id, coords) in (1u32..).zip(page.iter_baseline_coords()) {
            let coords = scale_coords(coords, out_size, page.size());
            let stroke = self.stroke(out_size, &coords);
            total_overlap |= draw::compose_stroke_rgb(&mut pano, &stroke, draw::id_to_rgb(id));
            segments.push(SegmentsInfo {
                id,
                category_id: 0,
                iscrowd: false,
            });
        }
        self.warn_overlap(page, total_overlap);
        (pano, segments)
    }

    fn stroke(&self, out_size: (u32, u32), coords: &[Point]) -> GrayImage {
        draw::stroke_polyline(out_size, coords, self.regions.line_width, self.square_lines)
    }

    fn warn_overlap(&self, page: &PageAnnotation, overlap: bool) {
        if overlap {
            warn!(
                "{} contains overlapping {} lines",
                page.source.display(),
                self.regions.mode
            );
        }
    }
}

enum Endpoint {
    Start,
    End,
    Both,
}

fn gray((height, width): (u32, u32)) -> GrayImage {
    GrayImage::new(width, height)
}

fn rgb((height, width): (u32, u32)) -> RgbImage {
    RgbImage::new(width, height)
}

fn check_sizes(page: &PageAnnotation, out_size: (u32, u32)) -> LayprepResult<()> {
    let source = page.source.display().to_string();
    let size = page.size();
    validate_image_dimensions(&source, size.1, size.0)?;
    validate_image_dimensions(&source, out_size.1, out_size.0)?;
    Ok(())
}

/// Scales page coordinates onto the output raster. Both sizes are
/// (height, width); x follows width, y follows height.
fn scale_coords(coords: &[Point], out_size: (u32, u32), size: (u32, u32)) -> Vec<Point> {
    let scale_x = out_size.1 as f32 / size.1 as f32;
    let scale_y = out_size.0 as f32 / size.0 as f32;
    coords
        .iter()
        .map(|p| Point::new(p.x * scale_x, p.y * scale_y))
        .collect()
}

fn bounding_box(coords: &[Point]) -> [f32; 4] {
    let mut bbox = [f32::INFINITY, f32::INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY];
    for point in coords {
        bbox[0] = bbox[0].min(point.x);
        bbox[1] = bbox[1].min(point.y);
        bbox[2] = bbox[2].max(point.x);
        bbox[3] = bbox[3].max(point.y);
    }
    bbox
}

fn polygon_instance(coords: &[Point], category_id: u32) -> Instance {
    let flattened = coords.iter().flat_map(|p| [p.x, p.y]).collect();
    Instance {
        bbox: bounding_box(coords),
        bbox_mode: BBOX_XYXY_ABS,
        category_id,
        segmentation: vec![flattened],
        keypoints: vec![],
        iscrowd: false,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::page::model::{Region, TextLine};

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    fn page(regions: Vec<Region>, text_lines: Vec<TextLine>) -> PageAnnotation {
        PageAnnotation::new(
            PathBuf::from("scan.xml"),
            "scan.png".into(),
            (100, 100),
            regions,
            text_lines,
        )
    }

    fn baseline_page(lines: Vec<Vec<Point>>) -> PageAnnotation {
        let text_lines = lines
            .into_iter()
            .map(|baseline| TextLine {
                coords: vec![],
                baseline: Some(baseline),
                region_type: Some("text".into()),
            })
            .collect();
        page(vec![], text_lines)
    }

    fn builder(mode: GroundTruthMode) -> GroundTruthBuilder {
        let set = RegionSet::new(mode, 3, vec!["text".into(), "photo".into()], &[])
            .expect("should build");
        GroundTruthBuilder::new(set, true)
    }

    #[test]
    fn region_mask_carries_class_values() {
        let page = page(
            vec![
                Region {
                    element: "TextRegion".into(),
                    region_type: "text".into(),
                    coords: rect(0.0, 0.0, 40.0, 40.0),
                },
                Region {
                    element: "ImageRegion".into(),
                    region_type: "photo".into(),
                    coords: rect(60.0, 60.0, 90.0, 90.0),
                },
            ],
            vec![],
        );
        let mask = builder(GroundTruthMode::Region)
            .build_sem_seg(&page, (100, 100))
            .expect("should build");
        assert_eq!(mask.get_pixel(20, 20)[0], 1);
        assert_eq!(mask.get_pixel(75, 75)[0], 2);
        assert_eq!(mask.get_pixel(50, 50)[0], 0);
    }

    #[test]
    fn unknown_regions_stay_background() {
        let page = page(
            vec![Region {
                element: "MusicRegion".into(),
                region_type: "music".into(),
                coords: rect(0.0, 0.0, 99.0, 99.0),
            }],
            vec![],
        );
        let mask = builder(GroundTruthMode::Region)
            .build_sem_seg(&page, (100, 100))
            .expect("should build");
        assert!(mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn coordinates_scale_to_the_output_size() {
        let page = page(
            vec![Region {
                element: "TextRegion".into(),
                region_type: "text".into(),
                coords: rect(0.0, 0.0, 99.0, 99.0),
            }],
            vec![],
        );
        let mask = builder(GroundTruthMode::Region)
            .build_sem_seg(&page, (50, 50))
            .expect("should build");
        assert_eq!(mask.dimensions(), (50, 50));
        assert_eq!(mask.get_pixel(25, 25)[0], 1);
    }

    #[test]
    fn baseline_mask_strokes_with_line_width() {
        let page = baseline_page(vec![vec![
            Point::new(10.0, 50.0),
            Point::new(90.0, 50.0),
        ]]);
        let mask = builder(GroundTruthMode::Baseline)
            .build_sem_seg(&page, (100, 100))
            .expect("should build");
        assert_eq!(mask.get_pixel(50, 50)[0], 1);
        assert_eq!(mask.get_pixel(50, 51)[0], 1);
        assert_eq!(mask.get_pixel(50, 60)[0], 0);
    }

    #[test]
    fn top_bottom_splits_across_the_line() {
        let page = baseline_page(vec![vec![
            Point::new(10.0, 50.0),
            Point::new(90.0, 50.0),
        ]]);
        let mask = builder(GroundTruthMode::TopBottom)
            .build_sem_seg(&page, (100, 100))
            .expect("should build");
        assert_eq!(mask.get_pixel(50, 49)[0], 1);
        assert_eq!(mask.get_pixel(50, 51)[0], 2);
    }

    #[test]
    fn separator_marks_both_endpoints() {
        let page = baseline_page(vec![vec![
            Point::new(20.0, 50.0),
            Point::new(80.0, 50.0),
        ]]);
        let mask = builder(GroundTruthMode::Separator)
            .build_sem_seg(&page, (100, 100))
            .expect("should build");
        assert_eq!(mask.get_pixel(20, 50)[0], 1);
        assert_eq!(mask.get_pixel(80, 50)[0], 1);
        assert_eq!(mask.get_pixel(50, 50)[0], 0);
    }

    #[test]
    fn baseline_separator_layers_endpoints_over_the_line() {
        let page = baseline_page(vec![vec![
            Point::new(20.0, 50.0),
            Point::new(80.0, 50.0),
        ]]);
        let mask = builder(GroundTruthMode::BaselineSeparator)
            .build_sem_seg(&page, (100, 100))
            .expect("should build");
        assert_eq!(mask.get_pixel(50, 50)[0], 1);
        assert_eq!(mask.get_pixel(20, 50)[0], 2);
        assert_eq!(mask.get_pixel(80, 50)[0], 2);
    }

    #[test]
    fn region_instances_report_zero_based_categories() {
        let page = page(
            vec![Region {
                element: "ImageRegion".into(),
                region_type: "photo".into(),
                coords: rect(10.0, 20.0, 30.0, 40.0),
            }],
            vec![],
        );
        let instances = builder(GroundTruthMode::Region)
            .build_instances(&page, (100, 100))
            .expect("should build")
            .expect("mode supports instances");
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].category_id, 1);
        assert_eq!(instances[0].bbox, [10.0, 20.0, 30.0, 40.0]);
        assert_eq!(instances[0].bbox_mode, BBOX_XYXY_ABS);
        assert_eq!(instances[0].segmentation[0].len(), 8);
    }

    #[test]
    fn baseline_instances_trace_the_stroke_outline() {
        let page = baseline_page(vec![vec![
            Point::new(10.0, 50.0),
            Point::new(90.0, 50.0),
        ]]);
        let instances = builder(GroundTruthMode::Baseline)
            .build_instances(&page, (100, 100))
            .expect("should build")
            .expect("mode supports instances");
        assert_eq!(instances.len(), 1);
        assert_eq!(instances[0].category_id, 0);
        assert!(!instances[0].segmentation.is_empty());
        let [min_x, min_y, max_x, max_y] = instances[0].bbox;
        assert!(min_x < max_x && min_y < max_y);
    }

    #[test]
    fn pano_encodes_one_id_per_region() {
        let page = page(
            vec![
                Region {
                    element: "TextRegion".into(),
                    region_type: "text".into(),
                    coords: rect(0.0, 0.0, 40.0, 40.0),
                },
                Region {
                    element: "ImageRegion".into(),
                    region_type: "photo".into(),
                    coords: rect(60.0, 60.0, 90.0, 90.0),
                },
            ],
            vec![],
        );
        let (pano, segments) = builder(GroundTruthMode::Region)
            .build_pano(&page, (100, 100))
            .expect("should build")
            .expect("mode supports pano");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, 1);
        assert_eq!(segments[1].id, 2);
        assert_eq!(segments[1].category_id, 1);
        assert_eq!(pano.get_pixel(20, 20).0, [1, 0, 0]);
        assert_eq!(pano.get_pixel(75, 75).0, [2, 0, 0]);
    }

    #[test]
    fn endpoint_modes_have_no_instance_or_pano_output() {
        let page = baseline_page(vec![vec![
            Point::new(20.0, 50.0),
            Point::new(80.0, 50.0),
        ]]);
        let builder = builder(GroundTruthMode::Start);
        assert!(builder
            .build_instances(&page, (100, 100))
            .expect("should build")
            .is_none());
        assert!(builder
            .build_pano(&page, (100, 100))
            .expect("should build")
            .is_none());
    }

    #[test]
    fn zero_sized_page_is_rejected() {
        let mut page = page(vec![], vec![]);
        page.set_size((0, 100));
        assert!(builder(GroundTruthMode::Region)
            .build_sem_seg(&page, (100, 100))
            .is_err());
    }
}
