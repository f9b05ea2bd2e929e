//! Typed model of a PAGE XML annotation.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::{LayprepError, LayprepResult};
use crate::page::regions::RegionSet;

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Parses a PAGE `points` attribute (`"x,y x,y ..."`).
pub fn parse_points(raw: &str) -> LayprepResult<Vec<Point>> {
    let mut points = Vec::new();
    for pair in raw.split_whitespace() {
        let (x, y) = pair.split_once(',').ok_or_else(|| {
            LayprepError::invalid_input(format!("malformed coordinate pair '{pair}'"))
        })?;
        let x: f32 = x.trim().parse().map_err(|_| {
            LayprepError::invalid_input(format!("malformed x coordinate '{x}'"))
        })?;
        let y: f32 = y.trim().parse().map_err(|_| {
            LayprepError::invalid_input(format!("malformed y coordinate '{y}'"))
        })?;
        points.push(Point::new(x, y));
    }
    Ok(points)
}

/// A layout region: polygon outline plus its annotated structure type.
#[derive(Debug, Clone)]
pub struct Region {
    /// PAGE element tag (`TextRegion`, `SeparatorRegion`, ...).
    pub element: String,
    /// Resolved structure type: the `custom` attribute's
    /// `structure {type:..}` value, falling back to the element tag.
    pub region_type: String,
    /// Polygon outline in page coordinates.
    pub coords: Vec<Point>,
}

/// A text line: outline, optional baseline, and the structure type of
/// its enclosing region.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// Polygon outline in page coordinates.
    pub coords: Vec<Point>,
    /// Baseline polyline in page coordinates, if annotated.
    pub baseline: Option<Vec<Point>>,
    /// Structure type of the enclosing region, if any.
    pub region_type: Option<String>,
}

/// A parsed PAGE XML annotation for a single scan.
#[derive(Debug, Clone)]
pub struct PageAnnotation {
    /// Path of the XML file this was parsed from.
    pub source: PathBuf,
    /// The `imageFilename` attribute of the `Page` element.
    pub image_filename: String,
    /// Annotated page size as (height, width).
    size: (u32, u32),
    /// All `*Region` elements on the page.
    pub regions: Vec<Region>,
    /// All `TextLine` elements on the page.
    pub text_lines: Vec<TextLine>,
}

impl PageAnnotation {
    pub(crate) fn new(
        source: PathBuf,
        image_filename: String,
        size: (u32, u32),
        regions: Vec<Region>,
        text_lines: Vec<TextLine>,
    ) -> Self {
        Self {
            source,
            image_filename,
            size,
            regions,
            text_lines,
        }
    }

    /// Annotated page size as (height, width).
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Overrides the annotated size with the actual image size.
    ///
    /// Some annotation tools write a size that disagrees with the scan;
    /// the scan wins.
    pub fn set_size(&mut self, size: (u32, u32)) {
        self.size = size;
    }

    /// Iterates regions resolved to a non-background class.
    pub fn iter_class_coords<'a>(
        &'a self,
        set: &'a RegionSet,
    ) -> impl Iterator<Item = (u8, &'a [Point])> + 'a {
        self.regions.iter().filter_map(move |region| {
            set.class_of(&region.region_type)
                .map(|class| (class, region.coords.as_slice()))
        })
    }

    /// Iterates text-line outlines.
    pub fn iter_text_line_coords(&self) -> impl Iterator<Item = &[Point]> {
        self.text_lines.iter().map(|line| line.coords.as_slice())
    }

    /// Iterates baselines.
    pub fn iter_baseline_coords(&self) -> impl Iterator<Item = &[Point]> {
        self.text_lines
            .iter()
            .filter_map(|line| line.baseline.as_deref())
    }

    /// Iterates baselines resolved to their enclosing region's class.
    pub fn iter_class_baseline_coords<'a>(
        &'a self,
        set: &'a RegionSet,
    ) -> impl Iterator<Item = (u8, &'a [Point])> + 'a {
        self.text_lines.iter().filter_map(move |line| {
            let baseline = line.baseline.as_deref()?;
            let class = set.class_of(line.region_type.as_deref()?)?;
            Some((class, baseline))
        })
    }
}
