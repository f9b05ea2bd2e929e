//! Region-name to class-id mapping and ground-truth extraction modes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TrainingConfig;
use crate::core::{LayprepError, LayprepResult};

/// What kind of ground truth a page is rasterized into.
///
/// Region-style modes paint filled region polygons; baseline-style modes
/// paint thickened baseline polylines or their endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundTruthMode {
    /// Filled region polygons, one class per region name.
    Region,
    /// Filled text-line polygons, a single foreground class.
    TextLine,
    /// Thickened baselines, a single foreground class.
    Baseline,
    /// Thickened baselines carrying the class of their enclosing region.
    ClassBaseline,
    /// Baseline pixels split into above-center and below-center classes.
    TopBottom,
    /// A disc at each baseline start point.
    Start,
    /// A disc at each baseline end point.
    End,
    /// Discs at both baseline endpoints.
    Separator,
    /// Thickened baselines plus endpoint discs as a second class.
    BaselineSeparator,
}

impl GroundTruthMode {
    /// Number of classes this mode writes, background included.
    pub fn num_classes(self, region_count: usize) -> usize {
        match self {
            GroundTruthMode::Region | GroundTruthMode::ClassBaseline => region_count + 1,
            GroundTruthMode::TextLine
            | GroundTruthMode::Baseline
            | GroundTruthMode::Start
            | GroundTruthMode::End
            | GroundTruthMode::Separator => 2,
            GroundTruthMode::TopBottom | GroundTruthMode::BaselineSeparator => 3,
        }
    }

    /// Whether this mode supports instance-style output.
    pub fn supports_instances(self) -> bool {
        matches!(
            self,
            GroundTruthMode::Region | GroundTruthMode::TextLine | GroundTruthMode::Baseline
        )
    }

    /// Whether this mode supports panoptic output.
    pub fn supports_pano(self) -> bool {
        self.supports_instances()
    }
}

impl std::fmt::Display for GroundTruthMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GroundTruthMode::Region => "region",
            GroundTruthMode::TextLine => "text_line",
            GroundTruthMode::Baseline => "baseline",
            GroundTruthMode::ClassBaseline => "class_baseline",
            GroundTruthMode::TopBottom => "top_bottom",
            GroundTruthMode::Start => "start",
            GroundTruthMode::End => "end",
            GroundTruthMode::Separator => "separator",
            GroundTruthMode::BaselineSeparator => "baseline_separator",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for GroundTruthMode {
    type Err = LayprepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "region" => Ok(GroundTruthMode::Region),
            "text_line" => Ok(GroundTruthMode::TextLine),
            "baseline" => Ok(GroundTruthMode::Baseline),
            "class_baseline" => Ok(GroundTruthMode::ClassBaseline),
            "top_bottom" => Ok(GroundTruthMode::TopBottom),
            "start" => Ok(GroundTruthMode::Start),
            "end" => Ok(GroundTruthMode::End),
            "separator" => Ok(GroundTruthMode::Separator),
            "baseline_separator" => Ok(GroundTruthMode::BaselineSeparator),
            other => Err(LayprepError::invalid_field(
                "mode",
                "one of region, text_line, baseline, class_baseline, top_bottom, start, end, \
                 separator, baseline_separator",
                other,
            )),
        }
    }
}

/// Resolves annotated region names onto rasterization class ids.
///
/// Class id is the region's position in the configured list plus one;
/// class 0 is background. Merge aliases fold onto a canonical region's
/// class. Unknown names resolve to background.
#[derive(Debug, Clone)]
pub struct RegionSet {
    /// Ground-truth extraction mode.
    pub mode: GroundTruthMode,
    /// Thickness in pixels of rasterized baselines and endpoint discs.
    pub line_width: u32,
    /// Ordered region names.
    pub regions: Vec<String>,
    merge: HashMap<String, String>,
}

impl RegionSet {
    /// Creates a region set from its parts.
    ///
    /// `merge_entries` use the `canonical:alias1,alias2` form. A merge
    /// target that is not a listed region is a configuration error.
    pub fn new(
        mode: GroundTruthMode,
        line_width: u32,
        regions: Vec<String>,
        merge_entries: &[String],
    ) -> LayprepResult<Self> {
        let mut merge = HashMap::new();
        for entry in merge_entries {
            let (canonical, aliases) = entry.split_once(':').ok_or_else(|| {
                LayprepError::invalid_field(
                    "merge regions",
                    "entries of the form 'canonical:alias1,alias2'",
                    entry.clone(),
                )
            })?;
            if !regions.iter().any(|r| r == canonical) {
                return Err(LayprepError::config_error_detailed(
                    "merge regions",
                    format!("merge target '{canonical}' is not a listed region"),
                ));
            }
            for alias in aliases.split(',').filter(|a| !a.is_empty()) {
                merge.insert(alias.to_string(), canonical.to_string());
            }
        }
        Ok(Self {
            mode,
            line_width,
            regions,
            merge,
        })
    }

    /// Builds the region set from a training configuration.
    pub fn from_config(config: &TrainingConfig) -> LayprepResult<Self> {
        Self::new(
            config.model.mode,
            config.preprocess.baseline.line_width,
            config.preprocess.region.regions.clone(),
            &config.preprocess.region.merge_regions,
        )
    }

    /// Resolves a region name to its class id (1-based), or `None` for
    /// background.
    pub fn class_of(&self, name: &str) -> Option<u8> {
        let canonical = self.merge.get(name).map(String::as_str).unwrap_or(name);
        let class = self
            .regions
            .iter()
            .position(|r| r == canonical)
            .map(|idx| (idx + 1) as u8);
        if class.is_none() {
            debug!("region type '{name}' is not configured, treating as background");
        }
        class
    }

    /// Number of classes, background included.
    pub fn num_classes(&self) -> usize {
        self.mode.num_classes(self.regions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> RegionSet {
        RegionSet::new(
            GroundTruthMode::Region,
            5,
            vec!["text".into(), "photo".into(), "marginalia".into()],
            &["text:header,heading".to_string()],
        )
        .expect("should build")
    }

    #[test]
    fn class_ids_are_one_based_in_listing_order() {
        let set = set();
        assert_eq!(set.class_of("text"), Some(1));
        assert_eq!(set.class_of("photo"), Some(2));
        assert_eq!(set.class_of("marginalia"), Some(3));
    }

    #[test]
    fn aliases_fold_onto_canonical_class() {
        let set = set();
        assert_eq!(set.class_of("header"), Some(1));
        assert_eq!(set.class_of("heading"), Some(1));
    }

    #[test]
    fn unknown_names_are_background() {
        assert_eq!(set().class_of("decoration"), None);
    }

    #[test]
    fn merge_target_must_exist() {
        let err = RegionSet::new(
            GroundTruthMode::Region,
            5,
            vec!["text".into()],
            &["photo:figure".to_string()],
        )
        .unwrap_err();
        assert!(err.to_string().contains("photo"));
    }

    #[test]
    fn mode_class_counts() {
        assert_eq!(GroundTruthMode::Region.num_classes(3), 4);
        assert_eq!(GroundTruthMode::Baseline.num_classes(3), 2);
        assert_eq!(GroundTruthMode::TopBottom.num_classes(0), 3);
        assert_eq!(GroundTruthMode::BaselineSeparator.num_classes(0), 3);
    }

    #[test]
    fn mode_round_trips_through_display_and_from_str() {
        for mode in [
            GroundTruthMode::Region,
            GroundTruthMode::TextLine,
            GroundTruthMode::Baseline,
            GroundTruthMode::ClassBaseline,
            GroundTruthMode::TopBottom,
            GroundTruthMode::Start,
            GroundTruthMode::End,
            GroundTruthMode::Separator,
            GroundTruthMode::BaselineSeparator,
        ] {
            let parsed: GroundTruthMode = mode.to_string().parse().expect("should parse");
            assert_eq!(parsed, mode);
        }
    }
}
