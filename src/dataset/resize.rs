//! Output-shape selection for dataset images.
//!
//! Resizing here is deterministic. The sampling knob (`Choice`/`Range`)
//! randomizes sizes during training-time augmentation; for a dataset
//! written once to disk, `Choice` takes the largest configured size and
//! `Range` the midpoint, so repeated runs agree on what "up to date"
//! means.

use crate::config::{DpiConfig, PreprocessConfig, ResizeModeKind, Sampling};
use crate::core::{LayprepError, LayprepResult};

/// Resolves the effective source resolution of a scan and the scale
/// toward a target resolution.
#[derive(Debug, Clone, Copy)]
pub struct DpiPolicy {
    auto_detect: bool,
    default_dpi: Option<u32>,
    manual_dpi: Option<u32>,
    target_dpi: Option<u32>,
}

impl DpiPolicy {
    pub fn from_config(config: &DpiConfig) -> Self {
        Self {
            auto_detect: config.auto_detect,
            default_dpi: config.default_dpi,
            manual_dpi: config.manual_dpi,
            target_dpi: config.target_dpi,
        }
    }

    /// The resolution to treat the image as having. A manual value wins;
    /// otherwise the probed value when auto-detection is on, falling back
    /// to the configured default.
    pub fn source_dpi(&self, image_dpi: Option<u32>) -> Option<u32> {
        if self.manual_dpi.is_some() {
            return self.manual_dpi;
        }
        if self.auto_detect {
            image_dpi.or(self.default_dpi)
        } else {
            self.default_dpi
        }
    }

    /// Scale factor that brings the image to the target resolution, 1.0
    /// when either side is unknown.
    pub fn scale(&self, image_dpi: Option<u32>) -> f64 {
        match (self.target_dpi, self.source_dpi(image_dpi)) {
            (Some(target), Some(source)) if source > 0 => f64::from(target) / f64::from(source),
            _ => 1.0,
        }
    }
}

/// How output shapes are derived from input shapes.
#[derive(Debug, Clone)]
pub enum ResizePolicy {
    /// Keep images at their original size.
    None,
    /// Scale so the shortest edge hits the selected size, clamped so the
    /// longest edge stays within `max_size`.
    ShortestEdge { size: u32, max_size: u32 },
    /// Scale so the longest edge hits the selected size, clamped to
    /// `max_size`.
    LongestEdge { size: u32, max_size: u32 },
    /// Scale by a fixed factor, adjusted toward the target resolution,
    /// clamped so the longest edge stays within `max_size`.
    Scaling { scale: f64, max_size: u32, dpi: DpiPolicy },
}

impl ResizePolicy {
    /// Builds the policy from the preprocessing configuration.
    pub fn from_config(config: &PreprocessConfig) -> LayprepResult<Self> {
        let resize = &config.resize;
        let policy = match resize.resize_mode {
            ResizeModeKind::None => ResizePolicy::None,
            ResizeModeKind::ShortestEdge => ResizePolicy::ShortestEdge {
                size: selected_size(&resize.min_size, resize.resize_sampling)?,
                max_size: resize.max_size,
            },
            ResizeModeKind::LongestEdge => ResizePolicy::LongestEdge {
                size: selected_size(&resize.min_size, resize.resize_sampling)?,
                max_size: resize.max_size,
            },
            ResizeModeKind::Scaling => ResizePolicy::Scaling {
                scale: resize.scaling,
                max_size: resize.max_size,
                dpi: DpiPolicy::from_config(&config.dpi),
            },
        };
        Ok(policy)
    }

    /// The output shape (height, width) for an input shape, preserving
    /// aspect ratio. Never returns a zero dimension.
    pub fn output_shape(&self, height: u32, width: u32, dpi: Option<u32>) -> (u32, u32) {
        let (h, w) = (f64::from(height), f64::from(width));
        let scale = match self {
            ResizePolicy::None => 1.0,
            ResizePolicy::ShortestEdge { size, max_size } => {
                let scale = f64::from(*size) / h.min(w);
                clamp_to_max(scale, h, w, *max_size)
            }
            ResizePolicy::LongestEdge { size, max_size } => {
                let scale = f64::from(*size) / h.max(w);
                clamp_to_max(scale, h, w, *max_size)
            }
            ResizePolicy::Scaling { scale, max_size, dpi: policy } => {
                clamp_to_max(scale * policy.scale(dpi), h, w, *max_size)
            }
        };
        (
            ((h * scale).round() as u32).max(1),
            ((w * scale).round() as u32).max(1),
        )
    }
}

fn clamp_to_max(scale: f64, h: f64, w: f64, max_size: u32) -> f64 {
    let longest = h.max(w) * scale;
    if longest > f64::from(max_size) {
        scale * f64::from(max_size) / longest
    } else {
        scale
    }
}

fn selected_size(sizes: &[u32], sampling: Sampling) -> LayprepResult<u32> {
    let (Some(&min), Some(&max)) = (sizes.iter().min(), sizes.iter().max()) else {
        return Err(LayprepError::config_error_detailed(
            "resize",
            "MIN_SIZE must list at least one size",
        ));
    };
    Ok(match sampling {
        Sampling::Choice => max,
        Sampling::Range => min + (max - min) / 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dpi(target: Option<u32>, default: Option<u32>) -> DpiPolicy {
        DpiPolicy {
            auto_detect: true,
            default_dpi: default,
            manual_dpi: None,
            target_dpi: target,
        }
    }

    #[test]
    fn none_keeps_the_input_shape() {
        assert_eq!(ResizePolicy::None.output_shape(480, 640, None), (480, 640));
    }

    #[test]
    fn shortest_edge_scales_up_to_the_selected_size() {
        let policy = ResizePolicy::ShortestEdge {
            size: 1024,
            max_size: 4096,
        };
        assert_eq!(policy.output_shape(512, 1024, None), (1024, 2048));
    }

    #[test]
    fn shortest_edge_respects_the_max_size_clamp() {
        let policy = ResizePolicy::ShortestEdge {
            size: 1024,
            max_size: 1500,
        };
        let (h, w) = policy.output_shape(512, 1024, None);
        assert_eq!(w, 1500);
        assert_eq!(h, 750);
    }

    #[test]
    fn longest_edge_scales_down_large_scans() {
        let policy = ResizePolicy::LongestEdge {
            size: 2048,
            max_size: 2048,
        };
        assert_eq!(policy.output_shape(4000, 3000, None), (2048, 1536));
    }

    #[test]
    fn scaling_applies_the_factor() {
        let policy = ResizePolicy::Scaling {
            scale: 0.5,
            max_size: 4096,
            dpi: dpi(None, None),
        };
        assert_eq!(policy.output_shape(1000, 600, None), (500, 300));
    }

    #[test]
    fn scaling_rescales_toward_the_target_dpi() {
        let policy = ResizePolicy::Scaling {
            scale: 1.0,
            max_size: 8192,
            dpi: dpi(Some(150), None),
        };
        assert_eq!(policy.output_shape(1000, 600, Some(300)), (500, 300));
        // Without a source resolution the factor stays 1.
        assert_eq!(policy.output_shape(1000, 600, None), (1000, 600));
    }

    #[test]
    fn manual_dpi_overrides_the_probed_value() {
        let policy = DpiPolicy {
            auto_detect: true,
            default_dpi: Some(72),
            manual_dpi: Some(400),
            target_dpi: None,
        };
        assert_eq!(policy.source_dpi(Some(300)), Some(400));
    }

    #[test]
    fn auto_detect_falls_back_to_the_default() {
        let policy = dpi(None, Some(72));
        assert_eq!(policy.source_dpi(Some(300)), Some(300));
        assert_eq!(policy.source_dpi(None), Some(72));
    }

    #[test]
    fn tiny_inputs_never_collapse_to_zero() {
        let policy = ResizePolicy::Scaling {
            scale: 0.01,
            max_size: 2048,
            dpi: dpi(None, None),
        };
        assert_eq!(policy.output_shape(10, 10, None), (1, 1));
    }

    #[test]
    fn choice_takes_the_largest_size_and_range_the_midpoint() {
        assert_eq!(
            selected_size(&[640, 1024, 800], Sampling::Choice).expect("should select"),
            1024
        );
        assert_eq!(
            selected_size(&[600, 1000], Sampling::Range).expect("should select"),
            800
        );
        assert!(selected_size(&[], Sampling::Choice).is_err());
    }
}
