//! Settings shared by all posts: default motion parameters, pagination and controller constants.

use serde::Deserialize;

use crate::post_error::PostError;
use crate::post_traits::{MAX_AXES, MIN_AXES};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostSettings {
    /// Lines per page before a program is split. Unset uses the post's own default,
    /// 0 disables splitting.
    pub max_lines: Option<usize>,
    pub speed_mm_s: f64,
    pub speed_joints_deg_s: f64,
    pub acceleration_mm_s2: f64,
    pub acceleration_joints_deg_s2: f64,
    /// Blending radius, zero or negative for exact stop
    pub zone_mm: f64,
    /// Joint speed that corresponds to 100% on controllers taking percentages
    pub max_joint_speed_deg_s: f64,
    pub max_joint_acceleration_deg_s2: f64,
    /// Encoder pulses per degree of every axis (Motoman joint targets)
    pub pulses_per_degree: Option<Vec<f64>>,
    pub ur_port: u16,
    pub connect_timeout_ms: u64,
}

impl Default for PostSettings {
    fn default() -> Self {
        PostSettings {
            max_lines: None,
            speed_mm_s: 100.0,
            speed_joints_deg_s: 30.0,
            acceleration_mm_s2: 1200.0,
            acceleration_joints_deg_s2: 80.0,
            zone_mm: -1.0,
            max_joint_speed_deg_s: 180.0,
            max_joint_acceleration_deg_s2: 800.0,
            pulses_per_degree: None,
            ur_port: 30002,
            connect_timeout_ms: 5000,
        }
    }
}

impl PostSettings {
    /// Page size to use by a post whose own default is `post_default`.
    pub fn max_lines_or(&self, post_default: usize) -> usize {
        self.max_lines.unwrap_or(post_default)
    }

    /// Joint speed as a percentage of the maximal joint speed, clamped to 1..=100.
    pub fn joint_speed_percent(&self, deg_s: f64) -> f64 {
        (100.0 * deg_s / self.max_joint_speed_deg_s).clamp(1.0, 100.0)
    }

    /// Joint acceleration as a percentage of the maximal one, clamped to 1..=100.
    pub fn joint_acceleration_percent(&self, deg_s2: f64) -> f64 {
        (100.0 * deg_s2 / self.max_joint_acceleration_deg_s2).clamp(1.0, 100.0)
    }

    /// Checks values that parse fine but make no sense for a controller.
    pub fn validate(&self) -> Result<(), PostError> {
        let positive = [
            ("speed_mm_s", self.speed_mm_s),
            ("speed_joints_deg_s", self.speed_joints_deg_s),
            ("acceleration_mm_s2", self.acceleration_mm_s2),
            ("acceleration_joints_deg_s2", self.acceleration_joints_deg_s2),
            ("max_joint_speed_deg_s", self.max_joint_speed_deg_s),
            ("max_joint_acceleration_deg_s2", self.max_joint_acceleration_deg_s2),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(PostError::SettingsError(format!(
                    "{} must be finite and positive (got {})", name, value
                )));
            }
        }
        if !self.zone_mm.is_finite() {
            return Err(PostError::SettingsError(format!("zone_mm must be finite (got {})", self.zone_mm)));
        }
        if let Some(pulses) = &self.pulses_per_degree {
            if !(MIN_AXES..=MAX_AXES).contains(&pulses.len()) {
                return Err(PostError::SettingsError(format!(
                    "pulses_per_degree must list {} to {} axes (got {})", MIN_AXES, MAX_AXES, pulses.len()
                )));
            }
            for (i, &p) in pulses.iter().enumerate() {
                if !p.is_finite() || p <= 0.0 {
                    return Err(PostError::SettingsError(format!(
                        "pulses_per_degree[{}] must be finite and positive (got {})", i, p
                    )));
                }
            }
        }
        if self.ur_port == 0 {
            return Err(PostError::SettingsError("ur_port must not be 0".into()));
        }
        Ok(())
    }
}

#[cfg(feature = "allow_filesystem")]
mod from_file {
    use std::path::Path;

    use serde_saphyr::Options;

    use super::PostSettings;
    use crate::post_error::PostError;

    impl PostSettings {
        /// Parses settings like
        /// ```yaml
        /// max_lines: 500
        /// speed_mm_s: 250
        /// zone_mm: 5
        /// pulses_per_degree: [1434.3, 1434.3, 1434.3, 969.8, 969.8, 454.8]
        /// ```
        /// Missing fields keep their defaults. The result is validated.
        pub fn from_yaml_str(yaml: &str) -> Result<Self, PostError> {
            let settings: PostSettings = serde_saphyr::from_str_with_options(
                yaml,
                Options { angle_conversions: true, ..Default::default() },
            ).map_err(|e| PostError::ParseError(format!("{}", e)))?;
            settings.validate()?;
            Ok(settings)
        }

        pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, PostError> {
            let contents = std::fs::read_to_string(path)?;
            Self::from_yaml_str(&contents)
        }
    }
}
