use crate::config::ClassifierConfig;
use crate::sensor::{Sample3, SensorKind};
use serde::{Deserialize, Serialize};

pub const STANDARD_GRAVITY: f64 = 9.8;

/// Thresholds for the three non-zero intensity levels, ascending.
/// Each comparison is strict: a value equal to a threshold stays below it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionThresholds {
    pub gravity: f64,
    pub accelerometer: [f64; 3],
    pub gyroscope: [f64; 3],
}

impl Default for MotionThresholds {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            accelerometer: [0.5, 1.5, 3.0],
            gyroscope: [0.3, 1.0, 2.0],
        }
    }
}

impl From<&ClassifierConfig> for MotionThresholds {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            gravity: config.gravity,
            accelerometer: config.accelerometer_thresholds,
            gyroscope: config.gyroscope_thresholds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Qualitative reading derived from one sample. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MotionClassification {
    /// 0 (still) to 3 (strong motion)
    pub intensity: u8,
    pub label: &'static str,
    pub axis: Axis,
    pub positive: bool,
    /// Euclidean magnitude of the raw sample
    pub magnitude: f64,
    /// Value compared against the thresholds: |magnitude - gravity| for the
    /// accelerometer, the raw magnitude for the gyroscope
    pub net: f64,
}

impl MotionClassification {
    pub fn intensity_name(&self) -> &'static str {
        match self.intensity {
            3 => "high",
            2 => "medium",
            1 => "low",
            _ => "still",
        }
    }

    /// Angular rate in degrees per second, meaningful for gyroscope readings
    pub fn degrees_per_second(&self) -> f64 {
        self.magnitude.to_degrees()
    }
}

/// Classify with the default thresholds
pub fn classify(sample: Sample3, kind: SensorKind) -> MotionClassification {
    classify_with(sample, kind, &MotionThresholds::default())
}

pub fn classify_with(
    sample: Sample3,
    kind: SensorKind,
    thresholds: &MotionThresholds,
) -> MotionClassification {
    let magnitude = sample.magnitude();
    let (net, levels) = match kind {
        SensorKind::Accelerometer => ((magnitude - thresholds.gravity).abs(), &thresholds.accelerometer),
        SensorKind::Gyroscope => (magnitude, &thresholds.gyroscope),
    };

    let intensity = if net > levels[2] {
        3
    } else if net > levels[1] {
        2
    } else if net > levels[0] {
        1
    } else {
        0
    };

    let (axis, value) = dominant_axis(sample);
    let positive = value > 0.0;

    MotionClassification {
        intensity,
        label: axis_label(kind, axis, positive),
        axis,
        positive,
        magnitude,
        net,
    }
}

/// Axis with the greatest absolute component; x wins ties with y and z,
/// y wins ties with z.
fn dominant_axis(sample: Sample3) -> (Axis, f64) {
    let (ax, ay, az) = (sample.x.abs(), sample.y.abs(), sample.z.abs());

    if ax >= ay && ax >= az {
        (Axis::X, sample.x)
    } else if ay >= az {
        (Axis::Y, sample.y)
    } else {
        (Axis::Z, sample.z)
    }
}

fn axis_label(kind: SensorKind, axis: Axis, positive: bool) -> &'static str {
    match (kind, axis, positive) {
        (SensorKind::Accelerometer, Axis::X, true) => "+X (Right)",
        (SensorKind::Accelerometer, Axis::X, false) => "-X (Left)",
        (SensorKind::Accelerometer, Axis::Y, true) => "+Y (Forward)",
        (SensorKind::Accelerometer, Axis::Y, false) => "-Y (Backward)",
        (SensorKind::Accelerometer, Axis::Z, true) => "+Z (Up)",
        (SensorKind::Accelerometer, Axis::Z, false) => "-Z (Down)",
        (SensorKind::Gyroscope, Axis::X, true) => "Pitch (X+)",
        (SensorKind::Gyroscope, Axis::X, false) => "Pitch (X-)",
        (SensorKind::Gyroscope, Axis::Y, true) => "Roll (Y+)",
        (SensorKind::Gyroscope, Axis::Y, false) => "Roll (Y-)",
        (SensorKind::Gyroscope, Axis::Z, true) => "Yaw (Z+)",
        (SensorKind::Gyroscope, Axis::Z, false) => "Yaw (Z-)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accel(x: f64, y: f64, z: f64) -> MotionClassification {
        classify(Sample3::new(x, y, z), SensorKind::Accelerometer)
    }

    fn gyro(x: f64, y: f64, z: f64) -> MotionClassification {
        classify(Sample3::new(x, y, z), SensorKind::Gyroscope)
    }

    #[test]
    fn test_accelerometer_at_rest_is_still() {
        let reading = accel(0.0, 0.0, 9.8);
        assert_eq!(reading.net, 0.0);
        assert_eq!(reading.intensity, 0);
        assert_eq!(reading.label, "+Z (Up)");
    }

    #[test]
    fn test_accelerometer_levels() {
        assert_eq!(accel(0.0, 0.0, 13.3).intensity, 3);
        assert_eq!(accel(0.0, 0.0, 12.0).intensity, 2);
        assert_eq!(accel(0.0, 0.0, 10.5).intensity, 1);
        assert_eq!(accel(0.0, 0.0, 10.0).intensity, 0);
    }

    #[test]
    fn test_accelerometer_below_gravity_uses_absolute_net() {
        // Free fall reads as strong motion
        let reading = accel(0.0, 0.0, 0.0);
        assert!((reading.net - 9.8).abs() < 1e-12);
        assert_eq!(reading.intensity, 3);
    }

    #[test]
    fn test_accelerometer_threshold_is_exclusive() {
        // 11.3 - 9.8 is exactly 1.5 in f64, which does not exceed 1.5
        let reading = accel(11.3, 0.0, 0.0);
        assert_eq!(reading.net, 1.5);
        assert_eq!(reading.intensity, 1);

        assert_eq!(accel(11.31, 0.0, 0.0).intensity, 2);
    }

    #[test]
    fn test_gyroscope_levels() {
        assert_eq!(gyro(2.0, 0.0, 0.0).intensity, 2);
        assert_eq!(gyro(2.01, 0.0, 0.0).intensity, 3);
        assert_eq!(gyro(1.0, 0.0, 0.0).intensity, 1);
        assert_eq!(gyro(0.3, 0.0, 0.0).intensity, 0);
        assert_eq!(gyro(0.0, 0.0, 0.0).intensity, 0);
    }

    #[test]
    fn test_gyroscope_does_not_subtract_gravity() {
        let reading = gyro(0.0, 0.0, 9.8);
        assert_eq!(reading.net, 9.8);
        assert_eq!(reading.intensity, 3);
    }

    #[test]
    fn test_dominant_axis_labels() {
        assert_eq!(accel(5.0, 1.0, 1.0).label, "+X (Right)");
        assert_eq!(accel(-5.0, 1.0, 1.0).label, "-X (Left)");
        assert_eq!(accel(1.0, 5.0, 1.0).label, "+Y (Forward)");
        assert_eq!(accel(1.0, -5.0, 1.0).label, "-Y (Backward)");
        assert_eq!(accel(1.0, 1.0, -9.8).label, "-Z (Down)");

        assert_eq!(gyro(0.5, 0.1, 0.1).label, "Pitch (X+)");
        assert_eq!(gyro(0.1, -0.5, 0.1).label, "Roll (Y-)");
        assert_eq!(gyro(0.1, 0.1, 0.5).label, "Yaw (Z+)");
        assert_eq!(gyro(0.1, 0.1, -0.5).label, "Yaw (Z-)");
    }

    #[test]
    fn test_dominant_axis_ties() {
        let reading = accel(3.0, -3.0, 3.0);
        assert_eq!(reading.axis, Axis::X);
        assert!(reading.positive);

        let reading = gyro(0.1, -0.4, 0.4);
        assert_eq!(reading.axis, Axis::Y);
        assert!(!reading.positive);
        assert_eq!(reading.label, "Roll (Y-)");
    }

    #[test]
    fn test_classification_is_reproducible() {
        let sample = Sample3::new(0.37, -1.12, 9.91);
        let first = classify(sample, SensorKind::Accelerometer);
        let second = classify(sample, SensorKind::Accelerometer);

        assert_eq!(first, second);
        assert_eq!(first.net.to_bits(), second.net.to_bits());
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = MotionThresholds {
            gravity: 9.80665,
            accelerometer: [0.1, 0.2, 0.3],
            gyroscope: [0.01, 0.02, 0.03],
        };

        let reading = classify_with(Sample3::new(0.0, 0.0, 10.0), SensorKind::Accelerometer, &thresholds);
        assert_eq!(reading.intensity, 1);

        let reading = classify_with(Sample3::new(0.05, 0.0, 0.0), SensorKind::Gyroscope, &thresholds);
        assert_eq!(reading.intensity, 3);
    }

    #[test]
    fn test_degrees_per_second() {
        let reading = gyro(std::f64::consts::PI, 0.0, 0.0);
        assert!((reading.degrees_per_second() - 180.0).abs() < 1e-9);
        assert_eq!(reading.intensity_name(), "high");
    }
}
