use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Receiver-reported position at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters
    pub accuracy: Option<f64>,
    /// Meters above the WGS84 ellipsoid
    pub altitude: Option<f64>,
    /// Ground speed in m/s
    pub speed: Option<f64>,
    /// Degrees clockwise from true north
    pub bearing: Option<f64>,
    pub provider: String,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new<S: Into<String>>(
        latitude: f64,
        longitude: f64,
        provider: S,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            speed: None,
            bearing: None,
            provider: provider.into(),
            timestamp,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_bearing(mut self, bearing: f64) -> Self {
        self.bearing = Some(bearing);
        self
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.speed.map(|speed| speed * 3.6)
    }

    pub fn compass_direction(&self) -> Option<&'static str> {
        self.bearing.map(compass_point)
    }

    /// Text shown in the background notice for this fix
    pub fn notice_body(&self) -> String {
        format!("Lat: {}, Lon: {}", self.latitude, self.longitude)
    }
}

/// 8-point compass rose for a bearing in degrees
pub fn compass_point(bearing: f64) -> &'static str {
    if bearing < 22.5 || bearing >= 337.5 {
        "N"
    } else if bearing < 67.5 {
        "NE"
    } else if bearing < 112.5 {
        "E"
    } else if bearing < 157.5 {
        "SE"
    } else if bearing < 202.5 {
        "S"
    } else if bearing < 247.5 {
        "SW"
    } else if bearing < 292.5 {
        "W"
    } else {
        "NW"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Accuracy {
    #[default]
    High,
    Balanced,
    Low,
    Passive,
}

/// Parameters passed to the positioning subsystem on registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationRequest {
    pub interval: Duration,
    pub accuracy: Accuracy,
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            accuracy: Accuracy::High,
        }
    }
}
