mod fix;
mod stream;

#[cfg(test)]
mod tests;

pub use fix::{compass_point, Accuracy, LocationFix, LocationRequest};
pub use stream::{FixSink, PositionStream, PositioningProvider, Subscription};
