mod channel;
mod types;


pub use channel::SensorChannel;
pub use types::{InertialHardware, RegistrationId, Sample3, SampleSink, SamplingRate, SensorKind};
