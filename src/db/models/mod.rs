pub mod observation;
pub mod traffic_light;

pub use observation::Observation;
pub use traffic_light::{TrafficLight, TrafficLightInput, TrafficLightUpdate};
