pub mod credentials;
pub mod observation;

pub use credentials::Credentials;
pub use observation::{Observation, Percentages, Side, Source};
