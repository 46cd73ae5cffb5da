//! Provider backends: Fission (default), Knative (legacy), Mock (tests).

mod fission;
mod knative;
mod mock;

pub use fission::FissionProvider;
pub use knative::KnativeProvider;
pub use mock::MockProvider;
