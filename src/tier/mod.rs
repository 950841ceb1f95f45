//! Tier-indexed parameter tables and the scaling policies that consume them.

pub mod activation;
pub mod parameter;
pub mod scaling;

pub use activation::{ActivationScaling, ActivationTrigger, ResolvedActivation};
pub use parameter::TierParameterConfig;
pub use scaling::{ScalingMode, TierScalingConfig};
