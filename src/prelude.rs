//! Common imports shared across the crate, mirroring the teacher's
//! `use crate::prelude::*;` convention: every module pulls its `Result`,
//! error-construction macros and logging macros from here instead of
//! repeating the same `use` block everywhere.

pub use anyhow::{anyhow, bail, Context};
pub use log::{debug, error, info, trace, warn};

pub type Result<T, E = anyhow::Error> = std::result::Result<T, E>;

pub use crate::error::{DriverError, ProfileError, SensorError};
pub use crate::key::SensorKey;
