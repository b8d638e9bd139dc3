//! Common test utilities for pomgrid.
//!
//! This module provides shared fixtures and assertions for the integration
//! tests.

pub mod assertions;
#[cfg(feature = "netcdf")]
pub mod test_data;
