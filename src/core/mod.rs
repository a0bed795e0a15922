//! Core runtime components: the report model, the PSI decoder, collectors,
//! discovery synthesis and the cycle driver.

pub mod collectors;
pub mod discovery;
pub mod executor;
pub mod psi;
pub mod report;
