//! Client for the PRISM portfolio challenge: fetch a client brief, pull the
//! investor's facts out of it, allocate lots across a small ticker pool, and
//! submit the result for scoring.

pub mod client;
pub mod config;
pub mod error;
pub mod investor;
pub mod pipeline;
pub mod portfolio;
