//! Domain logic for the load-triggered shield controller.
//!
//! Everything in this crate is pure: no filesystem, network or clock
//! access. The agent crate samples the host, reads the marker and talks to
//! the firewall API, then hands the results in here to be judged.

pub mod decision;
pub mod error;
pub mod marker;
pub mod outcome;
pub mod sample;
