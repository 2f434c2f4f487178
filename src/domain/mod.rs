//! Domain layer
//!
//! Resource identities, provisioning groups and the ports through which the
//! engine reaches the cluster, secret material, the operator and the progress
//! display. Adapters live in [`crate::cluster`], [`crate::policy`],
//! [`crate::prompt`] and [`crate::progress`].

pub mod ports;

pub use ports::*;
