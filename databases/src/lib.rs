//! This crate contains the interfaces used in production to store and lookup info.
pub mod mca;
