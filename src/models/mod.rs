//! Row types served by the reference routes.

pub mod catalog;
