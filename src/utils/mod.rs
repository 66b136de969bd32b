//! Small helpers shared by the processors

pub mod naming;
