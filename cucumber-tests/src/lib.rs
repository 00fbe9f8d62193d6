//! BDD scenarios for the Rampart security pipeline

pub mod features;
