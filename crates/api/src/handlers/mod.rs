pub mod generation;
pub mod status;
pub mod webhook;
