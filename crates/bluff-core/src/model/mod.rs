pub mod action;
pub mod phase;
pub mod signal;
pub mod turn;
