//! End-to-end change feed tests

pub mod end_to_end;
pub mod retry;
pub mod watch_state;
pub mod commands;
