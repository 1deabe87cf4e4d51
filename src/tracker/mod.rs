//! The tracker keeps skills, the session log and the stopwatch.
//! [state::TrackerState] holds the pure logic, [manager::TrackerManager] ties it to storage and
//! to the one second [ticker::TickHandle].

pub mod manager;
pub mod state;
pub mod ticker;
