//! Bob Planning - weekly plan coaching client
//!
//! Consumes a remote multi-agent planning service over a live Socket.IO
//! channel, accumulates what the agents stream back, and exports the
//! resulting week as an iCalendar file.

pub mod api;
pub mod calendar;
pub mod config;
pub mod runtime;
pub mod session;
pub mod socket_io;
