//! The Ferrochat agent: the bounded tool-call loop, the per-user chat
//! service around it, and the background snapshot monitor.

pub mod loop_runner;
pub mod monitor;
pub mod service;

pub use loop_runner::{AgentLoop, TurnOptions, TurnReport};
pub use monitor::{MonitorHandle, TaskMonitor};
pub use service::ChatService;
