//! Turn metrics and cost estimation for Ferrochat.
//!
//! Every completed turn yields token counts, tool-call counts, latency, and
//! an estimated dollar cost — the observation contract the transport layer
//! logs and reports on.

pub mod metrics;
pub mod pricing;

pub use metrics::TurnMetrics;
pub use pricing::{ModelPricing, PricingTable};
