//! Reporting port trait.
//!
//! The engine emits one NAV record per trading day plus the structured
//! order/fill log; what happens to them is the collaborator's business.

use crate::domain::engine::NavRecord;
use crate::domain::execution::{Fill, RejectedOrder};

pub trait ReportPort {
    fn record_nav(&mut self, record: &NavRecord);

    fn record_fill(&mut self, fill: &Fill);

    /// Default implementation: dropped orders go unrecorded.
    fn record_rejected(&mut self, _order: &RejectedOrder) {}
}
