//! Static routing of outbound items to queues and topics.
//!
//! The [`RoutingTable`] is resolved once from [`RoutingConfig`] when the
//! coordinator starts; [`RoutingTable::route`] is then a pure lookup.
//! Follow-up messages go to work queues, events to one topic per entity
//! category and dead letters to the dead-letter queue.

mod destination;
mod error;
mod table;

pub use destination::{Destination, Route};
pub use error::RoutingError;
pub use table::{
    CODE_REVIEW_QUEUE, DEAD_LETTER_QUEUE, ISSUE_INGESTION_QUEUE, RoutingConfig, RoutingTable,
    default_dispatch_queue, default_topic,
};
