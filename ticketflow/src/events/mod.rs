//! Event sinks for run observability.
//!
//! The pipeline emits every [`PipelineEvent`](crate::core::PipelineEvent)
//! through an [`EventSink`]. Sessions feed their event stream through a
//! [`ChannelEventSink`] and add any configured sink with [`FanoutEventSink`].

mod sink;

pub use sink::{
    ChannelEventSink, CollectingEventSink, EventSink, FanoutEventSink, LoggingEventSink,
    NoOpEventSink,
};
