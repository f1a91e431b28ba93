//! Event envelopes and dispatch.
//!
//! Every native signal a widget handles, and every dialog lifecycle step,
//! ends up as one [`Envelope`] handed to one user callback by the
//! [`Dispatcher`]. The callback answers with an
//! [`EventResult`](cinegrid_core::EventResult); only lifecycle events and the
//! typing buffer act on a veto.

mod dispatcher;
mod envelope;

pub use dispatcher::Dispatcher;
pub use envelope::Envelope;
