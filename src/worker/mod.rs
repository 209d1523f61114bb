//! Summarization tasks: claim, snapshot, summarize, deliver, clear-or-retain

pub mod deliver;
pub mod dispatch;
pub mod summarize;

pub use deliver::{StdoutSink, SummarySink};
pub use dispatch::{DispatchOutcome, SkipReason, SummaryDispatcher};
pub use summarize::SummarizeResult;
