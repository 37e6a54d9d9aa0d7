pub mod cancel;
pub mod session;

pub use cancel::CancelToken;
pub use session::{LoopState, LoopSummary, TuningDisplay, TuningLoop};
