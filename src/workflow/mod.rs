pub mod grading_ctx;
pub mod grading_flow;
pub mod session;

pub use grading_ctx::GradingCtx;
pub use grading_flow::GradingFlow;
pub use session::GradingSession;
