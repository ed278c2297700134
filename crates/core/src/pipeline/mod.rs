pub mod analyze_emotions_use_case;
pub mod batch_executor;
pub mod frame_report;
pub mod infrastructure;
pub mod pipeline_logger;
