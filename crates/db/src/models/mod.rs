pub mod code;
pub mod job;
pub mod job_analysis;
pub mod node;
pub mod npu;
pub mod parameter;
pub mod user;
