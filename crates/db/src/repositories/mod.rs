//! Repository layer: zero-sized structs with associated async functions
//! taking `&PgPool`.

pub mod code_repo;
pub mod job_analysis_repo;
pub mod job_group_repo;
pub mod job_repo;
pub mod node_repo;
pub mod npu_repo;
pub mod parameter_repo;
pub mod user_repo;

pub use code_repo::CodeRepo;
pub use job_analysis_repo::JobAnalysisRepo;
pub use job_group_repo::JobGroupRepo;
pub use job_repo::JobRepo;
pub use node_repo::NodeRepo;
pub use npu_repo::NpuRepo;
pub use parameter_repo::ParameterRepo;
pub use user_repo::UserRepo;
