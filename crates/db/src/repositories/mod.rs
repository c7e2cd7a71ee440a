//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod annotation_repo;
pub mod inference_result_repo;
pub mod sample_repo;
pub mod session_repo;
pub mod user_repo;
pub mod video_repo;

pub use annotation_repo::AnnotationRepo;
pub use inference_result_repo::InferenceResultRepo;
pub use sample_repo::{ButtonSampleRepo, SpeedSampleRepo};
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
pub use video_repo::VideoRepo;
