pub mod acl;
pub mod ai;
pub mod auth;
pub mod config;
pub mod convert;
pub mod db;
pub mod error;
pub mod extract;
pub mod jobs;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod repo;
pub mod routes;
pub mod s3;
pub mod schema;
pub mod state;
pub mod storage;
pub mod template;
pub mod workers;

pub use routes::create_router;
pub use workers::{JobExecution, JobHandler, Worker};
