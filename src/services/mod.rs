pub mod container_service;
pub mod health_service;
pub mod toast_factory;
pub mod toast_service;

pub use container_service::ContainerService;
pub use health_service::HealthService;
pub use toast_factory::{ToastFactory, ToastOptions};
pub use toast_service::ToastService;
