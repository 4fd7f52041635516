pub mod health;
pub mod toasts;
