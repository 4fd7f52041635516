pub mod clock;
pub mod event;
pub mod resolve;
pub mod selection;
pub mod toast;
