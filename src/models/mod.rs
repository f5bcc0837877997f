pub mod event;
pub mod notification;
