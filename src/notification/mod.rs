pub mod fanout;
pub mod pusher;
