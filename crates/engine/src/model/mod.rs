pub mod bench;
pub mod user;

pub use bench::{BenchEffect, BenchModel, BenchSnapshot, TimerKind};
pub use user::UserModel;
