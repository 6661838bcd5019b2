pub mod emit;
pub mod patterns;
pub mod rewrite;

pub use rewrite::Instrumenter;
