mod common;
mod java;
mod kotlin;

pub use common::{ParseResult, Parser};
pub use java::JavaParser;
pub use kotlin::KotlinParser;
