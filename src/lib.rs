pub mod modules;
pub mod shared;

pub use modules::report;
pub use modules::user;

#[cfg(test)]
mod tests;
