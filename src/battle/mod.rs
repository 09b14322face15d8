pub mod action_stack;
pub mod ai;
pub mod commands;
pub mod engine;
pub mod state;
pub mod stats;

#[cfg(test)]
pub(crate) mod tests;
