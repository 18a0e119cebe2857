pub mod registry;
pub mod state_machine;
