pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{entry_value, subscription, video, Harness, NOW};
#[allow(unused_imports)]
pub use mocks::{FaultyStore, ScriptedRemote};
