pub mod activity;
pub mod backup;
pub mod journey;
pub mod market;
pub mod monitor;
pub mod note;
pub mod point;
pub mod storage;
pub mod system;
pub mod weather;
