pub mod events;
pub mod run;
