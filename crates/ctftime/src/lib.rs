// CTFtime catalog client
//
// Looks up a single event by its numeric CTFtime id and converts it into a
// `NewEvent` ready for the agenda.

mod client;
mod types;

pub use client::{CtftimeClient, DEFAULT_CTFTIME_API_URL};
