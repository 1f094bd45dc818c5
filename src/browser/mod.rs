pub mod chrome;

pub use chrome::{ChromeProvider, ChromeSession};
