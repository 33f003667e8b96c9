//! # Events Module
//!
//! Progress reporting for front ends.
//!
//! ## Design
//! The service emits events through a channel, allowing any front end
//! (CLI, GUI, web) to subscribe and display progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Register(RegisterEvent::Progress(p)) = event {
//!             println!("Registered {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! service.register_with_events(request, &sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
