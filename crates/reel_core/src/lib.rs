//! # Reel Core
//!
//! Types and traits for the ecosystem.
//!
//! Defines the protocol spoken between the job client and the backend boundary.
//!
//! - **[`JobRequest`](job::JobRequest)**: The flat parameter set posted to start a job.
//! - **[`JobEvent`](job::JobEvent)**: One newline-delimited JSON line of a job's progress stream.
//! - **[`VideoInfo`](info::VideoInfo)**: The result of a metadata lookup.
//! - **[`MediaBackend`](traits::MediaBackend)**: Trait for plugging the opaque media work into the server.

pub mod constants;
pub mod error;
pub mod info;
pub mod job;
pub mod traits;

pub mod prelude {
    pub use super::constants::*;
    pub use super::error::*;
    pub use super::info::*;
    pub use super::job::*;
    pub use super::traits::*;
}
