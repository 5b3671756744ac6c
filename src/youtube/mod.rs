//! YouTube Data API v3 client and Google OAuth.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;

pub use auth::{DeviceLogin, YouTubeAuth};
pub use client::{VideoPlatform, YouTubeClient};
pub use error::YouTubeError;
pub use models::{VideoCandidate, VideoDetails};
