//! Data models for the admin API.
//!
//! - `Author`, `Avatar`: the authors resource as returned by the API
//! - `AuthorForm`, `AvatarUpload`, `AvatarChange`: add/edit payloads
//! - `Profile`: the logged-in operator

pub mod author;
pub mod profile;

pub use author::{Author, AuthorForm, Avatar, AvatarChange, AvatarUpload};
pub use profile::Profile;
