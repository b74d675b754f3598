//! Data models shared between the API layer and the repository.

mod berita;
mod keaktifan;
mod message;
mod pembayaran;
mod santri;
mod user;

pub use berita::*;
pub use keaktifan::*;
pub use message::*;
pub use pembayaran::*;
pub use santri::*;
pub use user::*;
