//! Output generation: the playlist and guide serializers and atomic publishing

pub mod playlist;
pub mod publish;
pub mod xmltv;

pub use playlist::render_playlist;
pub use publish::{write_atomic, write_atomic_blocking};
pub use xmltv::render_guide;
