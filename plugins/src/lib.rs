//! Concrete collaborators for `domreplay-core`: codecs, asset resolvers,
//! the replace-style tree diff and a console replay plugin.

pub mod assets;
pub mod codec;
pub mod console;
pub mod diff;
pub mod factory;
