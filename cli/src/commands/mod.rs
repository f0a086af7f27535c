pub mod cli;
pub mod frames;
pub mod live;
pub mod meta;
pub mod play;
pub mod recording;
