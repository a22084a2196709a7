pub mod audio_boundaries;
pub mod classify;
pub mod matcher;
pub mod normalize;
pub mod sequence;
pub mod similarity;
pub mod timeline;
