//! Catalog operations outside ranked search: play-target resolution, track
//! expansion, random picks and paged browsing.

pub mod library_browser;
pub mod play_target;
