//! Song and course identifiers
//!
//! Participants name a song or course by `"<group>/<leaf>"`, where the
//! leaf is the last segment of its storage path. Identifiers are opaque
//! to the protocol and only ever compared for equality.

/// The parts of a catalog song the protocol needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub group_name: String,
    /// Song directory, with either separator and an optional trailing one
    pub song_dir: String,
}

impl Song {
    pub fn new(group_name: impl Into<String>, song_dir: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            song_dir: song_dir.into(),
        }
    }
}

/// The parts of a catalog course the protocol needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub group_name: String,
    /// Course file path; empty for courses generated on the fly
    pub path: String,
}

impl Course {
    pub fn new(group_name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            group_name: group_name.into(),
            path: path.into(),
        }
    }
}

pub fn song_identifier(song: &Song) -> String {
    format!("{}/{}", song.group_name, leaf_segment(&song.song_dir))
}

/// Empty when the course has no backing file; such courses are never broadcast
pub fn course_identifier(course: &Course) -> String {
    if course.path.is_empty() {
        return String::new();
    }
    format!("{}/{}", course.group_name, leaf_segment(&course.path))
}

/// Last path segment, accepting `\` as a separator and ignoring trailing ones
fn leaf_segment(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    normalized
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}
