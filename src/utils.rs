use chrono::{DateTime, Utc};
use std::{future::Future, pin::Pin};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub fn from_unix(time: u32) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(i64::from(time), 0)
}

/// Joins a remote directory and a name for display.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_owned()
    } else if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Non-empty segments of an absolute remote path.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|c| !c.is_empty()).collect()
}
