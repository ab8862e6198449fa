//! Typed failures of the library layer.
//!
//! Calendar arithmetic rejects bad arguments with [`CalendarError`]. Roster
//! loading reports [`RosterError`], which callers normally absorb into an
//! empty roster (see [`crate::roster::load_roster_or_empty`]).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalendarError {
    #[error("month must be within 1..=12, got {0}")]
    InvalidMonth(u32),

    #[error("year {0} is outside the supported calendar range")]
    InvalidYear(i32),
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster {}: {source}", .path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed roster{}: {reason}", origin_suffix(.path.as_deref()))]
    Malformed {
        path: Option<PathBuf>,
        reason: String,
    },
}

impl RosterError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn with_path(self, origin: &std::path::Path) -> Self {
        match self {
            Self::Malformed { reason, .. } => Self::Malformed {
                path: Some(origin.to_path_buf()),
                reason,
            },
            other => other,
        }
    }
}

fn origin_suffix(path: Option<&std::path::Path>) -> String {
    path.map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
