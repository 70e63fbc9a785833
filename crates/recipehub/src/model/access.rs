use chrono::{DateTime, Utc};

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessLevel {
    NoAccess,
    Read,
    Write,
    Share,
}

impl AccessLevel {
    pub fn code(self) -> i64 {
        match self {
            AccessLevel::NoAccess => 1,
            AccessLevel::Read => 2,
            AccessLevel::Write => 3,
            AccessLevel::Share => 4,
        }
    }

    pub fn from_code(code: i64) -> Self {
        match code {
            1 => AccessLevel::NoAccess,
            2 => AccessLevel::Read,
            3 => AccessLevel::Write,
            4 => AccessLevel::Share,
            other => {
                log::warn!("Unknown access level {}, treating as no access", other);
                AccessLevel::NoAccess
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AccessLevel::NoAccess => "No Access",
            AccessLevel::Read => "Read Access",
            AccessLevel::Write => "Write Access",
            AccessLevel::Share => "Share Access",
        }
    }
}

/// Grants a user access to a project.
#[derive(Debug, Clone, PartialEq)]
pub struct Access {
    pub id: i64,
    pub user: UserId,
    pub project_id: i64,
    pub level: AccessLevel,
    pub date: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_codes_round_trip() {
        for level in [
            AccessLevel::NoAccess,
            AccessLevel::Read,
            AccessLevel::Write,
            AccessLevel::Share,
        ] {
            assert_eq!(AccessLevel::from_code(level.code()), level);
        }
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(AccessLevel::Share > AccessLevel::Write);
        assert!(AccessLevel::Write > AccessLevel::Read);
        assert_eq!(AccessLevel::Write.label(), "Write Access");
    }
}
