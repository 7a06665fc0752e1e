pub mod directory;
pub mod query;
pub mod session;

use serde::{Deserialize, Serialize};

/// A subject area answered by exactly one specialist tool.
///
/// Variant order is the composition priority: when several domains answer one
/// query their sections are assembled in this order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Academic,
    Calendar,
    Financial,
    Hostel,
    Library,
    Administrative,
}

impl Domain {
    pub const PRIORITY: [Domain; 6] = [
        Domain::Academic,
        Domain::Calendar,
        Domain::Financial,
        Domain::Hostel,
        Domain::Library,
        Domain::Administrative,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Academic => "academic",
            Self::Calendar => "calendar",
            Self::Financial => "financial",
            Self::Hostel => "hostel",
            Self::Library => "library",
            Self::Administrative => "administrative",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Academic => "Academic",
            Self::Calendar => "Calendar",
            Self::Financial => "Financial",
            Self::Hostel => "Hostel",
            Self::Library => "Library",
            Self::Administrative => "Administrative",
        }
    }

    /// Header used for this domain's section in a composed answer.
    pub fn section_label(self) -> &'static str {
        match self {
            Self::Academic => "Academic Info",
            Self::Calendar => "Calendar Info",
            Self::Financial => "Financial Info",
            Self::Hostel => "Hostel Info",
            Self::Library => "Library Info",
            Self::Administrative => "Administrative Info",
        }
    }

    pub fn tool_name(self) -> &'static str {
        match self {
            Self::Academic => "get_course_info",
            Self::Calendar => "get_schedule_info",
            Self::Financial => "get_financial_info",
            Self::Hostel => "get_hostel_info",
            Self::Library => "get_library_info",
            Self::Administrative => "get_administrative_info",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|domain| domain.tool_name() == name)
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Domain {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|domain| domain.as_str() == normalized)
            .ok_or_else(|| format!("unknown domain `{value}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::Domain;

    #[test]
    fn priority_matches_declaration_order() {
        let mut sorted = Domain::PRIORITY.to_vec();
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, Domain::PRIORITY.to_vec());
        assert!(Domain::Calendar < Domain::Financial);
    }

    #[test]
    fn tool_names_resolve_back_to_domains() {
        for domain in Domain::PRIORITY {
            assert_eq!(Domain::from_tool_name(domain.tool_name()), Some(domain));
        }
        assert_eq!(Domain::from_tool_name("get_weather"), None);
    }

    #[test]
    fn parses_domain_names_case_insensitively() {
        assert_eq!(" Hostel ".parse::<Domain>(), Ok(Domain::Hostel));
        assert!("weather".parse::<Domain>().is_err());
    }
}
