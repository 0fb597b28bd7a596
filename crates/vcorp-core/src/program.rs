// Program identifiers and the small enums shared by memberships and
// program accounts.

use std::fmt;

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// The five programs the network serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgramId {
    SpiritOf,
    Fyht4,
    Taekwondo,
    EdynsGate,
    Homeschool,
}

impl ProgramId {
    pub const ALL: [ProgramId; 5] = [
        ProgramId::SpiritOf,
        ProgramId::Fyht4,
        ProgramId::Taekwondo,
        ProgramId::EdynsGate,
        ProgramId::Homeschool,
    ];

    /// The canonical lowercase identifier stored in membership records.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramId::SpiritOf => "spiritof",
            ProgramId::Fyht4 => "fyht4",
            ProgramId::Taekwondo => "taekwondo",
            ProgramId::EdynsGate => "edynsgate",
            ProgramId::Homeschool => "homeschool",
        }
    }

    /// Parse a program identifier, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "spiritof" => Some(ProgramId::SpiritOf),
            "fyht4" => Some(ProgramId::Fyht4),
            "taekwondo" => Some(ProgramId::Taekwondo),
            "edynsgate" => Some(ProgramId::EdynsGate),
            "homeschool" => Some(ProgramId::Homeschool),
            _ => None,
        }
    }

    /// Human-facing program name for emails and dashboards.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProgramId::SpiritOf => "Spirit Of",
            ProgramId::Fyht4 => "FYHT4",
            ProgramId::Taekwondo => "Taekwondo",
            ProgramId::EdynsGate => "Edyn's Gate",
            ProgramId::Homeschool => "Homeschool",
        }
    }

    /// Collection that holds this program's account documents.
    pub fn account_collection(&self) -> &'static str {
        match self {
            ProgramId::SpiritOf => "spiritof_accounts",
            ProgramId::Fyht4 => "fyht4_accounts",
            ProgramId::Taekwondo => "taekwondo_accounts",
            ProgramId::EdynsGate => "edynsgate_accounts",
            ProgramId::Homeschool => "homeschool_accounts",
        }
    }

    /// Collection that holds dependents (students/children) for this program.
    pub fn dependent_collection(&self) -> &'static str {
        match self {
            ProgramId::SpiritOf => "spiritof_students",
            ProgramId::Fyht4 => "fyht4_students",
            ProgramId::Taekwondo => "taekwondo_students",
            ProgramId::EdynsGate => "edynsgate_children",
            ProgramId::Homeschool => "homeschool_students",
        }
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
}

impl Default for AccountStatus {
    fn default() -> Self {
        AccountStatus::Pending
    }
}

/// Per-program membership status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipStatus {
    Pending,
    Active,
    Inactive,
    Suspended,
}

impl Default for MembershipStatus {
    fn default() -> Self {
        MembershipStatus::Pending
    }
}

/// Recurring charge cadence for program accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl ChargeFrequency {
    /// The next charge date after `from`. Weekly and biweekly advance by a
    /// fixed number of days; monthly advances by one calendar month, clamping
    /// to the last day of shorter months.
    pub fn advance(&self, from: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ChargeFrequency::Weekly => from + chrono::Duration::days(7),
            ChargeFrequency::Biweekly => from + chrono::Duration::days(14),
            ChargeFrequency::Monthly => from
                .checked_add_months(Months::new(1))
                .unwrap_or(from + chrono::Duration::days(30)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_program_parse_round_trip() {
        for program in ProgramId::ALL {
            assert_eq!(ProgramId::parse(program.as_str()), Some(program));
        }
        assert_eq!(ProgramId::parse("SpiritOf"), Some(ProgramId::SpiritOf));
        assert_eq!(ProgramId::parse("unknown"), None);
    }

    #[test]
    fn test_program_serde_lowercase() {
        let json = serde_json::to_string(&ProgramId::EdynsGate).unwrap();
        assert_eq!(json, "\"edynsgate\"");
        let parsed: ProgramId = serde_json::from_str("\"fyht4\"").unwrap();
        assert_eq!(parsed, ProgramId::Fyht4);
    }

    #[test]
    fn test_collections_are_distinct() {
        let mut names: Vec<&str> = ProgramId::ALL
            .iter()
            .flat_map(|p| [p.account_collection(), p.dependent_collection()])
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 10);
    }

    #[test]
    fn test_advance_weekly_and_biweekly() {
        let from = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            ChargeFrequency::Weekly.advance(from),
            Utc.with_ymd_and_hms(2025, 3, 8, 12, 0, 0).unwrap()
        );
        assert_eq!(
            ChargeFrequency::Biweekly.advance(from),
            Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_advance_monthly_clamps_short_months() {
        let jan31 = Utc.with_ymd_and_hms(2025, 1, 31, 9, 0, 0).unwrap();
        let next = ChargeFrequency::Monthly.advance(jan31);
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 9, 0, 0).unwrap());
    }
}
