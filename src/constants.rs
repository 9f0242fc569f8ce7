/// Status labels the engine assigns itself. Any other status text is
/// carried through from the source systems untouched.
pub mod status {
    pub const NEW: &str = "New";
    pub const UNTOUCHED: &str = "Untouched";
    pub const REOPEN: &str = "Reopen";
    pub const NEEDS_REVIEW: &str = "Needs Review";
    pub const COMPLETED: &str = "Completed";
    pub const HOLD: &str = "Hold";
}

/// PISA users whose cases belong to this team
pub const DEFAULT_PISA_USERS: [&str; 6] = [
    "Goswami Sonali",
    "Patil Jayapal Gowd",
    "Ranganath Chilamakuri",
    "Sridhar Divya",
    "Sunitha S",
    "Varunkumar N",
];

/// RGPA assignee group marker
pub const DEFAULT_RGPA_ASSIGNEE_MARKER: &str = "VMD GS OSP-NA (GS/OMD-APAC)";

pub const DEFAULT_WORKON_PROCESSOR: &str = "Jayapal";
pub const DEFAULT_RGPA_PROCESSOR: &str = "Divya";

/// Country codes handled by the APAC team; supplier requests for these are excluded
pub const DEFAULT_APAC_COUNTRIES: [&str; 16] = [
    "AU", "BD", "CN", "HK", "ID", "IN", "JP", "KR", "LK", "MY", "NZ", "PH", "SG", "TH", "TW", "VN",
];

/// Registry/mapping column names after column-name normalization
pub const REGION_MAPPING_CODE_COLUMN: &str = "r3_coco";
pub const REGION_MAPPING_REGION_COLUMN: &str = "region";

/// Channel whose extracts routinely omit the company code
pub const COMPANY_CODE_BACKFILL_CHANNEL: &str = "PM7";
pub const COMPANY_CODE_PREFIX_LEN: usize = 4;
