//! Targetprocess REST API constants

/// REST API v1 root, relative to the account base URL
pub const API_V1_PATH: &str = "/api/v1";

/// Type discovery endpoint, relative to the API root
pub const META_ENDPOINT: &str = "Index/meta";

/// Value of the `format` query parameter for JSON responses
pub const FORMAT_JSON: &str = "json";

/// Query parameter carrying the token in API-key mode
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Namespace marker callers use for custom fields (`CustomField.Risk`)
pub const CUSTOM_FIELD_MARKER: &str = "CustomField.";

/// Prefix the wire API uses for custom fields (`cf_Risk`)
pub const CUSTOM_FIELD_WIRE_PREFIX: &str = "cf_";

/// Header carrying the per-request correlation id
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Well-known entity types, used when type discovery is unavailable
pub const FALLBACK_ENTITY_TYPES: &[&str] = &[
    "UserStory",
    "Bug",
    "Task",
    "Feature",
    "Epic",
    "PortfolioEpic",
    "Request",
    "Impediment",
    "TestCase",
    "TestPlan",
    "TestPlanRun",
    "Project",
    "Program",
    "Team",
    "TeamIteration",
    "Iteration",
    "Release",
    "Build",
    "Comment",
    "Attachment",
    "Time",
    "Assignment",
    "EntityState",
    "Priority",
    "Severity",
    "Process",
    "GeneralUser",
    "User",
    "Role",
    "Tag",
];
