use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geo/device profile of a request, produced by the out-of-scope profiler
/// and consumed as-is. The engine never derives or validates these values;
/// in particular it does not enforce that exactly one of the desktop/tablet/
/// phone flags is set.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct VisitorProfile {
    pub ip_address: String,
    pub city: Option<String>,
    pub user_agent: String,
    pub device: String,
    pub platform: String,
    pub platform_version: String,
    pub browser: String,
    pub browser_version: String,
    pub is_desktop: bool,
    pub is_tablet: bool,
    pub is_phone: bool,
    pub is_robot: bool,
}

/// Profiling record linked 1:1 to a registration via the session id.
/// Created once at first registration creation, never mutated.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Visitor {
    pub session_id: String,
    pub ip_address: String,
    pub city: Option<String>,
    pub user_agent: String,
    pub device: String,
    pub platform: String,
    pub platform_version: String,
    pub browser: String,
    pub browser_version: String,
    pub is_desktop: bool,
    pub is_tablet: bool,
    pub is_phone: bool,
    pub is_robot: bool,
    pub created_at: DateTime<Utc>,
}

impl Visitor {
    pub fn from_profile(session_id: impl Into<String>, profile: &VisitorProfile) -> Self {
        Self {
            session_id: session_id.into(),
            ip_address: profile.ip_address.clone(),
            city: profile.city.clone(),
            user_agent: profile.user_agent.clone(),
            device: profile.device.clone(),
            platform: profile.platform.clone(),
            platform_version: profile.platform_version.clone(),
            browser: profile.browser.clone(),
            browser_version: profile.browser_version.clone(),
            is_desktop: profile.is_desktop,
            is_tablet: profile.is_tablet,
            is_phone: profile.is_phone,
            is_robot: profile.is_robot,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_profile_copies_all_attributes() {
        let profile = VisitorProfile {
            ip_address: "203.0.113.7".into(),
            city: Some("Riga".into()),
            user_agent: "Mozilla/5.0".into(),
            device: "iPhone".into(),
            platform: "iOS".into(),
            platform_version: "17.2".into(),
            browser: "Safari".into(),
            browser_version: "17.0".into(),
            is_desktop: false,
            is_tablet: false,
            is_phone: true,
            is_robot: false,
        };

        let visitor = Visitor::from_profile("s1", &profile);
        assert_eq!(visitor.session_id, "s1");
        assert_eq!(visitor.city.as_deref(), Some("Riga"));
        assert!(visitor.is_phone);
        assert!(!visitor.is_desktop);
    }
}
