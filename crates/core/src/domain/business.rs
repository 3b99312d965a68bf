use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOURS: &str = "Mon-Sun 11AM-10PM";
pub const DEFAULT_MENU: &str = "Full menu available";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusinessId(pub String);

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Facts about the business a call was routed to. Immutable for the life of a
/// call; the prompt is rebuilt from these on every turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessContext {
    pub id: BusinessId,
    pub name: String,
    pub business_type: String,
    pub hours: Option<String>,
    pub menu: Option<String>,
    pub services: Option<String>,
    /// The dialed number that routes calls to this business.
    pub routing_key: String,
}

impl BusinessContext {
    pub fn new(id: BusinessId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            business_type: "Restaurant".to_string(),
            hours: None,
            menu: None,
            services: None,
            routing_key: String::new(),
        }
    }

    pub fn hours_or_default(&self) -> &str {
        non_empty(self.hours.as_deref()).unwrap_or(DEFAULT_HOURS)
    }

    pub fn menu_or_default(&self) -> &str {
        non_empty(self.menu.as_deref())
            .or_else(|| non_empty(self.services.as_deref()))
            .unwrap_or(DEFAULT_MENU)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{BusinessContext, BusinessId, DEFAULT_HOURS, DEFAULT_MENU};

    #[test]
    fn missing_facts_fall_back_to_defaults() {
        let business = BusinessContext::new(BusinessId("rec-1".to_string()), "Spice Route");
        assert_eq!(business.hours_or_default(), DEFAULT_HOURS);
        assert_eq!(business.menu_or_default(), DEFAULT_MENU);
    }

    #[test]
    fn services_stand_in_for_missing_menu() {
        let mut business = BusinessContext::new(BusinessId("rec-2".to_string()), "Fade Studio");
        business.menu = Some("  ".to_string());
        business.services = Some("Haircut, beard trim".to_string());
        assert_eq!(business.menu_or_default(), "Haircut, beard trim");
    }
}
