use regex::Regex;
use rust_decimal::Decimal;

use phonedesk_core::domain::action::{Action, Booking, LineItem, Order};
use phonedesk_core::domain::call::TranscriptEntry;

pub const DEFAULT_BOOKING_NAME: &str = "Phone Booking";

/// Digits or a spoken count up to twelve.
const QUANTITY: &str =
    r"\d+|an|a|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve";

/// One menu item family: a pattern exposing `qty` and optional `variant`
/// groups, priced per unit.
#[derive(Clone, Debug)]
pub struct ItemRule {
    pub category: String,
    pattern: Regex,
    pub default_variant: Option<String>,
    pub unit_price: Decimal,
}

impl ItemRule {
    /// `variants` is a `|`-separated alternation; leave it empty for items
    /// without variants.
    pub fn new(
        category: &str,
        variants: &str,
        variant_required: bool,
        default_variant: Option<&str>,
        unit_price: Decimal,
    ) -> Result<Self, regex::Error> {
        let noun = regex::escape(category);
        let pattern = match (variants.is_empty(), variant_required) {
            (true, _) => format!(r"(?i)\b(?P<qty>{QUANTITY})\s+{noun}s?\b"),
            (false, true) => {
                format!(r"(?i)\b(?P<qty>{QUANTITY})\s+(?P<variant>{variants})\s+{noun}s?\b")
            }
            (false, false) => {
                format!(r"(?i)\b(?P<qty>{QUANTITY})\s+(?:(?P<variant>{variants})\s+)?{noun}s?\b")
            }
        };

        Ok(Self {
            category: category.to_ascii_lowercase(),
            pattern: Regex::new(&pattern)?,
            default_variant: default_variant.map(str::to_string),
            unit_price,
        })
    }

    fn item_name(&self, variant: Option<&str>) -> String {
        match variant.map(normalize_variant).or_else(|| self.default_variant.clone()) {
            Some(variant) => format!("{variant} {}", self.category),
            None => self.category.clone(),
        }
    }
}

/// Service phrase that marks a booking request. `{party}` in the label is
/// replaced by the `party` group when the pattern has one.
#[derive(Clone, Debug)]
pub struct ServiceRule {
    pattern: Regex,
    pub label: String,
}

impl ServiceRule {
    pub fn new(pattern: &str, label: &str) -> Result<Self, regex::Error> {
        Ok(Self { pattern: Regex::new(pattern)?, label: label.to_string() })
    }
}

#[derive(Clone, Debug)]
pub struct BookingRules {
    pub services: Vec<ServiceRule>,
    day: Regex,
    time: Regex,
    name: Regex,
}

impl BookingRules {
    pub fn new(
        services: Vec<ServiceRule>,
        day: &str,
        time: &str,
        name: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self { services, day: Regex::new(day)?, time: Regex::new(time)?, name: Regex::new(name)? })
    }

    pub fn builtin() -> Result<Self, regex::Error> {
        let services = vec![
            ServiceRule::new(
                &format!(r"(?i)\btable for (?P<party>{QUANTITY})\b"),
                "Table for {party}",
            )?,
            ServiceRule::new(r"(?i)\b(?:reservation|reserve|book a table)\b", "Table reservation")?,
            ServiceRule::new(r"(?i)\bappointment\b", "Appointment")?,
        ];

        Self::new(
            services,
            r"(?i)\b(today|tonight|tomorrow|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
            r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b",
            r"(?i)\b(?:my name is|this is|name's|under the name)\s+(?P<name>[a-z][a-z'-]*)",
        )
    }
}

#[derive(Clone, Debug)]
pub struct ExtractionRules {
    pub items: Vec<ItemRule>,
    pub booking: BookingRules,
}

impl ExtractionRules {
    /// Biryani and samosa items plus table and appointment bookings.
    pub fn builtin() -> Result<Self, regex::Error> {
        let items = vec![
            ItemRule::new(
                "biryani",
                "chicken|mutton|vegetable|veg|paneer",
                true,
                None,
                Decimal::from(15),
            )?,
            ItemRule::new("samosa", "vegetable|veg|chicken", false, Some("vegetable"), Decimal::from(5))?,
        ];

        Ok(Self { items, booking: BookingRules::builtin()? })
    }
}

/// Turns free conversation text into a structured order or booking.
#[derive(Clone, Debug)]
pub struct ActionExtractor {
    rules: ExtractionRules,
    pickup_eta: String,
}

impl ActionExtractor {
    pub fn new(rules: ExtractionRules, pickup_eta: impl Into<String>) -> Self {
        Self { rules, pickup_eta: pickup_eta.into() }
    }

    pub fn extract(&self, prior: &[TranscriptEntry], utterance: &str, reply: &str) -> Option<Action> {
        let mut parts = prior.iter().map(|entry| entry.text.as_str()).collect::<Vec<_>>();
        parts.push(utterance);
        parts.push(reply);
        self.extract_text(&parts.join("\n"))
    }

    /// Orders win over bookings when both could be read from the text.
    pub fn extract_text(&self, text: &str) -> Option<Action> {
        if let Some(order) = self.extract_order(text) {
            return Some(Action::Order(order));
        }
        self.extract_booking(text).map(Action::Booking)
    }

    fn extract_order(&self, text: &str) -> Option<Order> {
        let mut mentions = Vec::new();
        for rule in &self.rules.items {
            for captures in rule.pattern.captures_iter(text) {
                let Some(quantity) = captures.name("qty").and_then(|m| parse_quantity(m.as_str()))
                else {
                    continue;
                };
                if quantity == 0 {
                    continue;
                }
                let start = captures.get(0).map(|m| m.start()).unwrap_or_default();
                let name = rule.item_name(captures.name("variant").map(|m| m.as_str()));
                mentions.push((start, LineItem { name, quantity, unit_price: rule.unit_price }));
            }
        }

        if mentions.is_empty() {
            return None;
        }

        mentions.sort_by_key(|(start, _)| *start);
        let mut items: Vec<LineItem> = Vec::new();
        for (_, mention) in mentions {
            match items.iter_mut().find(|item| item.name == mention.name) {
                Some(existing) => existing.quantity = mention.quantity,
                None => items.push(mention),
            }
        }

        Some(Order::new(items, self.pickup_eta.clone()))
    }

    fn extract_booking(&self, text: &str) -> Option<Booking> {
        let rules = &self.rules.booking;
        let service = rules.services.iter().find_map(|rule| {
            let captures = rule.pattern.captures_iter(text).last()?;
            let party = captures
                .name("party")
                .and_then(|m| parse_quantity(m.as_str()))
                .map(|party| party.to_string())
                .unwrap_or_default();
            Some(rule.label.replace("{party}", &party))
        })?;

        let day = rules.day.find_iter(text).last().map(|m| m.as_str().to_ascii_lowercase());
        let time = rules.time.captures_iter(text).last().map(|captures| {
            let hour = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
            let meridiem = captures.get(3).map(|m| m.as_str().to_ascii_lowercase()).unwrap_or_default();
            match captures.get(2) {
                Some(minutes) => format!("{hour}:{}{meridiem}", minutes.as_str()),
                None => format!("{hour}{meridiem}"),
            }
        });

        let date_time = match (day, time) {
            (Some(day), Some(time)) => format!("{day} {time}"),
            (Some(day), None) => day,
            (None, Some(time)) => time,
            (None, None) => return None,
        };

        let customer_name = rules
            .name
            .captures_iter(text)
            .last()
            .and_then(|captures| captures.name("name").map(|m| capitalize(m.as_str())))
            .unwrap_or_else(|| DEFAULT_BOOKING_NAME.to_string());

        Some(Booking { customer_name, service, date_time })
    }
}

fn normalize_variant(variant: &str) -> String {
    let lowered = variant.to_ascii_lowercase();
    match lowered.as_str() {
        "veg" => "vegetable".to_string(),
        _ => lowered,
    }
}

fn parse_quantity(raw: &str) -> Option<u32> {
    let lowered = raw.to_ascii_lowercase();
    let value = match lowered.as_str() {
        "a" | "an" | "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        digits => return digits.parse().ok(),
    };
    Some(value)
}

fn capitalize(word: &str) -> String {
    let mut characters = word.chars();
    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
