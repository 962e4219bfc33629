use std::fmt;

/// Fulfillment workflow for a customer order.
///
/// The tracking page's progress bar assumes exactly this forward order, with
/// `Cancelled` as a side exit that renders as an empty bar. Staff may set any
/// of these values; only the enumeration itself is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "preparing" => Some(Self::Preparing),
            "ready" => Some(Self::Ready),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Human-facing label for tracking and polling responses.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::Ready => "Ready",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Progress shown on the tracking page.
    pub fn progress_percent(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Confirmed => 25,
            Self::Preparing => 50,
            Self::Ready => 75,
            Self::Completed => 100,
            Self::Cancelled => 0,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the customer wants the order fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    DineIn,
    Takeaway,
}

impl OrderType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dine_in" => Some(Self::DineIn),
            "takeaway" => Some(Self::Takeaway),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DineIn => "dine_in",
            Self::Takeaway => "takeaway",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::DineIn => "Dine In",
            Self::Takeaway => "Takeaway",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_matches_the_tracking_page_table() {
        assert_eq!(OrderStatus::Pending.progress_percent(), 0);
        assert_eq!(OrderStatus::Confirmed.progress_percent(), 25);
        assert_eq!(OrderStatus::Preparing.progress_percent(), 50);
        assert_eq!(OrderStatus::Ready.progress_percent(), 75);
        assert_eq!(OrderStatus::Completed.progress_percent(), 100);
        assert_eq!(OrderStatus::Cancelled.progress_percent(), 0);
    }

    #[test]
    fn every_status_round_trips_through_its_string_form() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_strings_are_rejected() {
        assert_eq!(OrderStatus::parse("delivered"), None);
        assert_eq!(OrderStatus::parse("PENDING"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }

    #[test]
    fn display_names_are_human_readable() {
        assert_eq!(OrderStatus::Preparing.display_name(), "Preparing");
        assert_eq!(OrderType::DineIn.display_name(), "Dine In");
    }

    #[test]
    fn order_types_round_trip_and_reject_garbage() {
        assert_eq!(OrderType::parse("dine_in"), Some(OrderType::DineIn));
        assert_eq!(OrderType::parse("takeaway"), Some(OrderType::Takeaway));
        assert_eq!(OrderType::parse("delivery"), None);
    }
}
