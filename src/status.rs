#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Active,
    Pending,
    Inactive,
    Neutral,
}

/// Display class of a Status cell. Unknown values are `Neutral`.
pub fn classify(status: &str) -> StatusClass {
    match status.to_lowercase().as_str() {
        "active" => StatusClass::Active,
        "pending" => StatusClass::Pending,
        "inactive" => StatusClass::Inactive,
        _ => StatusClass::Neutral,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values_ignore_case() {
        assert_eq!(classify("Active"), StatusClass::Active);
        assert_eq!(classify("PENDING"), StatusClass::Pending);
        assert_eq!(classify("inactive"), StatusClass::Inactive);
    }

    #[test]
    fn unknown_values_are_neutral() {
        assert_eq!(classify(""), StatusClass::Neutral);
        assert_eq!(classify("removed"), StatusClass::Neutral);
        assert_eq!(classify(" active"), StatusClass::Neutral);
    }
}
