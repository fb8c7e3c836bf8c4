use crate::models::Requirement;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Already-structured requirements to match and price.
#[derive(Serialize, Deserialize, Debug, Validate)]
pub struct CalculateForm {
    #[validate(max_items = 1000)]
    pub requirements: Vec<Requirement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_numeric_cpu_fails_whole_form() {
        let result = serde_json::from_str::<CalculateForm>(
            r#"{"requirements":[
                {"Server Name":"a","CPU":2,"RAM":4,"Storage":"","Database":"None"},
                {"Server Name":"b","CPU":"two","RAM":4,"Storage":"","Database":"None"}
            ]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_requirements_key_fails() {
        assert!(serde_json::from_str::<CalculateForm>(r#"{"servers":[]}"#).is_err());
    }
}
