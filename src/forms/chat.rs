use serde::{Deserialize, Serialize};
use serde_valid::Validate;

/// Body of a chat estimate request. Either field may carry the text.
#[derive(Serialize, Deserialize, Debug, Default, Validate)]
pub struct ChatForm {
    #[validate(max_length = 8000)]
    pub query: Option<String>,
    #[validate(max_length = 8000)]
    pub message: Option<String>,
}

impl ChatForm {
    /// First non-blank of `query` and `message`.
    pub fn text(&self) -> Option<&str> {
        [self.query.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|text| !text.is_empty())
    }
}
