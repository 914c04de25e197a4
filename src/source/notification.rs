//! The payload handed to the push transport.
//!
//! Every source renders its native item into a `Notification` so the
//! transport never needs to know which storefront produced it.

/// A single push message, built fresh for each eligible item and dropped
/// once the transport has seen it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Notification {
    /// Body text shown to the user.
    pub message: String,

    /// Image attached to the push (banner, header art).
    pub image_url: Option<String>,

    /// Page opened when the notification is tapped.
    pub action_url: Option<String>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            image_url: None,
            action_url: None,
        }
    }

    pub fn with_image(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn with_action(mut self, action_url: Option<String>) -> Self {
        self.action_url = action_url;
        self
    }
}
