use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::info;
use url::Url;

use crate::error::ZakiError;

/// Hands a freshly issued password-reset token to its owner.
pub trait ResetDelivery: Send + Sync {
    fn deliver<'a>(&'a self, email: &'a str, token: &'a str) -> BoxFuture<'a, Result<(), ZakiError>>;
}

pub type SharedResetDelivery = Arc<dyn ResetDelivery>;

/// Writes the reset link to the log. Stands in for a mailer.
#[derive(Debug, Clone)]
pub struct LogDelivery {
    reset_url: Url,
}

impl LogDelivery {
    pub fn new(reset_url: &str) -> Result<Self, ZakiError> {
        Ok(Self {
            reset_url: Url::parse(reset_url)?,
        })
    }

    pub fn link(&self, token: &str) -> Url {
        let mut link = self.reset_url.clone();
        link.query_pairs_mut().append_pair("token", token);
        link
    }
}

impl ResetDelivery for LogDelivery {
    fn deliver<'a>(&'a self, email: &'a str, token: &'a str) -> BoxFuture<'a, Result<(), ZakiError>> {
        let link = self.link(token);
        Box::pin(async move {
            info!(email, link = %link, "password reset link");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_carries_the_token() {
        let delivery = LogDelivery::new("https://zaki.example/reset-password").expect("url");
        assert_eq!(
            delivery.link("abc_123").as_str(),
            "https://zaki.example/reset-password?token=abc_123"
        );
    }

    #[tokio::test]
    async fn log_delivery_succeeds() {
        let delivery = LogDelivery::new("http://localhost:8000/reset-password").expect("url");
        delivery.deliver("a@example.com", "t").await.expect("delivered");
    }
}
