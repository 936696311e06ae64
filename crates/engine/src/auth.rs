//! Static demo credential check.
//!
//! There is no session store: the issued token is a fixed placeholder and
//! nothing validates it afterwards.

use api_types::auth::DemoUser;

use crate::{EngineError, budget::DEMO_USER_ID};

pub const DEMO_PASSWORD: &str = "HireMe@2025!";
pub const DEMO_TOKEN: &str = "demo-token-123456";

#[derive(Debug, Clone)]
pub struct DemoCredential {
    pub email: String,
    pub password: String,
    pub user: DemoUser,
    pub token: String,
}

impl Default for DemoCredential {
    fn default() -> Self {
        Self {
            email: DEMO_USER_ID.to_string(),
            password: DEMO_PASSWORD.to_string(),
            user: DemoUser {
                id: "demo-user-1".to_string(),
                email: DEMO_USER_ID.to_string(),
                name: "Demo User".to_string(),
            },
            token: DEMO_TOKEN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: DemoUser,
    pub token: String,
}

impl DemoCredential {
    pub fn verify(&self, email: Option<&str>, password: Option<&str>) -> Result<Session, EngineError> {
        let (Some(email), Some(password)) = (
            email.filter(|email| !email.is_empty()),
            password.filter(|password| !password.is_empty()),
        ) else {
            return Err(EngineError::Validation(
                "Email and password are required".to_string(),
            ));
        };

        if email != self.email || password != self.password {
            return Err(EngineError::InvalidCredentials);
        }

        Ok(Session {
            user: self.user.clone(),
            token: self.token.clone(),
        })
    }
}
