/// Boundary to the external credential check. The gate hands over the
/// untouched username and password only after the admission decision; a
/// real deployment implements this against its user store.
pub trait CredentialValidator: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Single fixed credential pair for demos and local development. Not a
/// credential store: no hashing, one account.
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

impl CredentialValidator for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_credentials_verify_exact_match_only() {
        let v = StaticCredentials::new("demo", "password");
        assert!(v.verify("demo", "password"));
        assert!(!v.verify("demo", "wrong"));
        assert!(!v.verify("Demo", "password"));
        assert!(!v.verify("", ""));
    }
}
