/// Secret value whose `Debug` output never shows the content.
pub struct Secret(String);

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

/// Basic-auth credentials for the search store.
#[derive(Debug)]
pub struct Credentials {
    pub user: String,
    pub password: Secret,
}

impl Credentials {
    /// Both parts are required; a user without a password (or the reverse)
    /// is treated as anonymous access.
    pub fn from_parts(user: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (user, password) {
            (Some(user), Some(password)) if !user.is_empty() => Some(Self {
                user: user.to_string(),
                password: Secret::from(password),
            }),
            _ => None,
        }
    }

    pub fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.basic_auth(&self.user, Some(self.password.expose()))
    }
}
