use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub jwt_secret: Option<String>,
    pub strict_auth: bool,
    pub listen_addr: String,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let supabase_url = var("SUPABASE_URL").context("SUPABASE_URL must be set")?;
        let supabase_anon_key =
            var("SUPABASE_ANON_KEY").context("SUPABASE_ANON_KEY must be set")?;
        let jwt_secret = var("SUPABASE_JWT_SECRET");

        let strict_auth = match var("STRICT_AUTH") {
            Some(v) => v
                .trim()
                .parse::<bool>()
                .context("STRICT_AUTH must be true or false")?,
            None => false,
        };
        if strict_auth && jwt_secret.is_none() {
            anyhow::bail!("STRICT_AUTH requires SUPABASE_JWT_SECRET to be set");
        }

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            jwt_secret,
            strict_auth,
            listen_addr: var("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:8000".into()),
            cors_origin: var("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".into()),
        })
    }
}
