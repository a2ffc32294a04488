use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") | Some("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub supabase: SupabaseConfig,
    pub jwt: JwtConfig,
    pub environment: Environment,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let supabase = SupabaseConfig {
            url: std::env::var("SUPABASE_URL")?,
            api_key: std::env::var("SUPABASE_KEY")?,
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(30),
        };
        let environment = Environment::parse(std::env::var("APP_ENV").ok().as_deref());
        Ok(Self {
            supabase,
            jwt,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_prod_aliases() {
        assert_eq!(Environment::parse(Some("production")), Environment::Production);
        assert_eq!(Environment::parse(Some("prod")), Environment::Production);
    }

    #[test]
    fn environment_defaults_to_development() {
        assert_eq!(Environment::parse(None), Environment::Development);
        assert_eq!(Environment::parse(Some("staging")), Environment::Development);
    }
}
