//! Assembles a PostgreSQL connection string from environment variables.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::ConfigError;

/// Loads `USER`, `PASSWORD`, `HOST`, `PORT`, `DBNAME` from the process
/// environment (optionally populated from a `.env` file via `dotenvy`) and
/// assembles them into a `postgresql://` DSN, percent-encoding the password
/// the way the original implementation's `quote_plus` did.
pub fn load_dsn() -> Result<String, ConfigError> {
    dotenvy::dotenv().ok();

    let user = require_env("USER")?;
    let password = require_env("PASSWORD")?;
    let host = require_env("HOST")?;
    let port = require_env("PORT")?;
    let dbname = require_env("DBNAME")?;

    Ok(build_dsn(&user, &password, &host, &port, &dbname))
}

fn require_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Env(key.to_string()))
}

fn build_dsn(user: &str, password: &str, host: &str, port: &str, dbname: &str) -> String {
    let encoded_password = utf8_percent_encode(password, NON_ALPHANUMERIC).to_string();
    format!("postgresql://{user}:{encoded_password}@{host}:{port}/{dbname}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_expected_dsn_shape() {
        let dsn = build_dsn("alice", "pw", "localhost", "5432", "crawl");
        assert_eq!(dsn, "postgresql://alice:pw@localhost:5432/crawl");
    }

    #[test]
    fn percent_encodes_password_special_characters() {
        let dsn = build_dsn("alice", "p@ss w/rd", "localhost", "5432", "crawl");
        assert!(dsn.contains("p%40ss%20w%2Frd"));
    }
}
