//! Configuração do portal, lida de variáveis de ambiente

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;

use hospital_db::DbConfig;

use crate::services::appointments::OwnershipPolicy;
use crate::telemetry::LogFormat;

/// Configuração do serviço
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub db: DbConfig,
    /// Endereço de escuta HTTP
    pub bind_addr: SocketAddr,
    /// Segredo HS256 dos tokens; gerado por processo quando ausente
    pub session_secret: Option<String>,
    pub session_ttl_minutes: i64,
    /// Senha inicial do usuário `admin`, usada só no primeiro bootstrap
    pub admin_password: String,
    /// Se médicos só podem concluir/cancelar as próprias consultas
    pub enforce_doctor_ownership: bool,
    pub max_concurrent_requests: usize,
    pub log_format: LogFormat,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            session_secret: None,
            session_ttl_minutes: 480,
            admin_password: "admin".to_string(),
            enforce_doctor_ownership: false,
            max_concurrent_requests: 64,
            log_format: LogFormat::Text,
        }
    }
}

impl PortalConfig {
    /// Lê a configuração do ambiente, partindo dos valores padrão
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup("HOSPITAL_DB_PATH") {
            config.db.db_path = path;
        }
        if let Some(raw) = lookup("HOSPITAL_DB_MAX_CONNECTIONS") {
            config.db.max_connections = parse("HOSPITAL_DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("HOSPITAL_BIND_ADDR") {
            config.bind_addr = parse("HOSPITAL_BIND_ADDR", &raw)?;
        }
        config.session_secret = lookup("HOSPITAL_SESSION_SECRET").filter(|s| !s.is_empty());
        if let Some(raw) = lookup("HOSPITAL_SESSION_TTL_MINUTES") {
            config.session_ttl_minutes = parse("HOSPITAL_SESSION_TTL_MINUTES", &raw)?;
        }
        if let Some(password) = lookup("HOSPITAL_ADMIN_PASSWORD").filter(|s| !s.is_empty()) {
            config.admin_password = password;
        }
        if let Some(raw) = lookup("HOSPITAL_ENFORCE_DOCTOR_OWNERSHIP") {
            config.enforce_doctor_ownership = parse("HOSPITAL_ENFORCE_DOCTOR_OWNERSHIP", &raw)?;
        }
        if let Some(raw) = lookup("HOSPITAL_MAX_CONCURRENT_REQUESTS") {
            config.max_concurrent_requests = parse("HOSPITAL_MAX_CONCURRENT_REQUESTS", &raw)?;
        }
        if let Some(raw) = lookup("HOSPITAL_LOG_FORMAT") {
            config.log_format = parse("HOSPITAL_LOG_FORMAT", &raw)?;
        }

        Ok(config)
    }

    pub fn ownership_policy(&self) -> OwnershipPolicy {
        if self.enforce_doctor_ownership {
            OwnershipPolicy::Enforced
        } else {
            OwnershipPolicy::Unchecked
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Valor inválido para {key}: {raw:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(pairs: &[(&str, &str)]) -> Result<PortalConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PortalConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() -> Result<()> {
        let config = from_map(&[])?;
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.admin_password, "admin");
        assert!(config.session_secret.is_none());
        assert_eq!(config.ownership_policy(), OwnershipPolicy::Unchecked);
        Ok(())
    }

    #[test]
    fn environment_overrides() -> Result<()> {
        let config = from_map(&[
            ("HOSPITAL_DB_PATH", "/tmp/h.db"),
            ("HOSPITAL_BIND_ADDR", "0.0.0.0:8080"),
            ("HOSPITAL_SESSION_SECRET", "s3cr3t"),
            ("HOSPITAL_ENFORCE_DOCTOR_OWNERSHIP", "true"),
            ("HOSPITAL_LOG_FORMAT", "json"),
        ])?;
        assert_eq!(config.db.db_path, "/tmp/h.db");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.session_secret.as_deref(), Some("s3cr3t"));
        assert_eq!(config.ownership_policy(), OwnershipPolicy::Enforced);
        assert_eq!(config.log_format, LogFormat::Json);
        Ok(())
    }

    #[test]
    fn invalid_values_are_errors() {
        assert!(from_map(&[("HOSPITAL_DB_MAX_CONNECTIONS", "muitas")]).is_err());
        assert!(from_map(&[("HOSPITAL_ENFORCE_DOCTOR_OWNERSHIP", "talvez")]).is_err());
        assert!(from_map(&[("HOSPITAL_LOG_FORMAT", "xml")]).is_err());
    }
}
