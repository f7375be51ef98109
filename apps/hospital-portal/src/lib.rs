//! Portal hospitalar: cadastro de pacientes, agendamento de consultas,
//! registro de atendimentos e administração de médicos.
//!
//! A lógica vive em `services`; `http` só traduz requisições e respostas.

pub mod config;
pub mod error;
pub mod http;
pub mod outcome;
pub mod services;
pub mod session;
pub mod telemetry;

/// Metadados de build gerados por `built`
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub use config::PortalConfig;
pub use error::ServiceError;
