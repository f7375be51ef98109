//! Consultas SQL por entidade
//!
//! Todas as funções aceitam qualquer executor SQLite, de modo que rodam tanto
//! no pool quanto dentro de uma transação (`&mut *tx`).

pub mod appointments;
pub mod departments;
pub mod doctors;
pub mod treatments;
pub mod users;
