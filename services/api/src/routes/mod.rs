pub mod auth;
pub mod consultas;
pub mod medicos;
pub mod usuarios;
