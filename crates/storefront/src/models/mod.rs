//! Domain models for the storefront.
//!
//! Row types double as API payloads: every field serialized here is safe to
//! send to clients (password hashes never leave the repository layer).

pub mod catalog;
pub mod contact;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{Categoria, CategoriaConConteo, CategoriaInput, CategoriaRef, Pastel, PastelInput};
pub use contact::{NuevoReporte, ReporteContacto};
pub use order::{NuevoPedido, NuevoPedidoItem, Pedido, PedidoConItems, PedidoItem};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{NuevoUsuario, Usuario, UsuarioChanges};
