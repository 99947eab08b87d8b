//! Status enums for orders, payments and user roles.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Account role.
///
/// `vendedor` accounts can view the back-office (products, orders, contact
/// reports) but only `admin` accounts can change the catalog or users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Storefront customer.
    #[default]
    User,
    /// Full back-office access.
    Admin,
    /// Read-only back-office access.
    Vendedor,
}

impl Role {
    /// Whether this role can access the back-office at all.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Admin | Self::Vendedor)
    }

    /// Parse a role name as used on the wire and in the database.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "vendedor" => Some(Self::Vendedor),
            _ => None,
        }
    }

    /// Wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::Vendedor => "vendedor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order (pedido) lifecycle status.
///
/// ```text
/// pendiente ──> pagado ──> enviado ──> entregado
///     │            │
///     └────────────┴──> cancelado
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting payment (PayPal approval).
    #[default]
    Pendiente,
    /// Payment captured.
    Pagado,
    /// Handed to delivery.
    Enviado,
    /// Delivered to the customer.
    Entregado,
    /// Cancelled; stock has been restored.
    Cancelado,
}

impl OrderStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pendiente,
        Self::Pagado,
        Self::Enviado,
        Self::Entregado,
        Self::Cancelado,
    ];

    /// Whether an order in this status may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pendiente, Self::Pagado | Self::Cancelado)
                | (Self::Pagado, Self::Enviado | Self::Cancelado)
                | (Self::Enviado, Self::Entregado)
        )
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Entregado | Self::Cancelado)
    }

    /// Whether cancelling from this status must put stock back.
    #[must_use]
    pub const fn holds_stock(self) -> bool {
        matches!(self, Self::Pendiente | Self::Pagado)
    }

    /// Wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Pagado => "pagado",
            Self::Enviado => "enviado",
            Self::Entregado => "entregado",
            Self::Cancelado => "cancelado",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a pedido is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Simulated card payment, settled immediately.
    Tarjeta,
    /// PayPal order, settled on capture.
    Paypal,
}

impl PaymentMethod {
    /// Wire/database name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tarjeta => "tarjeta",
            Self::Paypal => "paypal",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_staff() {
        assert!(Role::Admin.is_staff());
        assert!(Role::Vendedor.is_staff());
        assert!(!Role::User.is_staff());
    }

    #[test]
    fn test_role_wire_format() {
        assert_eq!(serde_json::to_string(&Role::Vendedor).unwrap(), "\"vendedor\"");
        assert_eq!(Role::from_name(" ADMIN "), Some(Role::Admin));
        assert_eq!(Role::from_name("root"), None);
    }

    #[test]
    fn test_order_status_transitions() {
        use OrderStatus::*;

        assert!(Pendiente.can_transition_to(Pagado));
        assert!(Pendiente.can_transition_to(Cancelado));
        assert!(Pagado.can_transition_to(Enviado));
        assert!(Pagado.can_transition_to(Cancelado));
        assert!(Enviado.can_transition_to(Entregado));

        assert!(!Pendiente.can_transition_to(Enviado));
        assert!(!Enviado.can_transition_to(Cancelado));
        assert!(!Pagado.can_transition_to(Pendiente));

        for next in OrderStatus::ALL {
            assert!(!Entregado.can_transition_to(next));
            assert!(!Cancelado.can_transition_to(next));
        }
    }

    #[test]
    fn test_order_status_stock_hold() {
        assert!(OrderStatus::Pendiente.holds_stock());
        assert!(OrderStatus::Pagado.holds_stock());
        assert!(!OrderStatus::Enviado.holds_stock());
    }

    #[test]
    fn test_payment_method_serde() {
        let method: PaymentMethod = serde_json::from_str("\"paypal\"").unwrap();
        assert_eq!(method, PaymentMethod::Paypal);
        assert_eq!(PaymentMethod::Tarjeta.to_string(), "tarjeta");
    }
}
