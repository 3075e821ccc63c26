pub mod payment_registry;

pub use payment_registry::PaymentRegistry;
