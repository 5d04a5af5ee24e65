//! Database Models

// Serde helpers
pub mod serde_helpers;

// Accounts
pub mod user;

// Catalog
pub mod menu_item;
pub mod restaurant;

// Orders
pub mod order;

// Re-exports
pub use menu_item::{CustomizationGroup, CustomizationOption, MenuItem, MenuItemCreate, MenuItemUpdate};
pub use order::{
    CancellationInfo, ChosenCustomization, DeliveryTracking, LocationPing, Order, OrderItem,
    OrderPricing, OrderRating, OrderStatus, OrderType, PaymentInfo, PaymentStatus, TimelineEntry,
    generate_order_number,
};
pub use restaurant::{Address, OpeningHours, Restaurant, RestaurantCreate, RestaurantUpdate};
pub use user::{User, UserAddress, UserProfile, UserRole};
