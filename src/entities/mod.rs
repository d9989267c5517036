//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod auction_item;
pub mod auction_session;
pub mod bill;
pub mod buyer;
pub mod category;
pub mod commissioner;
pub mod enums;
pub mod farmer;
pub mod password_reset;
pub mod product;

// Re-export specific types to avoid conflicts
pub use auction_item::{
    Column as AuctionItemColumn, Entity as AuctionItem, Model as AuctionItemModel,
};
pub use auction_session::{
    Column as AuctionSessionColumn, Entity as AuctionSession, Model as AuctionSessionModel,
};
pub use bill::{Column as BillColumn, Entity as Bill, Model as BillModel};
pub use buyer::{Column as BuyerColumn, Entity as Buyer, Model as BuyerModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use commissioner::{
    Column as CommissionerColumn, Entity as Commissioner, Model as CommissionerModel,
};
pub use enums::{BillPaymentStatus, SessionPaymentStatus, SessionStatus, Unit};
pub use farmer::{Column as FarmerColumn, Entity as Farmer, Model as FarmerModel};
pub use password_reset::{
    Column as PasswordResetColumn, Entity as PasswordReset, Model as PasswordResetModel,
};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
