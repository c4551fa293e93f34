pub mod address_book;
pub mod deployments;
pub mod desired;
pub mod management;
pub mod migration;
pub mod resource;

pub use address_book::AddressBook;
pub use deployments::Deployments;
pub use desired::{DesiredState, TokenSymbol};
pub use management::ManagementSet;
pub use migration::PendingMigration;
pub use resource::{ContractKey, ResourceKind};
