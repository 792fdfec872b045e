//! Typed wrappers over the Keeper contracts.

pub mod agreements;
pub mod conditions;
pub mod did_registry;
pub mod dispenser;
pub mod nft;
pub mod templates;
pub mod token;

pub use agreements::{
    AgreementStoreManager, AgreementValues, ConditionState, ConditionStoreManager,
    ConditionValues,
};
pub use conditions::{Condition, ConditionKind};
pub use did_registry::{
    DidRegisterValues, DidRegistration, DidRegistry, ProvenanceEntry, ProvenanceEvent,
    ProvenanceMethod, RegisteredAttribute,
};
pub use dispenser::Dispenser;
pub use nft::{Nft1155, Nft721};
pub use templates::{Template, TemplateKind};
pub use token::Token;
