#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod guard;
pub mod messages;
pub mod resources;
pub mod routes;
pub mod storage;
pub mod store;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use client::{ApiClient, Notifier, TracingNotifier};
pub use config::ClientConfig;
pub use error::Error;
pub use flow::{
    AuthController, AuthState, FlowState, Navigator, SignInRequest, SignInResponse, SignUpRequest,
};
pub use guard::{Decision, RouteGuard, authorize};
pub use resources::{
    Category, CategoryForm, Country, CountryForm, CustomField, DocumentType, DocumentTypeForm,
    HsnCode, HsnCodeForm, HsnCodes, HsnDocumentRequirement, ImportStatus, Note, Product,
    ProductDocument, ProductForm, ProductStatusUpdate, UserDocument, UserDocumentForm,
};
pub use routes::{Route, landing_route};
pub use store::TokenStore;
pub use types::{
    AuthTokens, CategoryId, CountryId, DocumentTypeId, HsnCodeId, ProductId, ProductStatus, Role,
    Session, TokenGrant, UserDocumentId, UserId, UserProfile, UserStatus,
};
