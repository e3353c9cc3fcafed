//! Dashboard routes and who may enter them.

use crate::types::{CountryId, ProductId, Role};

const ADMIN: &[Role] = &[Role::Admin];
const MANUFACTURER: &[Role] = &[Role::Manufacturer];
const OFFICER: &[Role] = &[Role::Officer];
const ADMIN_OR_MANUFACTURER: &[Role] = &[Role::Admin, Role::Manufacturer];
const ANY_ROLE: &[Role] = &Role::ALL;

/// Every view the dashboard can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    ForgotPassword,
    NotAuthorized,
    /// User administration.
    Users,
    /// Products owned by the signed-in manufacturer (admin sees all).
    UserProducts,
    /// Officer's product review list.
    Products,
    AddProduct,
    EditProduct(ProductId),
    ProductDetails(ProductId),
    ProductCategories,
    ProductDocumentType,
    Countries,
    HsnCodes,
    ImportStatusDetails {
        product: ProductId,
        country: CountryId,
    },
    UserProfile,
}

impl Route {
    /// Path of the route in the dashboard.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::ForgotPassword => "/forgotPassword".into(),
            Self::NotAuthorized => "/not-authorized".into(),
            Self::Users => "/users".into(),
            Self::UserProducts => "/userProducts".into(),
            Self::Products => "/products".into(),
            Self::AddProduct => "/products/addProduct".into(),
            Self::EditProduct(id) => format!("/products/editProduct/{id}"),
            Self::ProductDetails(id) => format!("/products/{id}"),
            Self::ProductCategories => "/productCategories".into(),
            Self::ProductDocumentType => "/productDocumentType".into(),
            Self::Countries => "/countries".into(),
            Self::HsnCodes => "/hsnCodes".into(),
            Self::ImportStatusDetails { product, country } => {
                format!("/products/{product}/import-status/{country}")
            }
            Self::UserProfile => "/userProfile".into(),
        }
    }

    /// Roles admitted to this route. `None` for public routes.
    #[must_use]
    pub fn allowed_roles(&self) -> Option<&'static [Role]> {
        match self {
            Self::Login | Self::Register | Self::ForgotPassword | Self::NotAuthorized => None,
            Self::Users
            | Self::ProductCategories
            | Self::ProductDocumentType
            | Self::Countries
            | Self::HsnCodes => Some(ADMIN),
            Self::UserProducts | Self::ProductDetails(_) => Some(ADMIN_OR_MANUFACTURER),
            Self::AddProduct | Self::EditProduct(_) => Some(MANUFACTURER),
            Self::Products => Some(OFFICER),
            Self::ImportStatusDetails { .. } | Self::UserProfile => Some(ANY_ROLE),
        }
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.allowed_roles().is_none()
    }

    /// Parse a dashboard path. `/` is the login page.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] | ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["forgotPassword"] => Self::ForgotPassword,
            ["not-authorized"] => Self::NotAuthorized,
            ["users"] => Self::Users,
            ["userProducts"] => Self::UserProducts,
            ["products"] => Self::Products,
            ["products", "addProduct"] => Self::AddProduct,
            ["products", "editProduct", id] => Self::EditProduct(ProductId(id.parse().ok()?)),
            ["products", id] => Self::ProductDetails(ProductId(id.parse().ok()?)),
            ["products", product, "import-status", country] => Self::ImportStatusDetails {
                product: ProductId(product.parse().ok()?),
                country: CountryId(country.parse().ok()?),
            },
            ["productCategories"] => Self::ProductCategories,
            ["productDocumentType"] => Self::ProductDocumentType,
            ["countries"] => Self::Countries,
            ["hsnCodes"] => Self::HsnCodes,
            ["userProfile"] => Self::UserProfile,
            _ => return None,
        };
        Some(route)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path())
    }
}

/// Where a user lands after signing in.
///
/// A profile whose role is not recognized lands on [`Route::NotAuthorized`].
#[must_use]
pub fn landing_route(role: Option<Role>) -> Route {
    match role {
        Some(Role::Admin) => Route::Users,
        Some(Role::Manufacturer) => Route::UserProducts,
        Some(Role::Officer) => Route::Products,
        None => Route::NotAuthorized,
    }
}
