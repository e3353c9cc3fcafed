//! Typed calls for the dashboard's resource endpoints.
//!
//! All of these go through [`ApiClient`], so they carry the bearer token,
//! notify on success and failure, and survive one access token refresh.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::config::endpoints;
use crate::error::Error;
use crate::types::{
    CategoryId, CountryId, DocumentTypeId, HsnCodeId, ProductId, ProductStatus, UserDocumentId,
    UserId, UserProfile, UserStatus,
};

/// Product category, as listed by `GET categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(default)]
    pub category_description: Option<String>,
}

/// Body for creating or editing a category.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForm {
    pub category_name: String,
    pub category_description: String,
}

/// Document a product of a category must (or may) carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub document_type_id: DocumentTypeId,
    pub document_type_name: String,
    #[serde(default)]
    pub document_type_description: Option<String>,
    /// Accepted file format, e.g. `pdf`.
    #[serde(default)]
    pub document_type_format: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default)]
    pub mandatory: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeForm {
    pub document_type_name: String,
    pub document_type_description: String,
    pub document_type_format: String,
    pub document_category_id: CategoryId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub product_displayname: String,
    #[serde(default)]
    pub customer_product_description: Option<String>,
    #[serde(default)]
    pub origin_hsn_code: Option<String>,
    #[serde(default)]
    pub product_feature: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    pub status: ProductStatus,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default)]
    pub country_id: Option<CountryId>,
    #[serde(default)]
    pub import_status: Option<String>,
}

/// Body of `POST products` (no id) and `PUT products` (with id).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    pub product_display_name: String,
    pub origin_hsn_code: String,
    pub product_category_id: Option<CategoryId>,
    pub customer_product_description: String,
    pub product_feature: String,
    pub product_custom_fields: Vec<CustomField>,
    pub product_documents: Vec<ProductDocument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomField {
    #[serde(rename = "FieldName")]
    pub name: String,
    #[serde(rename = "FieldValue")]
    pub value: String,
}

/// Uploaded document; `document_data` is the base64 file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDocument {
    pub document_type: String,
    pub document_name: String,
    pub document_data: String,
}

/// Body of `PATCH products`: an officer or admin moving a product along
/// the approval workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStatusUpdate {
    pub product_id: ProductId,
    pub status: ProductStatus,
    pub comments: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_id: Option<CountryId>,
}

impl ProductStatusUpdate {
    #[must_use]
    pub fn new(product_id: ProductId, status: ProductStatus, comments: impl Into<String>) -> Self {
        Self {
            product_id,
            status,
            comments: comments.into(),
            country_id: None,
        }
    }
}

/// Officer note attached to a product review.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Note {
    pub note_id: i64,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub note_created_at: Option<String>,
    pub note_description: String,
    #[serde(default)]
    pub user_role: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Import approval of one product for one destination country.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImportStatus {
    pub product_id: ProductId,
    pub product_displayname: String,
    #[serde(default)]
    pub origin_hsn_code: Option<String>,
    pub country_id: CountryId,
    pub country_name: String,
    pub import_status: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub notes: Vec<Note>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub country_id: CountryId,
    pub country_code: String,
    pub country_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryForm {
    pub country_code: String,
    pub country_name: String,
}

/// HSN (Harmonized System of Nomenclature) code and the documents a
/// product filed under it has to carry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HsnCode {
    pub hsn_id: HsnCodeId,
    pub hsn_code: String,
    #[serde(default)]
    pub hsn_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub documents: Vec<DocumentType>,
}

/// `GET hsncodes` payload: the codes plus every selectable document type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HsnCodes {
    #[serde(default)]
    pub hsn_codes: Vec<HsnCode>,
    #[serde(default)]
    pub document_types: Vec<DocumentType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HsnDocumentRequirement {
    pub document_type_id: DocumentTypeId,
    pub mandatory: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HsnCodeForm {
    pub hsn_code: String,
    pub hsn_description: String,
    pub document_types: Vec<HsnDocumentRequirement>,
}

/// Document a user uploaded to their own profile (licences, registrations).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserDocument {
    pub userdocument_id: UserDocumentId,
    pub document_name: String,
    #[serde(default)]
    pub document_type: Option<String>,
    #[serde(default)]
    pub filetype: Option<String>,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub contentpath: Option<String>,
    #[serde(default)]
    pub audit_timestamp: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub userprofile_id: Option<UserId>,
    /// Base64 file content, when the server inlines it.
    #[serde(default, rename = "base64Data")]
    pub base64_data: Option<String>,
}

/// Body of `POST userdocuments` and `PATCH userdocuments/{id}`;
/// `document_data` is the base64 file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocumentForm {
    pub document_type: String,
    pub document_name: String,
    pub document_data: String,
}

/// Upload responses wrap the stored row as `{ document }`.
#[derive(Deserialize)]
struct StoredDocument {
    document: UserDocument,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserStatusUpdate {
    user_id: UserId,
    status: UserStatus,
}

impl ApiClient {
    /// # Errors
    ///
    /// See [`Error`].
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, Error> {
        self.get(endpoints::USERS).await
    }

    /// Approve or reject an account.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub async fn update_user_status(&self, user_id: UserId, status: UserStatus) -> Result<(), Error> {
        let _: IgnoredAny = self
            .patch(endpoints::USERS, &UserStatusUpdate { user_id, status })
            .await?;
        tracing::info!(%user_id, ?status, "User status updated");
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn list_products(&self) -> Result<Vec<Product>, Error> {
        self.get(endpoints::PRODUCTS).await
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn get_product(&self, id: ProductId) -> Result<Product, Error> {
        self.get(&format!("{}/{id}", endpoints::PRODUCTS)).await
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn create_product(&self, product: &ProductForm) -> Result<(), Error> {
        let _: IgnoredAny = self.post(endpoints::PRODUCTS, product).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `product.product_id` is unset.
    pub async fn update_product(&self, product: &ProductForm) -> Result<(), Error> {
        if product.product_id.is_none() {
            return Err(Error::Validation("Product id is required".into()));
        }
        let _: IgnoredAny = self.put(endpoints::PRODUCTS, product).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn update_product_status(&self, update: &ProductStatusUpdate) -> Result<(), Error> {
        let _: IgnoredAny = self.patch(endpoints::PRODUCTS, update).await?;
        tracing::info!(
            product_id = %update.product_id,
            status = ?update.status,
            "Product status updated"
        );
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn delete_product(&self, id: ProductId) -> Result<(), Error> {
        let _: IgnoredAny = self
            .delete(&format!("{}/{id}", endpoints::PRODUCTS))
            .await?;
        Ok(())
    }

    /// Fetch the categories and refresh the cached copy in the token store.
    ///
    /// # Errors
    ///
    /// See [`Error`]. A failure to update the cache is only logged.
    pub async fn list_categories(&self) -> Result<Vec<Category>, Error> {
        let categories: Vec<Category> = self.get(endpoints::CATEGORIES).await?;
        if let Err(e) = self.store().save_categories(&categories) {
            tracing::warn!(error = %e, "Failed to cache product categories");
        }
        Ok(categories)
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn create_category(&self, category: &CategoryForm) -> Result<(), Error> {
        let _: IgnoredAny = self.post(endpoints::CATEGORIES, category).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn update_category(&self, id: CategoryId, category: &CategoryForm) -> Result<(), Error> {
        let _: IgnoredAny = self
            .patch(&format!("{}/{id}", endpoints::CATEGORIES), category)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), Error> {
        let _: IgnoredAny = self
            .delete(&format!("{}/{id}", endpoints::CATEGORIES))
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn list_document_types(&self) -> Result<Vec<DocumentType>, Error> {
        self.get(endpoints::PRODUCT_DOCUMENT_TYPES).await
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn create_document_type(&self, document_type: &DocumentTypeForm) -> Result<(), Error> {
        let _: IgnoredAny = self
            .post(endpoints::PRODUCT_DOCUMENT_TYPES, document_type)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn update_document_type(
        &self,
        id: DocumentTypeId,
        document_type: &DocumentTypeForm,
    ) -> Result<(), Error> {
        let _: IgnoredAny = self
            .patch(
                &format!("{}/{id}", endpoints::PRODUCT_DOCUMENT_TYPES),
                document_type,
            )
            .await?;
        Ok(())
    }

    /// Import approval of a product for one destination country.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub async fn get_import_status(
        &self,
        product_id: ProductId,
        country_id: CountryId,
    ) -> Result<ImportStatus, Error> {
        self.get(&format!(
            "{}/{product_id}/{}/{country_id}",
            endpoints::PRODUCTS,
            endpoints::IMPORT_STATUS
        ))
        .await
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn list_countries(&self) -> Result<Vec<Country>, Error> {
        self.get(endpoints::COUNTRIES).await
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn create_country(&self, country: &CountryForm) -> Result<(), Error> {
        let _: IgnoredAny = self.post(endpoints::COUNTRIES, country).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn update_country(&self, id: CountryId, country: &CountryForm) -> Result<(), Error> {
        let _: IgnoredAny = self
            .patch(&format!("{}/{id}", endpoints::COUNTRIES), country)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn list_hsn_codes(&self) -> Result<HsnCodes, Error> {
        self.get(endpoints::HSN_CODES).await
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the code is blank.
    pub async fn create_hsn_code(&self, hsn: &HsnCodeForm) -> Result<(), Error> {
        validate_hsn_code(hsn)?;
        let _: IgnoredAny = self.post(endpoints::HSN_CODES, hsn).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the code is blank.
    pub async fn update_hsn_code(&self, id: HsnCodeId, hsn: &HsnCodeForm) -> Result<(), Error> {
        validate_hsn_code(hsn)?;
        let _: IgnoredAny = self
            .patch(&format!("{}/{id}", endpoints::HSN_CODES), hsn)
            .await?;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`Error`].
    pub async fn list_user_documents(&self, user_id: UserId) -> Result<Vec<UserDocument>, Error> {
        self.get(&format!("{}/{user_id}", endpoints::USER_DOCUMENTS))
            .await
    }

    /// Upload a document for the signed-in user and return the stored row.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub async fn upload_user_document(
        &self,
        document: &UserDocumentForm,
    ) -> Result<UserDocument, Error> {
        let stored: StoredDocument = self.post(endpoints::USER_DOCUMENTS, document).await?;
        tracing::debug!(id = %stored.document.userdocument_id, "User document uploaded");
        Ok(stored.document)
    }

    /// Replace an uploaded document.
    ///
    /// # Errors
    ///
    /// See [`Error`].
    pub async fn update_user_document(
        &self,
        id: UserDocumentId,
        document: &UserDocumentForm,
    ) -> Result<UserDocument, Error> {
        let stored: StoredDocument = self
            .patch(&format!("{}/{id}", endpoints::USER_DOCUMENTS), document)
            .await?;
        Ok(stored.document)
    }
}

fn validate_hsn_code(hsn: &HsnCodeForm) -> Result<(), Error> {
    if hsn.hsn_code.trim().is_empty() {
        return Err(Error::Validation("HSN code is required".into()));
    }
    Ok(())
}
