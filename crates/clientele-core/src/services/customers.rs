//! Customer, contact and activity endpoints.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::filters::CustomerFilter;
use crate::models::{
    Activity, ActivityDraft, Contact, ContactDraft, Customer, CustomerDraft, Paginated,
};

/// A customer with its contacts and activity history, as shown on the
/// detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerOverview {
    pub customer: Customer,
    pub contacts: Vec<Contact>,
    pub activities: Vec<Activity>,
}

/// `GET /customers` with `page`, `limit`, then `status` and `search` when set.
fn list_request(page: u32, limit: u32, filter: &CustomerFilter) -> ApiRequest {
    let mut request = ApiRequest::get("/customers")
        .query("page", page)
        .query("limit", limit);
    if let Some(status) = filter.status {
        request = request.query("status", status.as_str());
    }
    let search = filter.search.trim();
    if !search.is_empty() {
        request = request.query("search", search);
    }
    request
}

fn customer_path(id: &str) -> String {
    format!("/customers/{}", urlencoding::encode(id))
}

fn contacts_path(customer_id: &str) -> String {
    format!("{}/contacts", customer_path(customer_id))
}

fn contact_path(customer_id: &str, contact_id: &str) -> String {
    format!("{}/{}", contacts_path(customer_id), urlencoding::encode(contact_id))
}

fn activities_path(customer_id: &str) -> String {
    format!("{}/activities", customer_path(customer_id))
}

fn activity_path(customer_id: &str, activity_id: &str) -> String {
    format!("{}/{}", activities_path(customer_id), urlencoding::encode(activity_id))
}

#[derive(Clone)]
pub struct CustomerService {
    api: ApiClient,
}

impl CustomerService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    // ===== Customers =====

    /// Fetch one page of customers. Empty filter values are not sent.
    pub async fn list_customers(
        &self,
        page: u32,
        limit: u32,
        filter: &CustomerFilter,
    ) -> Result<Paginated<Customer>, ApiError> {
        let result: Paginated<Customer> = self
            .api
            .send_as(list_request(page, limit, filter))
            .await?;
        debug!(count = result.data.len(), total = result.meta.total, "Customers fetched");
        Ok(result)
    }

    /// Like `list_customers`, but abandoned with `ApiError::Cancelled` once
    /// `cancel` fires. Used when a newer query supersedes this one.
    pub async fn list_customers_with_cancel(
        &self,
        page: u32,
        limit: u32,
        filter: &CustomerFilter,
        cancel: &CancellationToken,
    ) -> Result<Paginated<Customer>, ApiError> {
        let result: Paginated<Customer> = self
            .api
            .send_as_with_cancel(list_request(page, limit, filter), cancel)
            .await?;
        debug!(count = result.data.len(), total = result.meta.total, "Customers fetched");
        Ok(result)
    }

    pub async fn get_customer(&self, id: &str) -> Result<Customer, ApiError> {
        self.api.get(&customer_path(id)).await
    }

    pub async fn create_customer(&self, draft: &CustomerDraft) -> Result<Customer, ApiError> {
        self.api.post("/customers", draft).await
    }

    pub async fn update_customer(&self, id: &str, draft: &CustomerDraft) -> Result<Customer, ApiError> {
        self.api.put(&customer_path(id), draft).await
    }

    pub async fn delete_customer(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete::<IgnoredAny>(&customer_path(id)).await?;
        Ok(())
    }

    // ===== Contacts =====

    pub async fn list_contacts(&self, customer_id: &str) -> Result<Vec<Contact>, ApiError> {
        self.api.get(&contacts_path(customer_id)).await
    }

    pub async fn add_contact(&self, customer_id: &str, draft: &ContactDraft) -> Result<Contact, ApiError> {
        self.api.post(&contacts_path(customer_id), draft).await
    }

    pub async fn update_contact(
        &self,
        customer_id: &str,
        contact_id: &str,
        draft: &ContactDraft,
    ) -> Result<Contact, ApiError> {
        self.api.put(&contact_path(customer_id, contact_id), draft).await
    }

    pub async fn delete_contact(&self, customer_id: &str, contact_id: &str) -> Result<(), ApiError> {
        self.api
            .delete::<IgnoredAny>(&contact_path(customer_id, contact_id))
            .await?;
        Ok(())
    }

    // ===== Activities =====

    pub async fn list_activities(&self, customer_id: &str) -> Result<Vec<Activity>, ApiError> {
        self.api.get(&activities_path(customer_id)).await
    }

    pub async fn add_activity(&self, customer_id: &str, draft: &ActivityDraft) -> Result<Activity, ApiError> {
        self.api.post(&activities_path(customer_id), draft).await
    }

    pub async fn update_activity(
        &self,
        customer_id: &str,
        activity_id: &str,
        draft: &ActivityDraft,
    ) -> Result<Activity, ApiError> {
        self.api.put(&activity_path(customer_id, activity_id), draft).await
    }

    pub async fn delete_activity(&self, customer_id: &str, activity_id: &str) -> Result<(), ApiError> {
        self.api
            .delete::<IgnoredAny>(&activity_path(customer_id, activity_id))
            .await?;
        Ok(())
    }

    // ===== Detail view =====

    /// Fetch a customer together with its contacts and activities.
    ///
    /// The three requests run concurrently. The customer itself is required;
    /// a failed contacts or activities fetch leaves that list empty.
    pub async fn customer_overview(&self, id: &str) -> Result<CustomerOverview, ApiError> {
        let (customer, contacts, activities) = futures::join!(
            self.get_customer(id),
            self.list_contacts(id),
            self.list_activities(id),
        );

        let customer = customer?;
        let contacts = contacts.unwrap_or_else(|e| {
            warn!(customer_id = %id, error = %e, "Failed to load contacts");
            Vec::new()
        });
        let activities = activities.unwrap_or_else(|e| {
            warn!(customer_id = %id, error = %e, "Failed to load activities");
            Vec::new()
        });

        Ok(CustomerOverview {
            customer,
            contacts,
            activities,
        })
    }
}
